use cell_transport::ModbusTransport;
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

/// Binds a listener without ever accepting, so connects it.
fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener); // nothing is listening on this port anymore
    addr
}

#[test]
fn reports_not_connected_when_the_peer_is_unreachable() {
    let addr = unreachable_addr();
    let transport = ModbusTransport::connect(addr);

    // First request forces a connect attempt that fails; the handle should
    // surface a transport error rather than hang indefinitely.
    let result = transport.read_u16(0);
    assert!(result.is_err());
    assert!(!transport.is_connected());
}

#[test]
fn cloned_handles_share_the_same_worker() {
    let addr = unreachable_addr();
    let transport = ModbusTransport::connect(addr);
    let cloned = transport.clone();

    assert_eq!(transport.is_connected(), cloned.is_connected());
    std::thread::sleep(Duration::from_millis(10));
    assert!(!cloned.is_connected());
}
