//! The single thread that owns the Modbus-TCP connection.
//!
//! Every request from every caller is serialised through `rx`; this mirrors
//! the teacher driver's IO thread owning the CAN adapter and accepting
//! frames over a channel rather than letting every caller touch the socket.

use crate::error::TransportError;
use cell_tools::{Backoff, BackoffConfig};
use crossbeam_channel::Receiver;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::*;
use tracing::{debug, error, info, warn};

pub(crate) enum Request {
    ReadU16 {
        addr: u16,
        reply: crossbeam_channel::Sender<Result<u16, TransportError>>,
    },
    WriteU16 {
        addr: u16,
        value: u16,
        reply: crossbeam_channel::Sender<Result<(), TransportError>>,
    },
    ReadBlock {
        addr: u16,
        count: u16,
        reply: crossbeam_channel::Sender<Result<Vec<u16>, TransportError>>,
    },
    WriteBlock {
        addr: u16,
        values: Vec<u16>,
        reply: crossbeam_channel::Sender<Result<(), TransportError>>,
    },
}

pub(crate) fn run(addr: SocketAddr, rx: Receiver<Request>, connected: Arc<AtomicBool>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("transport worker failed to start its runtime: {e}");
            return;
        }
    };

    runtime.block_on(async move {
        let mut ctx: Option<Context> = None;
        let mut backoff = Backoff::new(BackoffConfig::default());

        while let Ok(request) = rx.recv() {
            if ctx.is_none() {
                match tcp::connect(addr).await {
                    Ok(c) => {
                        info!("connected to Modbus server at {addr}");
                        connected.store(true, Ordering::SeqCst);
                        backoff.reset();
                        ctx = Some(c);
                    }
                    Err(e) => {
                        connected.store(false, Ordering::SeqCst);
                        warn!("Modbus connect to {addr} failed: {e}");
                        fail_request(request, TransportError::ErrTransport(e.to_string()));
                        tokio::time::sleep(backoff.next_delay()).await;
                        continue;
                    }
                }
            }

            let context = ctx.as_mut().expect("context populated above");
            if !dispatch(context, request).await {
                error!("Modbus transport error, dropping connection to reconnect");
                connected.store(false, Ordering::SeqCst);
                ctx = None;
            }
        }

        debug!("transport worker shutting down: request channel closed");
    });
}

fn fail_request(request: Request, err: TransportError) {
    match request {
        Request::ReadU16 { reply, .. } => {
            let _ = reply.send(Err(err));
        }
        Request::WriteU16 { reply, .. } => {
            let _ = reply.send(Err(err));
        }
        Request::ReadBlock { reply, .. } => {
            let _ = reply.send(Err(err));
        }
        Request::WriteBlock { reply, .. } => {
            let _ = reply.send(Err(err));
        }
    }
}

/// The result of one roundtrip against the live connection, distinguishing
/// a Modbus-protocol exception (peer rejected the request; connection is
/// still good) from an I/O failure (connection must be dropped and
/// reconnected on the next request).
enum Outcome<T> {
    Success(T),
    ProtocolException(TransportError),
    IoFailure(TransportError),
}

fn classify<T>(
    outcome: Result<Result<T, tokio_modbus::ExceptionCode>, std::io::Error>,
) -> Outcome<T> {
    match outcome {
        Ok(Ok(value)) => Outcome::Success(value),
        Ok(Err(exception)) => Outcome::ProtocolException(TransportError::ErrTransport(format!(
            "Modbus exception: {exception}"
        ))),
        Err(io_err) => Outcome::IoFailure(TransportError::ErrTransport(io_err.to_string())),
    }
}

/// Executes one request and always replies to the caller. Returns `false`
/// when the connection should be torn down and reconnected.
async fn dispatch(ctx: &mut Context, request: Request) -> bool {
    match request {
        Request::ReadU16 { addr, reply } => {
            match classify(ctx.read_holding_registers(addr, 1).await) {
                Outcome::Success(mut regs) => {
                    let _ = reply.send(Ok(regs.remove(0)));
                    true
                }
                Outcome::ProtocolException(e) => {
                    let _ = reply.send(Err(e));
                    true
                }
                Outcome::IoFailure(e) => {
                    let _ = reply.send(Err(e));
                    false
                }
            }
        }
        Request::WriteU16 { addr, value, reply } => {
            match classify(ctx.write_single_register(addr, value).await) {
                Outcome::Success(()) => {
                    let _ = reply.send(Ok(()));
                    true
                }
                Outcome::ProtocolException(e) => {
                    let _ = reply.send(Err(e));
                    true
                }
                Outcome::IoFailure(e) => {
                    let _ = reply.send(Err(e));
                    false
                }
            }
        }
        Request::ReadBlock { addr, count, reply } => {
            match classify(ctx.read_holding_registers(addr, count).await) {
                Outcome::Success(regs) => {
                    let _ = reply.send(Ok(regs));
                    true
                }
                Outcome::ProtocolException(e) => {
                    let _ = reply.send(Err(e));
                    true
                }
                Outcome::IoFailure(e) => {
                    let _ = reply.send(Err(e));
                    false
                }
            }
        }
        Request::WriteBlock { addr, values, reply } => {
            match classify(ctx.write_multiple_registers(addr, &values).await) {
                Outcome::Success(()) => {
                    let _ = reply.send(Ok(()));
                    true
                }
                Outcome::ProtocolException(e) => {
                    let _ = reply.send(Err(e));
                    true
                }
                Outcome::IoFailure(e) => {
                    let _ = reply.send(Err(e));
                    false
                }
            }
        }
    }
}
