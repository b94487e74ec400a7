//! Public, cheaply-`Clone`-able handle to the transport worker.

use crate::error::TransportError;
use crate::worker::{self, Request};
use cell_protocol::{decode_i32_be, encode_i32_be};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Typed, synchronous Modbus-TCP operations, serialised through a single
/// worker thread that owns the one TCP connection this cell's Modbus server
/// sees.
#[derive(Clone)]
pub struct ModbusTransport {
    tx: crossbeam_channel::Sender<Request>,
    connected: Arc<AtomicBool>,
}

impl ModbusTransport {
    pub fn connect(addr: SocketAddr) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let connected = Arc::new(AtomicBool::new(false));
        let connected_for_worker = connected.clone();
        thread::Builder::new()
            .name("modbus-transport".into())
            .spawn(move || worker::run(addr, rx, connected_for_worker))
            .expect("failed to spawn transport worker thread");

        Self { tx, connected }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn read_u16(&self, addr: u16) -> Result<u16, TransportError> {
        let (reply, rx) = crossbeam_channel::bounded(1);
        self.send(Request::ReadU16 { addr, reply })?;
        rx.recv().map_err(|_| TransportError::WorkerGone)?
    }

    pub fn write_u16(&self, addr: u16, value: u16) -> Result<(), TransportError> {
        let (reply, rx) = crossbeam_channel::bounded(1);
        self.send(Request::WriteU16 { addr, value, reply })?;
        rx.recv().map_err(|_| TransportError::WorkerGone)?
    }

    pub fn read_block(&self, addr: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let (reply, rx) = crossbeam_channel::bounded(1);
        self.send(Request::ReadBlock { addr, count, reply })?;
        rx.recv().map_err(|_| TransportError::WorkerGone)?
    }

    pub fn write_block(&self, addr: u16, values: Vec<u16>) -> Result<(), TransportError> {
        let (reply, rx) = crossbeam_channel::bounded(1);
        self.send(Request::WriteBlock { addr, values, reply })?;
        rx.recv().map_err(|_| TransportError::WorkerGone)?
    }

    pub fn read_i32_be(&self, addr: u16) -> Result<i32, TransportError> {
        let regs = self.read_block(addr, 2)?;
        Ok(decode_i32_be(regs[0], regs[1]))
    }

    pub fn write_i32_be(&self, addr: u16, value: i32) -> Result<(), TransportError> {
        let (hi, lo) = encode_i32_be(value);
        self.write_block(addr, vec![hi, lo])
    }

    fn send(&self, request: Request) -> Result<(), TransportError> {
        self.tx.send(request).map_err(|_| TransportError::WorkerGone)
    }
}
