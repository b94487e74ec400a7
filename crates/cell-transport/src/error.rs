use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Modbus transport error: {0}")]
    ErrTransport(String),

    #[error("not connected to the Modbus server")]
    NotConnected,

    #[error("transport worker shut down")]
    WorkerGone,
}
