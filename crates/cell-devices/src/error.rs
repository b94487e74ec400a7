//! The flat error taxonomy shared by the handshake primitive and every
//! device client built on top of it.

use cell_transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DeviceError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("peer not ready (Ready/Initialized bits not set, or Alarm set)")]
    NotReady,

    #[error("operation timed out")]
    Timeout,

    #[error("peer asserted Alarm mid-operation")]
    PeerAlarm,

    #[error("peer issued the command but Running never asserted before the deadline")]
    CommandLost,

    #[error("impossible status combination observed: {0}")]
    ProtocolViolation(String),

    #[error("operation cancelled")]
    Cancelled,

    // Camera-specific (§4.3)
    #[error("no objects available")]
    NoObjects,
    #[error("detection failed")]
    DetectionFailed,
    #[error("vision system not ready")]
    SystemNotReady,

    // Angle-correction-specific (§4.5)
    #[error("angle detection failed")]
    Failed,
    #[error("connection error")]
    ConnectionError,
    #[error("system error")]
    SystemError,
    #[error("no valid contour found")]
    NoValidContour,
}
