//! Flow-level error taxonomy: every device/transport error a flow step can
//! raise, plus the failures that belong to the control layer itself.

use cell_devices::DeviceError;
use cell_transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FlowError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("no material available on camera-A's queue")]
    NoMaterial,

    #[error("motion state machine refused the command: not ready")]
    NotReadyForCommand,

    #[error("flow cancelled")]
    Cancelled,

    #[error("named point {0:?} not found in the loaded points file")]
    UnknownPoint(String),

    #[error("motion primitive {0} timed out")]
    MotionTimeout(&'static str),
}
