//! High-level device clients built on the shared handshake primitive:
//! camera-A (buffered detection), the gripper, and the angle-correction
//! camera-B + servo bridge pair.

pub mod angle;
pub mod camera;
pub mod error;
pub mod gripper;
pub mod handshake;
pub mod peripheral;

pub use angle::{AngleClient, AngleDetection, ServoBridge};
pub use camera::CameraClient;
pub use error::DeviceError;
pub use gripper::{CancelPoll, CancelSignal, GripperClient};
pub use handshake::{HandshakeDescriptor, HandshakeTiming};
pub use peripheral::Peripheral;
