//! Register map, status-word bit layout and wire encoding shared by every
//! peripheral client and the motion state machine.

pub mod command;
pub mod detection;
pub mod error;
pub mod flow;
pub mod polygon;
pub mod registers;
pub mod status;
pub mod value;

pub use command::{FeederCommand, GripperCommand, VisionCommand, ANGLE_DETECT_COMMAND};
pub use detection::DetectionRecord;
pub use error::ProtocolError;
pub use flow::{FlowCommand, FlowId, FlowKind, FlowPayload};
pub use polygon::ProtectionPolygon;
pub use status::StatusWord;
pub use value::{centihundredths_to_f64, decode_i32_be, encode_i32_be, f64_to_centihundredths};
