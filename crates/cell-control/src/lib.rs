//! Motion state machine, flow executors, dispatcher/queues and the
//! auto-program loop built on top of `cell-devices`.

pub mod auto_program;
pub mod cancel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod flows;
pub mod points;
pub mod robot;
pub mod state_machine;

pub use auto_program::{AutoProgram, AutoProgramCountersSnapshot, RobotJobSupervisor, SharedSignals};
pub use cancel::CancelToken;
pub use config::{CellConfig, CliPreferences};
pub use dispatcher::{Dispatcher, Queues};
pub use error::FlowError;
pub use flows::FlowContext;
pub use points::{Cartesian, Joint, Point, PointsConfig};
pub use robot::{MockRobot, MotionPrimitives};
pub use state_machine::{FlowSlot, MotionState, MotionStateMachine};
