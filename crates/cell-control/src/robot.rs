//! The robot motion-primitive surface flows script against. The robot API
//! is used only to enqueue motion; the core is the party that enforces
//! completion via `sync()`.

use crate::error::FlowError;
use crate::points::{Cartesian, Joint};
use std::time::Duration;
use tracing::debug;

pub trait MotionPrimitives: Send + Sync {
    fn move_j(&self, target: Cartesian) -> Result<(), FlowError>;
    fn move_l(&self, target: Cartesian) -> Result<(), FlowError>;
    fn joint_move(&self, target: Joint) -> Result<(), FlowError>;
    /// Waits for the motion queue to drain. Every motion primitive is
    /// immediately followed by this call.
    fn sync(&self) -> Result<(), FlowError>;
    fn set_do(&self, channel: u16, value: bool) -> Result<(), FlowError>;
    fn read_di(&self, channel: u16) -> Result<bool, FlowError>;
}

/// A `MotionPrimitives` implementation that just records calls and sleeps
/// briefly, standing in for an actual robot-arm driver connection.
pub struct MockRobot {
    pub step_delay: Duration,
}

impl Default for MockRobot {
    fn default() -> Self {
        Self { step_delay: Duration::from_millis(10) }
    }
}

impl MotionPrimitives for MockRobot {
    fn move_j(&self, target: Cartesian) -> Result<(), FlowError> {
        debug!(?target, "mock robot: move_j");
        std::thread::sleep(self.step_delay);
        Ok(())
    }

    fn move_l(&self, target: Cartesian) -> Result<(), FlowError> {
        debug!(?target, "mock robot: move_l");
        std::thread::sleep(self.step_delay);
        Ok(())
    }

    fn joint_move(&self, target: Joint) -> Result<(), FlowError> {
        debug!(?target, "mock robot: joint_move");
        std::thread::sleep(self.step_delay);
        Ok(())
    }

    fn sync(&self) -> Result<(), FlowError> {
        Ok(())
    }

    fn set_do(&self, channel: u16, value: bool) -> Result<(), FlowError> {
        debug!(channel, value, "mock robot: set_do");
        Ok(())
    }

    fn read_di(&self, channel: u16) -> Result<bool, FlowError> {
        debug!(channel, "mock robot: read_di");
        Ok(false)
    }
}
