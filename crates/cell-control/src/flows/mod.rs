//! Per-flow functions: `(robot, peripherals, state_machine, cancel_token) →
//! Result`. Flattens what upstream modelled as a deep executor class
//! hierarchy into plain functions sharing a context struct.

pub mod assembly;
pub mod feed;
pub mod flip;
pub mod pick;
pub mod unload;

use crate::points::PointsConfig;
use crate::robot::MotionPrimitives;
use crate::state_machine::MotionStateMachine;
use cell_devices::{AngleClient, CameraClient, GripperClient, ServoBridge};
use cell_transport::ModbusTransport;
use std::sync::Arc;

/// Everything a flow needs, gathered in one place and constructed once in
/// `main` — the single explicit process-wide context every worker shares,
/// replacing upstream's module-level singleton.
#[derive(Clone)]
pub struct FlowContext {
    pub robot: Arc<dyn MotionPrimitives>,
    pub camera: CameraClient,
    pub gripper: GripperClient,
    pub angle: AngleClient,
    pub servo: ServoBridge,
    pub transport: ModbusTransport,
    pub state_machine: Arc<MotionStateMachine>,
    pub points: Arc<PointsConfig>,
    pub feeder_base: u16,
    /// Whether the pick flow should run its angle-correction step. Disabled
    /// for cells whose part geometry doesn't need re-orienting before
    /// handoff.
    pub angle_correction: bool,
}

/// Channels the flip flow toggles; kept configurable since the exact DO
/// wiring is a cell-specific detail.
#[derive(Debug, Clone, Copy)]
pub struct FlipChannels {
    pub actuator_a: u16,
    pub actuator_b: u16,
    pub settle: std::time::Duration,
}

impl Default for FlipChannels {
    fn default() -> Self {
        Self {
            actuator_a: 0,
            actuator_b: 1,
            settle: std::time::Duration::from_millis(300),
        }
    }
}
