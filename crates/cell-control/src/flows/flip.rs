//! Flip flow (I/O-A): a pure DO sequence cycling two pneumatic actuators
//! with intermediate sleep gates. Runs on its own worker, independent of
//! the motion state machine.

use crate::error::FlowError;
use crate::flows::{FlipChannels, FlowContext};

pub fn run(ctx: &FlowContext, channels: FlipChannels) -> Result<(), FlowError> {
    ctx.robot.set_do(channels.actuator_a, true)?;
    std::thread::sleep(channels.settle);
    ctx.robot.set_do(channels.actuator_a, false)?;

    ctx.robot.set_do(channels.actuator_b, true)?;
    std::thread::sleep(channels.settle);
    ctx.robot.set_do(channels.actuator_b, false)?;

    Ok(())
}
