//! Unload flow (motion, Flow2): standby → internal buffer pickup →
//! discharge → release → standby → report done.

use crate::cancel::CancelToken;
use crate::error::FlowError;
use crate::flows::FlowContext;
use cell_devices::CancelSignal;

pub fn run(ctx: &FlowContext, cancel: &CancelToken) -> Result<(), FlowError> {
    let standby = ctx.points.get("standby")?;
    let buffer = ctx.points.get("buffer_pickup")?;
    let discharge = ctx.points.get("discharge")?;

    ctx.robot.move_j(standby.cartesian)?;
    ctx.robot.sync()?;

    ctx.robot.move_l(buffer.cartesian)?;
    ctx.robot.sync()?;

    ctx.gripper.quick_close().map_err(FlowError::Device)?;

    if matches!(cancel.poll(), CancelSignal::Abort) {
        return Err(FlowError::Cancelled);
    }

    ctx.robot.move_j(discharge.cartesian)?;
    ctx.robot.sync()?;

    ctx.gripper.quick_open().map_err(FlowError::Device)?;

    ctx.robot.move_j(standby.cartesian)?;
    ctx.robot.sync()?;

    ctx.state_machine.report_success();
    Ok(())
}
