//! Assembly / run flow (motion, Flow5): a longer scripted path touching
//! several named points in sequence.

use crate::cancel::CancelToken;
use crate::error::FlowError;
use crate::flows::FlowContext;
use cell_devices::CancelSignal;

/// The named points visited, in order. Configurable in spirit — kept as a
/// constant sequence here since the assembly path is fixed per cell.
const WAYPOINTS: &[&str] = &["standby", "assembly_approach", "assembly_1", "assembly_2", "assembly_release", "standby"];

pub fn run(ctx: &FlowContext, cancel: &CancelToken) -> Result<(), FlowError> {
    for name in WAYPOINTS {
        if matches!(cancel.poll(), CancelSignal::Abort) {
            return Err(FlowError::Cancelled);
        }
        let point = ctx.points.get(name)?;
        ctx.robot.move_j(point.cartesian)?;
        ctx.robot.sync()?;
    }

    ctx.state_machine.report_success();
    Ok(())
}
