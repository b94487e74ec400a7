//! Pick flow (motion, Flow1): standby → retrieve target from camera-A's
//! FIFO → approach → descend → grip → lift → handoff → angle-correct →
//! report done.

use crate::cancel::CancelToken;
use crate::error::FlowError;
use crate::flows::FlowContext;
use crate::points::Cartesian;
use cell_devices::CancelPoll;
use tracing::info;

/// Run the pick flow to completion. Returns the angle-correction result's
/// measured angle so the caller can log/inspect it, or `None` when
/// `ctx.angle_correction` is disabled and the step was skipped; the servo
/// drive itself happens as a side effect before returning.
pub fn run(ctx: &FlowContext, cancel: &CancelToken) -> Result<Option<f64>, FlowError> {
    let standby = ctx.points.get("standby")?;
    ctx.robot.move_j(standby.cartesian)?;
    ctx.robot.sync()?;

    let detection = ctx
        .camera
        .get_next_object()
        .map_err(FlowError::Device)?
        .ok_or(FlowError::NoMaterial)?;

    let approach_template = ctx.points.get("pick_approach")?;
    let grasp_template = ctx.points.get("pick_grasp")?;
    let handoff = ctx.points.get("handoff")?;

    let approach = Cartesian {
        x: detection.world_xy.0,
        y: detection.world_xy.1,
        z: approach_template.cartesian.z,
        r: approach_template.cartesian.r,
    };
    let grasp = Cartesian {
        x: detection.world_xy.0,
        y: detection.world_xy.1,
        z: grasp_template.cartesian.z,
        r: grasp_template.cartesian.r,
    };

    ctx.robot.move_l(approach)?;
    ctx.robot.sync()?;

    ctx.robot.move_l(grasp)?;
    ctx.robot.sync()?;

    ctx.gripper.quick_close().map_err(FlowError::Device)?;

    if matches!(cancel.poll(), cell_devices::CancelSignal::Abort) {
        return Err(FlowError::Cancelled);
    }

    ctx.robot.move_l(approach)?;
    ctx.robot.sync()?;

    ctx.robot.move_j(handoff.cartesian)?;
    ctx.robot.sync()?;

    let measured_angle = if ctx.angle_correction {
        let detection = ctx.angle.detect_angle(0).map_err(FlowError::Device)?;
        let target = cell_devices::angle::target_servo_position(detection.measured_angle);
        ctx.servo.drive_to(target).map_err(FlowError::Device)?;
        info!(measured_angle = detection.measured_angle, "pick flow: angle-correction complete");
        Some(detection.measured_angle)
    } else {
        None
    };

    ctx.state_machine.report_success();

    Ok(measured_angle)
}
