//! Vibration feed flow (I/O-B): drives the vibratory bowl through its own
//! command register block, waits a configured duration, stops it.
//!
//! [`vibrate`] is a shared helper: both this flow's own executor entry
//! point and the auto-program's "spread parts" rescue step (§4.9, total
//! detections ≥ 4) call it, rather than duplicating the command sequence.

use crate::error::FlowError;
use crate::flows::FlowContext;
use cell_protocol::{registers::feeder, FeederCommand};
use cell_transport::ModbusTransport;
use std::time::Duration;
use tracing::info;

/// Default parameters observed in the vibration-rescue scenario.
pub const DEFAULT_STRENGTH: u16 = 50;
pub const DEFAULT_FREQUENCY: u16 = 43;
pub const DEFAULT_DURATION: Duration = Duration::from_millis(500);

pub fn vibrate(
    transport: &ModbusTransport,
    feeder_base: u16,
    strength: u16,
    frequency: u16,
    duration: Duration,
) -> Result<(), FlowError> {
    let cmd_reg = feeder_base + feeder::CMD_CODE;
    let params_reg = feeder_base + feeder::PARAMS_START;

    transport.write_block(params_reg, vec![strength, frequency])?;
    transport.write_u16(cmd_reg, FeederCommand::Vibrate.into())?;
    info!(strength, frequency, "feed flow: vibrating bowl");

    std::thread::sleep(duration);

    transport.write_u16(cmd_reg, FeederCommand::Stop.into())?;
    Ok(())
}

/// Entry point for the I/O-B executor worker.
pub fn run(transport: &ModbusTransport, feeder_base: u16) -> Result<(), FlowError> {
    vibrate(transport, feeder_base, DEFAULT_STRENGTH, DEFAULT_FREQUENCY, DEFAULT_DURATION)
}

/// Convenience entry point when the caller already holds a [`FlowContext`].
pub fn run_from_context(ctx: &FlowContext) -> Result<(), FlowError> {
    run(&ctx.transport, ctx.feeder_base)
}
