//! The generic command-register/status-register handshake (C2) used by
//! every peripheral: write a command code, wait for the peer to accept it
//! (`Ready=0, Running=1`), wait for it to finish (`Running=0`), read the
//! result area, then clear the command register and wait for `Ready=1`.

use crate::error::DeviceError;
use cell_protocol::StatusWord;
use cell_transport::ModbusTransport;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Describes one handshake interaction. Bases the defaults named in the
/// design notes: `min_running_hold` 1s, `completion_grace` 2s.
#[derive(Debug, Clone)]
pub struct HandshakeDescriptor {
    pub command_reg: u16,
    pub status_reg: u16,
    pub command_code: u16,
    /// Addresses zeroed before the command is written, so stale completion
    /// flags from a prior cycle can't be mistaken for this one's result.
    pub clear_before_issue: Vec<u16>,
    /// Overall budget across both the accept-wait and the completion-wait.
    pub timeout: Duration,
    /// Once `Running` is observed, keep polling for at least this long so
    /// a peer that completes very quickly is still visible to supervisors.
    pub min_running_hold: Duration,
    pub poll_interval: Duration,
    /// How long `Ready=0, Running=0` may persist before being treated as
    /// an implicit "done" rather than a protocol violation.
    pub completion_grace: Duration,
}

impl Default for HandshakeDescriptor {
    fn default() -> Self {
        Self {
            command_reg: 0,
            status_reg: 0,
            command_code: 0,
            clear_before_issue: Vec::new(),
            timeout: Duration::from_secs(10),
            min_running_hold: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
            completion_grace: Duration::from_secs(2),
        }
    }
}

/// The subset of a handshake's timing that callers configure per cell,
/// independent of the per-command fields (`command_reg`, `clear_before_issue`,
/// ...) each client builds for itself.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeTiming {
    pub timeout: Duration,
    pub min_running_hold: Duration,
    pub poll_interval: Duration,
    pub completion_grace: Duration,
}

impl Default for HandshakeTiming {
    fn default() -> Self {
        let d = HandshakeDescriptor::default();
        Self {
            timeout: d.timeout,
            min_running_hold: d.min_running_hold,
            poll_interval: d.poll_interval,
            completion_grace: d.completion_grace,
        }
    }
}

impl HandshakeTiming {
    pub fn apply(&self, descriptor: &mut HandshakeDescriptor) {
        descriptor.timeout = self.timeout;
        descriptor.min_running_hold = self.min_running_hold;
        descriptor.poll_interval = self.poll_interval;
        descriptor.completion_grace = self.completion_grace;
    }
}

fn read_status(transport: &ModbusTransport, descriptor: &HandshakeDescriptor) -> Result<StatusWord, DeviceError> {
    let raw = transport.read_u16(descriptor.status_reg)?;
    Ok(StatusWord::from_raw(raw))
}

/// Runs steps 1-5 and 7-8 of the handshake, calling `read_result` in between
/// (step 6) so each device client can read its own result-area layout.
/// `read_result` is handed the transport only after the peer has finished
/// running and before the command register is cleared.
pub fn run<T>(
    transport: &ModbusTransport,
    descriptor: &HandshakeDescriptor,
    read_result: impl FnOnce(&ModbusTransport) -> Result<T, DeviceError>,
) -> Result<T, DeviceError> {
    // Step 1: confirm the peer will accept a command.
    let status = read_status(transport, descriptor)?;
    if status.alarm() {
        return Err(DeviceError::PeerAlarm);
    }
    if !status.ready() || !status.initialized() {
        return Err(DeviceError::NotReady);
    }

    // Step 2: clear stale completion flags.
    for addr in &descriptor.clear_before_issue {
        transport.write_u16(*addr, 0)?;
    }

    // Step 3: issue the command.
    transport.write_u16(descriptor.command_reg, descriptor.command_code)?;

    let deadline = Instant::now() + descriptor.timeout;

    // Step 4: wait for the peer to visibly accept the command. A peer that
    // completes a command faster than our poll_interval may never be
    // caught with Running=1; completion_grace covers that case by letting
    // a persistent Ready=0/Running=0 stand in for "accepted and already
    // finished" instead of failing the whole handshake.
    if wait_for_running(transport, descriptor, deadline)? {
        // Step 5: wait for completion, honoring min_running_hold.
        wait_for_completed(transport, descriptor, deadline)?;
    }

    // Step 6: read the result area (module-specific).
    let result = read_result(transport)?;

    // Step 7: clear the command register.
    transport.write_u16(descriptor.command_reg, 0)?;

    // Step 8: wait for Ready=1.
    wait_for_ready(transport, descriptor, deadline)?;

    Ok(result)
}

/// Returns `Ok(true)` once Running=1 is observed (caller should still wait
/// for completion), or `Ok(false)` if Ready=0/Running=0 persisted past
/// `completion_grace` without Running ever being seen (caller should treat
/// the command as already finished).
fn wait_for_running(
    transport: &ModbusTransport,
    descriptor: &HandshakeDescriptor,
    deadline: Instant,
) -> Result<bool, DeviceError> {
    let step_started = Instant::now();
    let mut quiescent_since: Option<Instant> = None;
    loop {
        let status = read_status(transport, descriptor)?;
        if status.alarm() {
            return Err(DeviceError::PeerAlarm);
        }
        // Tie-break: Ready=1 AND Running=1 observed together still counts
        // as accepted — Running takes precedence.
        if status.running() {
            trace!(
                elapsed_ms = step_started.elapsed().as_millis() as u64,
                "handshake: peer accepted command"
            );
            return Ok(true);
        }
        if !status.ready() {
            let since = quiescent_since.get_or_insert_with(Instant::now);
            if since.elapsed() > descriptor.completion_grace {
                warn!("handshake: peer never asserted Running; treating as already completed");
                return Ok(false);
            }
        } else {
            quiescent_since = None;
        }
        if Instant::now() >= deadline {
            return Err(DeviceError::CommandLost);
        }
        std::thread::sleep(descriptor.poll_interval);
    }
}

fn wait_for_completed(
    transport: &ModbusTransport,
    descriptor: &HandshakeDescriptor,
    deadline: Instant,
) -> Result<(), DeviceError> {
    let step_started = Instant::now();
    let running_seen_at = Instant::now();

    loop {
        let status = read_status(transport, descriptor)?;
        if status.alarm() {
            return Err(DeviceError::PeerAlarm);
        }

        if !status.running() {
            let held = running_seen_at.elapsed();
            if held < descriptor.min_running_hold {
                std::thread::sleep(descriptor.min_running_hold - held);
            }
            trace!(
                elapsed_ms = step_started.elapsed().as_millis() as u64,
                "handshake: peer completed"
            );
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(DeviceError::Timeout);
        }
        std::thread::sleep(descriptor.poll_interval);
    }
}

fn wait_for_ready(
    transport: &ModbusTransport,
    descriptor: &HandshakeDescriptor,
    deadline: Instant,
) -> Result<(), DeviceError> {
    loop {
        let status = read_status(transport, descriptor)?;
        if status.alarm() {
            return Err(DeviceError::PeerAlarm);
        }
        if status.ready() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(DeviceError::Timeout);
        }
        std::thread::sleep(descriptor.poll_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_descriptor_matches_documented_defaults() {
        let d = HandshakeDescriptor::default();
        assert_eq!(d.min_running_hold, Duration::from_secs(1));
        assert_eq!(d.completion_grace, Duration::from_secs(2));
        assert_eq!(d.poll_interval, Duration::from_millis(50));
    }
}
