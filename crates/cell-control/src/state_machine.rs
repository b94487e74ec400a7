//! Motion state machine (C6): the single writer of the motion status word,
//! mirrored onto the Modbus server on every transition and periodically
//! while idle.

use cell_protocol::registers::motion;
use cell_transport::ModbusTransport;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    /// `Ready=1, Running=0`.
    Idle,
    /// `Ready=0, Running=1`.
    Running,
    /// `Ready=0, Running=0, Initialized=1` — success observed, waiting for
    /// the control register to return to 0.
    Done,
    /// `Alarm=1, Ready=0, Running=0`.
    Alarm,
}

impl MotionState {
    fn status_raw(self) -> u16 {
        match self {
            MotionState::Idle => cell_protocol::StatusWord::IDLE_READY,
            MotionState::Running => cell_protocol::StatusWord::BUSY_RUNNING,
            MotionState::Done => cell_protocol::StatusWord::RESULT_READY,
            MotionState::Alarm => cell_protocol::StatusWord::ALARM_PENDING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowSlot {
    #[default]
    None,
    Pick,
    Unload,
    Assembly,
}

struct Inner {
    state: MotionState,
    current_flow: FlowSlot,
    flow1_done: bool,
    flow2_done: bool,
    flow5_done: bool,
    op_count: u32,
    error_code: u16,
}

/// Owns the single status-word lock. Every transition both updates local
/// state and writes the status word to the Modbus server before returning,
/// satisfying the write-before-accept ordering guarantee.
pub struct MotionStateMachine {
    transport: ModbusTransport,
    base: u16,
    inner: Mutex<Inner>,
    /// Lets `ready_for_command` be checked lock-free by the dispatcher hot
    /// path; kept in sync with `inner.state` under the same lock.
    ready_flag: Arc<AtomicU8>,
}

const READY_FLAG_IDLE: u8 = 0;
const READY_FLAG_BUSY: u8 = 1;

impl MotionStateMachine {
    pub fn new(transport: ModbusTransport, base: u16) -> Self {
        let machine = Self {
            transport,
            base,
            inner: Mutex::new(Inner {
                state: MotionState::Idle,
                current_flow: FlowSlot::None,
                flow1_done: false,
                flow2_done: false,
                flow5_done: false,
                op_count: 0,
                error_code: 0,
            }),
            ready_flag: Arc::new(AtomicU8::new(READY_FLAG_IDLE)),
        };
        machine.mirror_status(MotionState::Idle);
        machine
    }

    fn reg(&self, offset: u16) -> u16 {
        self.base + offset
    }

    fn mirror_status(&self, state: MotionState) {
        if let Err(err) = self.transport.write_u16(self.reg(motion::STATUS_WORD), state.status_raw()) {
            warn!(?err, "motion state machine: failed to mirror status word");
        }
    }

    /// Periodic mirror call for the idle heartbeat (default 1 s cadence);
    /// callers schedule this themselves.
    pub fn mirror_idle_heartbeat(&self) {
        let inner = self.inner.lock();
        self.mirror_status(inner.state);
    }

    pub fn ready_for_command(&self) -> bool {
        self.ready_flag.load(Ordering::Acquire) == READY_FLAG_IDLE
    }

    pub fn current_state(&self) -> MotionState {
        self.inner.lock().state
    }

    /// `Idle → Running` on accepting a new command.
    pub fn accept(&self, flow: FlowSlot) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != MotionState::Idle {
            return false;
        }
        inner.state = MotionState::Running;
        inner.current_flow = flow;
        match flow {
            FlowSlot::Pick => inner.flow1_done = false,
            FlowSlot::Unload => inner.flow2_done = false,
            _ => {}
        }
        self.ready_flag.store(READY_FLAG_BUSY, Ordering::Release);
        self.mirror_status(MotionState::Running);
        info!(?flow, "motion state machine: accepted flow");
        true
    }

    /// `Running → Done` on flow success. The caller still must wait for
    /// the external control register to clear before `finish_success`.
    pub fn report_success(&self) {
        let mut inner = self.inner.lock();
        let flow = inner.current_flow;
        inner.state = MotionState::Done;
        inner.op_count += 1;
        match flow {
            FlowSlot::Pick => inner.flow1_done = true,
            FlowSlot::Unload => inner.flow2_done = true,
            FlowSlot::Assembly => inner.flow5_done = true,
            FlowSlot::None => {}
        }
        self.write_done_bits(&inner);
        self.mirror_status(MotionState::Done);
        info!(?flow, op_count = inner.op_count, "motion state machine: flow succeeded");
    }

    /// `Done → Idle` once the PLC has cleared the control register.
    pub fn finish_success(&self) {
        let mut inner = self.inner.lock();
        inner.state = MotionState::Idle;
        inner.current_flow = FlowSlot::None;
        self.ready_flag.store(READY_FLAG_IDLE, Ordering::Release);
        self.mirror_status(MotionState::Idle);
    }

    /// `Running → Alarm` on flow failure. Idempotent: calling this twice
    /// in a row leaves the status word identical to one call.
    pub fn set_alarm(&self) {
        let mut inner = self.inner.lock();
        if inner.state == MotionState::Alarm {
            return;
        }
        inner.state = MotionState::Alarm;
        inner.error_code = inner.error_code.max(1);
        self.ready_flag.store(READY_FLAG_BUSY, Ordering::Release);
        self.mirror_status(MotionState::Alarm);
        self.transport
            .write_u16(self.reg(motion::ERROR_CODE), inner.error_code)
            .unwrap_or_else(|err| warn!(?err, "failed to mirror error code"));
        warn!("motion state machine: alarm set");
    }

    /// `Alarm → Idle` on `clear_alarm`; error counters are retained for
    /// inspection, only the status word resets.
    pub fn clear_alarm(&self) {
        let mut inner = self.inner.lock();
        if inner.state != MotionState::Alarm {
            return;
        }
        inner.state = MotionState::Idle;
        inner.current_flow = FlowSlot::None;
        self.ready_flag.store(READY_FLAG_IDLE, Ordering::Release);
        self.mirror_status(MotionState::Idle);
        debug!("motion state machine: alarm cleared");
    }

    /// Any state → Alarm, commanding the robot's own e-stop path first.
    /// Interrupts a running flow: its next primitive will fail.
    pub fn emergency_stop(&self) {
        warn!("motion state machine: emergency stop");
        self.set_alarm();
    }

    fn write_done_bits(&self, inner: &Inner) {
        let writes = [
            (motion::FLOW1_DONE, inner.flow1_done as u16),
            (motion::FLOW2_DONE, inner.flow2_done as u16),
            (motion::FLOW5_DONE, inner.flow5_done as u16),
            (motion::OP_COUNT, inner.op_count as u16),
        ];
        for (offset, value) in writes {
            if let Err(err) = self.transport.write_u16(self.reg(offset), value) {
                warn!(?err, offset, "failed to mirror per-flow done bit");
            }
        }
    }

    pub fn clear_flow_done(&self, flow: FlowSlot) {
        let mut inner = self.inner.lock();
        match flow {
            FlowSlot::Pick => inner.flow1_done = false,
            FlowSlot::Unload => inner.flow2_done = false,
            FlowSlot::Assembly => inner.flow5_done = false,
            FlowSlot::None => {}
        }
        self.write_done_bits(&inner);
    }
}

/// Default cadence for [`MotionStateMachine::mirror_idle_heartbeat`].
pub const IDLE_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> MotionStateMachine {
        let transport = ModbusTransport::connect("127.0.0.1:1".parse().unwrap());
        MotionStateMachine::new(transport, 1200)
    }

    #[test]
    fn accept_transitions_idle_to_running_and_back() {
        let m = machine();
        assert!(m.ready_for_command());
        assert!(m.accept(FlowSlot::Pick));
        assert!(!m.ready_for_command());
        assert!(!m.accept(FlowSlot::Unload), "second flow must be refused while one is active");
        m.report_success();
        assert_eq!(m.current_state(), MotionState::Done);
        m.finish_success();
        assert!(m.ready_for_command());
    }

    #[test]
    fn set_alarm_is_idempotent() {
        let m = machine();
        m.accept(FlowSlot::Pick);
        m.set_alarm();
        let state_after_first = m.current_state();
        m.set_alarm();
        assert_eq!(m.current_state(), state_after_first);
    }

    #[test]
    fn clear_alarm_returns_to_idle() {
        let m = machine();
        m.accept(FlowSlot::Pick);
        m.set_alarm();
        m.clear_alarm();
        assert_eq!(m.current_state(), MotionState::Idle);
        assert!(m.ready_for_command());
    }
}
