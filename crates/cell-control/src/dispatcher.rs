//! Dispatcher (C8): one polling thread reads the control-register block,
//! detects rising edges, and pushes typed commands onto per-class bounded
//! queues. Falling edges ask the state machine to restore `Ready=1` when
//! no flow is active.

use crate::state_machine::{FlowSlot, MotionStateMachine};
use cell_protocol::registers::{io_flow, motion};
use cell_protocol::{FlowCommand, FlowId, FlowKind, FlowPayload};
use cell_transport::ModbusTransport;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Bound shared by every per-class queue.
pub const QUEUE_CAPACITY: usize = 50;

/// Used when a caller doesn't have a configured interval to hand in (tests,
/// mainly); production wiring passes `TimingConfig::dispatcher_poll_interval`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The control bits the dispatcher watches, one per flow plus the two
/// bypass controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ControlBits {
    flow1: bool,
    flow2: bool,
    flow5: bool,
    flip: bool,
    feed: bool,
    clear_alarm: bool,
    e_stop: bool,
}

pub struct Queues {
    pub motion_rx: Receiver<FlowCommand>,
    pub io_a_rx: Receiver<FlowCommand>,
    pub io_b_rx: Receiver<FlowCommand>,
    /// Catch-all peripheral operations; no control bit in the register
    /// table maps to this queue today; the worker simply blocks on it.
    pub external_rx: Receiver<FlowCommand>,
}

struct Senders {
    motion: Sender<FlowCommand>,
    io_a: Sender<FlowCommand>,
    io_b: Sender<FlowCommand>,
    #[allow(dead_code)]
    external: Sender<FlowCommand>,
}

/// Polls control registers, detects edges, and routes commands onto
/// per-class queues. Emergency-stop and clear-alarm bypass the queues
/// entirely and act on the state machine directly.
pub struct Dispatcher {
    transport: ModbusTransport,
    motion_base: u16,
    io_flow_base: u16,
    state_machine: Arc<MotionStateMachine>,
    senders: Senders,
    next_id: AtomicU64,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: ModbusTransport,
        motion_base: u16,
        io_flow_base: u16,
        state_machine: Arc<MotionStateMachine>,
        running: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> (Self, Queues) {
        let (motion_tx, motion_rx) = crossbeam_channel::bounded(QUEUE_CAPACITY);
        let (io_a_tx, io_a_rx) = crossbeam_channel::bounded(QUEUE_CAPACITY);
        let (io_b_tx, io_b_rx) = crossbeam_channel::bounded(QUEUE_CAPACITY);
        let (external_tx, external_rx) = crossbeam_channel::bounded(QUEUE_CAPACITY);

        let dispatcher = Self {
            transport,
            motion_base,
            io_flow_base,
            state_machine,
            senders: Senders { motion: motion_tx, io_a: io_a_tx, io_b: io_b_tx, external: external_tx },
            next_id: AtomicU64::new(1),
            running,
            poll_interval,
        };
        (dispatcher, Queues { motion_rx, io_a_rx, io_b_rx, external_rx })
    }

    fn reg(base: u16, offset: u16) -> u16 {
        base + offset
    }

    fn read_control_bits(&self) -> Result<ControlBits, cell_transport::TransportError> {
        Ok(ControlBits {
            flow1: self.transport.read_u16(Self::reg(self.motion_base, motion::FLOW1))? != 0,
            flow2: self.transport.read_u16(Self::reg(self.motion_base, motion::FLOW2))? != 0,
            flow5: self.transport.read_u16(Self::reg(self.motion_base, motion::FLOW5))? != 0,
            flip: self.transport.read_u16(Self::reg(self.io_flow_base, io_flow::FLIP))? != 0,
            feed: self.transport.read_u16(Self::reg(self.io_flow_base, io_flow::VIBRATION_FEED))? != 0,
            clear_alarm: self.transport.read_u16(Self::reg(self.motion_base, motion::CLEAR_ALARM))? != 0,
            e_stop: self.transport.read_u16(Self::reg(self.motion_base, motion::E_STOP))? != 0,
        })
    }

    fn enqueue_motion(&self, flow: FlowId, kind: FlowKind) {
        let slot = match flow {
            FlowId::Pick => FlowSlot::Pick,
            FlowId::Unload => FlowSlot::Unload,
            FlowId::Assembly => FlowSlot::Assembly,
            FlowId::Flip | FlowId::Feed => unreachable!("flip/feed are not motion flows"),
        };
        // `accept` both gates on Idle and transitions the state machine to
        // Running, so the worker picking this command up observes the
        // correct `current_flow` when it later calls `report_success`.
        if !self.state_machine.accept(slot) {
            warn!(?flow, "dispatcher: dropping motion edge, a flow is already active");
            return;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let command = FlowCommand {
            kind,
            flow,
            payload: FlowPayload::default(),
            enqueue_time_ms: monotonic_ms(),
            id,
        };
        if self.senders.motion.try_send(command).is_err() {
            warn!(?flow, "dispatcher: motion queue full, dropping command");
        }
    }

    fn enqueue_io(&self, sender: &Sender<FlowCommand>, flow: FlowId, kind: FlowKind) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let command = FlowCommand {
            kind,
            flow,
            payload: FlowPayload::default(),
            enqueue_time_ms: monotonic_ms(),
            id,
        };
        if sender.try_send(command).is_err() {
            warn!(?flow, "dispatcher: queue full, dropping command");
        }
    }

    /// Runs the poll loop until `running` is cleared. Intended to be
    /// spawned on its own thread.
    pub fn run(&self) {
        let mut previous = ControlBits::default();
        info!("dispatcher: starting poll loop");
        while self.running.load(Ordering::Acquire) {
            match self.read_control_bits() {
                Ok(current) => {
                    if current.e_stop && !previous.e_stop {
                        self.state_machine.emergency_stop();
                    }
                    if current.clear_alarm && !previous.clear_alarm {
                        self.state_machine.clear_alarm();
                    }
                    if current.flow1 && !previous.flow1 {
                        self.enqueue_motion(FlowId::Pick, FlowKind::Motion);
                    }
                    if current.flow2 && !previous.flow2 {
                        self.enqueue_motion(FlowId::Unload, FlowKind::Motion);
                    }
                    if current.flow5 && !previous.flow5 {
                        self.enqueue_motion(FlowId::Assembly, FlowKind::Motion);
                    }
                    if current.flip && !previous.flip {
                        self.enqueue_io(&self.senders.io_a, FlowId::Flip, FlowKind::IoA);
                    }
                    if current.feed && !previous.feed {
                        self.enqueue_io(&self.senders.io_b, FlowId::Feed, FlowKind::IoB);
                    }

                    // Falling edge: restore Ready=1 once no flow is active.
                    let any_motion_control_fell = (!current.flow1 && previous.flow1)
                        || (!current.flow2 && previous.flow2)
                        || (!current.flow5 && previous.flow5);
                    if any_motion_control_fell
                        && self.state_machine.current_state() == crate::state_machine::MotionState::Done
                    {
                        self.state_machine.finish_success();
                    }

                    previous = current;
                }
                Err(err) => warn!(?err, "dispatcher: failed to read control registers"),
            }
            std::thread::sleep(self.poll_interval);
        }
        info!("dispatcher: poll loop exiting");
    }
}

/// Process-relative monotonic milliseconds, used only to order queued
/// commands by enqueue time — never wall-clock, so it stays cheap and
/// doesn't need external time sources.
fn monotonic_ms() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_millis() as u64
}
