//! Auto-program loop (C9) and the robot-job-supervisor sub-loop.
//!
//! The two loops want to pause each other; rather than holding back-
//! references to one another they communicate only through shared atomic
//! flags (`feeding_ready`, `pause_for_robot`) — the auto-program writes,
//! the motion side only reads, per the upstream cyclic-reference fix.

use crate::flows::feed;
use cell_devices::CameraClient;
use cell_protocol::registers::{auto_program, feeder, io_flow, motion};
use cell_protocol::ProtectionPolygon;
use cell_tools::Counter;
use cell_transport::ModbusTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Used when a caller doesn't have a configured interval to hand in (tests,
/// mainly); production wiring passes `TimingConfig::cycle_interval`.
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(2);
const ROBOT_JOB_POLL_INTERVAL: Duration = Duration::from_millis(500); // 2 Hz
const FEEDER_PULSE_WIDTH: Duration = Duration::from_millis(100);
/// Total detections at or above which the bowl is vibrated to spread parts
/// rather than pulsing in more material.
const DENSE_DETECTION_THRESHOLD: u16 = 4;

/// Shared pause/ready signalling between the auto-feeding loop and the
/// robot-job supervisor. Cloned into both loops; neither holds a
/// back-reference to the other's worker struct.
#[derive(Clone, Default)]
pub struct SharedSignals {
    pub feeding_ready: Arc<AtomicBool>,
    pub pause_for_robot: Arc<AtomicBool>,
    pub robot_job_prepared: Arc<AtomicBool>,
}

/// Running counters for the auto-feeding loop, exposed read-only for the
/// CLI `s` (status) command.
#[derive(Default)]
pub struct AutoProgramCounters {
    pub cycle_count: Counter,
    pub dr_f_found_count: Counter,
    pub feeder_trigger_count: Counter,
    pub vp_vibration_count: Counter,
}

/// Snapshot of `AutoProgramCounters` at a point in time.
#[derive(Debug, Clone, Copy)]
pub struct AutoProgramCountersSnapshot {
    pub cycle_count: u64,
    pub dr_f_found_count: u64,
    pub feeder_trigger_count: u64,
    pub vp_vibration_count: u64,
}

pub struct AutoProgram {
    transport: ModbusTransport,
    camera: CameraClient,
    camera_a_base: u16,
    feeder_base: u16,
    auto_program_base: u16,
    io_flow_base: u16,
    polygon: ProtectionPolygon,
    signals: SharedSignals,
    enabled: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    counters: AutoProgramCounters,
    cycle_interval: Duration,
}

impl AutoProgram {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: ModbusTransport,
        camera: CameraClient,
        camera_a_base: u16,
        feeder_base: u16,
        auto_program_base: u16,
        io_flow_base: u16,
        polygon: ProtectionPolygon,
        signals: SharedSignals,
        enabled: Arc<AtomicBool>,
        running: Arc<AtomicBool>,
        cycle_interval: Duration,
    ) -> Self {
        Self {
            transport,
            camera,
            camera_a_base,
            feeder_base,
            auto_program_base,
            io_flow_base,
            polygon,
            signals,
            enabled,
            running,
            counters: AutoProgramCounters::default(),
            cycle_interval,
        }
    }

    /// Pauses the auto-feeding loop while the arm works near the vision
    /// field.
    pub fn pause_for_robot(&self) {
        self.signals.pause_for_robot.store(true, Ordering::Release);
    }

    /// Resumes the auto-feeding loop once the arm has cleared the field.
    pub fn resume_after_robot(&self) {
        self.signals.pause_for_robot.store(false, Ordering::Release);
    }

    /// A snapshot of the running counters, for the CLI `s` command.
    pub fn counters(&self) -> AutoProgramCountersSnapshot {
        AutoProgramCountersSnapshot {
            cycle_count: self.counters.cycle_count.get(),
            dr_f_found_count: self.counters.dr_f_found_count.get(),
            feeder_trigger_count: self.counters.feeder_trigger_count.get(),
            vp_vibration_count: self.counters.vp_vibration_count.get(),
        }
    }

    fn camera_a_ready(&self) -> bool {
        self.camera.is_ready().unwrap_or(false)
    }

    fn feeder_ready(&self) -> bool {
        let raw = self
            .transport
            .read_u16(self.feeder_base + feeder::MODULE_STATUS)
            .unwrap_or(0);
        cell_protocol::StatusWord::from_raw(raw).accepts_command()
    }

    /// Combined module-health check (§4.9 step 1): both camera-A and the
    /// feeder must be ready to accept a command.
    fn precheck(&self) -> bool {
        self.camera_a_ready() && self.feeder_ready()
    }

    /// Runs one cycle of the auto-feeding loop (§4.9 steps 1-4).
    fn run_cycle(&self) {
        self.counters.cycle_count.increment();

        // Step 1: module health.
        if !self.precheck() {
            info!("auto-program: camera-A or feeder not ready, skipping cycle");
            return;
        }

        // Step 2: capture+detect.
        if let Err(err) = self.camera.manual_capture() {
            warn!(?err, "auto-program: capture+detect failed, skipping cycle");
            return;
        }

        // Collect everything currently buffered this cycle (already filtered
        // to in-polygon detections by the camera client).
        let mut detections = Vec::new();
        while let Ok(Some(record)) = self.camera.get_next_object() {
            detections.push(record);
        }

        // The dense/sparse branch below is specified against the total
        // count the peer reported, not just the in-polygon survivors, so a
        // bowl crowded with out-of-polygon parts still triggers the
        // vibration rescue instead of a feeder drop.
        let total_detected = self.camera.last_reported_count();

        // Step 3: search for an in-polygon target.
        let target = detections.iter().find(|d| self.polygon.contains(d.world_xy.0, d.world_xy.1));

        if let Some(target) = target {
            self.counters.dr_f_found_count.increment();
            if let Err(err) = self.publish_next_target(target) {
                warn!(?err, "auto-program: failed to publish next target");
                return;
            }
            self.signals.feeding_ready.store(true, Ordering::Release);
            info!(world_xy = ?target.world_xy, "auto-program: target ready for pick flow");
        } else if (total_detected as usize) < DENSE_DETECTION_THRESHOLD as usize {
            self.counters.feeder_trigger_count.increment();
            self.pulse_feeder_drop();
        } else {
            self.counters.vp_vibration_count.increment();
            if let Err(err) = feed::vibrate(
                &self.transport,
                self.feeder_base,
                feed::DEFAULT_STRENGTH,
                feed::DEFAULT_FREQUENCY,
                feed::DEFAULT_DURATION,
            ) {
                warn!(?err, "auto-program: vibration rescue failed");
            }
        }

        // Step 4: clear camera-A's transient registers.
        self.camera.clear_queue();
    }

    fn publish_next_target(&self, target: &cell_protocol::DetectionRecord) -> Result<(), cell_transport::TransportError> {
        use cell_protocol::registers::camera_a;
        use cell_protocol::encode_i32_be;

        let (hi, lo) = encode_i32_be((target.world_xy.0 * 100.0).round() as i32);
        let (hi2, lo2) = encode_i32_be((target.world_xy.1 * 100.0).round() as i32);
        self.transport
            .write_block(self.camera_a_base + camera_a::WORLD_START, vec![hi, lo, hi2, lo2])?;
        self.transport.write_u16(self.camera_a_base + camera_a::WORLD_VALID_FIRST, 1)?;
        Ok(())
    }

    fn pulse_feeder_drop(&self) {
        let reg = self.io_flow_base + io_flow::VIBRATION_FEED;
        if let Err(err) = self.transport.write_u16(reg, 1) {
            warn!(?err, "auto-program: feeder drop pulse (rising) failed");
            return;
        }
        std::thread::sleep(FEEDER_PULSE_WIDTH);
        if let Err(err) = self.transport.write_u16(reg, 0) {
            warn!(?err, "auto-program: feeder drop pulse (falling) failed");
        }
    }

    /// Runs the auto-feeding loop until `running` is cleared.
    pub fn run(&self) {
        info!("auto-program: starting feeding loop");
        while self.running.load(Ordering::Acquire) {
            let enabled = self.transport.read_u16(self.auto_program_base + auto_program::ENABLE).unwrap_or(0) != 0;
            self.enabled.store(enabled, Ordering::Release);

            if enabled && !self.signals.pause_for_robot.load(Ordering::Acquire) {
                self.run_cycle();
            }
            std::thread::sleep(self.cycle_interval);
        }
        info!("auto-program: feeding loop exiting");
    }
}

/// Watches Flow1/Flow2 completion at 2 Hz to pause/resume the feeding loop
/// while the arm is near the vision field.
pub struct RobotJobSupervisor {
    transport: ModbusTransport,
    motion_base: u16,
    signals: SharedSignals,
    auto_program: Arc<AutoProgram>,
    running: Arc<AtomicBool>,
}

impl RobotJobSupervisor {
    pub fn new(
        transport: ModbusTransport,
        motion_base: u16,
        signals: SharedSignals,
        auto_program: Arc<AutoProgram>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self { transport, motion_base, signals, auto_program, running }
    }

    pub fn run(&self) {
        info!("robot-job-supervisor: starting");
        let mut flow1_seen = false;
        let mut flow2_seen = false;
        while self.running.load(Ordering::Acquire) {
            let flow1_done = self.transport.read_u16(self.motion_base + motion::FLOW1_DONE).unwrap_or(0) != 0;
            let flow2_done = self.transport.read_u16(self.motion_base + motion::FLOW2_DONE).unwrap_or(0) != 0;

            if flow1_done && !flow1_seen {
                self.signals.robot_job_prepared.store(true, Ordering::Release);
                let _ = self.transport.write_u16(self.motion_base + motion::FLOW1, 0);
                self.auto_program.pause_for_robot();
                info!("robot-job-supervisor: flow1 complete, pausing auto-feeding");
            }
            flow1_seen = flow1_done;

            if flow2_done && !flow2_seen {
                self.signals.robot_job_prepared.store(false, Ordering::Release);
                self.auto_program.resume_after_robot();
                info!("robot-job-supervisor: flow2 complete, resuming auto-feeding");
            }
            flow2_seen = flow2_done;

            std::thread::sleep(ROBOT_JOB_POLL_INTERVAL);
        }
        info!("robot-job-supervisor: exiting");
    }
}
