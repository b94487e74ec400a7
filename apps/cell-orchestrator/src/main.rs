//! Interactive orchestration binary: wires the transport, every device
//! client, the dispatcher, its worker threads, and the auto-program +
//! robot-job-supervisor loops, then drives them from a small stdin REPL.

use anyhow::{Context, Result};
use cell_control::{
    AutoProgram, CellConfig, Dispatcher, FlowContext, MockRobot, MotionStateMachine, PointsConfig,
    RobotJobSupervisor, SharedSignals,
};
use cell_devices::{AngleClient, CameraClient, GripperClient, HandshakeTiming, ServoBridge};
use cell_protocol::{registers::{auto_program as auto_program_regs, base}, ProtectionPolygon};
use cell_transport::ModbusTransport;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod workers;

#[derive(Parser, Debug)]
#[command(name = "cell-orchestrator")]
#[command(about = "Orchestration core for a Modbus-TCP pick-and-place cell")]
#[command(version)]
struct Args {
    /// Path to the cell's JSON configuration file.
    #[arg(long, default_value = "configs/cell.json")]
    config: String,

    /// Path to the JSON points file, overriding the one named in the config.
    #[arg(long)]
    points: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = CellConfig::load(&args.config)
        .with_context(|| format!("loading cell config from {}", args.config))?;
    let points_path = args.points.clone().unwrap_or_else(|| config.points_file.clone());
    let points = Arc::new(
        PointsConfig::load(&points_path).with_context(|| format!("loading points from {points_path}"))?,
    );

    let modbus_addr: SocketAddr = format!("{}:{}", config.modbus_host, config.modbus_port)
        .parse()
        .context("parsing modbus_host:modbus_port")?;
    let transport = ModbusTransport::connect(modbus_addr);

    // Every cell ships a 4-vertex protection polygon in its config; for the
    // base case where one isn't configured yet, default to an unbounded
    // square so the filter is a no-op rather than rejecting everything.
    let polygon = ProtectionPolygon::new([
        (-1.0e9, -1.0e9),
        (1.0e9, -1.0e9),
        (1.0e9, 1.0e9),
        (-1.0e9, 1.0e9),
    ]);

    let handshake_timing = HandshakeTiming {
        timeout: config.timing.ready_wait,
        min_running_hold: config.timing.min_running_hold,
        poll_interval: config.timing.dispatcher_poll_interval,
        completion_grace: config.timing.completion_grace,
    };
    let camera = CameraClient::with_handshake_timing(transport.clone(), config.registers.camera_a, polygon, handshake_timing);
    let gripper = GripperClient::new(transport.clone(), config.registers.gripper);
    let angle = AngleClient::with_detect_timeout(transport.clone(), config.registers.camera_b, config.timing.angle_detect);
    let servo = ServoBridge::with_detect_timeout(
        transport.clone(),
        config.registers.angle_servo + cell_protocol::registers::angle_servo::STATUS_WORD,
        config.registers.angle_servo + cell_protocol::registers::angle_servo::SERVO_POSITION_HI,
        config.timing.angle_detect,
    );

    let state_machine = Arc::new(MotionStateMachine::new(transport.clone(), config.registers.motion));
    let running = Arc::new(AtomicBool::new(true));

    let ctx = FlowContext {
        robot: Arc::new(MockRobot::default()),
        camera: camera.clone(),
        gripper,
        angle,
        servo,
        transport: transport.clone(),
        state_machine: state_machine.clone(),
        points,
        feeder_base: config.registers.feeder,
        angle_correction: config.features.angle_correction,
    };

    let (dispatcher, queues) = Dispatcher::new(
        transport.clone(),
        config.registers.motion,
        base::IO_FLOW,
        state_machine.clone(),
        running.clone(),
        config.timing.dispatcher_poll_interval,
    );

    let auto_enabled = Arc::new(AtomicBool::new(config.features.auto_program));
    let signals = SharedSignals::default();
    let auto_program = Arc::new(AutoProgram::new(
        transport.clone(),
        camera,
        config.registers.camera_a,
        config.registers.feeder,
        config.registers.auto_program,
        base::IO_FLOW,
        polygon,
        signals.clone(),
        auto_enabled.clone(),
        running.clone(),
        config.timing.cycle_interval,
    ));
    let robot_job_supervisor = Arc::new(RobotJobSupervisor::new(
        transport.clone(),
        config.registers.motion,
        signals.clone(),
        auto_program.clone(),
        running.clone(),
    ));

    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            tracing::warn!("received interrupt, shutting down");
            running.store(false, Ordering::Release);
        })
        .context("installing ctrl-c handler")?;
    }

    let auto_program_base = config.registers.auto_program;
    let handles = workers::spawn_all(ctx.clone(), queues, dispatcher, auto_program.clone(), robot_job_supervisor, running.clone());

    run_repl(&ctx, &state_machine, auto_program_base, &auto_program, &signals, &running)?;

    for handle in handles {
        let _ = handle.join();
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_repl(
    ctx: &FlowContext,
    state_machine: &MotionStateMachine,
    auto_program_base: u16,
    auto_program: &AutoProgram,
    signals: &SharedSignals,
    running: &AtomicBool,
) -> Result<()> {
    use std::io::{BufRead, Write};

    println!("cell-orchestrator ready. commands: s start stop pause resume r q");
    let stdin = std::io::stdin();
    let mut line = String::new();

    while running.load(Ordering::Acquire) {
        print!("> ");
        std::io::stdout().flush().ok();
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "s" => print_status(ctx, state_machine, auto_program),
            "start" => {
                // The auto-program loop reads this register itself every
                // cycle; writing here rather than a local flag is what
                // makes the command actually take effect.
                if let Err(err) = ctx.transport.write_u16(auto_program_base + auto_program_regs::ENABLE, 1) {
                    println!("failed to enable auto-program: {err}");
                } else {
                    println!("auto-program enabled");
                }
            }
            "stop" => {
                if let Err(err) = ctx.transport.write_u16(auto_program_base + auto_program_regs::ENABLE, 0) {
                    println!("failed to disable auto-program: {err}");
                } else {
                    println!("auto-program disabled");
                }
            }
            "pause" => {
                signals.pause_for_robot.store(true, Ordering::Release);
                println!("feeding loop paused");
            }
            "resume" => {
                signals.pause_for_robot.store(false, Ordering::Release);
                println!("feeding loop resumed");
            }
            "r" => {
                state_machine.clear_alarm();
                println!("state machines restarted");
            }
            "q" => {
                running.store(false, Ordering::Release);
            }
            "" => {}
            other => println!("unrecognized command: {other:?}"),
        }
    }
    Ok(())
}

fn print_status(ctx: &FlowContext, state_machine: &MotionStateMachine, auto_program: &AutoProgram) {
    println!("motion state: {:?}", state_machine.current_state());
    println!("transport connected: {}", ctx.transport.is_connected());
    let counters = auto_program.counters();
    println!(
        "auto-program counters: cycles={} targets_found={} feeder_triggers={} vibration_rescues={}",
        counters.cycle_count, counters.dr_f_found_count, counters.feeder_trigger_count, counters.vp_vibration_count
    );
}
