//! Spawns every long-running thread the orchestrator needs: the
//! dispatcher's own poll loop, one worker per command queue, and the
//! auto-program/robot-job-supervisor pair. `main` joins the returned
//! handles on shutdown.

use cell_control::{AutoProgram, CancelToken, Dispatcher, FlowContext, Queues, RobotJobSupervisor};
use cell_protocol::{FlowCommand, FlowId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, warn};

#[allow(clippy::too_many_arguments)]
pub fn spawn_all(
    ctx: FlowContext,
    queues: Queues,
    dispatcher: Dispatcher,
    auto_program: Arc<AutoProgram>,
    robot_job_supervisor: Arc<RobotJobSupervisor>,
    running: Arc<AtomicBool>,
) -> Vec<JoinHandle<()>> {
    let cancel = CancelToken::new();

    let mut handles = Vec::new();

    handles.push(
        std::thread::Builder::new()
            .name("dispatcher".into())
            .spawn(move || dispatcher.run())
            .expect("spawn dispatcher thread"),
    );

    handles.push(spawn_motion_worker(ctx.clone(), queues.motion_rx, cancel.clone()));
    handles.push(spawn_io_a_worker(ctx.clone(), queues.io_a_rx));
    handles.push(spawn_io_b_worker(ctx.clone(), queues.io_b_rx));
    handles.push(spawn_external_worker(queues.external_rx, running.clone()));

    handles.push(
        std::thread::Builder::new()
            .name("auto-program".into())
            .spawn(move || auto_program.run())
            .expect("spawn auto-program thread"),
    );

    handles.push(
        std::thread::Builder::new()
            .name("robot-job-supervisor".into())
            .spawn(move || robot_job_supervisor.run())
            .expect("spawn robot-job-supervisor thread"),
    );

    handles
}

/// Consumes the motion queue one command at a time; the motion state
/// machine already refuses to accept a second command while one is in
/// flight, so this worker never needs its own concurrency guard.
fn spawn_motion_worker(
    ctx: FlowContext,
    motion_rx: crossbeam_channel::Receiver<FlowCommand>,
    cancel: CancelToken,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("motion-worker".into())
        .spawn(move || {
            for command in motion_rx {
                let result = match command.flow {
                    FlowId::Pick => cell_control::flows::pick::run(&ctx, &cancel).map(|_| ()),
                    FlowId::Unload => cell_control::flows::unload::run(&ctx, &cancel),
                    FlowId::Assembly => cell_control::flows::assembly::run(&ctx, &cancel),
                    other => {
                        warn!(?other, "motion worker: command does not belong on this queue");
                        continue;
                    }
                };
                if let Err(err) = result {
                    error!(?err, flow = ?command.flow, "motion worker: flow failed, raising alarm");
                    ctx.state_machine.set_alarm();
                }
            }
        })
        .expect("spawn motion worker thread")
}

fn spawn_io_a_worker(ctx: FlowContext, io_a_rx: crossbeam_channel::Receiver<FlowCommand>) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("io-a-worker".into())
        .spawn(move || {
            for command in io_a_rx {
                if !matches!(command.flow, FlowId::Flip) {
                    warn!(flow = ?command.flow, "io-a worker: command does not belong on this queue");
                    continue;
                }
                if let Err(err) = cell_control::flows::flip::run(&ctx, Default::default()) {
                    error!(?err, "io-a worker: flip flow failed, raising alarm");
                    ctx.state_machine.set_alarm();
                }
            }
        })
        .expect("spawn io-a worker thread")
}

fn spawn_io_b_worker(ctx: FlowContext, io_b_rx: crossbeam_channel::Receiver<FlowCommand>) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("io-b-worker".into())
        .spawn(move || {
            for command in io_b_rx {
                if !matches!(command.flow, FlowId::Feed) {
                    warn!(flow = ?command.flow, "io-b worker: command does not belong on this queue");
                    continue;
                }
                if let Err(err) = cell_control::flows::feed::run_from_context(&ctx) {
                    error!(?err, "io-b worker: feed flow failed, raising alarm");
                    ctx.state_machine.set_alarm();
                }
            }
        })
        .expect("spawn io-b worker thread")
}

/// Nothing enqueues onto the external queue yet; the worker just drains it
/// so a future producer has somewhere to send commands.
fn spawn_external_worker(
    external_rx: crossbeam_channel::Receiver<FlowCommand>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("external-worker".into())
        .spawn(move || {
            while running.load(Ordering::Acquire) {
                match external_rx.recv_timeout(std::time::Duration::from_millis(500)) {
                    Ok(command) => warn!(flow = ?command.flow, "external worker: no handler registered, dropping"),
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                }
            }
        })
        .expect("spawn external worker thread")
}
