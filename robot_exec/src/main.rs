//! Main robot executable entry point.
//!
//! # Architecture
//!
//! The executable runs a cyclic executive. Each major cycle is split into equal minor cycles, and
//! in each minor cycle the scheduler runs a fixed sequence of tasks:
//!
//!     - Communicate, only in this robot's communication slot
//!     - Navigate
//!     - Control and Avoid, on every fifth minor cycle
//!     - Refine
//!     - Report
//!     - Mission
//!
//! The executable stops at the next minor cycle boundary after SIGINT or SIGTERM, then logs and
//! saves the run statistics.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use conquer_once::OnceCell;
use log::{info, warn};

// Internal
use comms_if::net::{zmq, ZmqTransport};
use robot_lib::{
    comms::{CommsGuard, CommsTask},
    data_store::DataStore,
    params::RobotExecParams,
    sched::{
        CancelToken, CycleScheduler, DeadlineModel, SchedConfig, SchedParams, TaskId,
        TaskRegistry,
    },
    tasks::*,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    raise_error,
    session::Session,
    time::SystemClock,
};

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// Token cancelled by the signal handler.
static CANCEL: OnceCell<CancelToken> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- LOAD PARAMETERS ----

    let params: RobotExecParams = util::params::load("robot_exec.toml")
        .wrap_err("Could not load robot_exec params")?;
    let sched_params: SchedParams = util::params::load("sched.toml")
        .wrap_err("Could not load sched params")?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("robot_exec", params.robot_id, "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, params.robot_id, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Search and Rescue Robot Executable\n");
    info!(
        "Running on: {}",
        host::get_hostname().unwrap_or_else(|| String::from("unknown host"))
    );
    info!("Session directory: {:?}", session.session_root);
    info!("Robot {} of team {}\n", params.robot_id, params.robot_team);

    // ---- SHUTDOWN HANDLING ----

    let cancel = CancelToken::new();
    if CANCEL.try_init_once(|| cancel.clone()).is_err() {
        raise_error!("The shutdown token was already initialised");
    }

    // Safety: the handler only stores to an atomic flag
    unsafe {
        libc::signal(libc::SIGINT, on_signal as *const () as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_signal as *const () as libc::sighandler_t);
    }

    // ---- INITIALISE TASKS ----

    info!("Initialising tasks...");

    let model = DeadlineModel::new(&sched_params)
        .wrap_err("Invalid deadline model parameters")?;
    let mut registry = TaskRegistry::new(&model)
        .wrap_err("Failed to build the task registry")?;

    for task in TaskId::ALL.iter() {
        info!(
            "    {:<4} deadline {} ms",
            task.short_name(),
            model.deadline_ms(*task).wrap_err("Deadline of a fixed task not found")?
        );
    }

    registry.register(
        TaskId::Mission,
        Box::new(MissionTask::new(params.task_enabled(TaskId::Mission.short_name()))),
    )?;
    registry.register(
        TaskId::Navigate,
        Box::new(NavigateTask::new(
            params.task_enabled(TaskId::Navigate.short_name()),
            params.cruise_speed_mm_s,
            params.pose_period,
        )),
    )?;
    registry.register(
        TaskId::Control,
        Box::new(ControlTask::new(params.task_enabled(TaskId::Control.short_name()))),
    )?;
    registry.register(
        TaskId::Refine,
        Box::new(RefineTask::new(
            params.task_enabled(TaskId::Refine.short_name()),
            params.landmark_tags.clone(),
        )),
    )?;
    registry.register(
        TaskId::Report,
        Box::new(ReportTask::new(params.task_enabled(TaskId::Report.short_name()))),
    )?;
    registry.register(
        TaskId::Avoid,
        Box::new(AvoidTask::new(
            params.task_enabled(TaskId::Avoid.short_name()),
            params.avoid_threshold_mm,
        )),
    )?;

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();

    let transport = ZmqTransport::new(&zmq_ctx, &params.net)
        .wrap_err("Failed to initialise the transport")?;
    info!(
        "Transport open on {}, {} peers configured",
        params.net.pub_endpoint,
        params.net.peer_endpoints.len()
    );
    if !transport.has_peers() {
        info!("No peers connected yet, packets are dropped until they are");
    }
    let guard = CommsGuard::new(
        params.robot_id,
        params.robot_team,
        params.max_packets_per_invocation,
        params.max_packet_size,
    )
    .wrap_err("Invalid communication parameters")?;

    registry.register(
        TaskId::Communicate,
        Box::new(CommsTask::new(
            guard,
            transport,
            params.task_enabled(TaskId::Communicate.short_name()),
        )),
    )?;

    info!("Network initialisation complete");

    for task in TaskId::ALL.iter() {
        match registry.is_enabled(*task) {
            Some(true) => (),
            Some(false) => info!("{} is disabled", task.short_name()),
            None => warn!("{} has no body and will do nothing", task.short_name()),
        }
    }

    // ---- INITIALISE SCHEDULER ----

    let mut scheduler = CycleScheduler::new(
        SchedConfig {
            minor_cycle_ms: params.minor_cycle_ms,
            major_cycle_ms: params.major_cycle_ms,
            robot_id: params.robot_id,
            control_period_minor_cycles: sched_params.control_period_minor_cycles,
            wall_clock_sync: params.wall_clock_sync,
        },
        registry,
        SystemClock::new(),
        cancel,
    )
    .wrap_err("Failed to initialise the scheduler")?;

    scheduler.check_load(&model);

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let mut ds = DataStore::default();

    let run_result = scheduler.run(&mut ds);

    if let Err(ref e) = run_result {
        warn!("Scheduler stopped on an error: {}", e);
    }

    // ---- SHUTDOWN ----

    let snapshot = ds.stats.snapshot();
    snapshot.log_summary();
    session.save("stats.json", snapshot);

    scheduler.destroy();
    session.exit();

    run_result.wrap_err("Scheduler failed")
}

/// Cancel the scheduler on SIGINT or SIGTERM.
extern "C" fn on_signal(_sig: libc::c_int) {
    if let Some(token) = CANCEL.get() {
        token.cancel();
    }
}
