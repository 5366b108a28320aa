//! The cyclic executive

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use std::time::Duration;
use util::time::{self, Clock};

use super::{CancelToken, DeadlineModel, SchedError, TaskId, TaskRegistry};
use crate::data_store::DataStore;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Configuration of the cycle structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedConfig {
    /// Units: milliseconds
    pub minor_cycle_ms: u32,

    /// Units: milliseconds
    pub major_cycle_ms: u32,

    /// This robot's ID, which sets its communication slot.
    pub robot_id: u16,

    /// Control and Avoid run on minor cycle indices that are a multiple of this.
    pub control_period_minor_cycles: u32,

    /// Align the first minor cycle to a whole wall-clock second before starting.
    pub wall_clock_sync: bool,
}

/// The cyclic executive.
pub struct CycleScheduler<C: Clock> {
    config: SchedConfig,

    minor_cycle: Duration,

    num_minor_cycles: u32,

    /// Minor cycle index in which this robot may transmit.
    tdma_slot: u32,

    registry: TaskRegistry,

    clock: C,

    cancel: CancelToken,

    /// Time the scheduler started, after any wall-clock alignment.
    started_at: Option<Duration>,

    /// Start of the current minor cycle as scheduled. Always advanced by exactly one minor cycle,
    /// whatever time the cycle actually took.
    cycle_ref: Duration,

    /// Sleep performed to align the first cycle to a wall-clock second.
    ///
    /// Units: microseconds
    sync_offset_us: Option<u64>,

    num_major_cycles: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C: Clock> CycleScheduler<C> {
    /// Initialise the scheduler.
    ///
    /// Fails if the major cycle is not an exact multiple of the minor cycle.
    pub fn new(
        config: SchedConfig,
        registry: TaskRegistry,
        clock: C,
        cancel: CancelToken,
    ) -> Result<Self, SchedError> {
        if config.minor_cycle_ms == 0 {
            return Err(SchedError::ZeroMinorCycle)
        }
        if config.major_cycle_ms == 0 {
            return Err(SchedError::ZeroMajorCycle)
        }
        if config.major_cycle_ms % config.minor_cycle_ms != 0 {
            return Err(SchedError::CycleMismatch {
                major_ms: config.major_cycle_ms,
                minor_ms: config.minor_cycle_ms,
            })
        }

        let num_minor_cycles = config.major_cycle_ms / config.minor_cycle_ms;

        if config.control_period_minor_cycles == 0 {
            return Err(SchedError::ZeroControlPeriod)
        }

        let tdma_slot = config.robot_id as u32 % num_minor_cycles;

        info!(
            "Scheduler initialised: minor cycle {} ms, major cycle {} ms ({} minor cycles), \
            communication slot {}",
            config.minor_cycle_ms, config.major_cycle_ms, num_minor_cycles, tdma_slot
        );

        Ok(Self {
            config,
            minor_cycle: Duration::from_millis(config.minor_cycle_ms as u64),
            num_minor_cycles,
            tdma_slot,
            registry,
            clock,
            cancel,
            started_at: None,
            cycle_ref: Duration::from_secs(0),
            sync_offset_us: None,
            num_major_cycles: 0,
        })
    }

    pub fn num_minor_cycles(&self) -> u32 {
        self.num_minor_cycles
    }

    pub fn tdma_slot(&self) -> u32 {
        self.tdma_slot
    }

    pub fn sync_offset_us(&self) -> Option<u64> {
        self.sync_offset_us
    }

    pub fn num_major_cycles(&self) -> u64 {
        self.num_major_cycles
    }

    /// Time since the scheduler started, zero if it has not started.
    pub fn run_time(&self) -> Duration {
        match self.started_at {
            Some(s) => self.clock.monotonic().checked_sub(s).unwrap_or_default(),
            None => Duration::from_secs(0),
        }
    }

    /// The tasks run in the given minor cycle, in execution order.
    pub fn tasks_for_minor_cycle(&self, index: u32) -> Vec<TaskId> {
        let mut tasks = Vec::with_capacity(TaskId::ALL.len());

        if index == self.tdma_slot {
            tasks.push(TaskId::Communicate);
        }

        tasks.push(TaskId::Navigate);

        if index % self.config.control_period_minor_cycles == 0 {
            tasks.push(TaskId::Control);
            tasks.push(TaskId::Avoid);
        }

        tasks.push(TaskId::Refine);
        tasks.push(TaskId::Report);
        tasks.push(TaskId::Mission);

        tasks
    }

    /// Largest sum of WCETs over all minor cycles of the schedule.
    ///
    /// Units: milliseconds
    pub fn nominal_peak_load_ms(&self, model: &DeadlineModel) -> u32 {
        (0..self.num_minor_cycles)
            .map(|i| {
                self.tasks_for_minor_cycle(i)
                    .iter()
                    .filter_map(|t| model.wcet_ms(*t))
                    .sum::<u32>()
            })
            .max()
            .unwrap_or(0)
    }

    /// Warn if the nominal schedule cannot fit in a minor cycle.
    pub fn check_load(&self, model: &DeadlineModel) -> bool {
        let peak = self.nominal_peak_load_ms(model);

        if peak > self.config.minor_cycle_ms {
            warn!(
                "Nominal load of the busiest minor cycle ({} ms) exceeds the minor cycle ({} ms), \
                overruns are expected",
                peak, self.config.minor_cycle_ms
            );
            false
        }
        else {
            debug!("Nominal peak load {} ms of {} ms", peak, self.config.minor_cycle_ms);
            true
        }
    }

    /// Run the scheduler until cancelled.
    pub fn run(&mut self, ds: &mut DataStore) -> Result<(), SchedError> {
        self.start();

        loop {
            for index in 0..self.num_minor_cycles {
                if self.cancel.is_cancelled() {
                    info!(
                        "Scheduler cancelled after {} major cycles", 
                        self.num_major_cycles
                    );
                    return Ok(())
                }

                self.run_minor_cycle(index, ds)?;
            }

            self.num_major_cycles += 1;
        }
    }

    /// Start the cycle timers, first aligning to the next wall-clock second if configured.
    ///
    /// Robots of the fleet all start on a second boundary, which lines up their communication
    /// slots.
    pub fn start(&mut self) {
        if self.config.wall_clock_sync {
            let offset_us = time::micros_to_next_second(&self.clock.now_utc());
            debug!("Aligning to wall-clock second, sleeping {} us", offset_us);
            self.clock.sleep(Duration::from_micros(offset_us));
            self.sync_offset_us = Some(offset_us);
        }

        let now = self.clock.monotonic();
        self.started_at = Some(now);
        self.cycle_ref = now;
    }

    /// Run one minor cycle, including the sleep to its end.
    pub fn run_minor_cycle(
        &mut self, 
        index: u32, 
        ds: &mut DataStore
    ) -> Result<(), SchedError> {
        if self.started_at.is_none() {
            self.start();
        }

        ds.minor_cycle_index = index;

        for task in self.tasks_for_minor_cycle(index) {
            if task == TaskId::Avoid {
                ds.stats.record_avoid_call(self.clock.monotonic());
            }

            self.process_task(task, ds)?;
        }

        self.wait_for_boundary(ds);

        Ok(())
    }

    /// Execute one task and check it against its deadline.
    ///
    /// The run is always counted, an overrun is counted as well if the task took longer than
    /// its deadline.
    pub fn process_task(&mut self, task: TaskId, ds: &mut DataStore) -> Result<(), SchedError> {
        let deadline = self.registry.deadline(task)?;

        let start = self.clock.monotonic();
        ds.now = start;
        ds.now_utc = self.clock.now_utc();

        self.registry.execute(task, ds);

        let exec_time = self.clock.monotonic().checked_sub(start).unwrap_or_default();
        let overrun = exec_time > deadline;

        if overrun {
            warn!(
                "{:?} overran its deadline: took {:.3} ms, deadline {} ms",
                task,
                exec_time.as_secs_f64() * 1e3,
                deadline.as_millis()
            );
        }

        ds.stats.record_task_run(task, overrun);

        Ok(())
    }

    /// Sleep until the end of the current minor cycle.
    ///
    /// If the cycle already overran the next one starts immediately. The cycle reference always
    /// moves on by exactly one minor cycle, so an overrun eats into the following cycle rather
    /// than shifting every later boundary.
    fn wait_for_boundary(&mut self, ds: &mut DataStore) {
        let boundary = self.cycle_ref + self.minor_cycle;
        let now = self.clock.monotonic();

        match boundary.checked_sub(now) {
            Some(remaining) if remaining > Duration::from_secs(0) => {
                self.clock.sleep(remaining);
                ds.stats.record_minor_cycle(false, remaining);
            }
            Some(_) => ds.stats.record_minor_cycle(false, Duration::from_secs(0)),
            None => {
                warn!(
                    "Minor cycle {} overran by {:.3} ms",
                    ds.minor_cycle_index,
                    (now - boundary).as_secs_f64() * 1e3
                );
                ds.stats.record_minor_cycle(true, Duration::from_secs(0));
            }
        }

        self.cycle_ref = boundary;
    }

    /// Tear down the scheduler.
    ///
    /// The statistics live in the data store, take the final snapshot before or after calling
    /// this.
    pub fn destroy(self) {
        info!(
            "Scheduler destroyed after {} major cycles ({:.2} s)",
            self.num_major_cycles,
            self.run_time().as_secs_f64()
        );
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::sched::{SchedParams, Task};
    use chrono::{TimeZone, Utc};
    use std::{cell::RefCell, rc::Rc};
    use util::time::ManualClock;

    /// Fake body which takes a fixed time to run and logs when it ran.
    struct FakeTask {
        id: TaskId,
        clock: ManualClock,
        exec_time: Duration,
        log: Rc<RefCell<Vec<(u32, TaskId)>>>,
    }

    impl Task for FakeTask {
        fn execute(&mut self, ds: &mut DataStore) {
            self.log.borrow_mut().push((ds.minor_cycle_index, self.id));
            self.clock.advance(self.exec_time);
        }
    }

    /// Cancels the scheduler after it has run a given number of times.
    struct CancelAfter {
        remaining: u32,
        token: CancelToken,
    }

    impl Task for CancelAfter {
        fn execute(&mut self, _ds: &mut DataStore) {
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.token.cancel();
            }
        }
    }

    fn config(minor_cycle_ms: u32, robot_id: u16) -> SchedConfig {
        SchedConfig {
            minor_cycle_ms,
            major_cycle_ms: 1000,
            robot_id,
            control_period_minor_cycles: 5,
            wall_clock_sync: false,
        }
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.timestamp_opt(1_600_000_000, 250_000_000).unwrap())
    }

    fn registry() -> TaskRegistry {
        TaskRegistry::new(&DeadlineModel::new(&SchedParams::default()).unwrap()).unwrap()
    }

    fn scheduler(cfg: SchedConfig, clock: ManualClock) -> CycleScheduler<ManualClock> {
        CycleScheduler::new(cfg, registry(), clock, CancelToken::new()).unwrap()
    }

    #[test]
    fn test_cycle_ratio() {
        for minor in 1..=1000 {
            let result = CycleScheduler::new(
                config(minor, 0), registry(), clock(), CancelToken::new()
            );

            if 1000 % minor == 0 {
                assert!(result.is_ok(), "minor = {}", minor);
            }
            else {
                match result {
                    Err(SchedError::CycleMismatch { major_ms: 1000, minor_ms }) => 
                        assert_eq!(minor_ms, minor),
                    _ => panic!("Expected a cycle mismatch for minor = {}", minor),
                }
            }
        }

        assert!(matches!(
            CycleScheduler::new(config(0, 0), registry(), clock(), CancelToken::new()),
            Err(SchedError::ZeroMinorCycle)
        ));
    }

    #[test]
    fn test_tdma_slot() {
        for robot_id in 0..50u16 {
            let s = scheduler(config(100, robot_id), clock());

            let slots: Vec<u32> = (0..s.num_minor_cycles())
                .filter(|i| s.tasks_for_minor_cycle(*i).contains(&TaskId::Communicate))
                .collect();

            assert_eq!(slots, vec![robot_id as u32 % 10]);
        }
    }

    #[test]
    fn test_schedule_robot_3() {
        let s = scheduler(config(100, 3), clock());

        for i in 0..10 {
            let tasks = s.tasks_for_minor_cycle(i);

            assert_eq!(tasks.contains(&TaskId::Communicate), i == 3);
            assert_eq!(tasks.contains(&TaskId::Control), i == 0 || i == 5);
            assert_eq!(tasks.contains(&TaskId::Avoid), i == 0 || i == 5);

            for t in [TaskId::Navigate, TaskId::Refine, TaskId::Report, TaskId::Mission].iter() {
                assert!(tasks.contains(t), "{:?} missing from minor cycle {}", t, i);
            }
        }

        assert_eq!(
            s.tasks_for_minor_cycle(0),
            vec![
                TaskId::Navigate,
                TaskId::Control,
                TaskId::Avoid,
                TaskId::Refine,
                TaskId::Report,
                TaskId::Mission
            ]
        );
        assert_eq!(s.tasks_for_minor_cycle(3)[0], TaskId::Communicate);
    }

    #[test]
    fn test_major_cycle_execution() {
        let clock = clock();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut reg = registry();

        for task in TaskId::ALL.iter() {
            reg.register(*task, Box::new(FakeTask {
                id: *task,
                clock: clock.clone(),
                exec_time: Duration::from_millis(1),
                log: log.clone(),
            })).unwrap();
        }

        let mut s = CycleScheduler::new(config(100, 3), reg, clock.clone(), CancelToken::new())
            .unwrap();
        let mut ds = DataStore::default();

        s.start();
        for i in 0..10 {
            s.run_minor_cycle(i, &mut ds).unwrap();
        }

        let log = log.borrow();
        let count = |t: TaskId| log.iter().filter(|(_, id)| *id == t).count();

        assert_eq!(count(TaskId::Communicate), 1);
        assert!(log.contains(&(3, TaskId::Communicate)));
        assert_eq!(count(TaskId::Control), 2);
        assert_eq!(count(TaskId::Avoid), 2);
        assert_eq!(count(TaskId::Navigate), 10);
        assert_eq!(count(TaskId::Mission), 10);

        // Each minor cycle is padded out to exactly 100 ms
        assert_eq!(clock.monotonic(), Duration::from_millis(1000));

        let snap = ds.stats.snapshot();
        assert_eq!(snap.total_runs, 10 * 4 + 1 + 2 * 2);
        assert_eq!(snap.total_overruns, 0);
    }

    #[test]
    fn test_overrun_counts_only_that_task() {
        let clock = clock();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut reg = registry();

        // Refine's deadline is 22 ms
        reg.register(TaskId::Refine, Box::new(FakeTask {
            id: TaskId::Refine,
            clock: clock.clone(),
            exec_time: Duration::from_millis(30),
            log: log.clone(),
        })).unwrap();
        reg.register(TaskId::Report, Box::new(FakeTask {
            id: TaskId::Report,
            clock: clock.clone(),
            exec_time: Duration::from_millis(1),
            log,
        })).unwrap();

        let mut s = CycleScheduler::new(config(100, 3), reg, clock, CancelToken::new()).unwrap();
        let mut ds = DataStore::default();

        let before = ds.stats.snapshot();
        s.process_task(TaskId::Refine, &mut ds).unwrap();
        let after = ds.stats.snapshot();

        for task in TaskId::ALL.iter() {
            let b = before.task(*task);
            let a = after.task(*task);
            if *task == TaskId::Refine {
                assert_eq!(a.runs, b.runs + 1);
                assert_eq!(a.overruns, b.overruns + 1);
            }
            else {
                assert_eq!(a, b);
            }
        }

        s.process_task(TaskId::Report, &mut ds).unwrap();
        let report = ds.stats.snapshot();
        assert_eq!(report.task(TaskId::Report).runs, 1);
        assert_eq!(report.task(TaskId::Report).overruns, 0);
    }

    #[test]
    fn test_overrun_does_not_shift_boundaries() {
        let clock = clock();
        let mut reg = registry();

        reg.register(TaskId::Avoid, Box::new(FakeTask {
            id: TaskId::Avoid,
            clock: clock.clone(),
            exec_time: Duration::from_millis(130),
            log: Rc::new(RefCell::new(Vec::new())),
        })).unwrap();

        let mut s = CycleScheduler::new(config(100, 3), reg, clock.clone(), CancelToken::new())
            .unwrap();
        let mut ds = DataStore::default();

        s.start();
        s.run_minor_cycle(0, &mut ds).unwrap();
        // No sleep after the overrun, the cycle is simply behind
        assert!(clock.sleeps().is_empty());
        assert_eq!(clock.monotonic(), Duration::from_millis(130));

        s.run_minor_cycle(1, &mut ds).unwrap();
        // The second boundary is still at 200 ms
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(70)]);
        assert_eq!(clock.monotonic(), Duration::from_millis(200));

        let snap = ds.stats.snapshot();
        assert_eq!(snap.minor_cycle_overruns, 1);
        assert_eq!(snap.task(TaskId::Avoid).overruns, 1);
    }

    #[test]
    fn test_task_sees_scheduler_time() {
        /// Records the times the data store held while it ran.
        struct TimeRecorder(Rc<RefCell<Vec<(Duration, chrono::DateTime<Utc>)>>>);

        impl Task for TimeRecorder {
            fn execute(&mut self, ds: &mut DataStore) {
                self.0.borrow_mut().push((ds.now, ds.now_utc));
            }
        }

        let clock = clock();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut reg = registry();
        reg.register(TaskId::Communicate, Box::new(TimeRecorder(seen.clone()))).unwrap();

        let mut s = CycleScheduler::new(config(100, 0), reg, clock.clone(), CancelToken::new())
            .unwrap();
        let mut ds = DataStore::default();

        clock.advance(Duration::from_millis(40));
        s.process_task(TaskId::Communicate, &mut ds).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![(
                Duration::from_millis(40),
                Utc.timestamp_opt(1_600_000_000, 290_000_000).unwrap()
            )]
        );
    }

    #[test]
    fn test_wall_clock_sync() {
        // Clock starts 250 ms into a second
        let clock = clock();
        let mut cfg = config(100, 1);
        cfg.wall_clock_sync = true;

        let mut s = scheduler(cfg, clock.clone());
        s.start();

        assert_eq!(s.sync_offset_us(), Some(750_000));
        assert_eq!(clock.sleeps(), vec![Duration::from_micros(750_000)]);
        assert_eq!(clock.now_utc(), Utc.timestamp_opt(1_600_000_001, 0).unwrap());
    }

    #[test]
    fn test_cancel_stops_at_boundary() {
        let clock = clock();
        let token = CancelToken::new();
        let mut reg = registry();

        // Mission runs once per minor cycle, cancel after the 15th
        reg.register(TaskId::Mission, Box::new(CancelAfter {
            remaining: 15,
            token: token.clone(),
        })).unwrap();

        let mut s = CycleScheduler::new(config(100, 3), reg, clock.clone(), token).unwrap();
        let mut ds = DataStore::default();

        s.run(&mut ds).unwrap();

        let snap = ds.stats.snapshot();
        assert_eq!(snap.task(TaskId::Mission).runs, 15);
        assert_eq!(snap.task(TaskId::Navigate).runs, 15);
        assert_eq!(s.num_major_cycles(), 1);
        assert_eq!(clock.monotonic(), Duration::from_millis(1500));
    }

    #[test]
    fn test_peak_load() {
        let model = DeadlineModel::new(&SchedParams::default()).unwrap();
        let s = scheduler(config(100, 0), clock());

        // Slot 0 has every task: 1 + 1 + 5 + 11 + 1 + 5 + 17
        assert_eq!(s.nominal_peak_load_ms(&model), 41);
        assert!(s.check_load(&model));

        let s = scheduler(config(20, 0), clock());
        assert!(!s.check_load(&model));
    }
}
