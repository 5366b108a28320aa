//! # Statistics
//!
//! Running counters kept over the whole run. Counters only ever increase, so a snapshot can be
//! taken at any time, including while shutting down.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use serde::Serialize;
use std::time::Duration;

use crate::{
    comms::TrafficClass,
    sched::{TaskId, NUM_TASK_SLOTS},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Statistics accumulated over the run.
#[derive(Debug, Default, Clone)]
pub struct Stats {
    task_runs: [u64; NUM_TASK_SLOTS],
    task_overruns: [u64; NUM_TASK_SLOTS],

    minor_cycles: u64,
    minor_cycle_overruns: u64,

    class_offered: [u64; TrafficClass::COUNT],
    class_sent: [u64; TrafficClass::COUNT],

    total_comms: u64,
    illegal_comms: u64,
    send_failures: u64,

    packets_received: u64,
    packets_forwarded: u64,

    total_victims: u64,
    inaccurate_victims: u64,

    idle_ms: RunningAverage,
    avoid_period_ms: RunningAverage,
    victim_offset_mm: RunningAverage,
    last_avoid_call: Option<Duration>,
    last_victim_latency_ms: Option<f64>,
}

/// Average in which every new sample weighs as much as all previous samples together.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct RunningAverage(Option<f64>);

/// Point-in-time copy of the statistics with the derived figures filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub tasks: Vec<TaskStats>,
    pub total_runs: u64,
    pub total_overruns: u64,

    /// Percentage of task runs which met their deadline
    pub scheduler_performance_pct: f64,

    pub minor_cycles: u64,
    pub minor_cycle_overruns: u64,

    /// Units: milliseconds
    pub avg_idle_ms: Option<f64>,

    /// Units: milliseconds
    pub avg_avoid_period_ms: Option<f64>,

    pub classes: Vec<ClassStats>,

    /// Packets transmitted
    pub total_comms: u64,

    /// Items dropped because the invocation budget was spent
    pub illegal_comms: u64,

    /// Packets within the budget which could not be encoded or broadcast
    pub send_failures: u64,

    pub illegal_comms_pct: f64,
    pub legal_comms_pct: f64,

    pub packets_received: u64,
    pub packets_forwarded: u64,

    pub total_victims: u64,
    pub inaccurate_victims: u64,

    /// Units: millimeters
    pub avg_victim_offset_mm: Option<f64>,

    /// Time from finding the last victim to transmitting it.
    ///
    /// Units: milliseconds
    pub last_victim_latency_ms: Option<f64>,
}

/// Statistics of one task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaskStats {
    pub task: TaskId,
    pub runs: u64,
    pub overruns: u64,

    /// Overruns as a percentage of this task's runs
    pub overrun_pct_self: f64,

    /// Overruns as a percentage of all overruns
    pub overrun_pct_all: f64,
}

/// Statistics of one traffic class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassStats {
    pub class: TrafficClass,

    /// Items found queued when the communicate task ran
    pub offered: u64,

    /// Items transmitted
    pub sent: u64,

    pub sent_pct: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Stats {
    pub fn record_task_run(&mut self, task: TaskId, overrun: bool) {
        self.task_runs[task.index()] += 1;
        if overrun {
            self.task_overruns[task.index()] += 1;
        }
    }

    /// Record the end of a minor cycle and the time slept at its end.
    pub fn record_minor_cycle(&mut self, overrun: bool, idle: Duration) {
        self.minor_cycles += 1;
        if overrun {
            self.minor_cycle_overruns += 1;
        }
        self.idle_ms.add(idle.as_secs_f64() * 1e3);
    }

    /// Record that avoid is about to run at the given scheduler time.
    pub fn record_avoid_call(&mut self, at: Duration) {
        if let Some(last) = self.last_avoid_call {
            let period = at.checked_sub(last).unwrap_or_default();
            self.avoid_period_ms.add(period.as_secs_f64() * 1e3);
        }
        self.last_avoid_call = Some(at);
    }

    pub fn record_offered(&mut self, class: TrafficClass, count: usize) {
        self.class_offered[class.index()] += count as u64;
    }

    pub fn record_sent(&mut self, class: TrafficClass) {
        self.class_sent[class.index()] += 1;
        self.total_comms += 1;
    }

    pub fn record_illegal(&mut self, count: usize) {
        self.illegal_comms += count as u64;
    }

    pub fn record_send_failure(&mut self) {
        self.send_failures += 1;
    }

    pub fn record_received(&mut self, forwarded: bool) {
        self.packets_received += 1;
        if forwarded {
            self.packets_forwarded += 1;
        }
    }

    /// Record a victim found by refine, with its offset from the known position if there is one.
    pub fn record_victim(&mut self, accurate: bool, offset_mm: Option<f64>) {
        self.total_victims += 1;
        if !accurate {
            self.inaccurate_victims += 1;
        }
        if let Some(o) = offset_mm {
            self.victim_offset_mm.add(o);
        }
    }

    pub fn record_victim_latency(&mut self, latency: Duration) {
        self.last_victim_latency_ms = Some(latency.as_secs_f64() * 1e3);
    }

    pub fn task_runs(&self, task: TaskId) -> u64 {
        self.task_runs[task.index()]
    }

    pub fn task_overruns(&self, task: TaskId) -> u64 {
        self.task_overruns[task.index()]
    }

    /// Take a snapshot of the statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        let total_runs: u64 = TaskId::ALL.iter().map(|t| self.task_runs(*t)).sum();
        let total_overruns: u64 = TaskId::ALL.iter().map(|t| self.task_overruns(*t)).sum();

        let tasks = TaskId::ALL
            .iter()
            .map(|t| TaskStats {
                task: *t,
                runs: self.task_runs(*t),
                overruns: self.task_overruns(*t),
                overrun_pct_self: pct(self.task_overruns(*t), self.task_runs(*t)),
                overrun_pct_all: pct(self.task_overruns(*t), total_overruns),
            })
            .collect();

        let classes = TrafficClass::ALL
            .iter()
            .map(|c| ClassStats {
                class: *c,
                offered: self.class_offered[c.index()],
                sent: self.class_sent[c.index()],
                sent_pct: pct(self.class_sent[c.index()], self.class_offered[c.index()]),
            })
            .collect();

        let legal = self.total_comms + self.send_failures;
        let attempted = legal + self.illegal_comms;

        StatsSnapshot {
            tasks,
            total_runs,
            total_overruns,
            scheduler_performance_pct: if total_runs == 0 {
                0.0
            } else {
                100.0 - pct(total_overruns, total_runs)
            },
            minor_cycles: self.minor_cycles,
            minor_cycle_overruns: self.minor_cycle_overruns,
            avg_idle_ms: self.idle_ms.value(),
            avg_avoid_period_ms: self.avoid_period_ms.value(),
            classes,
            total_comms: self.total_comms,
            illegal_comms: self.illegal_comms,
            send_failures: self.send_failures,
            illegal_comms_pct: pct(self.illegal_comms, attempted),
            legal_comms_pct: pct(legal, attempted),
            packets_received: self.packets_received,
            packets_forwarded: self.packets_forwarded,
            total_victims: self.total_victims,
            inaccurate_victims: self.inaccurate_victims,
            avg_victim_offset_mm: self.victim_offset_mm.value(),
            last_victim_latency_ms: self.last_victim_latency_ms,
        }
    }
}

impl RunningAverage {
    /// Add a sample. The first sample becomes the average.
    pub fn add(&mut self, sample: f64) {
        self.0 = Some(match self.0 {
            Some(avg) => (avg + sample) / 2.0,
            None => sample,
        });
    }

    pub fn value(&self) -> Option<f64> {
        self.0
    }
}

impl StatsSnapshot {
    /// Statistics of the given task.
    ///
    /// # Panics
    /// - If `task` is the no-op task, which is never run.
    pub fn task(&self, task: TaskId) -> TaskStats {
        match self.tasks.iter().find(|t| t.task == task) {
            Some(t) => *t,
            None => panic!("No statistics are kept for {:?}", task),
        }
    }

    pub fn class(&self, class: TrafficClass) -> ClassStats {
        self.classes[class.index()]
    }

    /// Write the snapshot to the log.
    pub fn log_summary(&self) {
        info!("---- RUN STATISTICS ----");
        info!(
            "Minor cycles: {} ({} overran), average idle {:.3} ms",
            self.minor_cycles,
            self.minor_cycle_overruns,
            self.avg_idle_ms.unwrap_or(0.0)
        );
        info!(
            "Avoid call period: {:.3} ms",
            self.avg_avoid_period_ms.unwrap_or(0.0)
        );
        info!("Tasks run: {}, deadline overruns: {}", self.total_runs, self.total_overruns);

        info!("    {:<6}{:>10}{:>10}{:>10}{:>10}", "TASK", "#_runs", "#_do", "%_self", "%_all");
        for t in self.tasks.iter() {
            info!(
                "    {:<6}{:>10}{:>10}{:>9.2}%{:>9.2}%",
                t.task.short_name(), t.runs, t.overruns, t.overrun_pct_self, t.overrun_pct_all
            );
        }
        info!("Scheduler performance: {:.2} %", self.scheduler_performance_pct);

        info!("    {:<10}{:>10}{:>10}{:>10}", "CLASS", "offered", "sent", "%_sent");
        for c in self.classes.iter() {
            info!(
                "    {:<10}{:>10}{:>10}{:>9.2}%",
                format!("{:?}", c.class), c.offered, c.sent, c.sent_pct
            );
        }
        info!(
            "Communications: {} sent, {} illegal ({:.2} %), {} failed, legal {:.2} %",
            self.total_comms,
            self.illegal_comms,
            self.illegal_comms_pct,
            self.send_failures,
            self.legal_comms_pct
        );
        info!(
            "Packets received: {} ({} forwarded)",
            self.packets_received, self.packets_forwarded
        );
        info!(
            "Victims found: {} ({} inaccurate, average offset {:.1} mm)",
            self.total_victims,
            self.inaccurate_victims,
            self.avg_victim_offset_mm.unwrap_or(0.0)
        );
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Percentage of `num` in `den`, zero when `den` is zero.
fn pct(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        100.0 * num as f64 / den as f64
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_snapshot_idempotent() {
        let mut stats = Stats::default();
        stats.record_task_run(TaskId::Refine, true);
        stats.record_offered(TrafficClass::Victim, 3);
        stats.record_sent(TrafficClass::Victim);

        assert_eq!(stats.snapshot(), stats.snapshot());
    }

    #[test]
    fn test_percentages() {
        let mut stats = Stats::default();

        for i in 0..4 {
            stats.record_task_run(TaskId::Navigate, i == 0);
        }
        stats.record_task_run(TaskId::Avoid, true);
        stats.record_task_run(TaskId::Mission, false);
        stats.record_task_run(TaskId::Mission, false);
        stats.record_task_run(TaskId::Mission, false);

        let snap = stats.snapshot();

        assert_eq!(snap.total_runs, 8);
        assert_eq!(snap.total_overruns, 2);
        assert_eq!(snap.task(TaskId::Navigate).overrun_pct_self, 25.0);
        assert_eq!(snap.task(TaskId::Navigate).overrun_pct_all, 50.0);
        assert_eq!(snap.task(TaskId::Avoid).overrun_pct_self, 100.0);
        assert_eq!(snap.task(TaskId::Control).overrun_pct_self, 0.0);
        assert_eq!(snap.scheduler_performance_pct, 75.0);
    }

    #[test]
    fn test_comms_percentages() {
        let mut stats = Stats::default();

        stats.record_offered(TrafficClass::Robot, 4);
        for _ in 0..3 {
            stats.record_sent(TrafficClass::Robot);
        }
        stats.record_illegal(1);

        let snap = stats.snapshot();

        assert_eq!(snap.class(TrafficClass::Robot).sent_pct, 75.0);
        assert_eq!(snap.class(TrafficClass::Stream).sent_pct, 0.0);
        assert_eq!(snap.illegal_comms_pct, 25.0);
        assert_eq!(snap.legal_comms_pct, 75.0);
    }

    #[test]
    fn test_snapshot_serialises() {
        let mut stats = Stats::default();
        stats.record_task_run(TaskId::Mission, false);

        let json = serde_json::to_value(stats.snapshot()).unwrap();

        assert_eq!(json["tasks"].as_array().unwrap().len(), 7);
        assert_eq!(json["tasks"][0]["task"], "Mission");
        assert_eq!(json["tasks"][0]["runs"], 1);
        assert_eq!(json["classes"][3]["class"], "Stream");
    }

    #[test]
    fn test_running_averages() {
        let mut stats = Stats::default();

        stats.record_avoid_call(Duration::from_millis(0));
        assert_eq!(stats.snapshot().avg_avoid_period_ms, None);

        stats.record_avoid_call(Duration::from_millis(500));
        stats.record_avoid_call(Duration::from_millis(1100));
        assert_eq!(stats.snapshot().avg_avoid_period_ms, Some(550.0));

        stats.record_victim(true, None);
        stats.record_victim(false, Some(10.0));
        stats.record_victim(false, Some(20.0));
        stats.record_victim(false, None);
        let snap = stats.snapshot();
        assert_eq!(snap.total_victims, 4);
        assert_eq!(snap.inaccurate_victims, 3);
        assert_eq!(snap.avg_victim_offset_mm, Some(15.0));
    }
}
