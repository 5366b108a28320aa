//! Deadline model
//!
//! `deadline = ceil(wcet * factor)`, where the factor depends on the priority class of the task.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{PrioClass, SchedError, SchedParams, TaskId, WcetTable};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Derives task deadlines from their worst case execution times.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadlineModel {
    wcet_ms: WcetTable,
    high_prio_factor: f64,
    low_prio_factor: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DeadlineModel {
    pub fn new(params: &SchedParams) -> Result<Self, SchedError> {
        for f in [params.high_prio_factor, params.low_prio_factor].iter() {
            if !f.is_finite() || *f <= 0.0 {
                return Err(SchedError::InvalidPrioFactor(*f))
            }
        }

        Ok(Self {
            wcet_ms: params.wcet_ms,
            high_prio_factor: params.high_prio_factor,
            low_prio_factor: params.low_prio_factor,
        })
    }

    /// Factor applied to tasks of the given class.
    pub fn factor(&self, class: PrioClass) -> f64 {
        match class {
            PrioClass::High => self.high_prio_factor,
            PrioClass::Low => self.low_prio_factor,
        }
    }

    /// Worst case execution time of the task in milliseconds, `None` for the no-op task.
    pub fn wcet_ms(&self, task: TaskId) -> Option<u32> {
        let w = &self.wcet_ms;
        match task {
            TaskId::Nop => None,
            TaskId::Mission => Some(w.mission),
            TaskId::Navigate => Some(w.navigate),
            TaskId::Control => Some(w.control),
            TaskId::Refine => Some(w.refine),
            TaskId::Report => Some(w.report),
            TaskId::Communicate => Some(w.communicate),
            TaskId::Avoid => Some(w.avoid),
        }
    }

    /// Deadline of the task in milliseconds.
    ///
    /// The no-op task has no deadline, asking for it is a configuration error.
    pub fn deadline_ms(&self, task: TaskId) -> Result<u32, SchedError> {
        match (self.wcet_ms(task), task.prio_class()) {
            (Some(wcet), Some(class)) => 
                Ok((wcet as f64 * self.factor(class)).ceil() as u32),
            _ => Err(SchedError::UnknownTask(task.raw())),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
