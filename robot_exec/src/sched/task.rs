//! Task identities and the task registry

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{DeadlineModel, SchedError};
use crate::data_store::DataStore;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of task id slots, including the no-op task.
pub const NUM_TASK_SLOTS: usize = 8;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A task body.
///
/// A body runs to completion each time it is executed, it must never block. All of its inputs
/// and outputs go through the data store.
pub trait Task {
    /// Run the task once.
    fn execute(&mut self, ds: &mut DataStore);

    /// Whether the body does anything when executed. Disabled bodies still count as having run.
    fn enabled(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Identity of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskId {
    /// Does nothing, never scheduled
    Nop = 0,
    Mission = 1,
    Navigate = 2,
    Control = 3,
    Refine = 4,
    Report = 5,
    Communicate = 6,
    Avoid = 7,
}

/// Priority class of a task, which sets how much slack its deadline gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrioClass {
    High,
    Low,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Table of every task's deadline and body.
///
/// Deadlines are computed once, when the registry is built, and never change afterwards.
/// Bodies are registered separately; executing a task without a body does nothing.
pub struct TaskRegistry {
    deadlines: [Option<Duration>; NUM_TASK_SLOTS],

    bodies: [Option<Box<dyn Task>>; NUM_TASK_SLOTS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TaskId {
    /// All schedulable tasks, in id order.
    pub const ALL: [TaskId; 7] = [
        TaskId::Mission,
        TaskId::Navigate,
        TaskId::Control,
        TaskId::Refine,
        TaskId::Report,
        TaskId::Communicate,
        TaskId::Avoid,
    ];

    /// Get the task with the given numeric id.
    pub fn from_raw(id: u8) -> Option<Self> {
        match id {
            0 => Some(TaskId::Nop),
            1 => Some(TaskId::Mission),
            2 => Some(TaskId::Navigate),
            3 => Some(TaskId::Control),
            4 => Some(TaskId::Refine),
            5 => Some(TaskId::Report),
            6 => Some(TaskId::Communicate),
            7 => Some(TaskId::Avoid),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        self as u8
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Short name used in reports.
    pub fn short_name(self) -> &'static str {
        match self {
            TaskId::Nop => "NOP",
            TaskId::Mission => "MISS",
            TaskId::Navigate => "NAV",
            TaskId::Control => "CON",
            TaskId::Refine => "REF",
            TaskId::Report => "REP",
            TaskId::Communicate => "COM",
            TaskId::Avoid => "AVO",
        }
    }

    /// Priority class of the task, `None` for the no-op task.
    ///
    /// Control and Communicate must complete as soon as possible so they get the tighter
    /// factor.
    pub fn prio_class(self) -> Option<PrioClass> {
        match self {
            TaskId::Nop => None,
            TaskId::Control | TaskId::Communicate => Some(PrioClass::High),
            _ => Some(PrioClass::Low),
        }
    }
}

impl TaskRegistry {
    /// Build the registry, deriving the deadline of every task from the model.
    pub fn new(model: &DeadlineModel) -> Result<Self, SchedError> {
        let mut deadlines = [None; NUM_TASK_SLOTS];

        for task in TaskId::ALL.iter() {
            let ms = model.deadline_ms(*task)?;
            deadlines[task.index()] = Some(Duration::from_millis(ms as u64));
        }

        Ok(Self {
            deadlines,
            bodies: Default::default(),
        })
    }

    /// Set the body of a task, replacing any previous body.
    pub fn register(&mut self, task: TaskId, body: Box<dyn Task>) -> Result<(), SchedError> {
        if task == TaskId::Nop {
            return Err(SchedError::UnknownTask(task.raw()))
        }

        self.bodies[task.index()] = Some(body);

        Ok(())
    }

    /// Deadline of the given task.
    pub fn deadline(&self, task: TaskId) -> Result<Duration, SchedError> {
        self.deadlines[task.index()].ok_or(SchedError::UnknownTask(task.raw()))
    }

    /// Whether the task's body is enabled, `None` if the task has no body.
    pub fn is_enabled(&self, task: TaskId) -> Option<bool> {
        self.bodies[task.index()].as_ref().map(|b| b.enabled())
    }

    /// Execute the body of the given task.
    ///
    /// A task without a body is a no-op.
    pub fn execute(&mut self, task: TaskId, ds: &mut DataStore) {
        match self.bodies[task.index()] {
            Some(ref mut body) => body.execute(ds),
            None => trace!("No body registered for {:?}", task),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::sched::SchedParams;

    struct CountTask(u32);

    impl Task for CountTask {
        fn execute(&mut self, ds: &mut DataStore) {
            self.0 += 1;
            ds.robot_pose.x_mm += 1;
        }
    }

    fn registry() -> TaskRegistry {
        TaskRegistry::new(&DeadlineModel::new(&SchedParams::default()).unwrap()).unwrap()
    }

    #[test]
    fn test_from_raw() {
        for task in TaskId::ALL.iter() {
            assert_eq!(TaskId::from_raw(task.raw()), Some(*task));
        }
        assert_eq!(TaskId::from_raw(0), Some(TaskId::Nop));
        assert_eq!(TaskId::from_raw(8), None);
    }

    #[test]
    fn test_registry_deadlines() {
        let reg = registry();

        assert_eq!(reg.deadline(TaskId::Avoid), Ok(Duration::from_millis(34)));
        assert_eq!(reg.deadline(TaskId::Control), Ok(Duration::from_millis(8)));
        assert_eq!(reg.deadline(TaskId::Nop), Err(SchedError::UnknownTask(0)));
    }

    #[test]
    fn test_dispatch() {
        let mut reg = registry();
        let mut ds = DataStore::default();

        reg.register(TaskId::Refine, Box::new(CountTask(0))).unwrap();
        assert_eq!(
            reg.register(TaskId::Nop, Box::new(CountTask(0))),
            Err(SchedError::UnknownTask(0))
        );

        reg.execute(TaskId::Refine, &mut ds);
        reg.execute(TaskId::Refine, &mut ds);

        // Neither a task without a body nor the no-op task does anything
        reg.execute(TaskId::Mission, &mut ds);
        reg.execute(TaskId::Nop, &mut ds);

        assert_eq!(ds.robot_pose.x_mm, 2);
        assert_eq!(reg.is_enabled(TaskId::Refine), Some(true));
        assert_eq!(reg.is_enabled(TaskId::Mission), None);
    }
}
