//! Parameters structure for the scheduler

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Baseline major cycle length.
///
/// Units: milliseconds
pub const DEFAULT_MAJOR_CYCLE_MS: u32 = 1000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the deadline model and of the schedule.
///
/// The WCETs were measured on the robot's hardware, if the hardware changes they must be
/// measured again and the deadlines re-derived.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SchedParams {
    /// Worst case execution time of each task.
    pub wcet_ms: WcetTable,

    /// Deadline factor applied to the WCET of high priority tasks.
    pub high_prio_factor: f64,

    /// Deadline factor applied to the WCET of low priority tasks.
    pub low_prio_factor: f64,

    /// Control and Avoid run on minor cycle indices that are a multiple of this.
    ///
    /// Units: minor cycles
    #[serde(default = "default_control_period")]
    pub control_period_minor_cycles: u32,
}

/// Worst case execution time of each task.
///
/// Units: milliseconds
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct WcetTable {
    pub mission: u32,
    pub navigate: u32,
    pub control: u32,
    pub refine: u32,
    pub report: u32,
    pub communicate: u32,
    pub avoid: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SchedParams {
    fn default() -> Self {
        Self {
            wcet_ms: WcetTable::default(),
            high_prio_factor: 1.5,
            low_prio_factor: 2.0,
            control_period_minor_cycles: default_control_period(),
        }
    }
}

impl Default for WcetTable {
    fn default() -> Self {
        Self {
            mission: 1,
            navigate: 1,
            control: 5,
            refine: 11,
            report: 1,
            communicate: 5,
            avoid: 17,
        }
    }
}

fn default_control_period() -> u32 {
    5
}
