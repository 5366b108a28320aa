//! # Task bodies
//!
//! Minimal bodies for every task the scheduler runs, apart from communicate which lives in
//! `comms`. Each body owns an enabled flag, a disabled body returns immediately.
//!
//! Refine and avoid consume the `tag_inbox` and `range_inbox` feeds of the data store, which the
//! sensor drivers fill outside this crate. Control keeps `robot_pose` up to date.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod avoid;
mod control;
mod mission;
mod navigate;
mod refine;
mod report;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use avoid::AvoidTask;
pub use control::ControlTask;
pub use mission::MissionTask;
pub use navigate::NavigateTask;
pub use refine::{RefineTask, KNOWN_VICTIMS};
pub use report::ReportTask;
