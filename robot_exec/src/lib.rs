//! # Robot library.
//!
//! The onboard control loop of a search-and-rescue robot: a cyclic executive running the robot's
//! tasks under per-task deadlines, and the budgeted communication exchange that shares the
//! fleet's channel.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Inter-robot communication - budgeted exchange of queued data over the fleet channel
pub mod comms;

/// Global data store shared by the scheduler and all tasks
pub mod data_store;

/// Parameters of the robot executable
pub mod params;

/// Cyclic executive scheduler, task registry and deadline model
pub mod sched;

/// Statistics gathered over the run
pub mod stats;

/// Task bodies run by the scheduler
pub mod tasks;
