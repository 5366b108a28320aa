//! # Cyclic executive scheduler
//!
//! The scheduler runs an endless sequence of major cycles, each split into a fixed number of
//! equal minor cycles. Within a minor cycle tasks run one after another to completion, each
//! timed against a deadline derived from its worst case execution time. Whatever time is left
//! at the end of the minor cycle is slept away.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cancel;
mod deadline;
mod executive;
mod params;
mod task;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use cancel::*;
pub use deadline::*;
pub use executive::*;
pub use params::*;
pub use task::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by the scheduler.
///
/// All of these are configuration errors, the executable must not start if one is returned.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SchedError {
    #[error("The minor cycle length must be greater than zero")]
    ZeroMinorCycle,

    #[error("The major cycle length must be greater than zero")]
    ZeroMajorCycle,

    #[error(
        "The major cycle ({major_ms} ms) is not an exact multiple of the minor cycle \
        ({minor_ms} ms)"
    )]
    CycleMismatch {
        major_ms: u32,
        minor_ms: u32,
    },

    #[error("Unknown task id {0}")]
    UnknownTask(u8),

    #[error("Priority factor must be finite and positive, found {0}")]
    InvalidPrioFactor(f64),

    #[error("The control period must be at least one minor cycle")]
    ZeroControlPeriod,
}
