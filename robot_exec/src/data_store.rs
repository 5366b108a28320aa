//! # Data Store
//!
//! All state shared between tasks lives here. The scheduler passes the data store to every task
//! it runs, and since tasks run one at a time on a single thread nothing in here needs locking.
//!
//! The sensor inboxes (`tag_inbox`, `range_inbox`) are filled by the RFID reader and range sensor
//! drivers, which sit outside this crate. Without them refine and avoid have nothing to consume.

use comms_if::proto::{
    Command, Payload, PheromoneSector, RobotPose, StreamSample, VictimReport,
};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;

use crate::{comms::TrafficClass, stats::Stats};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Input to the mission task.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionInput {
    Command(Command),
    Victim(VictimReport),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Index of the current minor cycle within the major cycle
    pub minor_cycle_index: u32,

    /// Scheduler time at which the running task started
    pub now: Duration,

    /// Wall-clock time at which the running task started, read from the scheduler's clock
    pub now_utc: DateTime<Utc>,

    // Statistics
    pub stats: Stats,

    // Communication queues
    /// Data waiting to be sent by the communicate task
    pub outbound: OutboundQueues,

    /// Commands and victim reports for the mission task
    pub mission_inbox: VecDeque<MissionInput>,

    /// Pheromone map updates for the navigate task
    pub navigate_inbox: VecDeque<PheromoneSector>,

    // Sensor inputs
    /// RFID tags read since refine last ran
    pub tag_inbox: VecDeque<String>,

    /// Range readings since avoid last ran.
    ///
    /// Units: millimeters
    pub range_inbox: VecDeque<u32>,

    // Inter-task data
    /// Current pose estimate of this robot, dead-reckoned by control
    pub robot_pose: RobotPose,

    /// Victims found by refine which report has not yet queued for sending
    pub refined_victims: VecDeque<FoundVictim>,

    /// Set once the fleet coordinator has given this robot the go-ahead
    pub go_ahead: bool,

    /// Set by a stop command, cleared again by resume
    pub mission_stopped: bool,

    /// Set by avoid while an obstacle is in range
    pub obstacle_detected: bool,

    /// Motion demanded by navigate
    pub motion_dem: MotionDemand,

    /// Motion last applied by control
    pub motion_applied: MotionDemand,
}

/// A victim found by this robot.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundVictim {
    pub report: VictimReport,

    /// Scheduler time at which refine found the victim
    pub found_at: Duration,
}

/// An item waiting in one of the outbound queues.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundItem {
    pub payload: Payload,

    /// Scheduler time at which the victim carried by this item was found, used to measure how
    /// long the fleet took to hear about it
    pub found_at: Option<Duration>,
}

/// Motion demand for the drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionDemand {
    /// Units: millimeters/second
    pub speed_mm_s: i32,

    /// Units: milliradians/second
    pub turn_rate_mrad_s: i32,
}

/// The four outbound queues, one per traffic class, oldest item first.
#[derive(Debug, Default)]
pub struct OutboundQueues {
    queues: [VecDeque<OutboundItem>; TrafficClass::COUNT],
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl OutboundQueues {
    pub fn push_pose(&mut self, pose: RobotPose) {
        self.push(TrafficClass::Robot, Payload::Robot(pose), None);
    }

    /// Queue a victim found at the given scheduler time.
    pub fn push_victim(&mut self, victim: VictimReport, found_at: Duration) {
        self.push(TrafficClass::Victim, Payload::Victim(victim), Some(found_at));
    }

    pub fn push_pheromone(&mut self, sector: PheromoneSector) {
        self.push(TrafficClass::Pheromone, Payload::Pheromone(sector), None);
    }

    pub fn push_stream(&mut self, sample: StreamSample) {
        self.push(TrafficClass::Stream, Payload::Stream(sample), None);
    }

    fn push(&mut self, class: TrafficClass, payload: Payload, found_at: Option<Duration>) {
        self.queues[class.index()].push_back(OutboundItem { payload, found_at });
    }

    /// Remove the oldest item of the given class.
    pub fn pop_front(&mut self, class: TrafficClass) -> Option<OutboundItem> {
        self.queues[class.index()].pop_front()
    }

    /// Number of items queued in the given class.
    pub fn count(&self, class: TrafficClass) -> usize {
        self.queues[class.index()].len()
    }

    /// Number of items queued over all classes.
    pub fn total(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }

    /// Empty the given class, returning how many items were dropped.
    pub fn clear(&mut self, class: TrafficClass) -> usize {
        let q = &mut self.queues[class.index()];
        let n = q.len();
        q.clear();
        n
    }
}
