//! # Robot Executable Parameters
//!
//! This module provides parameters for the robot executable, loaded from `robot_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::net::NetParams;
use serde::Deserialize;

use crate::sched::DEFAULT_MAJOR_CYCLE_MS;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RobotExecParams {

    /// ID of this robot, which sets its communication slot
    pub robot_id: u16,

    /// Team this robot belongs to, packets from other teams are ignored
    pub robot_team: u16,

    /// Units: milliseconds
    pub minor_cycle_ms: u32,

    /// Units: milliseconds
    #[serde(default = "default_major_cycle_ms")]
    pub major_cycle_ms: u32,

    /// Maximum number of packets sent each time the communicate task runs
    pub max_packets_per_invocation: u32,

    /// Units: bytes
    pub max_packet_size: usize,

    /// Align the start of the schedule to a wall-clock second
    #[serde(default = "default_true")]
    pub wall_clock_sync: bool,

    /// The robot's pose is sent once every this many navigate invocations
    pub pose_period: u32,

    /// Units: millimeters/second
    pub cruise_speed_mm_s: i32,

    /// Objects closer than this are obstacles.
    ///
    /// Units: millimeters
    pub avoid_threshold_mm: u32,

    /// RFID tags which mark landmarks rather than victims
    #[serde(default)]
    pub landmark_tags: Vec<String>,

    /// Tasks which are disabled, by short name (e.g. `"AVO"`)
    #[serde(default)]
    pub disabled_tasks: Vec<String>,

    pub net: NetParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RobotExecParams {
    /// Whether the task with the given short name is enabled.
    pub fn task_enabled(&self, short_name: &str) -> bool {
        !self.disabled_tasks.iter().any(|t| t.eq_ignore_ascii_case(short_name))
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_major_cycle_ms() -> u32 {
    DEFAULT_MAJOR_CYCLE_MS
}

fn default_true() -> bool {
    true
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let params: RobotExecParams = util::params::from_toml_str(
            r#"
            robot_id = 3
            robot_team = 1
            minor_cycle_ms = 100
            max_packets_per_invocation = 8
            max_packet_size = 1024
            pose_period = 5
            cruise_speed_mm_s = 200
            avoid_threshold_mm = 300
            disabled_tasks = ["avo"]

            [net]
            pub_endpoint = "tcp://*:5103"
            peer_endpoints = ["tcp://localhost:5101", "tcp://localhost:5102"]
            "#,
        )
        .unwrap();

        assert_eq!(params.major_cycle_ms, 1000);
        assert!(params.wall_clock_sync);
        assert!(params.landmark_tags.is_empty());
        assert!(!params.task_enabled("AVO"));
        assert!(params.task_enabled("NAV"));
        assert_eq!(params.net.coordinator_endpoint, None);
    }
}
