//! # Packet payloads
//!
//! The data items robots exchange. Each maps onto one data kind of a data
//! packet.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{de, Deserialize, Deserializer, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Estimated pose of a robot in the arena frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct RobotPose {
    /// Units: millimeters
    pub x_mm: i32,

    /// Units: millimeters
    pub y_mm: i32,

    /// Units: radians
    pub heading_rad: f64,
}

/// A victim located by a robot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VictimReport {
    /// Units: millimeters
    pub x_mm: i32,

    /// Units: millimeters
    pub y_mm: i32,

    /// RFID tag identifier of the victim, as a hex string.
    pub tag_id: String,
}

/// One sector of a robot's pheromone map.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PheromoneSector {
    pub sector_id: u32,

    /// Pheromone intensity of each cell in the sector, row major.
    pub intensities: Vec<u8>,
}

/// A command for the mission task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
}

/// A sample of a generic data stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct StreamSample {
    pub channel: u16,

    pub values: Vec<f32>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Permission to transmit, issued by the fleet coordinator.
    GoAhead,

    /// Stop the mission
    Stop,

    /// Resume the mission after a stop
    Resume,
}

/// Payload of a data packet.
///
/// A payload whose kind this software does not know decodes into
/// `Payload::Unknown` rather than failing, its content is dropped.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", content = "data")]
pub enum Payload {
    Robot(RobotPose),
    Victim(VictimReport),
    Pheromone(PheromoneSector),
    Command(Command),
    Stream(StreamSample),
    Unknown,
}

/// Undecoded form of a payload.
#[derive(Deserialize)]
struct RawPayload {
    kind: String,

    #[serde(default)]
    data: serde_json::Value,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawPayload::deserialize(deserializer)?;

        let payload = match raw.kind.as_str() {
            "Robot" => serde_json::from_value(raw.data).map(Payload::Robot),
            "Victim" => serde_json::from_value(raw.data).map(Payload::Victim),
            "Pheromone" => serde_json::from_value(raw.data).map(Payload::Pheromone),
            "Command" => serde_json::from_value(raw.data).map(Payload::Command),
            "Stream" => serde_json::from_value(raw.data).map(Payload::Stream),
            _ => return Ok(Payload::Unknown),
        };

        payload.map_err(de::Error::custom)
    }
}
