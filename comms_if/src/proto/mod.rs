//! # Fleet protocol
//!
//! Packets are JSON encoded. Every packet carries a header identifying the
//! sender and its place in the sender's transmission, followed by a body
//! whose variant is the packet type.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod data;

pub use data::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Sender ID used by the fleet coordinator, no robot may use it.
pub const COORDINATOR_ID: u16 = u16::MAX;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A packet exchanged between robots.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Packet {
    pub header: Header,

    pub body: Body,
}

/// Header common to all packets.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Who the packet is for
    pub dest: Address,

    /// Robot ID of the sender
    pub sender_id: u16,

    /// Team of the sender
    pub sender_team: u16,

    /// Position of this packet within the sender's current exchange, starting at 1.
    pub seq: u32,

    /// Sender's message sequence id, identifies the exchange this packet is part of.
    pub msg_seq_id: u64,

    /// Total number of items the sender had queued for this exchange.
    pub last_id: u32,

    /// Milliseconds into the current minute at which the sender sent the packet.
    pub send_time_ms: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Destination of a packet.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    Broadcast,
    Robot(u16),
}

/// Body of a packet, the variant gives the packet type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "body")]
pub enum Body {
    /// Acknowledgement, carries nothing
    Ack,

    /// Permission for the addressed robot to start its mission
    GoAhead,

    /// Data item
    Data(Payload),
}

/// Errors which can occur when encoding a packet.
#[derive(Debug, Error)]
pub enum PacketEncodeError {
    #[error("Could not serialize the packet: {0}")]
    SerializationError(serde_json::Error),

    #[error("Encoded packet is {0} bytes, over the maximum packet size of {1} bytes")]
    TooLarge(usize, usize),
}

/// Errors which can occur when decoding a packet.
#[derive(Debug, Error)]
pub enum PacketParseError {
    #[error("Packet contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Packet {
    /// Encode the packet, rejecting it if it would be larger than `max_size` bytes.
    pub fn to_bytes(&self, max_size: usize) -> Result<Vec<u8>, PacketEncodeError> {
        let bytes = serde_json::to_vec(self)
            .map_err(PacketEncodeError::SerializationError)?;

        if bytes.len() > max_size {
            return Err(PacketEncodeError::TooLarge(bytes.len(), max_size))
        }

        Ok(bytes)
    }

    /// Decode a packet from a received datagram.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketParseError> {
        serde_json::from_slice(bytes).map_err(PacketParseError::InvalidJson)
    }
}

impl Header {
    /// Milliseconds into the current minute at the given time, as sent in `send_time_ms`.
    pub fn ms_into_minute(time: &DateTime<Utc>) -> u32 {
        time.second() * 1000 + (time.nanosecond() / 1_000_000).min(999)
    }
}

impl Address {
    /// Returns true if a packet with this destination should be handled by the given robot.
    pub fn accepts(&self, robot_id: u16) -> bool {
        match self {
            Address::Broadcast => true,
            Address::Robot(id) => *id == robot_id,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn header() -> Header {
        Header {
            dest: Address::Broadcast,
            sender_id: 2,
            sender_team: 1,
            seq: 1,
            msg_seq_id: 7,
            last_id: 3,
            send_time_ms: 12_345,
        }
    }

    #[test]
    fn test_victim_packet_decodes() {
        let packet = Packet {
            header: header(),
            body: Body::Data(Payload::Victim(VictimReport {
                x_mm: 340,
                y_mm: 340,
                tag_id: "020058F5BD".into(),
            })),
        };

        let bytes = packet.to_bytes(1024).unwrap();

        assert_eq!(Packet::from_bytes(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_unknown_data_kind() {
        let json = r#"{
            "header": {
                "dest": "Broadcast",
                "sender_id": 4,
                "sender_team": 1,
                "seq": 1,
                "msg_seq_id": 0,
                "last_id": 1,
                "send_time_ms": 0
            },
            "body": {"type": "Data", "body": {"kind": "Thermal", "data": [1, 2, 3]}}
        }"#;

        let packet = Packet::from_bytes(json.as_bytes()).unwrap();

        assert_eq!(packet.body, Body::Data(Payload::Unknown));
    }

    #[test]
    fn test_too_large() {
        let packet = Packet {
            header: header(),
            body: Body::Data(Payload::Stream(StreamSample {
                channel: 0,
                values: vec![0.5; 256],
            })),
        };

        match packet.to_bytes(64) {
            Err(PacketEncodeError::TooLarge(_, 64)) => (),
            r => panic!("Expected TooLarge, got {:?}", r),
        }
    }

    #[test]
    fn test_address_accepts() {
        assert!(Address::Broadcast.accepts(3));
        assert!(Address::Robot(3).accepts(3));
        assert!(!Address::Robot(4).accepts(3));
    }

    #[test]
    fn test_ms_into_minute() {
        use chrono::TimeZone;

        let time = Utc.timestamp_opt(3_605, 250_000_000).unwrap();
        assert_eq!(Header::ms_into_minute(&time), 5_250);

        // Leap second
        let time = Utc.timestamp_opt(59, 1_500_000_000).unwrap();
        assert_eq!(Header::ms_into_minute(&time), 59_999);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Packet::from_bytes(b"\x00\x01not json").is_err());
    }
}
