//! # Communications
//!
//! The communication budget guard drains the outbound queues into a bounded number of packets each
//! time the communicate task runs, and hands received packets to the tasks that consume them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod task;

pub use task::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::Transport,
    proto::{Address, Body, CommandKind, Command, Header, Packet, Payload},
};
use log::{debug, info, trace, warn};
use serde::Serialize;
use thiserror::Error;

use crate::data_store::{DataStore, MissionInput};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Class of outbound traffic. Classes are sent in the order they are declared here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrafficClass {
    Robot,
    Victim,
    Pheromone,
    Stream,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommsError {
    #[error("The per-invocation packet cap must be at least 1")]
    ZeroPacketCap,

    #[error("The maximum packet size must be at least 1 byte")]
    ZeroPacketSize,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Limits the number of packets sent per invocation of the communicate task.
pub struct CommsGuard {
    robot_id: u16,

    team: u16,

    max_packets: u32,

    max_packet_size: usize,

    /// Identifies the current exchange, shared by all classes.
    msg_seq_id: u64,

    /// Packets sent in the current invocation, including ones the transport rejected.
    packets_sent: u32,
}

/// What happened during one exchange.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeReport {
    pub sent: u32,
    pub illegal: u32,
    pub send_failures: u32,
    pub received: u32,
    pub forwarded: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TrafficClass {
    pub const COUNT: usize = 4;

    pub const ALL: [TrafficClass; TrafficClass::COUNT] = [
        TrafficClass::Robot,
        TrafficClass::Victim,
        TrafficClass::Pheromone,
        TrafficClass::Stream,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl CommsGuard {
    pub fn new(
        robot_id: u16,
        team: u16,
        max_packets: u32,
        max_packet_size: usize,
    ) -> Result<Self, CommsError> {
        if max_packets == 0 {
            return Err(CommsError::ZeroPacketCap)
        }
        if max_packet_size == 0 {
            return Err(CommsError::ZeroPacketSize)
        }

        Ok(Self {
            robot_id,
            team,
            max_packets,
            max_packet_size,
            msg_seq_id: 0,
            packets_sent: 0,
        })
    }

    pub fn msg_seq_id(&self) -> u64 {
        self.msg_seq_id
    }

    /// Send what the budget allows from the outbound queues, then dispatch every pending received
    /// packet.
    pub fn exchange<T: Transport + ?Sized>(
        &mut self,
        ds: &mut DataStore,
        transport: &mut T,
    ) -> ExchangeReport {
        let mut report = ExchangeReport::default();

        self.send_all(ds, transport, &mut report);
        self.packets_sent = 0;

        self.receive_all(ds, transport, &mut report);

        self.msg_seq_id += 1;

        report
    }

    fn send_all<T: Transport + ?Sized>(
        &mut self,
        ds: &mut DataStore,
        transport: &mut T,
        report: &mut ExchangeReport,
    ) {
        let last_id = ds.outbound.total() as u32;
        let send_time_ms = Header::ms_into_minute(&ds.now_utc);

        for class in TrafficClass::ALL.iter() {
            ds.stats.record_offered(*class, ds.outbound.count(*class));

            while self.packets_sent < self.max_packets {
                let item = match ds.outbound.pop_front(*class) {
                    Some(i) => i,
                    None => break,
                };

                let packet = Packet {
                    header: Header {
                        dest: Address::Broadcast,
                        sender_id: self.robot_id,
                        sender_team: self.team,
                        seq: self.packets_sent + 1,
                        msg_seq_id: self.msg_seq_id,
                        last_id,
                        send_time_ms,
                    },
                    body: Body::Data(item.payload),
                };

                let bytes = match packet.to_bytes(self.max_packet_size) {
                    Ok(b) => b,
                    Err(e) => {
                        warn!("Dropping {:?} item: {}", class, e);
                        ds.stats.record_send_failure();
                        report.send_failures += 1;
                        continue;
                    }
                };

                self.packets_sent += 1;

                match transport.broadcast(&bytes) {
                    Ok(()) => {
                        ds.stats.record_sent(*class);
                        report.sent += 1;

                        if let Some(found_at) = item.found_at {
                            let latency = ds.now.checked_sub(found_at).unwrap_or_default();
                            info!(
                                "Victim notified {:.3} ms after being found",
                                latency.as_secs_f64() * 1e3
                            );
                            ds.stats.record_victim_latency(latency);
                        }
                    }
                    Err(e) => {
                        warn!("Transport rejected {:?} packet {}: {}", class, packet.header.seq, e);
                        ds.stats.record_send_failure();
                        report.send_failures += 1;
                    }
                }
            }

            if self.packets_sent >= self.max_packets {
                let dropped = ds.outbound.clear(*class);
                if dropped > 0 {
                    debug!(
                        "Packet budget of {} spent, dropping {} {:?} items",
                        self.max_packets, dropped, class
                    );
                    ds.stats.record_illegal(dropped);
                    report.illegal += dropped as u32;
                }
            }
        }
    }

    fn receive_all<T: Transport + ?Sized>(
        &mut self,
        ds: &mut DataStore,
        transport: &mut T,
        report: &mut ExchangeReport,
    ) {
        loop {
            let bytes = match transport.receive() {
                Ok(Some(b)) => b,
                Ok(None) => break,
                Err(e) => {
                    warn!("Could not receive from the transport: {}", e);
                    break;
                }
            };

            let packet = match Packet::from_bytes(&bytes) {
                Ok(p) => p,
                Err(e) => {
                    trace!("Dropping undecodable datagram: {}", e);
                    continue;
                }
            };

            if packet.header.sender_id == self.robot_id
                || packet.header.sender_team != self.team
                || !packet.header.dest.accepts(self.robot_id)
            {
                continue;
            }

            let forwarded = dispatch(packet, ds);

            ds.stats.record_received(forwarded);
            report.received += 1;
            if forwarded {
                report.forwarded += 1;
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Hand a received packet to the task that consumes it. Returns true if it was forwarded.
fn dispatch(packet: Packet, ds: &mut DataStore) -> bool {
    trace!(
        "Packet {}/{} from robot {}: {:?}",
        packet.header.seq,
        packet.header.last_id,
        packet.header.sender_id,
        packet.body
    );

    match packet.body {
        Body::Ack => false,
        Body::GoAhead => {
            ds.mission_inbox.push_back(MissionInput::Command(Command {
                kind: CommandKind::GoAhead,
            }));
            true
        }
        Body::Data(Payload::Victim(v)) => {
            ds.mission_inbox.push_back(MissionInput::Victim(v));
            true
        }
        Body::Data(Payload::Command(c)) => {
            ds.mission_inbox.push_back(MissionInput::Command(c));
            true
        }
        Body::Data(Payload::Pheromone(p)) => {
            ds.navigate_inbox.push_back(p);
            true
        }
        Body::Data(Payload::Robot(_)) => false,
        Body::Data(Payload::Stream(_)) | Body::Data(Payload::Unknown) => false,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
