//! # Transport
//!
//! The transport moves raw datagrams between robots. It does not look inside them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A shared broadcast channel.
pub trait Transport {
    /// Broadcast one datagram to every robot listening on the channel.
    fn broadcast(&mut self, datagram: &[u8]) -> Result<(), TransportError>;

    /// Receive the next pending datagram without blocking.
    ///
    /// Returns `Ok(None)` when nothing is pending.
    fn receive(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Broadcast channel built from one ZMQ publisher and one subscriber connected to every peer.
pub struct ZmqTransport {
    publisher: MonitoredSocket,

    subscriber: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to peers: {0}")]
    SubscribeError(zmq::Error),

    #[error("Could not broadcast the datagram: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a datagram: {0}")]
    RecvError(zmq::Error),

    #[error("The channel is unavailable: {0}")]
    Unavailable(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ZmqTransport {
    /// Create the transport, binding the publisher and connecting the subscriber.
    ///
    /// This function will not block until any peer connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, TransportError> {
        // Messages are dropped rather than queued when nobody is listening, a stale pose is of
        // no use to anyone.
        let publisher = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            SocketOptions {
                bind: true,
                linger: 0,
                send_hwm: 64,
                send_timeout: 0,
                ..Default::default()
            },
            &[params.pub_endpoint.clone()]
        ).map_err(TransportError::SocketError)?;

        let mut sub_endpoints = params.peer_endpoints.clone();
        if let Some(ref c) = params.coordinator_endpoint {
            sub_endpoints.push(c.clone());
        }

        let subscriber = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            SocketOptions {
                bind: false,
                linger: 0,
                recv_hwm: 256,
                ..Default::default()
            },
            &sub_endpoints
        ).map_err(TransportError::SocketError)?;

        subscriber.set_subscribe(b"")
            .map_err(TransportError::SubscribeError)?;

        Ok(Self {
            publisher,
            subscriber
        })
    }

    /// True if at least one peer is connected to us.
    pub fn has_peers(&self) -> bool {
        self.subscriber.connected() || self.publisher.connected()
    }
}

impl Transport for ZmqTransport {
    fn broadcast(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        self.publisher.send(datagram, zmq::DONTWAIT)
            .map_err(TransportError::SendError)
    }

    fn receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.subscriber.recv_bytes(zmq::DONTWAIT) {
            Ok(b) => Ok(Some(b)),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(TransportError::RecvError(e))
        }
    }
}
