//! # Network Module
//!
//! Robots of the fleet share one channel. Each robot publishes its packets on
//! its own ZMQ PUB socket and subscribes to the publishers of every other
//! robot (and of the fleet coordinator), which together behave as a
//! broadcast medium.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod transport;

pub use transport::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use serde::Deserialize;
use std::{sync::{Arc, atomic::{AtomicBool, AtomicUsize}, atomic::Ordering}, thread};
use zmq::{Socket, Context, SocketType, SocketEvent};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| MonitoredSocketError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Number of monitors that are registered. Used to provide unique IDs for each mointor endpoint.
static NUM_MONITORS: AtomicUsize = AtomicUsize::new(0);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network endpoints used by a robot.
#[derive(Debug, Clone, Deserialize)]
pub struct NetParams {
    /// Endpoint this robot publishes its packets on, e.g. `"tcp://*:5100"`.
    pub pub_endpoint: String,

    /// Publish endpoints of the other robots of the fleet.
    pub peer_endpoints: Vec<String>,

    /// Publish endpoint of the fleet coordinator issuing go-ahead packets, if any.
    #[serde(default)]
    pub coordinator_endpoint: Option<String>,
}

/// A zmq socket which is monitored providing additional information.
///
/// A background thread watches the socket's monitor endpoint and tracks whether the socket
/// currently has a peer connected.
pub struct MonitoredSocket {
    socket: Socket,

    join_handle: Option<thread::JoinHandle<()>>,

    shutdown: Arc<AtomicBool>,
    
    connected: Arc<AtomicBool>
}

/// Options which can be set on a monitored socket.
///
/// Most options here correspond to those found in the 
/// [`zmq_setsockopt`](http://api.zeromq.org/4-2:zmq-setsockopt) documentation.
pub struct SocketOptions {
    /// Indicates if the socket should bind itself to the endpoint. Publishers should have this
    /// value set as `true`, subscribers `false`.
    pub bind: bool,

    /// `ZMQ_LINGER`: Set linger period for socket shutdown
    pub linger: i32,

    /// `ZMQ_RECONNECT_IVL`: Set reconnection interval
    pub reconnect_ivl: i32,

    /// `ZMQ_SNDHWM`: High water mark for outbound messages
    pub send_hwm: i32,

    /// `ZMQ_RCVHWM`: High water mark for inbound messages
    pub recv_hwm: i32,

    /// `ZMQ_SNDTIMEO`: Maximum time before a send operation returns with `EAGAIN`
    pub send_timeout: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MonitoredSocketError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Error enabling monitoring for the socket: {0}")]
    MonitoringEnableError(zmq::Error),

    #[error("Could not connect the socket to {0}: {1}")]
    CouldNotConnect(String, zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MonitoredSocket {
    /// Create a new monitored socket.
    ///
    /// The socket is bound to or connected to every endpoint in `endpoints`, depending on
    /// `socket_options.bind`. This function never blocks waiting for a peer.
    pub fn new(
        ctx: &Context, 
        socket_type: SocketType,
        socket_options: SocketOptions,
        endpoints: &[String]
    ) -> Result<Self, MonitoredSocketError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let connected = Arc::new(AtomicBool::new(false));

        let socket = ctx.socket(socket_type)
            .map_err(MonitoredSocketError::CreateSocketError)?;

        // Enable, create, and connect monitor
        let monitor_endpoint = format!(
            "inproc://monitor_{}", 
            NUM_MONITORS.fetch_add(1, Ordering::Relaxed)
        );
        socket.monitor(&monitor_endpoint, SocketEvent::ALL as i32)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;
        let monitor = ctx.socket(zmq::PAIR)
            .map_err(MonitoredSocketError::CreateSocketError)?;
        monitor.connect(&monitor_endpoint)
            .map_err(|e| MonitoredSocketError::CouldNotConnect(monitor_endpoint.clone(), e))?;

        socket_options.set(&socket)?;

        for endpoint in endpoints {
            match socket_options.bind {
                false => socket.connect(endpoint),
                true => socket.bind(endpoint)
            }.map_err(|e| MonitoredSocketError::CouldNotConnect(endpoint.clone(), e))?;
        }

        let shutdown_clone = shutdown.clone();
        let connected_clone = connected.clone();
        let join_handle = thread::spawn(move || monitor_socket(
            monitor, 
            monitor_endpoint,
            shutdown_clone, 
            connected_clone
        ));

        Ok(Self {
            socket,
            join_handle: Some(join_handle),
            shutdown,
            connected
        })
    }

    /// Return if the socket has at least one peer connected.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl Drop for MonitoredSocket {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        
        // The monitor thread is blocked on its next event, which will not come once the socket
        // is gone, so it is detached rather than joined.
        self.join_handle.take();
    }
}

impl std::ops::Deref for MonitoredSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl SocketOptions {
    /// Set these options on the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), MonitoredSocketError> {
        set_sockopts!(
            socket,
            (set_linger, self.linger),
            (set_reconnect_ivl, self.reconnect_ivl),
            (set_sndhwm, self.send_hwm),
            (set_rcvhwm, self.recv_hwm),
            (set_sndtimeo, self.send_timeout)
        );

        Ok(())
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // Defaults for sockopts taken from http://api.zeromq.org/4-2:zmq-setsockopt
        Self {
            bind: false,
            linger: 30_000,
            reconnect_ivl: 100,
            send_hwm: 1000,
            recv_hwm: 1000,
            send_timeout: -1,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read an event from a socket.
fn read_event(socket: &Socket) -> Result<SocketEvent, zmq::Error> {
    let msg = socket.recv_msg(0)?;

    if msg.len() < 2 {
        return Err(zmq::Error::EINVAL)
    }
    let event = u16::from_ne_bytes([msg[0], msg[1]]);

    // Second frame is the address, ignore it
    if socket.get_rcvmore()? {
        let _ = socket.recv_msg(0)?;
    }

    Ok(SocketEvent::from_raw(event))
}

fn monitor_socket(
    monitor: Socket,
    monitor_endpoint: String,
    shutdown: Arc<AtomicBool>,
    connected: Arc<AtomicBool>
) {
    while !shutdown.load(Ordering::Relaxed) {
        let event = match read_event(&monitor) {
            Ok(e) => e,
            Err(e) => {
                warn!("Error reading event from monitor {}: {}", monitor_endpoint, e);
                break
            }
        };

        match event {
            SocketEvent::CONNECTED | SocketEvent::ACCEPTED => 
                connected.store(true, Ordering::Relaxed),
            SocketEvent::DISCONNECTED => connected.store(false, Ordering::Relaxed),
            _ => ()
        }
    }
}
