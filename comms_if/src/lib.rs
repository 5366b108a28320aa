//! # Communications interface crate.
//!
//! Provides the inter-robot communications interfaces for the fleet: the
//! packet definitions exchanged between robots and the transport they are
//! exchanged over.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Packet definitions and their wire encoding
pub mod proto;

/// Network module
pub mod net;
