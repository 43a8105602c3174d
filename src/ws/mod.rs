//! Controller link: connection lifecycle, wire messages and command routing.
//!
//! The [`connection::ConnectionManager`] owns the socket and forwards every
//! inbound text frame to the [`dispatcher::Dispatcher`], which decodes it,
//! runs the command against the host and sends the reply back through the
//! manager.

pub mod connection;
pub mod dispatcher;
pub mod messages;
pub mod reconnect;
