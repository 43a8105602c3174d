//! # openclaw-bridge
//!
//! WebSocket remote-command bridge between an OpenClaw controller and a
//! tabletop host application.
//!
//! The bridge keeps one outbound WebSocket connection to the controller,
//! announces itself with an `identify` handshake, and answers JSON
//! commands that create NPCs, journal entries and scenes in the host. All
//! host access goes through the [`host::Host`] trait, so the bridge is a
//! coordination layer only.
//!
//! ## Architecture
//!
//! ```text
//! Controller (WebSocket)
//!     │
//!     ├── Connector / Link (transport/)
//!     ├── ConnectionManager (ws/connection)
//!     │
//!     ├── Dispatcher (ws/dispatcher)
//!     │
//!     ├── entity_factory, batch_coordinator (service/)
//!     │
//!     └── Host (host/)
//! ```

pub mod bridge;
pub mod config;
pub mod domain;
pub mod error;
pub mod host;
pub mod service;
pub mod transport;
pub mod ws;
