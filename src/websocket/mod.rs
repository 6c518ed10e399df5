//! Real-time notification channel.
//!
//! Architecture:
//! 1. `registry`: role-partitioned map of live, authenticated connections
//! 2. `session`: per-channel actor handling the auth handshake and liveness
//! 3. `frames`: the JSON wire protocol
//! 4. `health`: periodic sweep that evicts idle connections

pub mod frames;
pub mod health;
pub mod registry;
pub mod session;

pub use frames::{ClientFrame, EventFrame, ServerFrame};
pub use health::HealthMonitor;
pub use registry::{ConnectionRegistry, Outbound, PushSender, RegistryStats};
pub use session::ws_entry;
