pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod migrations;
pub mod models;
pub mod router;
pub mod scheduler;
pub mod store;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use router::{DeliveryTarget, NotificationRouter};
pub use store::{EventStore, NotificationStore};
pub use websocket::{ConnectionRegistry, HealthMonitor};
