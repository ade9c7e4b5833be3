//! Health-check engine: probes a list of services over TCP, HTTP or a
//! game-server status protocol and keeps the last observation of each in a
//! JSON snapshot on disk.
//!
//! ```text
//! targets -> pool -> router -> checker -> CheckResult
//!                                            |
//!                       previous snapshot -> merge -> atomic write
//! ```

pub mod api;
pub mod checks;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod pool;
pub mod router;
pub mod store;
pub mod target;
pub mod wire;

pub use config::EngineConfig;
pub use engine::{Engine, TickReport};
pub use error::TickError;
