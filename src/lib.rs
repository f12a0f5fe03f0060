pub mod driver;
pub mod monitor;
pub mod server;

// Re-export common items
pub use monitor::{MonitorConfig, MonitorEngine, SnapshotStore, StatusSnapshot};
pub use server::{StatusServer, StatusServerConfig};
