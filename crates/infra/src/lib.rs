//! Infrastructure layer: configuration, storage, and the Firebase replica.

pub mod config;
pub mod replica;
pub mod store;

pub use config::{AppConfig, ConfigError, DatabaseConfig, FirebaseConfig};
