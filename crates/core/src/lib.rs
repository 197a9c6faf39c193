pub mod config;
pub mod paths;

pub use config::{BridgeConfig, ConfigError, ServiceEndpoints};
pub use paths::{expand_home, home_dir};
