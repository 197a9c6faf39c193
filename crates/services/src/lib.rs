//! Auxiliary web3se-lab services: liveness probes, the scanner binary and its launcher.

pub mod health;
pub mod launcher;
pub mod scanner;

pub use health::{ScannerPresence, ServiceHealthChecker, ServiceStatus, StatusReport};
pub use launcher::{ServiceError, ServiceLauncher};
pub use scanner::{ScanOptions, ScannerBinary};
