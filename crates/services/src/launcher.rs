use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use toolbridge_core::BridgeConfig;
use toolbridge_executor::{CommandExecutor, ExecutionRequest, ExecutorError, ToolEnvironment};
use tracing::{info, warn};

use crate::health::{ServiceHealthChecker, StatusReport};
use crate::scanner::ScannerBinary;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("web3-scanner not found at {}", .0.display())]
    ScannerMissing(PathBuf),

    #[error("Failed to launch services: {0}")]
    Launch(#[from] ExecutorError),

    #[error("Service launch timed out after {}s\nCommand: {command}", .timeout.as_secs())]
    LaunchTimedOut { command: String, timeout: Duration },
}

/// Starts the auxiliary services detached, then reports their status.
pub struct ServiceLauncher {
    executor: Arc<CommandExecutor>,
    checker: Arc<ServiceHealthChecker>,
    scanner: ScannerBinary,
    launch_timeout: Duration,
    grace: Duration,
}

impl ServiceLauncher {
    pub fn new(
        executor: Arc<CommandExecutor>,
        checker: Arc<ServiceHealthChecker>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            executor,
            checker,
            scanner: ScannerBinary::from_config(config),
            launch_timeout: config.launch_timeout,
            grace: config.start_grace,
        }
    }

    pub async fn start_background(
        &self,
        environment: ToolEnvironment,
    ) -> Result<StatusReport, ServiceError> {
        if !self.scanner.is_present() {
            return Err(ServiceError::ScannerMissing(self.scanner.path().to_path_buf()));
        }

        let command = self.scanner.background_start_command();
        let request = ExecutionRequest::new(
            command.clone(),
            self.scanner.dir().to_string_lossy(),
            environment,
            self.launch_timeout,
        );

        let result = self.executor.execute(&request).await?;
        if result.timed_out {
            return Err(ServiceError::LaunchTimedOut {
                command,
                timeout: self.launch_timeout,
            });
        }
        if !result.success() {
            warn!(
                "Service launch exited with code {}: {}",
                result.exit_code,
                result.stderr.trim()
            );
        }

        info!(
            "Services launched in background, waiting {}s before status check",
            self.grace.as_secs()
        );
        tokio::time::sleep(self.grace).await;

        Ok(self.checker.check().await)
    }
}
