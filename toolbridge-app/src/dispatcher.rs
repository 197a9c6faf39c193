use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use toolbridge_core::BridgeConfig;
use toolbridge_executor::{
    CommandExecutor, CommandPolicy, ExecutionRequest, ExecutionResult, ExecutorError,
    PolicyDecision, PolicyRequest, ToolEnvironment, TrustedCaller,
};
use toolbridge_services::{
    ScanOptions, ScannerBinary, ServiceError, ServiceHealthChecker, ServiceLauncher,
};
use toolbridge_tools::{known_tool_dirs, AvailabilityProbe, ToolResolver};
use tracing::{info, info_span, warn, Instrument};

use crate::error::DispatchError;
use crate::operations::{
    required, CheckToolArgs, ExecuteCommandArgs, Operation, RunSecurityToolArgs, ScanArgs,
    StartServicesArgs,
};
use crate::report;

/// Text result of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReply {
    pub text: String,
    pub is_error: bool,
}

impl OperationReply {
    fn ok(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    fn error(err: &DispatchError) -> Self {
        Self {
            text: err.to_string(),
            is_error: true,
        }
    }
}

/// Routes named operations to the resolver, executor and health checker.
///
/// Requests are handled one at a time; every failure becomes an error reply.
pub struct OperationDispatcher {
    config: Arc<BridgeConfig>,
    environment: ToolEnvironment,
    executor: Arc<CommandExecutor>,
    resolver: ToolResolver,
    checker: Arc<ServiceHealthChecker>,
    launcher: ServiceLauncher,
    scanner: ScannerBinary,
    policy: Arc<dyn CommandPolicy>,
}

impl OperationDispatcher {
    /// Dispatcher over the current process environment, trusting every caller command.
    pub fn new(config: BridgeConfig) -> Self {
        let environment = ToolEnvironment::from_process(&config);
        Self::with_environment(config, environment)
    }

    pub fn with_environment(config: BridgeConfig, environment: ToolEnvironment) -> Self {
        let executor = Arc::new(CommandExecutor::new());
        let checker = Arc::new(ServiceHealthChecker::new(&config));
        let launcher = ServiceLauncher::new(executor.clone(), checker.clone(), &config);

        Self {
            resolver: ToolResolver::from_config(&config),
            scanner: ScannerBinary::from_config(&config),
            config: Arc::new(config),
            environment,
            executor,
            checker,
            launcher,
            policy: Arc::new(TrustedCaller),
        }
    }

    /// Replaces the admission policy for caller-supplied command lines.
    pub fn with_policy(mut self, policy: Arc<dyn CommandPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub async fn dispatch(&self, operation: &str, arguments: Value) -> OperationReply {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("operation", name = %operation, request_id = %request_id);

        async {
            info!("Dispatching operation: {}", operation);

            let outcome = match operation.parse::<Operation>() {
                Ok(op) => self.run(op, arguments).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(text) => OperationReply::ok(text),
                Err(e) => {
                    warn!("Operation failed: {}", e);
                    OperationReply::error(&e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, operation: Operation, arguments: Value) -> Result<String, DispatchError> {
        match operation {
            Operation::ExecuteCommand => {
                self.execute_command(operation.parse_args(arguments)?).await
            }
            Operation::RunSecurityTool => {
                self.run_security_tool(operation.parse_args(arguments)?).await
            }
            Operation::CheckToolAvailable => {
                self.check_tool_available(operation.parse_args(arguments)?)
            }
            Operation::Web3ScannerScan => self.scan(operation.parse_args(arguments)?).await,
            Operation::StartWeb3seServices => {
                self.start_services(operation.parse_args(arguments)?).await
            }
            Operation::CheckWeb3seStatus => Ok(self.checker.check().await.to_string()),
        }
    }

    async fn execute_command(&self, args: ExecuteCommandArgs) -> Result<String, DispatchError> {
        let operation = Operation::ExecuteCommand;
        let command = required(operation, "command", args.command)?;
        let timeout = self.timeout(operation, args.timeout)?;

        self.admit(operation, &command, &args.working_directory).await?;

        let result = self
            .execute(&command, &args.working_directory, timeout)
            .await
            .map_err(|e| executor_failure(e, "executing command", &command, Vec::new()))?;

        if result.timed_out {
            return Err(DispatchError::Timeout {
                subject: "Command",
                seconds: timeout.as_secs(),
                details: vec![("Command", command)],
            });
        }

        Ok(report::command_report(&result))
    }

    async fn run_security_tool(&self, args: RunSecurityToolArgs) -> Result<String, DispatchError> {
        let operation = Operation::RunSecurityTool;
        let tool = required(operation, "tool name", args.tool_name)?.trim().to_lowercase();
        let tool_args = args.arguments.ok_or(DispatchError::InputMissing {
            operation,
            field: "arguments",
        })?;
        let timeout = self.timeout(operation, args.timeout)?;

        let resolved = self.resolver.resolve(&tool).map_err(|e| {
            info!("Resolution failed: {}", e);
            DispatchError::ToolNotFound { tool: tool.clone() }
        })?;

        let full_command = format!("{} {}", resolved.command, tool_args).trim().to_string();
        let cwd = if resolved.working_directory.is_dir() {
            resolved.working_directory.to_string_lossy().into_owned()
        } else {
            args.working_directory.clone()
        };

        self.admit(operation, &full_command, &cwd).await?;

        let details = || vec![("Tool", tool.clone()), ("Arguments", tool_args.clone())];
        let result = self
            .execute(&full_command, &cwd, timeout)
            .await
            .map_err(|e| executor_failure(e, "running security tool", &full_command, details()))?;

        if result.timed_out {
            return Err(DispatchError::Timeout {
                subject: "Tool execution",
                seconds: timeout.as_secs(),
                details: vec![("Tool", tool.clone()), ("Command", full_command)],
            });
        }

        Ok(report::tool_report(&tool, &resolved, &result))
    }

    fn check_tool_available(&self, args: CheckToolArgs) -> Result<String, DispatchError> {
        let tool = required(Operation::CheckToolAvailable, "tool name", args.tool_name)?;
        let tool = tool.trim();

        let probe = AvailabilityProbe::new(
            self.resolver.clone(),
            self.config.scanner_dir.clone(),
            self.environment.path().map(OsString::from),
        );
        let availability = probe.check(tool);
        info!("Availability of {}: {:?}", tool, availability);

        Ok(report::availability_report(
            tool,
            &availability,
            &self.config.tools_root,
            &known_tool_dirs(),
        ))
    }

    async fn scan(&self, args: ScanArgs) -> Result<String, DispatchError> {
        let operation = Operation::Web3ScannerScan;
        let repository = required(operation, "repository path", args.repository_path)?;

        if !self.scanner.is_present() {
            return Err(DispatchError::ScannerMissing {
                path: self.scanner.path().to_path_buf(),
            });
        }

        let options = ScanOptions {
            repository: repository.clone(),
            with_intent: args.with_intent,
            with_embed: args.with_embed,
            output_file: args.output_file.filter(|file| !file.trim().is_empty()),
        };
        let command = self.scanner.scan_command(&options);
        let cwd = self.scanner.dir().to_string_lossy().into_owned();
        let timeout = self.config.scan_timeout;

        self.admit(operation, &command, &cwd).await?;

        let result = self
            .execute(&command, &cwd, timeout)
            .await
            .map_err(|e| {
                executor_failure(
                    e,
                    "running web3-scanner",
                    &command,
                    vec![("Repository", repository.clone())],
                )
            })?;

        if result.timed_out {
            return Err(DispatchError::Timeout {
                subject: "Scan",
                seconds: timeout.as_secs(),
                details: vec![("Command", command)],
            });
        }

        let saved_to = options
            .output_file
            .as_deref()
            .map(|file| output_location(self.scanner.dir(), file))
            .filter(|path| path.exists());

        Ok(report::scan_report(&repository, &result, saved_to.as_deref()))
    }

    async fn start_services(&self, args: StartServicesArgs) -> Result<String, DispatchError> {
        if !self.scanner.is_present() {
            return Err(DispatchError::ScannerMissing {
                path: self.scanner.path().to_path_buf(),
            });
        }

        if !args.background {
            return Ok(self.scanner.start_instructions(&self.config.endpoints));
        }

        match self.launcher.start_background(self.environment.clone()).await {
            Ok(status) => Ok(status.to_string()),
            Err(ServiceError::ScannerMissing(path)) => Err(DispatchError::ScannerMissing { path }),
            Err(ServiceError::LaunchTimedOut { command, timeout }) => Err(DispatchError::Timeout {
                subject: "Service launch",
                seconds: timeout.as_secs(),
                details: vec![("Command", command)],
            }),
            Err(ServiceError::Launch(e)) => Err(DispatchError::SpawnOrIo {
                action: "starting services",
                message: e.to_string(),
                details: vec![("Command", self.scanner.background_start_command())],
            }),
        }
    }

    async fn admit(
        &self,
        operation: Operation,
        command: &str,
        working_directory: &str,
    ) -> Result<(), DispatchError> {
        let request = PolicyRequest {
            operation: operation.name().to_string(),
            command_line: command.to_string(),
            working_directory: working_directory.to_string(),
        };

        match self.policy.check(&request).await {
            PolicyDecision::Allow => Ok(()),
            PolicyDecision::Deny(reason) => {
                warn!("Policy denied command: {}", reason);
                Err(DispatchError::PolicyDenied {
                    reason,
                    command: command.to_string(),
                })
            }
        }
    }

    async fn execute(
        &self,
        command: &str,
        working_directory: &str,
        timeout: Duration,
    ) -> Result<ExecutionResult, ExecutorError> {
        let request = ExecutionRequest::new(
            command,
            working_directory,
            self.environment.clone(),
            timeout,
        );
        self.executor.execute(&request).await
    }

    fn timeout(
        &self,
        operation: Operation,
        seconds: Option<u64>,
    ) -> Result<Duration, DispatchError> {
        match seconds {
            None => Ok(self.config.command_timeout),
            Some(0) => Err(DispatchError::InvalidArgument {
                operation,
                message: "timeout must be greater than zero".to_string(),
            }),
            Some(seconds) => Ok(Duration::from_secs(seconds)),
        }
    }
}

fn executor_failure(
    err: ExecutorError,
    action: &'static str,
    command: &str,
    mut details: Vec<(&'static str, String)>,
) -> DispatchError {
    match err {
        ExecutorError::DirectoryNotFound(path) => DispatchError::DirectoryNotFound {
            path,
            command: command.to_string(),
        },
        other => {
            details.push(("Command", command.to_string()));
            DispatchError::SpawnOrIo {
                action,
                message: other.to_string(),
                details,
            }
        }
    }
}

/// Relative output files are written by the scanner from inside its own directory.
fn output_location(scanner_dir: &Path, file: &str) -> PathBuf {
    let path = toolbridge_core::expand_home(file);
    if path.is_absolute() {
        path
    } else {
        scanner_dir.join(path)
    }
}
