pub mod command_executor;
pub mod environment;
pub mod policy;

pub use command_executor::{
    resolve_working_directory, CommandExecutor, ExecutionRequest, ExecutionResult, ExecutorError,
    TIMEOUT_EXIT_CODE,
};
pub use environment::{prepend_path, ToolEnvironment};
pub use policy::{CommandPolicy, PolicyDecision, PolicyRequest, TrustedCaller};
