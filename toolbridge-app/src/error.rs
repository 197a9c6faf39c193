use std::path::PathBuf;
use thiserror::Error;
use toolbridge_tools::supported_tool_names;

use crate::operations::Operation;

/// Every way an operation can fail. `Display` is the report sent back to the caller, and always
/// names the command, tool or parameters involved so a human can re-run it.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{}", missing_input(.operation, .field))]
    InputMissing {
        operation: Operation,
        field: &'static str,
    },

    #[error("Error: Invalid arguments for {}: {message}", .operation.name())]
    InvalidArgument { operation: Operation, message: String },

    #[error("Error: Working directory does not exist: {}\nCommand: {command}", .path.display())]
    DirectoryNotFound { path: PathBuf, command: String },

    #[error(
        "Error: Tool '{tool}' not found.\nSupported tools: {}\nUse 'check_tool_available' to find how to run a specific tool.",
        supported_tool_names().join(", ")
    )]
    ToolNotFound { tool: String },

    #[error("Error: web3-scanner not found at {}", .path.display())]
    ScannerMissing { path: PathBuf },

    #[error("Error: {subject} timed out after {seconds} seconds{}", detail_lines(.details))]
    Timeout {
        subject: &'static str,
        seconds: u64,
        details: Vec<(&'static str, String)>,
    },

    #[error("Error {action}: {message}{}", detail_lines(.details))]
    SpawnOrIo {
        action: &'static str,
        message: String,
        details: Vec<(&'static str, String)>,
    },

    #[error("Error: Command rejected by policy: {reason}\nCommand: {command}")]
    PolicyDenied { reason: String, command: String },

    #[error("{}", unknown_operation(.0))]
    UnknownOperation(String),
}

fn missing_input(operation: &Operation, field: &str) -> String {
    let mut message = format!("Error: No {field} provided for {}", operation.name());
    if *operation == Operation::RunSecurityTool && field == "tool name" {
        message.push_str(&format!(
            ". Supported tools: {}",
            supported_tool_names().join(", ")
        ));
    }
    message
}

fn detail_lines(details: &[(&'static str, String)]) -> String {
    details
        .iter()
        .map(|(label, value)| format!("\n{label}: {value}"))
        .collect()
}

fn unknown_operation(name: &str) -> String {
    let known: Vec<&str> = Operation::ALL.iter().map(Operation::name).collect();
    format!(
        "Unknown operation: {name}\nSupported operations: {}",
        known.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_report_names_command() {
        let err = DispatchError::Timeout {
            subject: "Tool execution",
            seconds: 1,
            details: vec![
                ("Tool", "slither".to_string()),
                ("Command", "python3 slither/slither.py .".to_string()),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Error: Tool execution timed out after 1 seconds\nTool: slither\nCommand: python3 slither/slither.py ."
        );
    }

    #[test]
    fn test_tool_not_found_lists_supported_tools() {
        let err = DispatchError::ToolNotFound {
            tool: "forge".into(),
        };
        let text = err.to_string();
        assert!(text.starts_with("Error: Tool 'forge' not found."));
        assert!(
            text.contains("slither, mythril, echidna, securify2, medusa, fuzz-utils, solc-select")
        );
    }

    #[test]
    fn test_missing_tool_name_lists_supported_tools() {
        let err = DispatchError::InputMissing {
            operation: Operation::RunSecurityTool,
            field: "tool name",
        };
        assert!(err.to_string().contains("Supported tools: slither"));

        let err = DispatchError::InputMissing {
            operation: Operation::ExecuteCommand,
            field: "command",
        };
        assert_eq!(
            err.to_string(),
            "Error: No command provided for execute_command"
        );
    }

    #[test]
    fn test_unknown_operation_lists_operations() {
        let text = DispatchError::UnknownOperation("rm_rf".into()).to_string();
        assert!(text.starts_with("Unknown operation: rm_rf"));
        assert!(text.contains("check_web3se_status"));
    }
}
