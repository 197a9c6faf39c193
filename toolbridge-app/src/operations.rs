use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;

use crate::error::DispatchError;

/// The remotely invocable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ExecuteCommand,
    RunSecurityTool,
    CheckToolAvailable,
    Web3ScannerScan,
    StartWeb3seServices,
    CheckWeb3seStatus,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::ExecuteCommand,
        Operation::RunSecurityTool,
        Operation::CheckToolAvailable,
        Operation::Web3ScannerScan,
        Operation::StartWeb3seServices,
        Operation::CheckWeb3seStatus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::ExecuteCommand => "execute_command",
            Operation::RunSecurityTool => "run_security_tool",
            Operation::CheckToolAvailable => "check_tool_available",
            Operation::Web3ScannerScan => "web3_scanner_scan",
            Operation::StartWeb3seServices => "start_web3se_services",
            Operation::CheckWeb3seStatus => "check_web3se_status",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Operation::ExecuteCommand => {
                "Execute a shell command and return its output. Shell operators (pipes, redirects, &&) \
                 are honoured. Tools installed under ~/tools are on PATH."
            }
            Operation::RunSecurityTool => {
                "Run a security tool from ~/tools with automatic discovery. Supports: slither, mythril, \
                 echidna, securify2, medusa, fuzz-utils, solc-select."
            }
            Operation::CheckToolAvailable => "Check if a tool is available in PATH or ~/tools",
            Operation::Web3ScannerScan => {
                "Scan a Web3 repository using the web3se-lab scanner. Generates embeddings and detects \
                 malicious intents. Requires web3se-lab services to be running."
            }
            Operation::StartWeb3seServices => {
                "Start web3se-lab services (SmartBERT API and web3-sekit API). Returns status."
            }
            Operation::CheckWeb3seStatus => {
                "Check if web3se-lab services (SmartBERT and web3-sekit) are running"
            }
        }
    }

    pub fn schema(&self) -> Value {
        match self {
            Operation::ExecuteCommand => json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "The shell command to execute"},
                    "working_directory": {
                        "type": "string",
                        "description": "Working directory for the command",
                        "default": "."
                    },
                    "timeout": {"type": "integer", "description": "Timeout in seconds", "default": 300}
                },
                "required": ["command"]
            }),
            Operation::RunSecurityTool => json!({
                "type": "object",
                "properties": {
                    "tool_name": {
                        "type": "string",
                        "description": "slither, mythril, echidna, securify2, medusa, fuzz-utils or solc-select"
                    },
                    "arguments": {
                        "type": "string",
                        "description": "Arguments passed to the tool (e.g. '.', 'analyze Contract.sol')"
                    },
                    "working_directory": {"type": "string", "default": "."},
                    "timeout": {"type": "integer", "default": 300}
                },
                "required": ["tool_name", "arguments"]
            }),
            Operation::CheckToolAvailable => json!({
                "type": "object",
                "properties": {
                    "tool_name": {"type": "string", "description": "Name of the tool to check"}
                },
                "required": ["tool_name"]
            }),
            Operation::Web3ScannerScan => json!({
                "type": "object",
                "properties": {
                    "repository_path": {
                        "type": "string",
                        "description": "Path to repository or GitHub URL"
                    },
                    "with_intent": {"type": "boolean", "default": true},
                    "with_embed": {"type": "boolean", "default": true},
                    "output_file": {"type": "string", "description": "Output JSON file path", "default": ""}
                },
                "required": ["repository_path"]
            }),
            Operation::StartWeb3seServices => json!({
                "type": "object",
                "properties": {
                    "background": {"type": "boolean", "description": "Run in background", "default": false}
                }
            }),
            Operation::CheckWeb3seStatus => json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    /// Every operation in function-calling form.
    pub fn catalog() -> Vec<Value> {
        Self::ALL
            .iter()
            .map(|operation| {
                json!({
                    "type": "function",
                    "function": {
                        "name": operation.name(),
                        "description": operation.description(),
                        "parameters": operation.schema()
                    }
                })
            })
            .collect()
    }

    /// Deserializes the argument bag; `null` counts as an empty object.
    pub(crate) fn parse_args<T: DeserializeOwned>(
        &self,
        arguments: Value,
    ) -> Result<T, DispatchError> {
        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };

        serde_json::from_value(arguments).map_err(|e| DispatchError::InvalidArgument {
            operation: *self,
            message: e.to_string(),
        })
    }
}

impl FromStr for Operation {
    type Err = DispatchError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|operation| operation.name() == name.trim())
            .ok_or_else(|| DispatchError::UnknownOperation(name.to_string()))
    }
}

fn default_working_directory() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExecuteCommandArgs {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default = "default_working_directory")]
    pub working_directory: String,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunSecurityToolArgs {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default = "default_working_directory")]
    pub working_directory: String,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CheckToolArgs {
    #[serde(default)]
    pub tool_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScanArgs {
    #[serde(default)]
    pub repository_path: Option<String>,
    #[serde(default = "default_true")]
    pub with_intent: bool,
    #[serde(default = "default_true")]
    pub with_embed: bool,
    #[serde(default)]
    pub output_file: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartServicesArgs {
    #[serde(default)]
    pub background: bool,
}

/// A required string argument: absent, `null` and blank are all "missing".
pub(crate) fn required(
    operation: Operation,
    field: &'static str,
    value: Option<String>,
) -> Result<String, DispatchError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(DispatchError::InputMissing { operation, field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for operation in Operation::ALL {
            assert_eq!(operation.name().parse::<Operation>().unwrap(), operation);
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(matches!(
            "delete_everything".parse::<Operation>(),
            Err(DispatchError::UnknownOperation(_))
        ));
    }

    #[test]
    fn test_catalog_shape() {
        let catalog = Operation::catalog();
        assert_eq!(catalog.len(), 6);
        let scan = catalog
            .iter()
            .find(|entry| entry["function"]["name"] == "web3_scanner_scan")
            .unwrap();
        assert_eq!(scan["function"]["parameters"]["required"], json!(["repository_path"]));
    }

    #[test]
    fn test_execute_defaults() {
        let args: ExecuteCommandArgs = Operation::ExecuteCommand
            .parse_args(json!({"command": "ls"}))
            .unwrap();
        assert_eq!(args.working_directory, ".");
        assert_eq!(args.timeout, None);
    }

    #[test]
    fn test_scan_defaults() {
        let args: ScanArgs = Operation::Web3ScannerScan
            .parse_args(json!({"repository_path": "."}))
            .unwrap();
        assert!(args.with_intent);
        assert!(args.with_embed);
        assert_eq!(args.output_file, None);
    }

    #[test]
    fn test_null_arguments_are_empty() {
        let args: StartServicesArgs = Operation::StartWeb3seServices
            .parse_args(Value::Null)
            .unwrap();
        assert!(!args.background);
    }

    #[test]
    fn test_wrong_type_is_invalid_argument() {
        let result: Result<ExecuteCommandArgs, _> =
            Operation::ExecuteCommand.parse_args(json!({"command": "ls", "timeout": "soon"}));
        assert!(matches!(result, Err(DispatchError::InvalidArgument { .. })));
    }

    #[test]
    fn test_blank_required_is_missing() {
        let result = required(Operation::ExecuteCommand, "command", Some("   ".into()));
        assert!(matches!(result, Err(DispatchError::InputMissing { .. })));
    }
}
