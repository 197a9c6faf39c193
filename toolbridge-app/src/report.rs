//! Text reports returned to the orchestrator.

use std::fmt::Write;
use std::path::Path;
use toolbridge_executor::ExecutionResult;
use toolbridge_tools::{Availability, ResolvedInvocation};

const SEPARATOR_WIDTH: usize = 50;

pub const UNVERIFIED_NOTE: &str =
    "Note: launch command not verified on disk; the tool may need a different invocation.";

pub fn command_report(result: &ExecutionResult) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Command: {}", result.command_line);
    let _ = writeln!(text, "Working Directory: {}", result.working_directory.display());
    let _ = writeln!(text, "Exit Code: {}", result.exit_code);
    push_streams(&mut text, result);
    text
}

pub fn tool_report(tool: &str, resolved: &ResolvedInvocation, result: &ExecutionResult) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Security Tool Execution: {tool}");
    let _ = writeln!(text, "Command: {}", result.command_line);
    let _ = writeln!(text, "Working Directory: {}", result.working_directory.display());
    let _ = writeln!(text, "Exit Code: {}", result.exit_code);
    if !resolved.is_verified() {
        let _ = writeln!(text, "{UNVERIFIED_NOTE}");
    }
    push_streams(&mut text, result);
    text
}

pub fn scan_report(repository: &str, result: &ExecutionResult, saved_to: Option<&Path>) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Web3 Scanner Results:");
    let _ = writeln!(text, "Repository: {repository}");
    let _ = writeln!(text, "Exit Code: {}", result.exit_code);
    push_streams(&mut text, result);
    if let Some(path) = saved_to {
        let _ = writeln!(text, "\n✅ Results saved to: {}", path.display());
    }
    text
}

pub fn availability_report(
    tool: &str,
    availability: &Availability,
    tools_root: &Path,
    known_dirs: &[&str],
) -> String {
    match availability {
        Availability::OnPath(path) => {
            format!("Tool '{tool}' is available at: {}", path.display())
        }
        Availability::Resolved(resolved) => {
            let cwd = resolved.working_directory.display();
            let mut text = format!(
                "Tool '{tool}' found:\n  {}\n  Command: {}\n  Directory: {cwd}\n\nUsage example:\n  cd {cwd} && {} <args>",
                resolved.description, resolved.command, resolved.command
            );
            if !resolved.is_verified() {
                let _ = write!(text, "\n\n{UNVERIFIED_NOTE}");
            }
            text
        }
        Availability::InToolsDir(path) => format!(
            "Tool '{tool}' found in {} at: {}",
            tools_root.display(),
            path.display()
        ),
        Availability::NotFound => format!(
            "Tool '{tool}' not found in PATH or {root}.\nAvailable tools in {root}: {}",
            known_dirs.join(", "),
            root = tools_root.display()
        ),
    }
}

fn push_streams(text: &mut String, result: &ExecutionResult) {
    text.push_str(&"=".repeat(SEPARATOR_WIDTH));
    text.push('\n');

    if !result.stdout.is_empty() {
        let _ = writeln!(text, "STDOUT:\n{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        let _ = writeln!(text, "STDERR:\n{}", result.stderr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn result(stdout: &str, stderr: &str, exit_code: i32) -> ExecutionResult {
        ExecutionResult {
            command_line: "echo hello".into(),
            working_directory: PathBuf::from("/work"),
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_command_report_layout() {
        let text = command_report(&result("hello\n", "", 0));
        let expected = format!(
            "Command: echo hello\nWorking Directory: /work\nExit Code: 0\n{}\nSTDOUT:\nhello\n\n",
            "=".repeat(50)
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_streams_omitted() {
        let text = command_report(&result("", "", 3));
        assert!(!text.contains("STDOUT"));
        assert!(!text.contains("STDERR"));
        assert!(text.contains("Exit Code: 3"));
    }

    #[test]
    fn test_not_found_lists_known_dirs() {
        let text = availability_report(
            "halmos",
            &Availability::NotFound,
            Path::new("/home/a/tools"),
            &["echidna", "slither"],
        );
        assert_eq!(
            text,
            "Tool 'halmos' not found in PATH or /home/a/tools.\nAvailable tools in /home/a/tools: echidna, slither"
        );
    }
}
