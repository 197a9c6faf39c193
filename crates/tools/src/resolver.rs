use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toolbridge_core::BridgeConfig;
use tracing::debug;

use crate::registry::{self, Launch, Lookup, ToolDescriptor};

const PACKAGE_MARKER: &str = "__init__.py";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool '{tool}' is not installed at {}", dir.display())]
    NotInstalled { tool: String, dir: PathBuf },
}

/// How much of a resolution was confirmed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// The interpreter module or script named by the template exists.
    Module,
    /// An executable file was found in the installation directory.
    Executable,
    /// Only the installation directory exists; the template is returned as-is.
    Unverified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedInvocation {
    pub tool: &'static str,
    pub command: String,
    pub working_directory: PathBuf,
    pub description: &'static str,
    pub verification: Verification,
}

impl ResolvedInvocation {
    pub fn is_verified(&self) -> bool {
        self.verification != Verification::Unverified
    }
}

/// Maps tool names to runnable invocations below a tools root.
///
/// Every call probes the filesystem afresh; nothing is cached.
#[derive(Debug, Clone)]
pub struct ToolResolver {
    tools_root: PathBuf,
}

impl ToolResolver {
    pub fn new(tools_root: impl Into<PathBuf>) -> Self {
        Self {
            tools_root: tools_root.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.tools_root.clone())
    }

    pub fn tools_root(&self) -> &Path {
        &self.tools_root
    }

    pub fn resolve(&self, tool_name: &str) -> Result<ResolvedInvocation, ResolveError> {
        let requested = tool_name.trim();
        let found = registry::lookup(requested)
            .ok_or_else(|| ResolveError::UnknownTool(requested.to_string()))?;

        // Aliases probe under the canonical name so both spellings resolve identically.
        let (descriptor, probe_name) = match found {
            Lookup::Direct(descriptor) => (descriptor, requested),
            Lookup::Alias(descriptor) => (descriptor, descriptor.name),
        };

        let dir = descriptor.install_path(&self.tools_root);
        if !dir.is_dir() {
            return Err(ResolveError::NotInstalled {
                tool: requested.to_string(),
                dir,
            });
        }

        if launch_target_present(descriptor, &dir) {
            debug!("Resolved {} via launch template", descriptor.name);
            return Ok(resolved(
                descriptor,
                descriptor.invocation.to_string(),
                dir,
                Verification::Module,
            ));
        }

        if let Some(executable) = find_executable(&dir, probe_name) {
            debug!("Resolved {} to executable {}", descriptor.name, executable.display());
            let command = executable.to_string_lossy().into_owned();
            return Ok(resolved(descriptor, command, dir, Verification::Executable));
        }

        debug!("Falling back to unverified template for {}", descriptor.name);
        Ok(resolved(descriptor, descriptor.invocation.to_string(), dir, Verification::Unverified))
    }
}

fn resolved(
    descriptor: &'static ToolDescriptor,
    command: String,
    working_directory: PathBuf,
    verification: Verification,
) -> ResolvedInvocation {
    ResolvedInvocation {
        tool: descriptor.name,
        command,
        working_directory,
        description: descriptor.description,
        verification,
    }
}

fn launch_target_present(descriptor: &ToolDescriptor, dir: &Path) -> bool {
    match descriptor.launch() {
        Launch::PythonModule(module) if !module.is_empty() => {
            let path = dir.join(module.replace('.', "/"));
            path.exists()
                || path.join(PACKAGE_MARKER).is_file()
                || path.with_extension("py").is_file()
        }
        Launch::PythonScript(script) => dir.join(script).is_file(),
        _ => false,
    }
}

/// First executable among `{dir}/{name}`, `{dir}/{lower}`, `{dir}/bin/{name}`, `{dir}/bin/{lower}`.
pub(crate) fn find_executable(dir: &Path, name: &str) -> Option<PathBuf> {
    let lower = name.to_lowercase();
    [
        dir.join(name),
        dir.join(&lower),
        dir.join("bin").join(name),
        dir.join("bin").join(&lower),
    ]
    .into_iter()
    .find(|candidate| is_executable(candidate))
}

pub(crate) fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        fs::write(path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_unknown_tool() {
        let root = tempfile::tempdir().unwrap();
        let resolver = ToolResolver::new(root.path());
        assert_eq!(
            resolver.resolve("forge"),
            Err(ResolveError::UnknownTool("forge".to_string()))
        );
    }

    #[test]
    fn test_missing_install_dir() {
        let root = tempfile::tempdir().unwrap();
        let resolver = ToolResolver::new(root.path());
        assert!(matches!(
            resolver.resolve("slither"),
            Err(ResolveError::NotInstalled { .. })
        ));
    }

    #[test]
    fn test_python_script_template() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("slither/slither");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("slither.py"), "").unwrap();

        let resolved = ToolResolver::new(root.path()).resolve("slither").unwrap();
        assert_eq!(resolved.command, "python3 slither/slither.py");
        assert_eq!(resolved.working_directory, root.path().join("slither"));
        assert_eq!(resolved.verification, Verification::Module);
    }

    #[test]
    fn test_python_package_template() {
        let root = tempfile::tempdir().unwrap();
        let package = root.path().join("medusa/medusa");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join(PACKAGE_MARKER), "").unwrap();

        let resolved = ToolResolver::new(root.path()).resolve("medusa").unwrap();
        assert_eq!(resolved.command, "python3 -m medusa");
        assert_eq!(resolved.verification, Verification::Module);
    }

    #[test]
    fn test_python_module_file_template() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("fuzz-utils");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("fuzz_utils.py"), "").unwrap();

        let resolved = ToolResolver::new(root.path()).resolve("fuzz-utils").unwrap();
        assert_eq!(resolved.command, "python3 -m fuzz_utils");
        assert!(resolved.is_verified());
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_candidates_in_order() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("solc-select");
        fs::create_dir_all(dir.join("bin")).unwrap();
        make_executable(&dir.join("bin/solc-select"));

        let resolver = ToolResolver::new(root.path());
        let resolved = resolver.resolve("solc-select").unwrap();
        assert_eq!(resolved.command, dir.join("bin/solc-select").to_string_lossy());
        assert_eq!(resolved.verification, Verification::Executable);

        make_executable(&dir.join("solc-select"));
        let resolved = resolver.resolve("solc-select").unwrap();
        assert_eq!(resolved.command, dir.join("solc-select").to_string_lossy());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("echidna");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("echidna"), "not executable").unwrap();

        let resolved = ToolResolver::new(root.path()).resolve("echidna").unwrap();
        assert_eq!(resolved.command, "echidna-test");
        assert_eq!(resolved.verification, Verification::Unverified);
    }

    #[test]
    fn test_directory_named_like_tool_is_not_executable() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("echidna/echidna")).unwrap();

        let resolved = ToolResolver::new(root.path()).resolve("echidna").unwrap();
        assert!(!resolved.is_verified());
    }

    #[test]
    fn test_unverified_fallback() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("mythril2.0")).unwrap();

        let resolved = ToolResolver::new(root.path()).resolve("MYTHRIL").unwrap();
        assert_eq!(resolved.tool, "mythril");
        assert_eq!(resolved.command, "python3 mythril/mythril");
        assert_eq!(resolved.working_directory, root.path().join("mythril2.0"));
        assert_eq!(resolved.verification, Verification::Unverified);
    }
}
