use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::resolver::{is_executable, ResolvedInvocation, ToolResolver};

/// Where a tool was found, in the order the probe tries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Found by an OS-level `PATH` lookup.
    OnPath(PathBuf),
    /// Known to the registry and resolved below the tools root.
    Resolved(ResolvedInvocation),
    /// An executable found by scanning conventional directories below the tools root.
    InToolsDir(PathBuf),
    NotFound,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        !matches!(self, Availability::NotFound)
    }
}

/// Answers "can this tool be run?" for arbitrary names, not only registry entries.
pub struct AvailabilityProbe {
    resolver: ToolResolver,
    scanner_dir: PathBuf,
    search_path: Option<OsString>,
}

impl AvailabilityProbe {
    /// `search_path` is the `PATH` used for the OS lookup; `None` disables that step.
    pub fn new(
        resolver: ToolResolver,
        scanner_dir: impl Into<PathBuf>,
        search_path: Option<OsString>,
    ) -> Self {
        Self {
            resolver,
            scanner_dir: scanner_dir.into(),
            search_path,
        }
    }

    pub fn check(&self, tool_name: &str) -> Availability {
        let name = tool_name.trim();
        if name.is_empty() {
            return Availability::NotFound;
        }

        if let Some(path) = self.lookup_on_path(name) {
            return Availability::OnPath(path);
        }

        match self.resolver.resolve(name) {
            Ok(resolved) => return Availability::Resolved(resolved),
            Err(e) => debug!("Resolver did not locate {}: {}", name, e),
        }

        self.scan_tool_dirs(name)
            .map(Availability::InToolsDir)
            .unwrap_or(Availability::NotFound)
    }

    fn lookup_on_path(&self, name: &str) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        which::which_in(name, Some(search_path), cwd).ok()
    }

    /// Conventional layouts: `<root>/<name>`, `<root>/<name>/<name>`, `<root>/<name>2.0/<name>`
    /// and `<scanner dir>/<name>`, each searched for `<dir>/<name>` or `<dir>/bin/<name>`.
    fn scan_tool_dirs(&self, name: &str) -> Option<PathBuf> {
        let root = self.resolver.tools_root();
        let dirs = [
            root.join(name),
            root.join(name).join(name),
            root.join(format!("{name}2.0")).join(name),
            self.scanner_dir.join(name),
        ];

        dirs.iter()
            .filter(|dir| dir.is_dir())
            .find_map(|dir| executable_in(dir, name))
    }
}

fn executable_in(dir: &Path, name: &str) -> Option<PathBuf> {
    [dir.join(name), dir.join("bin").join(name)]
        .into_iter()
        .find(|candidate| is_executable(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn probe(root: &Path, search_path: Option<&Path>) -> AvailabilityProbe {
        AvailabilityProbe::new(
            ToolResolver::new(root),
            root.join("web3se-lab"),
            search_path.map(|p| p.as_os_str().to_os_string()),
        )
    }

    #[test]
    fn test_not_found_anywhere() {
        let root = tempfile::tempdir().unwrap();
        let empty_path = tempfile::tempdir().unwrap();
        let probe = probe(root.path(), Some(empty_path.path()));
        assert_eq!(probe.check("no-such-tool-xyz"), Availability::NotFound);
        assert_eq!(probe.check("   "), Availability::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_path_lookup_wins() {
        let root = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        make_executable(&bin.path().join("forge"));

        let probe = probe(root.path(), Some(bin.path()));
        assert_eq!(
            probe.check("forge"),
            Availability::OnPath(bin.path().join("forge"))
        );
    }

    #[test]
    fn test_registry_resolution_when_not_on_path() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("securify2")).unwrap();

        let probe = probe(root.path(), None);
        match probe.check("securify") {
            Availability::Resolved(resolved) => assert_eq!(resolved.tool, "securify2"),
            other => panic!("unexpected availability: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_versioned_directory_heuristic() {
        let root = tempfile::tempdir().unwrap();
        let exe = root.path().join("halmos2.0/halmos/bin/halmos");
        make_executable(&exe);

        let probe = probe(root.path(), None);
        assert_eq!(probe.check("halmos"), Availability::InToolsDir(exe));
    }

    #[cfg(unix)]
    #[test]
    fn test_scanner_directory_heuristic() {
        let root = tempfile::tempdir().unwrap();
        let exe = root.path().join("web3se-lab/sekit/sekit");
        make_executable(&exe);

        let probe = probe(root.path(), None);
        assert!(probe.check("sekit").is_available());
    }
}
