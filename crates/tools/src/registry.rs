use serde::Serialize;
use std::path::{Path, PathBuf};

/// A known security-analysis tool and how it is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    /// Installation directory, relative to the tools root.
    pub install_dir: &'static str,
    pub invocation: &'static str,
    pub description: &'static str,
}

/// How an invocation template starts the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch<'a> {
    /// `python3 -m pkg.module`
    PythonModule(&'a str),
    /// `python3 path/to/script.py`
    PythonScript(&'a str),
    /// A program looked up on `PATH`.
    Program(&'a str),
}

const PYTHON_INTERPRETERS: &[&str] = &["python3", "python"];

pub static TOOL_REGISTRY: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "slither",
        install_dir: "slither",
        invocation: "python3 slither/slither.py",
        description: "Slither static analyzer",
    },
    ToolDescriptor {
        name: "mythril",
        install_dir: "mythril2.0",
        invocation: "python3 mythril/mythril",
        description: "Mythril security analyzer",
    },
    ToolDescriptor {
        name: "echidna",
        install_dir: "echidna",
        invocation: "echidna-test",
        description: "Echidna fuzzing tool",
    },
    ToolDescriptor {
        name: "securify2",
        install_dir: "securify2",
        invocation: "python3 -m securify",
        description: "Securify2 static analyzer",
    },
    ToolDescriptor {
        name: "medusa",
        install_dir: "medusa",
        invocation: "python3 -m medusa",
        description: "Medusa fuzzing tool",
    },
    ToolDescriptor {
        name: "fuzz-utils",
        install_dir: "fuzz-utils",
        invocation: "python3 -m fuzz_utils",
        description: "Fuzz utilities",
    },
    ToolDescriptor {
        name: "solc-select",
        install_dir: "solc-select",
        invocation: "solc-select",
        description: "Solidity compiler version selector",
    },
];

/// Alternate spellings, mapped to the registry entry they stand for.
static ALIASES: &[(&str, &str)] = &[("securify", "securify2")];

/// Result of a registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Direct(&'static ToolDescriptor),
    Alias(&'static ToolDescriptor),
}

impl Lookup {
    pub fn descriptor(&self) -> &'static ToolDescriptor {
        match self {
            Lookup::Direct(descriptor) | Lookup::Alias(descriptor) => descriptor,
        }
    }
}

/// Case-insensitive lookup. Literal entries win over aliases.
pub fn lookup(tool_name: &str) -> Option<Lookup> {
    let key = tool_name.trim().to_lowercase();

    if let Some(descriptor) = find(&key) {
        return Some(Lookup::Direct(descriptor));
    }

    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .and_then(|(_, canonical)| find(canonical))
        .map(Lookup::Alias)
}

fn find(name: &str) -> Option<&'static ToolDescriptor> {
    TOOL_REGISTRY.iter().find(|descriptor| descriptor.name == name)
}

/// Names accepted by `run_security_tool`, in registry order.
pub fn supported_tool_names() -> Vec<&'static str> {
    TOOL_REGISTRY.iter().map(|descriptor| descriptor.name).collect()
}

/// Installation directory names under the tools root, sorted.
pub fn known_tool_dirs() -> Vec<&'static str> {
    let mut dirs: Vec<&'static str> = TOOL_REGISTRY
        .iter()
        .map(|descriptor| descriptor.install_dir)
        .collect();
    dirs.sort_unstable();
    dirs.dedup();
    dirs
}

impl ToolDescriptor {
    pub fn install_path(&self, tools_root: &Path) -> PathBuf {
        tools_root.join(self.install_dir)
    }

    pub fn launch(&self) -> Launch<'static> {
        let mut tokens = self.invocation.split_whitespace();
        let first = tokens.next().unwrap_or_default();

        if !PYTHON_INTERPRETERS.contains(&first) {
            return Launch::Program(first);
        }

        match tokens.next() {
            Some("-m") => Launch::PythonModule(tokens.next().unwrap_or_default()),
            Some(script) => Launch::PythonScript(script),
            None => Launch::Program(first),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_small_and_unique() {
        assert!(TOOL_REGISTRY.len() <= 8);
        let mut names = supported_tool_names();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TOOL_REGISTRY.len());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let found = lookup("Slither").unwrap();
        assert_eq!(found, Lookup::Direct(&TOOL_REGISTRY[0]));
        assert!(lookup("  MYTHRIL ").is_some());
    }

    #[test]
    fn test_unknown_tool() {
        assert!(lookup("forge").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_alias_maps_to_canonical_entry() {
        let alias = lookup("securify").unwrap();
        let canonical = lookup("securify2").unwrap();
        assert!(matches!(alias, Lookup::Alias(_)));
        assert_eq!(alias.descriptor(), canonical.descriptor());
    }

    #[test]
    fn test_launch_styles() {
        let by_name = |name| lookup(name).unwrap().descriptor().launch();
        assert_eq!(by_name("medusa"), Launch::PythonModule("medusa"));
        assert_eq!(by_name("fuzz-utils"), Launch::PythonModule("fuzz_utils"));
        assert_eq!(by_name("slither"), Launch::PythonScript("slither/slither.py"));
        assert_eq!(by_name("echidna"), Launch::Program("echidna-test"));
        assert_eq!(by_name("solc-select"), Launch::Program("solc-select"));
    }

    #[test]
    fn test_known_tool_dirs_sorted() {
        assert_eq!(
            known_tool_dirs(),
            vec![
                "echidna",
                "fuzz-utils",
                "medusa",
                "mythril2.0",
                "securify2",
                "slither",
                "solc-select"
            ]
        );
    }
}
