use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use toolbridge_core::BridgeConfig;

const PATH_VAR: &str = "PATH";
const PATH_SEPARATOR: char = ':';

/// Environment handed to every spawned command.
///
/// Built from a base environment with two overlays applied in order: the auxiliary service
/// endpoint variables, then the tools-root `PATH` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolEnvironment {
    vars: HashMap<String, String>,
}

impl ToolEnvironment {
    /// Overlays the current process environment. Non-UTF-8 variables are skipped.
    pub fn from_process(config: &BridgeConfig) -> Self {
        let base = env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
        Self::build(base, config)
    }

    pub fn build<I, K, V>(base: I, config: &BridgeConfig) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut vars: HashMap<String, String> = base
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        for (key, value) in config.endpoint_vars() {
            vars.insert(key.to_string(), value.to_string());
        }

        let path = prepend_path(vars.get(PATH_VAR).map(String::as_str), &config.path_prefix());
        vars.insert(PATH_VAR.to_string(), path);

        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn path(&self) -> Option<&str> {
        self.get(PATH_VAR)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Prepends every directory of `prefix` that is not already an entry of `current`.
///
/// Matching is per entry, so applying the same prefix repeatedly never grows the result.
pub fn prepend_path(current: Option<&str>, prefix: &[&Path]) -> String {
    let existing: Vec<&str> = match current {
        Some(path) if !path.is_empty() => path.split(PATH_SEPARATOR).collect(),
        _ => Vec::new(),
    };

    let mut entries: Vec<String> = Vec::with_capacity(prefix.len() + existing.len());
    for dir in prefix {
        let dir = dir.to_string_lossy().into_owned();
        if !existing.contains(&dir.as_str()) && !entries.contains(&dir) {
            entries.push(dir);
        }
    }
    entries.extend(existing.iter().map(|entry| entry.to_string()));

    entries.join(&PATH_SEPARATOR.to_string())
}
