//! Home-directory helpers shared by configuration and the executor.

use std::env;
use std::path::{Path, PathBuf};

/// The invoking user's home directory, taken from `HOME`.
pub fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Expands a leading `~` or `~/` to the home directory.
///
/// Anything else (including `~user` forms) is returned untouched, as is the input when no home
/// directory is known.
pub fn expand_home(raw: &str) -> PathBuf {
    expand_home_with(raw, home_dir().as_deref())
}

pub(crate) fn expand_home_with(raw: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(raw);
    };

    if raw == "~" {
        return home.to_path_buf();
    }

    match raw.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(raw),
    }
}
