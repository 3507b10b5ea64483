//! Interpreter resolution for the language-server process.
//!
//! Strategies are tried in order and short-circuit on the first hit:
//! a configured explicit path, a configured bare command name searched on the
//! PATH, the delegated sibling-extension resolver, then the platform default
//! command names. A miss produces a user-presentable message; the caller owns
//! showing it and offering the manual-selection fallback.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::config::RobotConfig;
use crate::host::DelegatedCommands;

/// Outcome of interpreter resolution.
///
/// `Missing` always carries a non-empty, user-presentable message; the two
/// states are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableResolution {
    Found(PathBuf),
    Missing(String),
}

impl ExecutableResolution {
    #[must_use]
    pub fn executable(&self) -> Option<&Path> {
        match self {
            Self::Found(path) => Some(path),
            Self::Missing(_) => None,
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Found(_) => None,
            Self::Missing(message) => Some(message),
        }
    }
}

fn has_path_separator(value: &str) -> bool {
    value.contains('/') || value.contains('\\')
}

/// Search a PATH-like value for `name`, honoring entry order.
///
/// The platform separator (`;` on Windows, `:` elsewhere) and executability
/// rules are those of `which`; the first match wins.
#[must_use]
pub fn find_in_search_path(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(name, Some(path_var), cwd).ok()
}

#[cfg(windows)]
const DEFAULT_CANDIDATES: &[&str] = &["python.exe"];
#[cfg(not(windows))]
const DEFAULT_CANDIDATES: &[&str] = &["python3", "python"];

fn not_on_path_message() -> String {
    "Unable to start the Robot Framework language server: no python interpreter \
     could be found on the PATH. Do you want to select a python executable to \
     start it?"
        .to_string()
}

/// Resolve the interpreter used to run the language server.
pub fn resolve_server_python(
    config: &RobotConfig,
    delegated: Option<&dyn DelegatedCommands>,
    path_var: &OsStr,
) -> ExecutableResolution {
    tracing::info!("resolving the language server interpreter");
    let configured = config
        .language_server
        .python
        .as_deref()
        .filter(|value| !value.is_empty());

    match configured {
        Some(value) if has_path_separator(value) => {
            let path = PathBuf::from(value);
            if path.exists() {
                tracing::info!(path = %path.display(), "using the configured interpreter");
                ExecutableResolution::Found(path)
            } else {
                ExecutableResolution::Missing(format!(
                    "Unable to start the Robot Framework language server: {value} does \
                     not exist. Do you want to select a new python executable to start it?"
                ))
            }
        }
        Some(name) => {
            tracing::info!(%name, "searching the PATH for the configured interpreter");
            match find_in_search_path(name, path_var) {
                Some(found) => {
                    tracing::info!(path = %found.display(), "interpreter found on the PATH");
                    ExecutableResolution::Found(found)
                }
                None => ExecutableResolution::Missing(not_on_path_message()),
            }
        }
        None => {
            if let Some(python) = delegated.and_then(|d| d.language_server_python()) {
                // Trusted as-is; the sibling extension manages this interpreter.
                tracing::info!(
                    path = %python.display(),
                    "interpreter supplied by the delegated resolver"
                );
                return ExecutableResolution::Found(python);
            }
            tracing::info!("searching the PATH for a default python interpreter");
            let found = DEFAULT_CANDIDATES
                .iter()
                .find_map(|name| find_in_search_path(name, path_var));
            match found {
                Some(found) => {
                    tracing::info!(path = %found.display(), "interpreter found on the PATH");
                    ExecutableResolution::Found(found)
                }
                None => ExecutableResolution::Missing(not_on_path_message()),
            }
        }
    }
}
