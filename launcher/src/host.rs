//! Host capability traits.
//!
//! Everything the launcher needs from the embedding editor is an explicit
//! trait handed in through [`Host`] — no ambient globals, no duck-typed
//! lookups. Optional collaborators (the sibling-extension commands) are an
//! `Option` on the host and are consulted once per operation, never cached.
//!
//! All methods are synchronous: the host event loop serializes callbacks, and
//! implementations are expected to answer fast (a dialog result, a settings
//! write, a filesystem check).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Scope a manually selected setting is persisted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTarget {
    User,
    Workspace,
}

/// Interpreter details produced by the delegated `resolve_interpreter`
/// capability. Immutable after creation; consumed once per debug/launch
/// action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterInfo {
    pub python_exe: PathBuf,
    /// Environment overrides merged into the session environment; these win
    /// on key conflicts.
    pub environ: HashMap<String, String>,
    /// Extra `--pythonpath` entries, in order.
    pub additional_pythonpath_entries: Vec<String>,
}

/// Commands an optional sibling extension may contribute.
///
/// A missing implementation, or a `None` return, means "feature not
/// available" and callers fall through to their next strategy — it is never
/// an error.
pub trait DelegatedCommands: Send + Sync {
    /// `robot.resolveInterpreter` — interpreter for a target suite.
    fn resolve_interpreter(&self, target: &Path) -> Option<InterpreterInfo>;
    /// `robocorp.getLanguageServerPython` — interpreter for the server
    /// itself. Trusted: callers do not re-check existence.
    fn language_server_python(&self) -> Option<PathBuf>;
    /// `robocorp.getPluginsDir` — plugins directory for the initialization
    /// payload.
    fn plugins_dir(&self) -> Option<PathBuf>;
}

/// User-visible surfaces: warning dialogs, pickers, the reload prompt.
pub trait HostUi: Send + Sync {
    fn warn(&self, message: &str);
    /// Show `message` with the save-in-user / save-in-workspace / decline
    /// choices. `None` means the user declined.
    fn ask_save_target(&self, message: &str) -> Option<SettingsTarget>;
    /// Open a file picker for an interpreter executable.
    fn pick_executable(&self) -> Option<PathBuf>;
    /// Ask whether to reload now that `setting` changed.
    fn confirm_reload(&self, setting: &str) -> bool;
    /// Reload the window, discarding this activation.
    fn reload(&self);
}

/// Persistence for settings the launcher writes back.
pub trait SettingsStore: Send + Sync {
    fn persist_server_python(&self, path: &Path, target: SettingsTarget);
}

/// Sink for `$/customProgress` reports, keyed by the server's progress id.
pub trait ProgressReporter: Send + Sync {
    fn begin(&self, id: &str, title: &str);
    fn report(&self, id: &str, message: Option<&str>, increment: Option<f64>);
    fn end(&self, id: &str);
}

/// Configuration-change notifications. Used only for the "reload required"
/// prompt; live reconfiguration is out of scope.
pub trait ConfigurationWatcher: Send + Sync {
    /// Invoke `on_change` with the key whenever one of `keys` changes.
    fn watch(&self, keys: &[&str], on_change: Box<dyn Fn(&str) + Send + Sync>);
}

/// Document-to-workspace mapping.
pub trait WorkspaceLayout: Send + Sync {
    /// Owning workspace folder for a document, if it has one.
    fn folder_of(&self, document: &url::Url) -> Option<PathBuf>;
}

/// The full host surface handed to activation.
#[derive(Clone)]
pub struct Host {
    pub ui: Arc<dyn HostUi>,
    pub settings: Arc<dyn SettingsStore>,
    pub progress: Arc<dyn ProgressReporter>,
    pub watcher: Arc<dyn ConfigurationWatcher>,
    pub workspace: Arc<dyn WorkspaceLayout>,
    /// Sibling-extension commands, when that extension is installed.
    pub delegated: Option<Arc<dyn DelegatedCommands>>,
}
