//! Terminal implementations of the launcher's host traits.
//!
//! A terminal has no dialogs: warnings go to the log, every prompt declines,
//! and settings writes are reported instead of persisted. Good enough to
//! drive the launcher exactly the way an editor host would.

use std::path::{Path, PathBuf};

use rfl_launcher::host::{
    ConfigurationWatcher, HostUi, ProgressReporter, SettingsStore, SettingsTarget, WorkspaceLayout,
};

pub struct TerminalUi;

impl HostUi for TerminalUi {
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn ask_save_target(&self, _message: &str) -> Option<SettingsTarget> {
        // Non-interactive; configuration has to come from the settings file.
        None
    }

    fn pick_executable(&self) -> Option<PathBuf> {
        None
    }

    fn confirm_reload(&self, _setting: &str) -> bool {
        false
    }

    fn reload(&self) {}
}

pub struct LoggingSettings;

impl SettingsStore for LoggingSettings {
    fn persist_server_python(&self, path: &Path, target: SettingsTarget) {
        tracing::info!(path = %path.display(), scope = ?target, "would persist language-server.python");
    }
}

/// Progress rendered as log lines.
pub struct TerminalProgress;

impl ProgressReporter for TerminalProgress {
    fn begin(&self, id: &str, title: &str) {
        tracing::info!(id, "{title}...");
    }

    fn report(&self, id: &str, message: Option<&str>, increment: Option<f64>) {
        let message = message.unwrap_or("working");
        match increment {
            Some(increment) => tracing::info!(id, increment, "{message}"),
            None => tracing::info!(id, "{message}"),
        }
    }

    fn end(&self, id: &str) {
        tracing::info!(id, "done");
    }
}

/// A one-shot process never sees settings change.
pub struct StaticConfiguration;

impl ConfigurationWatcher for StaticConfiguration {
    fn watch(&self, _keys: &[&str], _on_change: Box<dyn Fn(&str) + Send + Sync>) {}
}

/// Single workspace folder: documents under the root belong to it, anything
/// else is a loose file.
pub struct SingleFolderWorkspace {
    root: PathBuf,
}

impl SingleFolderWorkspace {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl WorkspaceLayout for SingleFolderWorkspace {
    fn folder_of(&self, document: &url::Url) -> Option<PathBuf> {
        let path = document.to_file_path().ok()?;
        path.starts_with(&self.root).then(|| self.root.clone())
    }
}
