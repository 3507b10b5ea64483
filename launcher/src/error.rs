//! Error kinds for launcher operations.
//!
//! None of these are fatal to the embedding host: each aborts only the
//! operation it occurred in (an activation attempt, a single debug/run
//! request). The interpreter/script kinds carry user-presentable messages;
//! activation surfaces them through the host UI and leaves the extension
//! loaded so the user can fix configuration and retry.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    /// No usable interpreter could be resolved for an operation.
    #[error("{0}")]
    InterpreterNotFound(String),

    /// A bundled entry script (server or debug adapter) is not on disk.
    #[error("Error. Expected: {} to exist.", .0.display())]
    EntryScriptMissing(PathBuf),

    /// The interpreter chosen for the debug adapter is not on disk.
    #[error("Error. Expected: {} to exist.", .0.display())]
    AdapterExecutableMissing(PathBuf),

    /// A command was invoked on a document with no owning workspace folder.
    #[error("document has no owning workspace folder: {0}")]
    NoWorkspaceFolder(url::Url),

    /// A document URI could not be mapped back to a filesystem path.
    #[error("document URI is not a local file: {0}")]
    InvalidDocument(url::Url),

    #[error("connecting to 127.0.0.1:{port}: {source}")]
    Connect {
        port: u16,
        source: std::io::Error,
    },

    #[error("spawning {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// A spawned server child was missing a stdio pipe.
    #[error("language server child process has no {0} pipe")]
    ChildPipe(&'static str),

    /// The server rejected the `initialize` request.
    #[error("language server initialize failed: {0}")]
    Handshake(String),

    /// The session's writer or reader side is gone.
    #[error("language server connection closed")]
    ConnectionClosed,

    #[error("language server request timed out")]
    Timeout,
}
