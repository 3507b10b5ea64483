//! Settings read from the host, under the `robot.` namespace.
//!
//! The host hands the launcher one JSON-shaped value for the namespace;
//! deserialization is the validated boundary. Key spelling matches the
//! settings schema (kebab-case), unknown keys are ignored and everything
//! defaults to empty so a bare host still activates.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

/// Settings whose change requires a fresh activation (window reload) to take
/// effect. The reload watcher prompts when one of these moves.
pub const RELOAD_SETTINGS: &[&str] = &[
    "robot.language-server.python",
    "robot.language-server.tcp-port",
    "robot.language-server.args",
];

/// Configuration sections the client keeps synchronized with the server.
pub const SYNC_SECTIONS: &[&str] = &["robot", "robocorp.home"];

/// The `robot.` settings namespace.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    #[serde(rename = "language-server")]
    pub language_server: LanguageServerConfig,
    /// Additional search-path entries passed as `--pythonpath` on launch.
    pub pythonpath: Vec<String>,
    /// Variables passed as `--variable key:value`, in the map's own key order.
    pub variables: IndexMap<String, String>,
    pub python: PythonConfig,
}

/// `robot.language-server.*` — how the server process is reached.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LanguageServerConfig {
    /// Interpreter path, or a bare command name to search on the PATH.
    pub python: Option<String>,
    /// When set, attach to an already-running server instead of spawning.
    #[serde(rename = "tcp-port")]
    pub tcp_port: Option<u16>,
    /// Extra arguments appended after the entry script on spawn.
    pub args: Vec<String>,
}

/// `robot.python.*` — interpreter and environment for debug/run sessions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    /// Interpreter for the debug adapter process.
    pub executable: Option<String>,
    /// Environment handed to launched suites.
    pub env: HashMap<String, String>,
}

impl RobotConfig {
    /// Deserialize the namespace from the host's settings value.
    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}
