//! Debug-session launching.
//!
//! Three cooperating pieces, mirroring the host debug subsystem's shape:
//! a configuration provider (the default launch template), a configuration
//! resolver (injects computed `--pythonpath` / `--variable` arguments and the
//! delegated interpreter's environment), and a descriptor factory for the
//! adapter process itself. [`DebugLauncher::launch`] chains them:
//! requested → configuration resolved → descriptor built → spawned.
//!
//! The adapter speaks DAP on its stdio pair; wiring that protocol is the
//! host's concern, not this crate's.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use url::Url;

use crate::config::RobotConfig;
use crate::error::LauncherError;
use crate::host::DelegatedCommands;

/// Debug configuration type identifier, shared with the host debug subsystem.
pub const DEBUG_TYPE: &str = "robotframework-lsp";

/// Entry script of the bundled debug adapter, under the install root.
#[must_use]
pub fn adapter_entry_script(install_root: &Path) -> PathBuf {
    install_root
        .join("src")
        .join("robotframework_debug_adapter")
        .join("__main__.py")
}

/// One user-initiated run/debug action. Ephemeral; built per command
/// invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugLaunchRequest {
    pub document: Url,
    pub testcase: Option<String>,
    pub no_debug: bool,
}

impl DebugLaunchRequest {
    #[must_use]
    pub fn suite(document: Url, no_debug: bool) -> Self {
        Self {
            document,
            testcase: None,
            no_debug,
        }
    }

    #[must_use]
    pub fn testcase(document: Url, testcase: String, no_debug: bool) -> Self {
        Self {
            document,
            testcase: Some(testcase),
            no_debug,
        }
    }
}

/// A launch configuration as the host debug subsystem sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugConfiguration {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub request: String,
    pub cwd: PathBuf,
    pub target: PathBuf,
    pub terminal: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Default launch template for a workspace folder (configuration provider).
#[must_use]
pub fn default_configuration(folder: &Path, target: &Path) -> DebugConfiguration {
    DebugConfiguration {
        kind: DEBUG_TYPE.to_string(),
        name: "Robot Framework: Launch .robot file".to_string(),
        request: "launch".to_string(),
        cwd: folder.to_path_buf(),
        target: target.to_path_buf(),
        terminal: "none".to_string(),
        env: HashMap::new(),
        args: Vec::new(),
    }
}

/// Merge `overrides` into `env`. Override keys win; everything else survives.
fn merge_environment(env: &mut HashMap<String, String>, overrides: &HashMap<String, String>) {
    for (key, value) in overrides {
        env.insert(key.clone(), value.clone());
    }
}

/// Configuration resolver — inject computed search-path and variable
/// arguments before the session starts.
///
/// Search-path entries come first from static configuration, extended by
/// whatever the delegated interpreter resolution supplies; the computed
/// arguments are placed ahead of anything already on the configuration.
#[must_use]
pub fn resolve_configuration(
    mut configuration: DebugConfiguration,
    config: &RobotConfig,
    delegated: Option<&dyn DelegatedCommands>,
) -> DebugConfiguration {
    let mut pythonpath = config.pythonpath.clone();
    if let Some(info) = delegated.and_then(|d| d.resolve_interpreter(&configuration.target)) {
        pythonpath.extend(info.additional_pythonpath_entries.iter().cloned());
        merge_environment(&mut configuration.env, &info.environ);
    }

    let mut computed = Vec::with_capacity(2 * (pythonpath.len() + config.variables.len()));
    for entry in &pythonpath {
        computed.push("--pythonpath".to_string());
        computed.push(entry.clone());
    }
    for (key, value) in &config.variables {
        computed.push("--variable".to_string());
        computed.push(format!("{key}:{value}"));
    }

    computed.append(&mut configuration.args);
    configuration.args = computed;
    configuration
}

/// Process descriptor for one debug-adapter launch. Environment travels
/// separately from the argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterDescriptor {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

/// Build the adapter process descriptor for a session.
///
/// Interpreter precedence: the delegated resolver, then the configured
/// `python.executable`, then the language server's own interpreter. Both the
/// adapter entry script and the chosen interpreter must exist on disk.
pub fn adapter_descriptor(
    config: &RobotConfig,
    delegated: Option<&dyn DelegatedCommands>,
    session_env: &HashMap<String, String>,
    target: &Path,
    install_root: &Path,
    server_python: Option<&Path>,
) -> Result<AdapterDescriptor, LauncherError> {
    let mut env = session_env.clone();

    let mut python = config.python.executable.as_deref().map(PathBuf::from);
    if let Some(info) = delegated.and_then(|d| d.resolve_interpreter(target)) {
        merge_environment(&mut env, &info.environ);
        python = Some(info.python_exe);
    }
    if python.is_none() {
        python = server_python.map(Path::to_path_buf);
    }
    let Some(python) = python else {
        return Err(LauncherError::InterpreterNotFound(
            "Error getting the language server python executable for creating a debug adapter."
                .to_string(),
        ));
    };

    let script = adapter_entry_script(install_root);
    if !script.is_file() {
        return Err(LauncherError::EntryScriptMissing(script));
    }
    if !python.exists() {
        return Err(LauncherError::AdapterExecutableMissing(python));
    }

    Ok(AdapterDescriptor {
        program: python,
        args: vec!["-u".to_string(), script.to_string_lossy().into_owned()],
        env,
    })
}

/// A spawned adapter process.
pub struct DebugSession {
    pub configuration: DebugConfiguration,
    pub no_debug: bool,
    child: Child,
}

impl DebugSession {
    /// Wait for the adapter process to terminate.
    pub async fn wait(&mut self) -> std::io::Result<std::process::ExitStatus> {
        self.child.wait().await
    }
}

/// Debug-session launcher registered at activation.
pub struct DebugLauncher {
    config: RobotConfig,
    install_root: PathBuf,
    /// Interpreter the language server itself runs under; the adapter's
    /// fallback of last resort.
    server_python: Option<PathBuf>,
}

impl DebugLauncher {
    #[must_use]
    pub fn new(config: RobotConfig, install_root: PathBuf, server_python: Option<PathBuf>) -> Self {
        Self {
            config,
            install_root,
            server_python,
        }
    }

    /// Launch configuration for one request, before resolution.
    ///
    /// Testcase requests carry `-t <name>`; the session environment starts
    /// from the configured `python.env`.
    pub fn configuration_for(
        &self,
        request: &DebugLaunchRequest,
        folder: &Path,
    ) -> Result<DebugConfiguration, LauncherError> {
        let target = request
            .document
            .to_file_path()
            .map_err(|()| LauncherError::InvalidDocument(request.document.clone()))?;

        let mut configuration = default_configuration(folder, &target);
        configuration.name = match &request.testcase {
            Some(testcase) => {
                format!("Robot Framework: Suite: {} Testcase: {testcase}", request.document)
            }
            None => format!("Robot Framework: Suite: {}", request.document),
        };
        configuration.env = self.config.python.env.clone();
        if let Some(testcase) = &request.testcase {
            configuration.args = vec!["-t".to_string(), testcase.clone()];
        }
        Ok(configuration)
    }

    /// Resolve a provided-or-default configuration (resolver step).
    #[must_use]
    pub fn resolve(
        &self,
        configuration: DebugConfiguration,
        delegated: Option<&dyn DelegatedCommands>,
    ) -> DebugConfiguration {
        resolve_configuration(configuration, &self.config, delegated)
    }

    /// Adapter descriptor for a resolved configuration (descriptor factory).
    pub fn descriptor_for(
        &self,
        configuration: &DebugConfiguration,
        delegated: Option<&dyn DelegatedCommands>,
    ) -> Result<AdapterDescriptor, LauncherError> {
        adapter_descriptor(
            &self.config,
            delegated,
            &configuration.env,
            &configuration.target,
            &self.install_root,
            self.server_python.as_deref(),
        )
    }

    /// Run the full launch sequence for one request.
    pub async fn launch(
        &self,
        request: &DebugLaunchRequest,
        folder: &Path,
        delegated: Option<&dyn DelegatedCommands>,
    ) -> Result<DebugSession, LauncherError> {
        let configuration = self.configuration_for(request, folder)?;
        let configuration = self.resolve(configuration, delegated);
        let descriptor = self.descriptor_for(&configuration, delegated)?;

        tracing::info!(
            program = %descriptor.program.display(),
            suite = %configuration.target.display(),
            no_debug = request.no_debug,
            "launching the debug adapter"
        );
        let child = Command::new(&descriptor.program)
            .args(&descriptor.args)
            .envs(&descriptor.env)
            .current_dir(&configuration.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LauncherError::Spawn {
                program: descriptor.program.clone(),
                source,
            })?;

        Ok(DebugSession {
            configuration,
            no_debug: request.no_debug,
            child,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InterpreterInfo;
    use std::fs;

    struct NoDelegation;
    impl DelegatedCommands for NoDelegation {
        fn resolve_interpreter(&self, _target: &Path) -> Option<InterpreterInfo> {
            None
        }
        fn language_server_python(&self) -> Option<PathBuf> {
            None
        }
        fn plugins_dir(&self) -> Option<PathBuf> {
            None
        }
    }

    struct ManagedEnvironment(InterpreterInfo);
    impl DelegatedCommands for ManagedEnvironment {
        fn resolve_interpreter(&self, _target: &Path) -> Option<InterpreterInfo> {
            Some(self.0.clone())
        }
        fn language_server_python(&self) -> Option<PathBuf> {
            None
        }
        fn plugins_dir(&self) -> Option<PathBuf> {
            None
        }
    }

    fn test_configuration(args: Vec<String>) -> DebugConfiguration {
        let mut configuration =
            default_configuration(Path::new("/workspace"), Path::new("/workspace/suite.robot"));
        configuration.args = args;
        configuration
    }

    fn config_from_value(value: serde_json::Value) -> RobotConfig {
        RobotConfig::from_value(value).unwrap()
    }

    fn install_root_with_adapter() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let script = adapter_entry_script(dir.path());
        fs::create_dir_all(script.parent().unwrap()).unwrap();
        fs::write(&script, "# adapter\n").unwrap();
        dir
    }

    // ── configuration provider ─────────────────────────────────────────

    #[test]
    fn default_template_targets_the_file_from_the_workspace_root() {
        let configuration =
            default_configuration(Path::new("/ws"), Path::new("/ws/tests/login.robot"));
        assert_eq!(configuration.kind, DEBUG_TYPE);
        assert_eq!(configuration.request, "launch");
        assert_eq!(configuration.cwd, PathBuf::from("/ws"));
        assert_eq!(configuration.target, PathBuf::from("/ws/tests/login.robot"));
        assert_eq!(configuration.terminal, "none");
        assert!(configuration.env.is_empty());
        assert!(configuration.args.is_empty());
    }

    #[test]
    fn configuration_serializes_with_the_launch_shape() {
        let configuration = default_configuration(Path::new("/ws"), Path::new("/ws/s.robot"));
        let value = serde_json::to_value(&configuration).unwrap();
        assert_eq!(value["type"], DEBUG_TYPE);
        assert_eq!(value["request"], "launch");
        assert_eq!(value["terminal"], "none");
    }

    // ── configuration resolver ─────────────────────────────────────────

    #[test]
    fn static_pythonpath_entries_become_flag_value_pairs_in_order() {
        let config = config_from_value(serde_json::json!({
            "pythonpath": ["libs", "resources", "vendored"]
        }));
        let resolved = resolve_configuration(test_configuration(Vec::new()), &config, None);
        assert_eq!(
            resolved.args,
            vec![
                "--pythonpath",
                "libs",
                "--pythonpath",
                "resources",
                "--pythonpath",
                "vendored",
            ]
        );
    }

    #[test]
    fn delegated_entries_extend_the_static_ones() {
        let config = config_from_value(serde_json::json!({ "pythonpath": ["libs"] }));
        let delegated = ManagedEnvironment(InterpreterInfo {
            python_exe: PathBuf::from("/managed/python"),
            environ: HashMap::new(),
            additional_pythonpath_entries: vec!["managed-a".to_string(), "managed-b".to_string()],
        });
        let resolved =
            resolve_configuration(test_configuration(Vec::new()), &config, Some(&delegated));
        assert_eq!(
            resolved.args,
            vec![
                "--pythonpath",
                "libs",
                "--pythonpath",
                "managed-a",
                "--pythonpath",
                "managed-b",
            ]
        );
    }

    #[test]
    fn computed_arguments_precede_preexisting_ones() {
        let config = config_from_value(serde_json::json!({ "pythonpath": ["libs"] }));
        let resolved = resolve_configuration(
            test_configuration(vec!["--exitonfailure".to_string()]),
            &config,
            None,
        );
        assert_eq!(
            resolved.args,
            vec!["--pythonpath", "libs", "--exitonfailure"]
        );
    }

    #[test]
    fn variables_become_key_colon_value_pairs_in_declaration_order() {
        let config = config_from_value(serde_json::json!({
            "variables": { "B": "2", "A": "1" }
        }));
        let resolved = resolve_configuration(test_configuration(Vec::new()), &config, None);
        assert_eq!(
            resolved.args,
            vec!["--variable", "B:2", "--variable", "A:1"]
        );
    }

    #[test]
    fn pythonpath_pairs_come_before_variable_pairs() {
        let config = config_from_value(serde_json::json!({
            "pythonpath": ["libs"],
            "variables": { "A": "1" }
        }));
        let resolved = resolve_configuration(test_configuration(Vec::new()), &config, None);
        assert_eq!(
            resolved.args,
            vec!["--pythonpath", "libs", "--variable", "A:1"]
        );
    }

    #[test]
    fn environment_merge_is_non_destructive() {
        let config = RobotConfig::default();
        let delegated = ManagedEnvironment(InterpreterInfo {
            python_exe: PathBuf::from("/managed/python"),
            environ: HashMap::from([
                ("PYTHONHOME".to_string(), "/managed".to_string()),
                ("SHARED".to_string(), "managed".to_string()),
            ]),
            additional_pythonpath_entries: Vec::new(),
        });

        let mut configuration = test_configuration(Vec::new());
        configuration.env = HashMap::from([
            ("KEEP_ME".to_string(), "original".to_string()),
            ("SHARED".to_string(), "original".to_string()),
        ]);

        let resolved = resolve_configuration(configuration, &config, Some(&delegated));
        assert_eq!(resolved.env["KEEP_ME"], "original");
        assert_eq!(resolved.env["SHARED"], "managed");
        assert_eq!(resolved.env["PYTHONHOME"], "/managed");
    }

    #[test]
    fn resolution_without_configuration_or_delegation_is_a_no_op() {
        let resolved = resolve_configuration(
            test_configuration(vec!["--existing".to_string()]),
            &RobotConfig::default(),
            Some(&NoDelegation),
        );
        assert_eq!(resolved.args, vec!["--existing"]);
    }

    // ── adapter descriptor factory ─────────────────────────────────────

    #[test]
    fn descriptor_uses_unbuffered_script_args_and_separate_env() {
        let install = install_root_with_adapter();
        let python = install.path().join("python3");
        fs::write(&python, "").unwrap();

        let config = config_from_value(serde_json::json!({
            "python": { "executable": python.to_str().unwrap() }
        }));
        let env = HashMap::from([("ROBOT_ENV".to_string(), "ci".to_string())]);
        let descriptor = adapter_descriptor(
            &config,
            None,
            &env,
            Path::new("/ws/s.robot"),
            install.path(),
            None,
        )
        .unwrap();

        let script = adapter_entry_script(install.path());
        assert_eq!(descriptor.program, python);
        assert_eq!(
            descriptor.args,
            vec!["-u".to_string(), script.to_string_lossy().into_owned()]
        );
        assert_eq!(descriptor.env["ROBOT_ENV"], "ci");
    }

    #[test]
    fn delegated_interpreter_outranks_the_configured_executable() {
        let install = install_root_with_adapter();
        let configured = install.path().join("configured-python");
        let managed = install.path().join("managed-python");
        fs::write(&configured, "").unwrap();
        fs::write(&managed, "").unwrap();

        let config = config_from_value(serde_json::json!({
            "python": { "executable": configured.to_str().unwrap() }
        }));
        let delegated = ManagedEnvironment(InterpreterInfo {
            python_exe: managed.clone(),
            environ: HashMap::from([("MANAGED".to_string(), "1".to_string())]),
            additional_pythonpath_entries: Vec::new(),
        });

        let descriptor = adapter_descriptor(
            &config,
            Some(&delegated),
            &HashMap::new(),
            Path::new("/ws/s.robot"),
            install.path(),
            None,
        )
        .unwrap();
        assert_eq!(descriptor.program, managed);
        assert_eq!(descriptor.env["MANAGED"], "1");
    }

    #[test]
    fn server_interpreter_is_the_fallback_of_last_resort() {
        let install = install_root_with_adapter();
        let server_python = install.path().join("server-python");
        fs::write(&server_python, "").unwrap();

        let descriptor = adapter_descriptor(
            &RobotConfig::default(),
            None,
            &HashMap::new(),
            Path::new("/ws/s.robot"),
            install.path(),
            Some(&server_python),
        )
        .unwrap();
        assert_eq!(descriptor.program, server_python);
    }

    #[test]
    fn no_interpreter_at_all_is_interpreter_not_found() {
        let install = install_root_with_adapter();
        let result = adapter_descriptor(
            &RobotConfig::default(),
            None,
            &HashMap::new(),
            Path::new("/ws/s.robot"),
            install.path(),
            None,
        );
        assert!(matches!(result, Err(LauncherError::InterpreterNotFound(_))));
    }

    #[test]
    fn missing_adapter_script_aborts() {
        let empty = tempfile::tempdir().unwrap();
        let python = empty.path().join("python3");
        fs::write(&python, "").unwrap();

        let config = config_from_value(serde_json::json!({
            "python": { "executable": python.to_str().unwrap() }
        }));
        let result = adapter_descriptor(
            &config,
            None,
            &HashMap::new(),
            Path::new("/ws/s.robot"),
            empty.path(),
            None,
        );
        assert!(matches!(result, Err(LauncherError::EntryScriptMissing(_))));
    }

    #[test]
    fn missing_interpreter_on_disk_aborts() {
        let install = install_root_with_adapter();
        let config = config_from_value(serde_json::json!({
            "python": { "executable": "/definitely/not/here/python3" }
        }));
        let result = adapter_descriptor(
            &config,
            None,
            &HashMap::new(),
            Path::new("/ws/s.robot"),
            install.path(),
            None,
        );
        assert!(matches!(
            result,
            Err(LauncherError::AdapterExecutableMissing(_))
        ));
    }

    // ── launch requests ────────────────────────────────────────────────

    #[test]
    fn testcase_requests_carry_the_test_selection_args() {
        let launcher = DebugLauncher::new(
            config_from_value(serde_json::json!({
                "python": { "env": { "ROBOT_ENV": "ci" } }
            })),
            PathBuf::from("/install"),
            None,
        );
        let document = Url::from_file_path("/ws/tests/login.robot").unwrap();
        let request = DebugLaunchRequest::testcase(document, "Login works".to_string(), false);

        let configuration = launcher
            .configuration_for(&request, Path::new("/ws"))
            .unwrap();
        assert_eq!(configuration.args, vec!["-t", "Login works"]);
        assert_eq!(configuration.env["ROBOT_ENV"], "ci");
        assert_eq!(configuration.cwd, PathBuf::from("/ws"));
        assert_eq!(
            configuration.target,
            PathBuf::from("/ws/tests/login.robot")
        );
        assert!(configuration.name.contains("Testcase: Login works"));
    }

    #[test]
    fn suite_requests_have_no_selection_args() {
        let launcher = DebugLauncher::new(RobotConfig::default(), PathBuf::from("/install"), None);
        let document = Url::from_file_path("/ws/suite.robot").unwrap();
        let request = DebugLaunchRequest::suite(document, true);

        let configuration = launcher
            .configuration_for(&request, Path::new("/ws"))
            .unwrap();
        assert!(configuration.args.is_empty());
        assert!(!configuration.name.contains("Testcase"));
    }

    #[test]
    fn non_file_documents_are_rejected() {
        let launcher = DebugLauncher::new(RobotConfig::default(), PathBuf::from("/install"), None);
        let document = Url::parse("https://example.com/suite.robot").unwrap();
        let request = DebugLaunchRequest::suite(document, true);

        let result = launcher.configuration_for(&request, Path::new("/ws"));
        assert!(matches!(result, Err(LauncherError::InvalidDocument(_))));
    }
}
