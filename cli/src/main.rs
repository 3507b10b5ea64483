//! rfl - standalone harness around the launcher library.
//!
//! Drives the same activation sequence an editor host would, with every host
//! surface mapped to the terminal: `serve` brings the language server up and
//! holds the session until Ctrl-C; the run/debug commands resolve an
//! interpreter, build the adapter descriptor, and launch a suite or a single
//! testcase.
//!
//! Logging goes to stderr via `tracing`; stdout stays free since spawned
//! children may multiplex protocol traffic with ours.

mod host;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;
use url::Url;

use rfl_launcher::activation::{ActivationContext, activate};
use rfl_launcher::commands::CommandSet;
use rfl_launcher::config::RobotConfig;
use rfl_launcher::debug::{DebugLauncher, DebugSession};
use rfl_launcher::host::Host;
use rfl_launcher::resolver::{ExecutableResolution, resolve_server_python};

use host::{
    LoggingSettings, SingleFolderWorkspace, StaticConfiguration, TerminalProgress, TerminalUi,
};

const USAGE: &str = "\
usage: rfl [--settings FILE] [--install-root DIR] [--workspace DIR] <command>

commands:
  serve                          start the language server, hold until Ctrl-C
  run-suite <file.robot>         run a whole suite (no debugging)
  debug-suite <file.robot>       debug a whole suite
  run-case <file.robot> <test>   run a single testcase
  debug-case <file.robot> <test> debug a single testcase

--settings points at a JSON file holding the `robot` settings namespace.";

#[derive(Debug)]
enum CliCommand {
    Serve,
    RunSuite(PathBuf),
    DebugSuite(PathBuf),
    RunCase(PathBuf, String),
    DebugCase(PathBuf, String),
}

#[derive(Debug)]
struct Invocation {
    settings: Option<PathBuf>,
    install_root: PathBuf,
    workspace: PathBuf,
    command: CliCommand,
}

fn parse_args(mut args: Vec<String>) -> Result<Invocation> {
    let mut settings = None;
    let mut install_root = None;
    let mut workspace = None;

    let mut positional = Vec::new();
    args.reverse();
    while let Some(arg) = args.pop() {
        match arg.as_str() {
            "--settings" => settings = Some(PathBuf::from(take_value(&mut args, "--settings")?)),
            "--install-root" => {
                install_root = Some(PathBuf::from(take_value(&mut args, "--install-root")?));
            }
            "--workspace" => workspace = Some(PathBuf::from(take_value(&mut args, "--workspace")?)),
            "--help" | "-h" => bail!("{USAGE}"),
            _ => positional.push(arg),
        }
    }

    let cwd = std::env::current_dir().context("reading the working directory")?;
    let command = match positional.split_first() {
        Some((name, rest)) => match (name.as_str(), rest) {
            ("serve", []) => CliCommand::Serve,
            ("run-suite", [file]) => CliCommand::RunSuite(PathBuf::from(file)),
            ("debug-suite", [file]) => CliCommand::DebugSuite(PathBuf::from(file)),
            ("run-case", [file, test]) => CliCommand::RunCase(PathBuf::from(file), test.clone()),
            ("debug-case", [file, test]) => {
                CliCommand::DebugCase(PathBuf::from(file), test.clone())
            }
            _ => bail!("unrecognized command line\n\n{USAGE}"),
        },
        None => bail!("{USAGE}"),
    };

    Ok(Invocation {
        settings,
        install_root: install_root.unwrap_or_else(|| cwd.clone()),
        workspace: workspace.unwrap_or(cwd),
        command,
    })
}

fn take_value(args: &mut Vec<String>, flag: &str) -> Result<String> {
    args.pop().with_context(|| format!("{flag} needs a value"))
}

fn load_config(settings: Option<&Path>) -> Result<RobotConfig> {
    let Some(path) = settings else {
        return Ok(RobotConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let mut value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    // Accept both a full settings document and the bare namespace.
    let namespace = match value.get_mut("robot") {
        Some(robot) => robot.take(),
        None => value,
    };
    RobotConfig::from_value(namespace).context("deserializing the robot settings namespace")
}

fn terminal_host(workspace: PathBuf) -> Host {
    Host {
        ui: Arc::new(TerminalUi),
        settings: Arc::new(LoggingSettings),
        progress: Arc::new(TerminalProgress),
        watcher: Arc::new(StaticConfiguration),
        workspace: Arc::new(SingleFolderWorkspace::new(workspace)),
        delegated: None,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn serve(config: RobotConfig, invocation: &Invocation) -> Result<()> {
    let activation = activate(ActivationContext {
        config,
        install_root: invocation.install_root.clone(),
        workspace_root: Some(invocation.workspace.clone()),
        host: terminal_host(invocation.workspace.clone()),
    })
    .await
    .context("establishing the language server session")?;

    let Some(activation) = activation else {
        bail!("activation aborted; see the log for the reason");
    };

    tracing::info!("session ready; Ctrl-C stops the server");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    activation.shutdown().await;
    Ok(())
}

/// Build the command set the way activation would, minus the server session:
/// launching suites only needs an interpreter and the adapter script.
fn command_set(config: RobotConfig, invocation: &Invocation) -> Result<CommandSet> {
    let path_var = std::env::var_os("PATH").unwrap_or_default();
    let python = match resolve_server_python(&config, None, &path_var) {
        ExecutableResolution::Found(python) => python,
        ExecutableResolution::Missing(message) => bail!("{message}"),
    };

    let launcher = Arc::new(DebugLauncher::new(
        config,
        invocation.install_root.clone(),
        Some(python),
    ));
    Ok(CommandSet::new(
        launcher,
        Arc::new(SingleFolderWorkspace::new(invocation.workspace.clone())),
        None,
    ))
}

fn document_url(file: &Path) -> Result<Url> {
    let absolute = std::path::absolute(file)
        .with_context(|| format!("resolving {}", file.display()))?;
    Url::from_file_path(&absolute)
        .map_err(|()| anyhow::anyhow!("cannot express {} as a file URL", absolute.display()))
}

async fn finish(mut session: DebugSession) -> Result<()> {
    let status = session.wait().await.context("waiting for the adapter")?;
    if !status.success() {
        bail!("adapter exited with {status}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let invocation = parse_args(std::env::args().skip(1).collect())?;
    let config = load_config(invocation.settings.as_deref())?;

    match &invocation.command {
        CliCommand::Serve => serve(config, &invocation).await,
        CliCommand::RunSuite(file) => {
            let commands = command_set(config, &invocation)?;
            finish(commands.run_testsuite(document_url(file)?).await?).await
        }
        CliCommand::DebugSuite(file) => {
            let commands = command_set(config, &invocation)?;
            finish(commands.debug_testsuite(document_url(file)?).await?).await
        }
        CliCommand::RunCase(file, test) => {
            let commands = command_set(config, &invocation)?;
            finish(commands.run_testcase(document_url(file)?, test.clone()).await?).await
        }
        CliCommand::DebugCase(file, test) => {
            let commands = command_set(config, &invocation)?;
            finish(
                commands
                    .debug_testcase(document_url(file)?, test.clone())
                    .await?,
            )
            .await
        }
    }
}
