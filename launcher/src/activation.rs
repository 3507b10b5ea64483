//! Activation — the startup sequence an embedding host drives once per
//! window.
//!
//! Order matters: interpreter resolution, transport selection, session
//! establishment (blocking on the readiness handshake), then progress
//! forwarding, debugger wiring and command registration. The reload watcher
//! is installed on every exit path, success or abort, so a later settings fix
//! can prompt for a fresh activation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::commands::CommandSet;
use crate::config::{RELOAD_SETTINGS, RobotConfig};
use crate::debug::DebugLauncher;
use crate::error::LauncherError;
use crate::host::Host;
use crate::progress::ProgressTracker;
use crate::protocol::InitializationOptions;
use crate::resolver::{self, ExecutableResolution};
use crate::session::ClientSession;
use crate::transport;

/// Everything activation needs, handed in explicitly.
pub struct ActivationContext {
    pub config: RobotConfig,
    /// Install location of the extension payload; entry scripts live below.
    pub install_root: PathBuf,
    /// Workspace root used for the server's `rootUri`, when there is one.
    pub workspace_root: Option<PathBuf>,
    pub host: Host,
}

/// A live, ready activation. Dropping it tears down the progress forwarder;
/// call [`Activation::shutdown`] for a graceful server stop.
pub struct Activation {
    pub session: ClientSession,
    pub commands: CommandSet,
    progress_task: tokio::task::JoinHandle<()>,
}

impl Activation {
    pub async fn shutdown(self) {
        self.session.shutdown().await;
        self.progress_task.abort();
    }
}

/// Run the activation sequence.
///
/// `Ok(None)` is a user-visible abort (no interpreter chosen, entry script
/// missing): the host stays loaded, the reload watcher stays armed, and a
/// configuration fix can start over. `Err` is an establishment failure the
/// caller reports.
pub async fn activate(ctx: ActivationContext) -> Result<Option<Activation>, LauncherError> {
    let started = Instant::now();
    let outcome = activate_inner(&ctx, started).await;
    install_reload_watcher(&ctx.host);
    outcome
}

async fn activate_inner(
    ctx: &ActivationContext,
    started: Instant,
) -> Result<Option<Activation>, LauncherError> {
    let host = &ctx.host;
    let delegated = host.delegated.as_deref();

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    let python = match resolver::resolve_server_python(&ctx.config, delegated, &path_var) {
        ExecutableResolution::Found(python) => python,
        ExecutableResolution::Missing(message) => {
            tracing::warn!("{message}");
            match pick_interpreter_interactively(host, &message) {
                Some(python) => python,
                None => {
                    tracing::info!("unable to start: no python executable specified");
                    return Ok(None);
                }
            }
        }
    };

    let mut options = InitializationOptions::default();
    if let Some(dir) = delegated.and_then(|d| d.plugins_dir()) {
        tracing::info!(dir = %dir.display(), "plugins dir");
        options.plugins_dir = Some(dir);
    }

    let kind = match transport::select_transport(&ctx.config, &python, &ctx.install_root) {
        Ok(kind) => kind,
        Err(error @ LauncherError::EntryScriptMissing(_)) => {
            host.ui.warn(&error.to_string());
            return Ok(None);
        }
        Err(error) => return Err(error),
    };
    let connection = transport::open(kind).await?;

    let root_uri = ctx
        .workspace_root
        .as_deref()
        .and_then(|root| url::Url::from_file_path(root).ok())
        .map(String::from);

    tracing::info!("waiting for the language server to finish activating");
    let (session, mut progress_rx) =
        ClientSession::start(connection, root_uri.as_deref(), &options).await?;
    tracing::info!(elapsed = ?started.elapsed(), "language server ready");

    let reporter = host.progress.clone();
    let progress_task = tokio::spawn(async move {
        let mut tracker = ProgressTracker::new();
        while let Some(report) = progress_rx.recv().await {
            tracker.handle(report, reporter.as_ref());
        }
    });

    let launcher = Arc::new(DebugLauncher::new(
        ctx.config.clone(),
        ctx.install_root.clone(),
        Some(python),
    ));
    let commands = CommandSet::new(launcher, host.workspace.clone(), host.delegated.clone());

    Ok(Some(Activation {
        session,
        commands,
        progress_task,
    }))
}

/// Offer to persist a manually chosen interpreter. A selected file is used
/// directly; declining any step aborts activation.
fn pick_interpreter_interactively(host: &Host, message: &str) -> Option<PathBuf> {
    let target = host.ui.ask_save_target(message)?;
    let python = host.ui.pick_executable()?;
    host.settings.persist_server_python(&python, target);
    Some(python)
}

fn install_reload_watcher(host: &Host) {
    let ui = host.ui.clone();
    host.watcher.watch(
        RELOAD_SETTINGS,
        Box::new(move |setting| {
            if ui.confirm_reload(setting) {
                ui.reload();
            }
        }),
    );
}
