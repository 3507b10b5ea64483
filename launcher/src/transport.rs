//! Transport selection — attach to a running server over TCP, or spawn one
//! and talk over its stdio pair.
//!
//! A configured `tcp-port` always wins and never spawns anything; the remote
//! process is managed elsewhere. Otherwise the resolved interpreter runs the
//! bundled entry script with `-u` (unbuffered stdio is non-negotiable for a
//! framed protocol) plus any user-configured extra arguments.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};

use crate::config::RobotConfig;
use crate::error::LauncherError;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Entry script of the bundled language server, under the install root.
#[must_use]
pub fn server_entry_script(install_root: &Path) -> PathBuf {
    install_root
        .join("src")
        .join("robotframework_ls")
        .join("__main__.py")
}

/// How the session will reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// Attach to an already-running server on the loopback interface.
    Tcp { port: u16 },
    /// Spawn `python args...` and use the child's stdio pair.
    Stdio { python: PathBuf, args: Vec<String> },
}

/// Decide the transport for this activation.
pub fn select_transport(
    config: &RobotConfig,
    python: &Path,
    install_root: &Path,
) -> Result<TransportKind, LauncherError> {
    if let Some(port) = config.language_server.tcp_port {
        return Ok(TransportKind::Tcp { port });
    }

    let script = server_entry_script(install_root);
    if !script.is_file() {
        return Err(LauncherError::EntryScriptMissing(script));
    }

    let mut args = vec!["-u".to_string(), script.to_string_lossy().into_owned()];
    args.extend(config.language_server.args.iter().cloned());
    Ok(TransportKind::Stdio {
        python: python.to_path_buf(),
        args,
    })
}

/// One open channel to the server, however it was reached.
pub struct Connection {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
    /// Present when this end spawned the server itself.
    pub child: Option<Child>,
}

/// Open the selected transport.
pub async fn open(kind: TransportKind) -> Result<Connection, LauncherError> {
    match kind {
        TransportKind::Tcp { port } => {
            tracing::info!(port, "connecting to the language server");
            let stream = TcpStream::connect(("127.0.0.1", port))
                .await
                .map_err(|source| LauncherError::Connect { port, source })?;
            let (read_half, write_half) = stream.into_split();
            Ok(Connection {
                reader: Box::new(read_half),
                writer: Box::new(write_half),
                child: None,
            })
        }
        TransportKind::Stdio { python, args } => {
            tracing::info!(
                python = %python.display(),
                ?args,
                "starting the language server"
            );
            let mut child = Command::new(&python)
                .args(&args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| LauncherError::Spawn {
                    program: python.clone(),
                    source,
                })?;
            let stdout = child
                .stdout
                .take()
                .ok_or(LauncherError::ChildPipe("stdout"))?;
            let stdin = child
                .stdin
                .take()
                .ok_or(LauncherError::ChildPipe("stdin"))?;
            Ok(Connection {
                reader: Box::new(stdout),
                writer: Box::new(stdin),
                child: Some(child),
            })
        }
    }
}
