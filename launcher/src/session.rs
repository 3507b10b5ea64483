//! Client session — one live connection to the language server.
//!
//! Construction is the readiness handshake: [`ClientSession::start`] returns
//! only after the server has answered `initialize` and the `initialized`
//! notification is queued. Nothing server-backed (the progress stream, the
//! run/debug commands) can be reached before that point, so "commands before
//! ready" is unrepresentable rather than merely forbidden.
//!
//! One session exists per activation; replacing the configuration that shaped
//! it requires a fresh activation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::LauncherError;
use crate::progress::{CUSTOM_PROGRESS, ProgressReport};
use crate::protocol::{self, Incoming, InitializationOptions};
use crate::transport::Connection;
use crate::wire::{MessageReader, MessageWriter};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const OUTBOX_CAPACITY: usize = 64;

const PROGRESS_CAPACITY: usize = 256;

enum Outgoing {
    Frame(Value),
    Stop,
}

type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

pub struct ClientSession {
    outbox: mpsc::Sender<Outgoing>,
    next_id: u64,
    pending: PendingReplies,
    child: Option<tokio::process::Child>,
    reader_task: JoinHandle<()>,
    #[allow(dead_code)]
    writer_task: JoinHandle<()>,
}

impl ClientSession {
    /// Establish the session and run the readiness handshake.
    ///
    /// The progress receiver is handed out only after the handshake, so no
    /// consumer can observe a pre-ready session.
    pub async fn start(
        connection: Connection,
        root_uri: Option<&str>,
        options: &InitializationOptions,
    ) -> Result<(Self, mpsc::Receiver<ProgressReport>), LauncherError> {
        let Connection {
            reader,
            writer,
            child,
        } = connection;

        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let (outbox, mut outbox_rx) = mpsc::channel::<Outgoing>(OUTBOX_CAPACITY);
        let (progress_tx, progress_rx) = mpsc::channel::<ProgressReport>(PROGRESS_CAPACITY);

        let writer_task = tokio::spawn(async move {
            let mut writer = MessageWriter::new(writer);
            while let Some(item) = outbox_rx.recv().await {
                match item {
                    Outgoing::Frame(frame) => {
                        if let Err(e) = writer.write_message(&frame).await {
                            tracing::warn!("language server write failed: {e}");
                            break;
                        }
                    }
                    Outgoing::Stop => break,
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_outbox = outbox.clone();
        let reader_task = tokio::spawn(async move {
            let mut reader = MessageReader::new(reader);
            loop {
                match reader.next_frame().await {
                    Ok(Some(frame)) => {
                        dispatch(&frame, &reader_pending, &progress_tx, &reader_outbox).await;
                    }
                    Ok(None) => {
                        tracing::info!("language server closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("language server read failed: {e}");
                        break;
                    }
                }
            }
            // Dropping the reply senders wakes every in-flight request with
            // a closed-channel error instead of a 30s timeout.
            reader_pending.lock().await.clear();
        });

        let mut session = Self {
            outbox,
            next_id: 1,
            pending,
            child,
            reader_task,
            writer_task,
        };
        session.initialize(root_uri, options).await?;
        Ok((session, progress_rx))
    }

    async fn initialize(
        &mut self,
        root_uri: Option<&str>,
        options: &InitializationOptions,
    ) -> Result<(), LauncherError> {
        let params = protocol::initialize_params(root_uri, options);
        let response = self.request("initialize", Some(params)).await?;
        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(LauncherError::Handshake(message.to_string()));
        }
        self.notify("initialized", Some(serde_json::json!({})))
            .await
    }

    /// Send a request and await the server's reply.
    pub async fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, LauncherError> {
        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = protocol::request_frame(id, method, params);
        if self.outbox.send(Outgoing::Frame(frame)).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(LauncherError::ConnectionClosed);
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                self.pending.lock().await.remove(&id);
                Err(LauncherError::ConnectionClosed)
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(LauncherError::Timeout)
            }
        }
    }

    /// Send a notification; fire-and-forget.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), LauncherError> {
        let frame = protocol::notification_frame(method, params);
        self.outbox
            .send(Outgoing::Frame(frame))
            .await
            .map_err(|_| LauncherError::ConnectionClosed)
    }

    /// Gracefully tear the session down. Consumes self.
    pub async fn shutdown(mut self) {
        if let Ok(response) = self.request("shutdown", None).await
            && response.get("error").is_none()
        {
            let _ = self.notify("exit", None).await;
        }

        let _ = self.outbox.send(Outgoing::Stop).await;

        if let Some(mut child) = self.child.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, child.wait())
                .await
                .is_err()
            {
                tracing::debug!("language server did not exit in time, killing");
                let _ = child.kill().await;
            }
        }
        self.reader_task.abort();
    }
}

async fn dispatch(
    frame: &Value,
    pending: &Mutex<HashMap<u64, oneshot::Sender<Value>>>,
    progress_tx: &mpsc::Sender<ProgressReport>,
    outbox: &mpsc::Sender<Outgoing>,
) {
    let Some(incoming) = protocol::classify(frame) else {
        tracing::trace!("ignoring a malformed frame from the language server");
        return;
    };

    match incoming {
        Incoming::Response { id, body } => {
            if let Some(tx) = pending.lock().await.remove(&id) {
                let _ = tx.send(body);
            }
        }
        Incoming::Request { id, method } => {
            // The server blocks on unanswered requests, so reply even when
            // the method means nothing to a launcher.
            tracing::debug!(%method, "answering a server request with method-not-found");
            let reply = protocol::method_not_found(&id, &method);
            let _ = outbox.send(Outgoing::Frame(reply)).await;
        }
        Incoming::Notification { method, params } if method == CUSTOM_PROGRESS => {
            let Some(params) = params else { return };
            match serde_json::from_value::<ProgressReport>(params) {
                Ok(report) => {
                    let _ = progress_tx.send(report).await;
                }
                Err(e) => tracing::debug!("malformed $/customProgress payload: {e}"),
            }
        }
        Incoming::Notification { method, .. } => {
            tracing::trace!(%method, "ignoring a server notification");
        }
    }
}
