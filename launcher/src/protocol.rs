//! JSON-RPC frame construction and classification for the server session.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Value, json};

/// Options handed to the server inside the `initialize` request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InitializationOptions {
    /// Plugins directory contributed by the sibling extension, when present.
    #[serde(rename = "pluginsDir", skip_serializing_if = "Option::is_none")]
    pub plugins_dir: Option<PathBuf>,
}

pub(crate) fn request_frame(id: u64, method: &str, params: Option<Value>) -> Value {
    let mut frame = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(params) = params {
        frame["params"] = params;
    }
    frame
}

pub(crate) fn notification_frame(method: &str, params: Option<Value>) -> Value {
    let mut frame = json!({
        "jsonrpc": "2.0",
        "method": method,
    });
    if let Some(params) = params {
        frame["params"] = params;
    }
    frame
}

/// Reply sent for server-to-client requests this launcher does not implement.
/// The server may block awaiting an answer, so every request gets one.
pub(crate) fn method_not_found(id: &Value, method: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": -32601,
            "message": format!("Method not found: {method}"),
        }
    })
}

pub(crate) fn initialize_params(root_uri: Option<&str>, options: &InitializationOptions) -> Value {
    json!({
        "processId": std::process::id(),
        "rootUri": root_uri,
        "capabilities": {
            "workspace": {
                "configuration": true,
                "didChangeConfiguration": { "dynamicRegistration": false },
            },
            "textDocument": {
                "synchronization": {
                    "dynamicRegistration": false,
                    "willSave": false,
                    "willSaveWaitUntil": false,
                    "didSave": true,
                },
            },
        },
        "initializationOptions": options,
    })
}

/// Classification of a frame arriving from the server.
#[derive(Debug)]
pub(crate) enum Incoming {
    /// Answer to one of our requests.
    Response { id: u64, body: Value },
    /// Server-to-client request; must be answered.
    Request { id: Value, method: String },
    Notification {
        method: String,
        params: Option<Value>,
    },
}

pub(crate) fn classify(frame: &Value) -> Option<Incoming> {
    let id = frame.get("id");
    let method = frame.get("method").and_then(Value::as_str);
    let is_reply = frame.get("result").is_some() || frame.get("error").is_some();

    match (id, method, is_reply) {
        (Some(id), None, true) => Some(Incoming::Response {
            id: id.as_u64()?,
            body: frame.clone(),
        }),
        (Some(id), Some(method), _) => Some(Incoming::Request {
            id: id.clone(),
            method: method.to_string(),
        }),
        (None, Some(method), _) => Some(Incoming::Notification {
            method: method.to_string(),
            params: frame.get("params").cloned(),
        }),
        _ => None,
    }
}
