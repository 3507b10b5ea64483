//! Launcher for the Robot Framework language server and debug adapter.
//!
//! This crate is the activation layer an editor host embeds: it resolves a
//! python interpreter, reaches the external language server (spawning it over
//! stdio or attaching over a loopback socket), blocks on the readiness
//! handshake, wires `$/customProgress` forwarding, and exposes the debug
//! launcher behind the four run/debug commands. All language analysis and
//! the debug-adapter protocol itself live in the external processes.
//!
//! Host surfaces (dialogs, settings, progress UI) are explicit traits in
//! [`host`]; nothing here reaches for ambient editor state.

pub mod activation;
pub mod commands;
pub mod config;
pub mod debug;
pub mod host;
pub mod progress;
pub mod resolver;
pub mod session;
pub mod transport;
pub mod wire;

mod error;
pub(crate) mod protocol;

pub use activation::{Activation, ActivationContext, activate};
pub use error::LauncherError;
pub use protocol::InitializationOptions;
