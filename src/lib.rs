//! Chat Widget - embeddable website chat widget core
//!
//! This library provides the parts of the widget that carry actual behavior:
//! a resilient request client for the chat backend, the visibility lifecycle
//! of the widget (expanded / collapsed / closed) with persistence, the
//! conversation model, and a controller that hosts drive. Drawing is left to
//! a [`renderer::Renderer`] implementation supplied by the host.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod history;
pub mod lifecycle;
pub mod renderer;
pub mod session;
pub mod store;

pub use client::{ChatClient, ChatError, Reply, RetryPolicy};
pub use config::{Config, InitOptions};
pub use controller::{Action, Controller};
pub use lifecycle::{MobileStatePolicy, Transition, VisualState, WidgetLifecycle};

/// Result type alias for widget operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for widget operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or incomplete configuration, raised before any widget exists
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key-value store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Widget registry error
    #[error("Widget error: {0}")]
    Widget(String),

    /// No widget is mounted for the requested container
    #[error("Widget not initialized: {0}")]
    NotInitialized(String),

    /// A send is already pending for this widget
    #[error("A message is already being sent")]
    SendInProgress,

    /// Message rejected before reaching the network
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Terminal outcome of a chat request
    #[error(transparent)]
    Request(#[from] ChatError),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Initialize the widget library with logging
pub fn init() {
    let _ = tracing_subscriber::fmt::try_init();
}

#[cfg(test)]
mod tests;
