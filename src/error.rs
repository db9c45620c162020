//! Error types for the scheduling core.
//!
//! Injected strategies ([`Scanner`](crate::scanner::Scanner),
//! [`Checker`](crate::checker::Checker)) report failures with
//! [`anyhow::Error`]; everything owned by the core uses [`Error`].

use crate::model::{CheckId, ResourceId};

/// Errors raised by the scheduling core and its in-process collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Subscribing to a notification channel failed. Fatal at startup.
    #[error("failed to listen on channel {channel}: {source}")]
    Listen {
        channel: String,
        #[source]
        source: Box<Error>,
    },

    /// The notification bus no longer accepts subscribers.
    #[error("notification bus is closed")]
    BusClosed,

    #[error("no active subscription on channel {channel}")]
    UnknownSubscription { channel: String },

    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),

    #[error("unknown check {0}")]
    UnknownCheck(CheckId),

    /// A supervised member failed before it became ready.
    #[error("{name} failed: {source}")]
    MemberFailed {
        name: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// A supervised member returned without being asked to stop.
    #[error("{name} exited unexpectedly")]
    MemberExited { name: &'static str },

    #[error("{name} panicked")]
    MemberPanicked { name: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
