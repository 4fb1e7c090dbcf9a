//! Error types for the position channel.

/// Errors that can occur while talking to the position channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to connect to or communicate with the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),

    /// A payload could not be serialized.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
