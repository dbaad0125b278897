/// Errors from session setup, shutdown, and cache writes.
///
/// Link faults are not errors here; they end up in [`SessionReport`](crate::SessionReport).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The key is reserved for link status.
    #[error("cache key '{0}' is reserved")]
    ReservedKey(String),

    /// The producer thread could not be started.
    #[error("failed to spawn session thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The producer thread panicked.
    #[error("session thread panicked")]
    Panicked,
}

/// Errors a [`SampleSink`](crate::SampleSink) reports back to the session.
///
/// The session logs and counts these; they never stop reception.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The consumer is not keeping up; the sample was dropped.
    #[error("sink queue full")]
    Full,

    /// The consumer went away.
    #[error("sink receiver disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, SessionError>;
