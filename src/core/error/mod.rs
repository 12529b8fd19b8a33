use thiserror::Error;

/// Failure of a blocking queue operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue was closed and holds no more values
    #[error("message queue is closed")]
    Closed,
    /// No value arrived before the deadline
    #[error("timed out waiting for a message")]
    Timeout,
}

/// Errors surfaced by a traffic light
#[derive(Debug, Error)]
pub enum LightError {
    #[error("the phase cycle is already running")]
    AlreadySimulating,
    #[error("the traffic light has been shut down")]
    ShutDown,
    #[error("timed out waiting for the light to turn green")]
    Timeout,
    #[error("invalid light configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to spawn the phase cycle thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

impl From<QueueError> for LightError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Closed => LightError::ShutDown,
            QueueError::Timeout => LightError::Timeout,
        }
    }
}
