use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SpawnError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("task failed: {0}")]
    TaskFailed(String),
    #[error("task panicked: {0}")]
    Panic(String),
    #[error("task queue is full")]
    QueueFull,
    #[error("pool is shut down")]
    ShutDown,
    #[error("result channel closed")]
    ChannelClosed,
    #[error("timed out waiting for task")]
    Timeout,
    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawn(String),
}
