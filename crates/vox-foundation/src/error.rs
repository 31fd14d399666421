use std::time::Duration;
use thiserror::Error;

/// Top-level error taxonomy for the server. Subsystem errors fold up into
/// this via `#[from]` so a session loop can propagate with `?` and still log
/// a specific cause at the boundary.
#[derive(Error, Debug)]
pub enum VoxError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Vad(#[from] VadError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("shutdown requested")]
    ShutdownRequested,

    #[error("fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("transient error, will retry: {0}")]
    Transient(String),
}

impl From<tokio::task::JoinError> for VoxError {
    fn from(err: tokio::task::JoinError) -> Self {
        VoxError::Transient(format!("task join failed: {err}"))
    }
}

/// Transient I/O errors on the transport boundary. Policy (spec §7): log and
/// terminate the session on read failure; log-and-retry-next-chunk on write.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("serialize failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("unsupported payload kind")]
    UnsupportedPayload,
}

/// Errors from the frame-processor runtime and pipeline composer.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("queue closed for processor {processor}")]
    QueueClosed { processor: String },

    #[error("drain timed out after {0:?}")]
    DrainTimeout(Duration),

    #[error("processor {processor} panicked: {reason}")]
    ProcessorPanicked { processor: String, reason: String },
}

/// VAD / voice-confidence provider errors.
#[derive(Error, Debug)]
pub enum VadError {
    #[error("voice confidence model failed: {0}")]
    ModelFailed(String),

    #[error("invalid window size: expected {expected}, got {actual}")]
    InvalidWindowSize { expected: usize, actual: usize },
}

/// LLM / tool execution errors (spec §7: decode errors and tool errors are
/// log-and-skip, not session-terminating).
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("provider call failed: {0}")]
    ProviderFailed(String),

    #[error("tool {name} not registered")]
    ToolNotFound { name: String },

    #[error("tool {name} argument decode failed: {source}")]
    ToolArgsInvalid {
        name: String,
        source: serde_json::Error,
    },

    #[error("tool {name} execution failed: {reason}")]
    ToolExecutionFailed { name: String, reason: String },

    #[error("tool-round cap exceeded ({0} rounds)")]
    ToolRoundCapExceeded(u32),
}

/// Resource-pool errors (spec §7: fatal only when zero instances survive
/// init; a runtime `get()` timeout is not an error, it is a fallback path).
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("factory produced zero instances")]
    InitFailedNoInstances,

    #[error("factory failed: {0}")]
    FactoryFailed(String),

    #[error("instance reset failed: {0}")]
    ResetFailed(String),

    #[error("pool is shutting down")]
    ShuttingDown,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration parsing error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("environment variable error: {0}")]
    EnvVar(String),
}
