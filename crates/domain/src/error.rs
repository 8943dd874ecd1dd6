/// Shared error type used across all warden crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Canonicalization failure or integrity-hash mismatch.
    #[error("integrity: {0}")]
    Integrity(String),

    /// The risk engine blocked an operation.
    #[error("policy blocked: {0}")]
    PolicyBlocked(String),

    /// Approval token rejected, expired, or malformed.
    #[error("approval: {0}")]
    Approval(String),

    /// A tool invocation failed in the external substrate.
    #[error("tool execution: {0}")]
    ToolExecution(String),

    /// A path resolved outside its sandbox root.
    #[error("path escape: {0}")]
    PathEscape(String),

    /// A persisted snapshot failed schema validation on load.
    #[error("state corruption: {0}")]
    StateCorruption(String),

    /// The reasoning oracle returned malformed or no output.
    #[error("oracle: {0}")]
    Oracle(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
