//! Error types for the cheddar controller.

/// Top-level error type for the controller and its host bridge.
#[derive(Debug, thiserror::Error)]
pub enum CheddarError {
    /// Configuration file or parameter error.
    #[error("config error: {0}")]
    Config(String),

    /// Persistent settings store error.
    #[error("settings error: {0}")]
    Settings(String),

    /// Host envelope or payload violated the wire contract.
    #[error("contract error: {0}")]
    Contract(#[from] crate::host::contract::ContractError),

    /// The host received the request and rejected it.
    #[error("host rejected {operation}: {message}")]
    HostRejected { operation: String, message: String },

    /// Channel send/receive error (host gone, response dropped).
    #[error("channel error: {0}")]
    Channel(String),

    /// Conversation storage collaborator error.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, CheddarError>;
