//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Requested event is not in the file.
    #[error("event {0} not found")]
    EventNotFound(u64),

    /// Requested telescope did not trigger on the event.
    #[error("telescope {tel_id} not found in event {event_id}")]
    TelescopeNotFound { event_id: u64, tel_id: u32 },

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] simcrop_core::Error),
}
