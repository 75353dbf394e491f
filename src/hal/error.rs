use thiserror::Error;

/// Failure reported by a device primitive.
///
/// The variants the flow controller reacts to get their own names; anything
/// else is carried through as an OS error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PcmError {
    #[error("interrupted system call")]
    Interrupted,
    #[error("resource temporarily unavailable")]
    WouldBlock,
    #[error("device or resource busy")]
    Busy,
    #[error("stream is suspended")]
    Suspended,
    #[error("buffer underrun")]
    Underrun,
    #[error("operation not supported by device")]
    Unsupported,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("no such device")]
    NoSuchDevice,
    #[error("{message} (errno {errno})")]
    Os { errno: i32, message: String },
}

impl PcmError {
    /// Errors the write loop retries without touching the stream
    pub fn is_transient(&self) -> bool {
        matches!(self, PcmError::Interrupted | PcmError::WouldBlock)
    }
}
