use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Bus errors
    #[error("Bus transmission failed: {0}")]
    Bus(String),

    // Link errors
    #[error("Timed out after {timeout_ms}ms waiting for reader ready")]
    TimedOut { timeout_ms: u64 },

    #[error("Reader busy or frame malformed: {0}")]
    Busy(String),

    #[error("Link write failed: {0}")]
    Link(String),

    // Validation errors
    #[error("Invalid bus channel {0}: must be 0-7")]
    InvalidChannel(u8),

    #[error("Invalid clip slot {0}: must be 0-5")]
    InvalidSlot(u8),

    #[error("Invalid tag UID: {0}")]
    InvalidUid(String),

    #[error("Invalid display line {line}: display has {max} lines")]
    InvalidLine { line: usize, max: usize },

    // Mapping table errors
    #[error("Mapping table error: {0}")]
    Table(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Bus transmission failure with a formatted message.
    pub fn bus(message: impl Into<String>) -> Self {
        Error::Bus(message.into())
    }

    /// Readiness deadline exceeded.
    pub fn timed_out(timeout_ms: u64) -> Self {
        Error::TimedOut { timeout_ms }
    }

    /// Malformed or unready response from a device that answered.
    pub fn busy(message: impl Into<String>) -> Self {
        Error::Busy(message.into())
    }

    /// Write-side link failure.
    pub fn link(message: impl Into<String>) -> Self {
        Error::Link(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
