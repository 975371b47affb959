//! Unified error types for GarageWatch.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! service's error handling uniform.  All variants are `Copy` so they can be
//! passed through the poller and the FSM without allocation.
//!
//! Collaborator failures (camera commands, subscribers, telemetry sinks) are
//! not represented here: those return `anyhow::Result` and are logged and
//! swallowed by the core.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible core operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The sensor bus could not be read.
    Bus(BusError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// An operation was called at the wrong point of the service lifecycle.
    Lifecycle(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Lifecycle(msg) => write!(f, "lifecycle: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// Transient failures of a raw block read.  The poller treats every variant
/// as "no data this tick".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The device did not acknowledge its address or the register write.
    Nack,
    /// Bus-level fault (arbitration loss, misplaced start/stop).
    BusFault,
    /// Data was lost because it was not read fast enough.
    Overrun,
    /// The device-level timeout expired.
    Timeout,
    /// Any other controller error.
    Other,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nack => write!(f, "no acknowledge"),
            Self::BusFault => write!(f, "bus fault"),
            Self::Overrun => write!(f, "overrun"),
            Self::Timeout => write!(f, "timeout"),
            Self::Other => write!(f, "bus error"),
        }
    }
}

impl From<embedded_hal::i2c::ErrorKind> for BusError {
    fn from(kind: embedded_hal::i2c::ErrorKind) -> Self {
        use embedded_hal::i2c::ErrorKind;
        match kind {
            ErrorKind::NoAcknowledge(_) => Self::Nack,
            ErrorKind::Bus | ErrorKind::ArbitrationLoss => Self::BusFault,
            ErrorKind::Overrun => Self::Overrun,
            _ => Self::Other,
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from [`ConfigPort`](crate::app::ports::ConfigPort) operations and
/// [`SystemConfig::validate`](crate::config::SystemConfig::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No stored config found (first run).
    NotFound,
    /// Stored config failed to deserialize.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
