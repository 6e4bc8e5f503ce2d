//! Configuration load/store error types.

use core::fmt;

use crate::traits::FlashError;

/// Why a persisted record could not be trusted.
///
/// Every variant recovers the same way: the store substitutes the
/// built-in defaults and sets the persistent history-bad flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFault {
    /// No slot carries the record magic; storage was never written.
    Empty,
    /// A record was found but its version is not loadable.
    VersionMismatch {
        /// Version found in the record header.
        found: u16,
    },
    /// The integrity code (or record framing) does not verify.
    IntegrityMismatch,
}

impl fmt::Display for ConfigFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFault::Empty => write!(f, "configuration storage is uninitialized"),
            ConfigFault::VersionMismatch { found } => {
                write!(f, "configuration record version {} is not loadable", found)
            }
            ConfigFault::IntegrityMismatch => {
                write!(f, "configuration record failed its integrity check")
            }
        }
    }
}

/// Errors raised while persisting the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The underlying flash operation failed.
    Flash(FlashError),
    /// The freshly written record did not read back verbatim.
    VerifyFailed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Flash(e) => write!(f, "config save failed: {}", e),
            ConfigError::VerifyFailed => {
                write!(f, "config save read-back verification failed")
            }
        }
    }
}

impl From<FlashError> for ConfigError {
    fn from(e: FlashError) -> Self {
        ConfigError::Flash(e)
    }
}
