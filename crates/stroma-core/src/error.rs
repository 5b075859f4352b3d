//! Error types shared across the Stroma workspace.
//!
//! Sub-system specific errors (lattice construction, model stepping,
//! field solving) live in their own crates; this module holds the two
//! kinds that cut across crate boundaries: configuration extraction and
//! frame exchange with external collaborators.

use std::error::Error;
use std::fmt;

/// Errors from extracting typed values out of a [`Params`](crate::Params)
/// mapping. Always fatal at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required parameter is absent from the mapping.
    MissingKey {
        /// Name of the missing parameter.
        key: String,
    },
    /// A parameter is present but holds the wrong kind of value.
    WrongType {
        /// Name of the offending parameter.
        key: String,
        /// The kind the caller asked for ("float", "int", "text").
        expected: &'static str,
    },
    /// A parameter parsed but violates a structural constraint.
    Invalid {
        /// Name of the offending parameter.
        key: String,
        /// What went wrong.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey { key } => write!(f, "missing required parameter '{key}'"),
            Self::WrongType { key, expected } => {
                write!(f, "parameter '{key}' is not a {expected}")
            }
            Self::Invalid { key, reason } => {
                write!(f, "parameter '{key}' is invalid: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Errors from exchanging coupling frames with an external store.
///
/// Raised by [`FrameSink`](crate::FrameSink) / [`FrameStore`](crate::FrameStore)
/// implementations. In coexecution mode a load failure means the
/// upstream sub-model's output never arrived, which is fatal.
#[derive(Debug)]
pub enum FrameError {
    /// The expected input is not present at the given location.
    MissingInput {
        /// Where the frame was expected.
        path: std::path::PathBuf,
    },
    /// The store produced a frame whose sample count does not match the
    /// consumer's site count.
    LengthMismatch {
        /// Name of the offending series.
        quantity: String,
        /// Samples in the frame.
        got: usize,
        /// Sites expected by the consumer.
        expected: usize,
    },
    /// The underlying store failed to read or write.
    Io(std::io::Error),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput { path } => {
                write!(f, "coupling input missing at {}", path.display())
            }
            Self::LengthMismatch {
                quantity,
                got,
                expected,
            } => write!(
                f,
                "series '{quantity}' has {got} samples, consumer has {expected} sites"
            ),
            Self::Io(e) => write!(f, "frame store I/O failed: {e}"),
        }
    }
}

impl Error for FrameError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
