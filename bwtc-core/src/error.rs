//! Error types for the entropy back-end.
//!
//! Every fallible operation in `bwtc-core` and `bwtc-entropy` returns
//! [`Result`]. Each block-level failure aborts decoding of the current
//! block; there is no partial output and no internal retry. Recovery is
//! the caller's concern.

use thiserror::Error;

/// The error type shared by every coder in the entropy back-end.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The bit stream was exhausted before a read completed.
    #[error("unexpected end of input after {bits_read} bits")]
    UnexpectedEof {
        /// Number of bits successfully consumed before the failure.
        bits_read: u64,
    },

    /// A header field failed validation (bad length, a gamma prefix with
    /// more than 63 leading zero bits, non-monotone cumulative ranges).
    #[error("malformed header: {message}")]
    MalformedHeader {
        /// Description of what was wrong with the header.
        message: String,
    },

    /// A run-length-encoded block's run-length vector disagreed with the
    /// reconstructed byte count.
    #[error("inconsistent RLE: expected {expected} literal bytes, reconstructed {actual}")]
    InconsistentRle {
        /// Number of literal bytes the header promised.
        expected: usize,
        /// Number of literal bytes actually reconstructed.
        actual: usize,
    },

    /// Renormalized arithmetic-coder frequencies did not sum to `SCALE`.
    #[error("probability overflow: renormalized frequencies sum to {sum}, expected {scale}")]
    ProbabilityOverflow {
        /// The sum that was actually reached.
        sum: u64,
        /// The required total (`SCALE`).
        scale: u64,
    },

    /// A recursive or cache-building step received data that violates an
    /// internal invariant (size 0, or a parent frequency sum that
    /// disagrees with the subrange length).
    #[error("internal invariant violated: {message}")]
    InternalInvariant {
        /// Description of the violated invariant.
        message: String,
    },
}

/// Result type alias used throughout the entropy back-end.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an [`Error::UnexpectedEof`].
    pub fn unexpected_eof(bits_read: u64) -> Self {
        Self::UnexpectedEof { bits_read }
    }

    /// Build an [`Error::MalformedHeader`].
    pub fn malformed_header(message: impl Into<String>) -> Self {
        Self::MalformedHeader {
            message: message.into(),
        }
    }

    /// Build an [`Error::InconsistentRle`].
    pub fn inconsistent_rle(expected: usize, actual: usize) -> Self {
        Self::InconsistentRle { expected, actual }
    }

    /// Build an [`Error::ProbabilityOverflow`].
    pub fn probability_overflow(sum: u64, scale: u64) -> Self {
        Self::ProbabilityOverflow { sum, scale }
    }

    /// Build an [`Error::InternalInvariant`].
    pub fn internal_invariant(message: impl Into<String>) -> Self {
        Self::InternalInvariant {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unexpected_eof(42);
        assert!(err.to_string().contains("42"));

        let err = Error::probability_overflow(268_435_450, 268_435_455);
        assert!(err.to_string().contains("268435450"));
    }

    #[test]
    fn test_inconsistent_rle_fields() {
        let err = Error::inconsistent_rle(10, 7);
        match err {
            Error::InconsistentRle { expected, actual } => {
                assert_eq!(expected, 10);
                assert_eq!(actual, 7);
            }
            _ => panic!("wrong variant"),
        }
    }
}
