//! Errors returned by the strict (`try_*`) constructors and decoders.

use thiserror::Error;

/// Errors related to bloom filter construction and decoding.
///
/// The lenient entry points (`new`, `from_dump`, ...) never produce these. They treat bad input
/// as a degenerate but usable filter instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BloomError {
    /// Strict construction was asked to size a filter for zero items.
    #[error("expected item count must be positive, got {0}")]
    InvalidItemCount(usize),

    /// Strict construction was given a false positive rate outside `(0, 1)`.
    #[error("false positive rate must be in (0, 1), got {0}")]
    InvalidFalsePositiveRate(f64),

    /// The dump declares more hash rounds than a `u32` round number can address.
    #[error("dump declares {0} hash rounds, more than a u32 round number can address")]
    InvalidHashCount(u64),

    /// The dump ends before the `k` and `size` header does.
    #[error("dump is {len} bytes, shorter than the 16 byte header")]
    TruncatedHeader {
        /// Length of the whole dump.
        len: usize,
    },

    /// The dump holds fewer filter bytes than its header declares.
    #[error("dump declares {declared} filter bytes but only {actual} are present")]
    TruncatedBody {
        /// Filter byte count read from the header.
        declared: u64,
        /// Filter bytes actually present after the header.
        actual: usize,
    },
}
