use crate::error::BloomError;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use std::f64::consts::LN_2;
use tracing::debug;

/// The shape of a bloom filter: `k` hash rounds per item over a bit array of `size` bytes.
///
/// Both values are fixed for the lifetime of a filter and are written verbatim into its dump.
///
/// # Examples
///
/// ```
/// use bloom_dump::bloom::FilterParameters;
///
/// let parameters = FilterParameters::from_rate(4000, 1e-7);
/// assert_eq!(parameters.k, 23);
/// assert_eq!(parameters.size, 16775);
/// assert_eq!(parameters.bit_count(), 134_200);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FilterParameters {
    /// Number of hash rounds applied to every item.
    pub k: u64,
    /// Length of the bit array in bytes.
    pub size: u64,
}

impl FilterParameters {
    /// Constructs parameters from an explicit hash round count and byte size.
    pub fn new(k: u64, size: u64) -> Self {
        FilterParameters { k, size }
    }

    /// Derives the parameters for a filter expected to hold `item_count` items with a false
    /// positive probability of `fpp`.
    ///
    /// The bit count is `ceil(-n * ln(fpp) / ln(2)^2)`, the round count is that bit count per
    /// item times `ln(2)` rounded to the nearest integer (at least 1), and the byte size leaves
    /// one spare byte on top of the bits needed.
    ///
    /// No validation is performed. `item_count == 0` yields `k == 1` and a one byte array; use
    /// [`try_from_rate`](Self::try_from_rate) to reject such input instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::FilterParameters;
    ///
    /// assert_eq!(FilterParameters::from_rate(10, 0.01), FilterParameters::new(7, 13));
    /// assert_eq!(FilterParameters::from_rate(0, 0.01), FilterParameters::new(1, 1));
    /// ```
    pub fn from_rate(item_count: usize, fpp: f64) -> Self {
        let n = item_count as f64;
        let bit_count = (-n * fpp.ln() / (LN_2 * LN_2)).ceil();
        // 0 / 0 for an empty filter is NaN, which casts to 0 and is lifted to 1.
        let k = ((bit_count / n * LN_2).round() as u64).max(1);
        let size = ((bit_count + 8.0) / 8.0).ceil() as u64;

        debug!(item_count, fpp, k, size, "derived bloom filter parameters");
        FilterParameters { k, size }
    }

    /// Same as [`from_rate`](Self::from_rate), but rejects an `item_count` of zero and any `fpp`
    /// that is not strictly between 0 and 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::FilterParameters;
    /// use bloom_dump::BloomError;
    ///
    /// assert!(FilterParameters::try_from_rate(100, 0.01).is_ok());
    /// assert_eq!(
    ///     FilterParameters::try_from_rate(100, 1.0),
    ///     Err(BloomError::InvalidFalsePositiveRate(1.0)),
    /// );
    /// ```
    pub fn try_from_rate(item_count: usize, fpp: f64) -> Result<Self, BloomError> {
        if item_count == 0 {
            return Err(BloomError::InvalidItemCount(item_count));
        }
        if !(fpp > 0.0 && fpp < 1.0) {
            return Err(BloomError::InvalidFalsePositiveRate(fpp));
        }
        Ok(Self::from_rate(item_count, fpp))
    }

    /// Returns the number of addressable bits, `size * 8`, saturating at `u64::MAX`.
    pub fn bit_count(&self) -> u64 {
        self.size.saturating_mul(8)
    }
}

#[cfg(test)]
mod tests {
    use super::FilterParameters;
    use crate::error::BloomError;

    #[test]
    fn test_reference_sizing() {
        let parameters = FilterParameters::from_rate(4000, 0.000_000_1);
        assert_eq!(parameters.k, 23);
        assert_eq!(parameters.size, 16775);
    }

    #[test]
    fn test_sizing() {
        assert_eq!(
            FilterParameters::from_rate(4000, 1e-9),
            FilterParameters::new(30, 21568),
        );
        assert_eq!(
            FilterParameters::from_rate(100, 0.01),
            FilterParameters::new(7, 121),
        );
        assert_eq!(
            FilterParameters::from_rate(1000, 0.01),
            FilterParameters::new(7, 1200),
        );
    }

    #[test]
    fn test_padding_covers_bit_count() {
        for &(n, fpp) in &[(1, 0.5), (7, 0.1), (333, 0.003), (4000, 1e-9)] {
            let parameters = FilterParameters::from_rate(n, fpp);
            let needed = (-(n as f64) * f64::ln(fpp) / (2f64.ln() * 2f64.ln())).ceil() as u64;
            assert!(parameters.bit_count() >= needed + 8);
            assert!(parameters.k >= 1);
        }
    }

    #[test]
    fn test_degenerate_item_count() {
        let parameters = FilterParameters::from_rate(0, 0.01);
        assert_eq!(parameters, FilterParameters::new(1, 1));
    }

    #[test]
    fn test_try_from_rate() {
        assert_eq!(
            FilterParameters::try_from_rate(4000, 1e-7),
            Ok(FilterParameters::new(23, 16775)),
        );
        assert_eq!(
            FilterParameters::try_from_rate(0, 0.01),
            Err(BloomError::InvalidItemCount(0)),
        );
        assert_eq!(
            FilterParameters::try_from_rate(10, 0.0),
            Err(BloomError::InvalidFalsePositiveRate(0.0)),
        );
        assert_eq!(
            FilterParameters::try_from_rate(10, -0.5),
            Err(BloomError::InvalidFalsePositiveRate(-0.5)),
        );
        assert!(FilterParameters::try_from_rate(10, std::f64::NAN).is_err());
    }

    #[test]
    fn test_bit_count_saturates() {
        assert_eq!(FilterParameters::new(1, 0).bit_count(), 0);
        assert_eq!(FilterParameters::new(1, u64::MAX).bit_count(), u64::MAX);
    }
}
