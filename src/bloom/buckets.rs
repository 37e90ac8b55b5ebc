use super::FilterParameters;
use crate::bit_field::BitField;
use crate::util::BucketHasher;
use std::convert::TryFrom;
use std::iter::FusedIterator;

/// One bit of a filter's bit array: byte `index`, bit `position` within that byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BucketCoordinate {
    /// Byte offset into the bit array.
    pub index: usize,
    /// Bit offset within the byte, in `0..8`, counted from the least significant bit.
    pub position: u8,
}

impl BucketCoordinate {
    /// Returns the coordinate of absolute bit `offset`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::BucketCoordinate;
    ///
    /// let coordinate = BucketCoordinate::from_bit_offset(19);
    /// assert_eq!(coordinate.index, 2);
    /// assert_eq!(coordinate.position, 3);
    /// assert_eq!(coordinate.mask(), 0b1000);
    /// ```
    pub fn from_bit_offset(offset: u64) -> Self {
        BucketCoordinate {
            // Offsets that do not fit the address space can never be in range anyway.
            index: usize::try_from(offset >> 3).unwrap_or(usize::MAX),
            position: (offset & 7) as u8,
        }
    }

    /// Returns the single-bit mask selecting this coordinate within its byte.
    pub fn mask(&self) -> u8 {
        1 << self.position
    }
}

/// Returns the `k` bucket coordinates of `item` for a filter shaped by `parameters`.
///
/// Round `i` hashes `item` with `hasher` and takes the digest modulo the filter's bit count. A
/// filter of zero bytes has no buckets, so the iterator is empty.
///
/// The round number handed to the hasher is a `u32`. A `k` above `u32::MAX`, which only a
/// hand-crafted dump can declare, wraps the round number around.
///
/// # Examples
///
/// ```
/// use bloom_dump::bloom::{buckets, FilterParameters};
///
/// let parameters = FilterParameters::new(3, 4);
/// let identity = |_: &[u8], round: u32| round * 13;
///
/// let offsets = buckets(&parameters, &identity, b"foo")
///     .map(|coordinate| (coordinate.index, coordinate.position))
///     .collect::<Vec<_>>();
/// assert_eq!(offsets, vec![(0, 0), (1, 5), (3, 2)]);
///
/// assert_eq!(buckets(&FilterParameters::new(3, 0), &identity, b"foo").count(), 0);
/// ```
pub fn buckets<'a, H>(
    parameters: &FilterParameters,
    hasher: &'a H,
    item: &'a [u8],
) -> Buckets<'a, H>
where
    H: BucketHasher + ?Sized,
{
    let bit_count = parameters.bit_count();
    Buckets {
        hasher,
        item,
        bit_count,
        round: 0,
        rounds: if bit_count == 0 { 0 } else { parameters.k },
    }
}

/// Iterator over the bucket coordinates of one item. See [`buckets`].
pub struct Buckets<'a, H: ?Sized> {
    hasher: &'a H,
    item: &'a [u8],
    bit_count: u64,
    round: u64,
    rounds: u64,
}

impl<'a, H: ?Sized> Clone for Buckets<'a, H> {
    fn clone(&self) -> Self {
        Buckets {
            hasher: self.hasher,
            item: self.item,
            bit_count: self.bit_count,
            round: self.round,
            rounds: self.rounds,
        }
    }
}

impl<'a, H> Iterator for Buckets<'a, H>
where
    H: BucketHasher + ?Sized,
{
    type Item = BucketCoordinate;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.round == self.rounds {
            return None;
        }
        let digest = self.hasher.hash(self.item, self.round as u32);
        self.round += 1;
        Some(BucketCoordinate::from_bit_offset(
            u64::from(digest) % self.bit_count,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rounds - self.round;
        match usize::try_from(remaining) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl<'a, H> FusedIterator for Buckets<'a, H> where H: BucketHasher + ?Sized {}

/// Returns `true` if `item` has at least one bucket and every one of them is set in `bit_field`.
/// Buckets past the end of `bit_field` count as unset, and a filter with no buckets holds nothing.
pub(crate) fn contains<H>(
    parameters: &FilterParameters,
    hasher: &H,
    bit_field: &BitField,
    item: &[u8],
) -> bool
where
    H: BucketHasher + ?Sized,
{
    let mut coordinates = buckets(parameters, hasher, item).peekable();
    coordinates.peek().is_some()
        && coordinates.all(|coordinate| bit_field.get_bit(coordinate.index, coordinate.position))
}

/// Sets every bucket of `item` in `bit_field` and returns how many bits flipped from 0 to 1.
/// Buckets past the end of `bit_field` are skipped.
pub(crate) fn set<H>(
    parameters: &FilterParameters,
    hasher: &H,
    bit_field: &mut BitField,
    item: &[u8],
) -> usize
where
    H: BucketHasher + ?Sized,
{
    buckets(parameters, hasher, item)
        .filter(|coordinate| bit_field.set_bit(coordinate.index, coordinate.position))
        .count()
}
