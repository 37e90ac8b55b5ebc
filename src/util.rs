//! Hash functions that map an item and a round number to a 32-bit digest.

use rand::Rng;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;
use std::io::Cursor;
use std::{cmp, fmt};

/// A hash function used by the bloom filters to place items into buckets.
///
/// `hash` must be pure: the same `item` and `round` always produce the same digest. Any closure
/// or function with the signature `Fn(&[u8], u32) -> u32` implements this trait.
///
/// Bits set under one hasher only carry meaning when they are looked up with the same hasher.
///
/// # Examples
///
/// ```
/// use bloom_dump::{BucketHasher, Murmur3};
///
/// let hasher = Murmur3;
/// assert_eq!(hasher.hash(b"foo", 0), hasher.hash(b"foo", 0));
///
/// let xor = |item: &[u8], round: u32| item.iter().fold(round, |acc, &b| acc ^ u32::from(b));
/// assert_eq!(xor.hash(&[1, 2], 0), 3);
/// ```
pub trait BucketHasher {
    /// Returns the digest of `item` for hash round `round`.
    fn hash(&self, item: &[u8], round: u32) -> u32;
}

impl<F> BucketHasher for F
where
    F: Fn(&[u8], u32) -> u32,
{
    #[inline]
    fn hash(&self, item: &[u8], round: u32) -> u32 {
        self(item, round)
    }
}

/// The default hasher: 32-bit MurmurHash3 (x86 variant) seeded with the round number.
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Murmur3;

impl BucketHasher for Murmur3 {
    #[inline]
    fn hash(&self, item: &[u8], round: u32) -> u32 {
        murmur3::murmur3_32(&mut Cursor::new(item), round)
            .expect("reading from an in-memory cursor cannot fail")
    }
}

/// A keyed SipHash-1-3 hasher. The round number is mixed into the first key and the 64-bit
/// output is folded down to 32 bits.
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy)]
pub struct SipHasherBuilder {
    k0: u64,
    k1: u64,
}

impl SipHasherBuilder {
    /// Constructs a new `SipHasherBuilder` that uses the thread-local RNG to seed itself.
    ///
    /// Filters built with an entropy-seeded hasher can only be looked up with that same hasher,
    /// so keep it around (or use [`from_seed`](Self::from_seed)) when persisting dumps.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::SipHasherBuilder;
    ///
    /// let hash_builder = SipHasherBuilder::from_entropy();
    /// ```
    pub fn from_entropy() -> Self {
        let mut rng = rand::thread_rng();
        Self::from_seed(rng.gen(), rng.gen())
    }

    /// Constructs a new `SipHasherBuilder` that is seeded with the given keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::SipHasherBuilder;
    ///
    /// let hash_builder = SipHasherBuilder::from_seed(0, 0);
    /// ```
    pub fn from_seed(k0: u64, k1: u64) -> Self {
        SipHasherBuilder { k0, k1 }
    }

    /// Returns the two keys this hasher was seeded with.
    pub fn keys(&self) -> (u64, u64) {
        (self.k0, self.k1)
    }
}

impl BucketHasher for SipHasherBuilder {
    #[inline]
    fn hash(&self, item: &[u8], round: u32) -> u32 {
        let mut hasher = SipHasher13::new_with_keys(self.k0 ^ u64::from(round), self.k1);
        hasher.write(item);
        let digest = hasher.finish();
        (digest ^ (digest >> 32)) as u32
    }
}

impl fmt::Debug for SipHasherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SipHasherBuilder")
            .field("k0", &self.k0)
            .field("k1", &self.k1)
            .finish()
    }
}

impl cmp::PartialEq for SipHasherBuilder {
    fn eq(&self, other: &SipHasherBuilder) -> bool {
        self.k0 == other.k0 && self.k1 == other.k1
    }
}
