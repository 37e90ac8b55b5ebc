use super::bloom_filter::estimated_fpp;
use super::{buckets, codec, BloomFilter, FilterParameters};
use crate::bit_field::BitField;
use crate::error::BloomError;
use crate::util::{BucketHasher, Murmur3};
use futures::{pin_mut, Stream, StreamExt};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use tracing::trace;

/// A bloom filter over byte strings that is updated in place.
///
/// It shares its parameter math, bucket mapping and dump format with [`BloomFilter`], so the
/// dumps of the two variants are interchangeable. There is no internal locking: sharing one
/// `MutableBloomFilter` between threads that insert requires external synchronization.
///
/// # Examples
///
/// ```
/// use bloom_dump::bloom::MutableBloomFilter;
///
/// let mut filter = MutableBloomFilter::new(10, 0.01);
///
/// assert!(!filter.lookup("foo"));
/// filter.insert("foo");
/// assert!(filter.lookup("foo"));
///
/// filter.clear();
/// assert!(!filter.lookup("foo"));
///
/// assert_eq!(filter.size(), 13);
/// assert_eq!(filter.k(), 7);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(crate = "serde_crate")
)]
pub struct MutableBloomFilter<H = Murmur3> {
    parameters: FilterParameters,
    bit_field: BitField,
    hasher: H,
}

impl MutableBloomFilter {
    /// Constructs a new, empty `MutableBloomFilter` with an estimated max capacity of
    /// `item_count` items and a maximum false positive probability of `fpp`, hashing with
    /// [`Murmur3`].
    pub fn new(item_count: usize, fpp: f64) -> Self {
        BloomFilter::new(item_count, fpp).thaw()
    }

    /// Same as [`new`](Self::new), but fails if `item_count` is zero or `fpp` is not in `(0, 1)`.
    pub fn try_new(item_count: usize, fpp: f64) -> Result<Self, BloomError> {
        BloomFilter::try_new(item_count, fpp).map(BloomFilter::thaw)
    }

    /// Rebuilds a `MutableBloomFilter` from a dump of either filter variant, hashing with
    /// [`Murmur3`].
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::{BloomFilter, MutableBloomFilter};
    ///
    /// let dump = BloomFilter::new(10, 0.01).insert("foo").dump();
    /// let mut filter = MutableBloomFilter::from_dump(&dump);
    ///
    /// assert!(filter.lookup("foo"));
    /// filter.insert("bar");
    /// assert!(filter.lookup("bar"));
    /// ```
    pub fn from_dump(dump: &[u8]) -> Self {
        Self::from_dump_with_hasher(dump, Murmur3)
    }

    /// Same as [`from_dump`](Self::from_dump), but rejects truncated dumps.
    pub fn try_from_dump(dump: &[u8]) -> Result<Self, BloomError> {
        Self::try_from_dump_with_hasher(dump, Murmur3)
    }
}

impl<H> MutableBloomFilter<H>
where
    H: BucketHasher,
{
    /// Constructs a new, empty `MutableBloomFilter` with an estimated max capacity of
    /// `item_count` items, a maximum false positive probability of `fpp`, and a custom hash
    /// function.
    pub fn with_hasher(item_count: usize, fpp: f64, hasher: H) -> Self {
        BloomFilter::with_hasher(item_count, fpp, hasher).thaw()
    }

    /// Same as [`with_hasher`](Self::with_hasher), but fails if `item_count` is zero or `fpp` is
    /// not in `(0, 1)`.
    pub fn try_with_hasher(item_count: usize, fpp: f64, hasher: H) -> Result<Self, BloomError> {
        BloomFilter::try_with_hasher(item_count, fpp, hasher).map(BloomFilter::thaw)
    }

    /// Constructs a new, empty `MutableBloomFilter` with explicit parameters.
    ///
    /// # Panics
    ///
    /// Panics if `parameters.size` bytes cannot be allocated.
    pub fn from_parameters(parameters: FilterParameters, hasher: H) -> Self {
        BloomFilter::from_parameters(parameters, hasher).thaw()
    }

    /// Rebuilds a `MutableBloomFilter` from a dump with a custom hash function.
    pub fn from_dump_with_hasher(dump: &[u8], hasher: H) -> Self {
        let (parameters, bytes) = codec::decode(dump);
        MutableBloomFilter {
            parameters,
            bit_field: BitField::from(bytes),
            hasher,
        }
    }

    /// Same as [`from_dump_with_hasher`](Self::from_dump_with_hasher), but rejects truncated
    /// dumps.
    pub fn try_from_dump_with_hasher(dump: &[u8], hasher: H) -> Result<Self, BloomError> {
        let (parameters, bytes) = codec::try_decode(dump)?;
        Ok(MutableBloomFilter {
            parameters,
            bit_field: BitField::from(bytes),
            hasher,
        })
    }

    /// Serializes the filter's `k`, `size` and bit array. See [`codec`] for the layout.
    pub fn dump(&self) -> Vec<u8> {
        codec::encode(&self.parameters, self.bit_field.as_bytes())
    }

    /// Checks if an item is possibly in the bloom filter.
    pub fn lookup<T>(&self, item: T) -> bool
    where
        T: AsRef<[u8]>,
    {
        buckets::contains(
            &self.parameters,
            &self.hasher,
            &self.bit_field,
            item.as_ref(),
        )
    }

    /// Inserts an item into the bloom filter.
    pub fn insert<T>(&mut self, item: T)
    where
        T: AsRef<[u8]>,
    {
        buckets::set(
            &self.parameters,
            &self.hasher,
            &mut self.bit_field,
            item.as_ref(),
        );
    }

    /// Inserts every item of `items`, in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::MutableBloomFilter;
    ///
    /// let mut filter = MutableBloomFilter::new(10, 0.01);
    /// filter.batch_insert(&["foo", "bar"]);
    ///
    /// assert!(filter.lookup("foo"));
    /// assert!(filter.lookup("bar"));
    /// ```
    pub fn batch_insert<I>(&mut self, items: I)
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let mut count = 0usize;
        for item in items {
            self.insert(item);
            count += 1;
        }
        trace!(count, "batch inserted into bloom filter");
    }

    /// Inserts every item yielded by the stream `items`, in arrival order, and resolves once the
    /// stream is exhausted.
    ///
    /// If the returned future is dropped early, the items received so far stay inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::MutableBloomFilter;
    /// use futures::executor::block_on;
    /// use futures::stream;
    ///
    /// let mut filter = MutableBloomFilter::new(10, 0.01);
    /// block_on(filter.async_batch_insert(stream::iter(vec!["foo", "bar"])));
    ///
    /// assert!(filter.lookup("foo"));
    /// assert!(filter.lookup("bar"));
    /// ```
    pub async fn async_batch_insert<S>(&mut self, items: S)
    where
        S: Stream,
        S::Item: AsRef<[u8]>,
    {
        let mut count = 0usize;
        pin_mut!(items);
        while let Some(item) = items.next().await {
            self.insert(item);
            count += 1;
        }
        trace!(count, "stream inserted into bloom filter");
    }

    /// Rebinds the filter to `hasher`, keeping its parameters and bits.
    ///
    /// Existing bits are not rehashed, so lookups of items inserted under the previous hash
    /// function are meaningless after a swap. Swap before populating the filter.
    pub fn swap<G>(self, hasher: G) -> MutableBloomFilter<G>
    where
        G: BucketHasher,
    {
        MutableBloomFilter {
            parameters: self.parameters,
            bit_field: self.bit_field,
            hasher,
        }
    }

    /// Clears the bloom filter, removing all elements. The parameters are kept.
    pub fn clear(&mut self) {
        self.bit_field.clear();
    }

    /// Returns a persistent filter with the same parameters, bits and hash function.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::MutableBloomFilter;
    ///
    /// let mut filter = MutableBloomFilter::new(10, 0.01);
    /// filter.insert("foo");
    ///
    /// let frozen = filter.freeze();
    /// assert!(frozen.lookup("foo"));
    /// assert!(!frozen.lookup("bar"));
    /// ```
    pub fn freeze(self) -> BloomFilter<H> {
        BloomFilter::from(self)
    }

    /// Returns the number of hash rounds per item.
    pub fn k(&self) -> u64 {
        self.parameters.k
    }

    /// Returns the size of the bit array in bytes, as declared by the filter's parameters.
    pub fn size(&self) -> u64 {
        self.parameters.size
    }

    /// Returns the filter's parameters.
    pub fn parameters(&self) -> &FilterParameters {
        &self.parameters
    }

    /// Returns the filter's hash function.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Returns the filter's bit array.
    pub fn bit_field(&self) -> &BitField {
        &self.bit_field
    }

    /// Returns the number of set bits in the bloom filter.
    pub fn count_ones(&self) -> usize {
        self.bit_field.count_ones()
    }

    /// Returns the number of unset bits in the bloom filter.
    pub fn count_zeros(&self) -> usize {
        self.bit_field.count_zeros()
    }

    /// Returns the estimated false positive probability of the bloom filter. This value will
    /// increase as more items are added.
    pub fn estimated_fpp(&self) -> f64 {
        estimated_fpp(&self.bit_field, self.parameters.k)
    }
}

impl<H, T> Extend<T> for MutableBloomFilter<H>
where
    H: BucketHasher,
    T: AsRef<[u8]>,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.batch_insert(iter);
    }
}

impl<H> From<BloomFilter<H>> for MutableBloomFilter<H> {
    fn from(filter: BloomFilter<H>) -> Self {
        MutableBloomFilter {
            parameters: filter.parameters,
            bit_field: filter.bit_field,
            hasher: filter.hasher,
        }
    }
}

impl<H> From<MutableBloomFilter<H>> for BloomFilter<H> {
    fn from(filter: MutableBloomFilter<H>) -> Self {
        BloomFilter {
            parameters: filter.parameters,
            bit_field: filter.bit_field,
            hasher: filter.hasher,
        }
    }
}
