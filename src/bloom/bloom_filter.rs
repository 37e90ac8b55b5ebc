use super::{buckets, codec, FilterParameters, MutableBloomFilter};
use crate::bit_field::BitField;
use crate::error::BloomError;
use crate::util::{BucketHasher, Murmur3};
use futures::{pin_mut, Stream, StreamExt};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use std::convert::TryFrom;
use tracing::trace;

/// A persistent bloom filter over byte strings.
///
/// At its core, a bloom filter is a bit array, initially all set to zero. `k` hash rounds map
/// each item to `k` bits in the bit array. An item definitely does not exist in the bloom filter
/// if any of its `k` bits are unset. An item is possibly in the set if all of its `k` bits are
/// set.
///
/// `BloomFilter` never changes once built: [`insert`](Self::insert) and friends return a new
/// filter and leave the receiver as it was. Unchanged filters share their bit array, and a new
/// array is only allocated once an insert actually flips a bit, so keeping old versions around
/// is cheap. Use [`MutableBloomFilter`] to update a single filter in place instead.
///
/// # Examples
///
/// ```
/// use bloom_dump::bloom::BloomFilter;
///
/// let empty = BloomFilter::new(4000, 1e-7);
/// let filter = empty.insert("foo");
///
/// assert!(!empty.lookup("foo"));
/// assert!(filter.lookup("foo"));
/// assert!(!filter.lookup("bar"));
///
/// assert_eq!(filter.k(), 23);
/// assert_eq!(filter.size(), 16775);
///
/// let restored = BloomFilter::from_dump(&filter.dump());
/// assert_eq!(restored, filter);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(crate = "serde_crate")
)]
pub struct BloomFilter<H = Murmur3> {
    pub(super) parameters: FilterParameters,
    pub(super) bit_field: BitField,
    pub(super) hasher: H,
}

impl BloomFilter {
    /// Constructs a new, empty `BloomFilter` with an estimated max capacity of `item_count` items
    /// and a maximum false positive probability of `fpp`, hashing with [`Murmur3`].
    ///
    /// The arguments are not validated; see [`try_new`](Self::try_new).
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::BloomFilter;
    ///
    /// let filter = BloomFilter::new(10, 0.01);
    /// assert_eq!(filter.k(), 7);
    /// assert_eq!(filter.size(), 13);
    /// ```
    pub fn new(item_count: usize, fpp: f64) -> Self {
        Self::with_hasher(item_count, fpp, Murmur3)
    }

    /// Same as [`new`](Self::new), but fails if `item_count` is zero or `fpp` is not in `(0, 1)`.
    pub fn try_new(item_count: usize, fpp: f64) -> Result<Self, BloomError> {
        Self::try_with_hasher(item_count, fpp, Murmur3)
    }

    /// Rebuilds a `BloomFilter` from the output of [`dump`](Self::dump), hashing with
    /// [`Murmur3`].
    ///
    /// Malformed dumps are accepted as they are: see [`codec::decode`].
    pub fn from_dump(dump: &[u8]) -> Self {
        Self::from_dump_with_hasher(dump, Murmur3)
    }

    /// Same as [`from_dump`](Self::from_dump), but rejects truncated dumps.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::BloomFilter;
    ///
    /// let dump = BloomFilter::new(10, 0.01).insert("foo").dump();
    ///
    /// assert!(BloomFilter::try_from_dump(&dump).unwrap().lookup("foo"));
    /// assert!(BloomFilter::try_from_dump(&dump[..20]).is_err());
    /// ```
    pub fn try_from_dump(dump: &[u8]) -> Result<Self, BloomError> {
        Self::try_from_dump_with_hasher(dump, Murmur3)
    }
}

impl<H> BloomFilter<H>
where
    H: BucketHasher,
{
    /// Constructs a new, empty `BloomFilter` with an estimated max capacity of `item_count` items,
    /// a maximum false positive probability of `fpp`, and a custom hash function.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::BloomFilter;
    /// use bloom_dump::SipHasherBuilder;
    ///
    /// let filter = BloomFilter::with_hasher(10, 0.01, SipHasherBuilder::from_seed(0, 0));
    /// assert!(filter.insert("foo").lookup("foo"));
    /// ```
    pub fn with_hasher(item_count: usize, fpp: f64, hasher: H) -> Self {
        Self::from_parameters(FilterParameters::from_rate(item_count, fpp), hasher)
    }

    /// Same as [`with_hasher`](Self::with_hasher), but fails if `item_count` is zero or `fpp` is
    /// not in `(0, 1)`.
    pub fn try_with_hasher(item_count: usize, fpp: f64, hasher: H) -> Result<Self, BloomError> {
        let parameters = FilterParameters::try_from_rate(item_count, fpp)?;
        Ok(Self::from_parameters(parameters, hasher))
    }

    /// Constructs a new, empty `BloomFilter` with explicit parameters.
    ///
    /// A `size` of zero gives a filter that holds nothing: every lookup misses and inserts are
    /// no-ops.
    ///
    /// # Panics
    ///
    /// Panics if `parameters.size` bytes cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::{BloomFilter, FilterParameters};
    /// use bloom_dump::Murmur3;
    ///
    /// let filter = BloomFilter::from_parameters(FilterParameters::new(3, 0), Murmur3);
    /// assert!(!filter.insert("foo").lookup("foo"));
    /// ```
    pub fn from_parameters(parameters: FilterParameters, hasher: H) -> Self {
        let size = usize::try_from(parameters.size).expect("filter size exceeds address space");
        BloomFilter {
            parameters,
            bit_field: BitField::new(size),
            hasher,
        }
    }

    /// Rebuilds a `BloomFilter` from the output of [`dump`](Self::dump) with a custom hash
    /// function. It must be the hash function the dumped filter was populated with.
    pub fn from_dump_with_hasher(dump: &[u8], hasher: H) -> Self {
        let (parameters, bytes) = codec::decode(dump);
        BloomFilter {
            parameters,
            bit_field: BitField::from(bytes),
            hasher,
        }
    }

    /// Same as [`from_dump_with_hasher`](Self::from_dump_with_hasher), but rejects truncated
    /// dumps.
    pub fn try_from_dump_with_hasher(dump: &[u8], hasher: H) -> Result<Self, BloomError> {
        let (parameters, bytes) = codec::try_decode(dump)?;
        Ok(BloomFilter {
            parameters,
            bit_field: BitField::from(bytes),
            hasher,
        })
    }

    /// Serializes the filter's `k`, `size` and bit array. See [`codec`] for the layout.
    ///
    /// Dumps do not record the hash function.
    pub fn dump(&self) -> Vec<u8> {
        codec::encode(&self.parameters, self.bit_field.as_bytes())
    }

    /// Checks if an item is possibly in the bloom filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::BloomFilter;
    ///
    /// let filter = BloomFilter::new(10, 0.01);
    /// assert!(!filter.lookup(b"foo"));
    /// assert!(filter.insert(b"foo").lookup(b"foo"));
    /// ```
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

    /// Returns a new filter that also contains `item`. `self` is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::BloomFilter;
    ///
    /// let a = BloomFilter::new(10, 0.01);
    /// let b = a.insert("foo");
    ///
    /// assert!(!a.lookup("foo"));
    /// assert!(b.lookup("foo"));
    /// ```
    pub fn insert<T>(&self, item: T) -> Self
    where
        T: AsRef<[u8]>,
        H: Clone,
    {
        let mut next = self.clone();
        next.set(item.as_ref());
        next
    }

    /// Returns a new filter that also contains every item of `items`. `self` is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::BloomFilter;
    ///
    /// let filter = BloomFilter::new(10, 0.01).batch_insert(vec!["foo", "bar"]);
    ///
    /// assert!(filter.lookup("foo"));
    /// assert!(filter.lookup("bar"));
    /// ```
    pub fn batch_insert<I>(&self, items: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
        H: Clone,
    {
        let mut next = self.clone();
        let mut count = 0usize;
        for item in items {
            next.set(item.as_ref());
            count += 1;
        }
        trace!(count, "batch inserted into bloom filter");
        next
    }

    /// Returns a new filter that also contains every item yielded by the stream `items`, applied
    /// in arrival order. `self` is unchanged.
    ///
    /// Dropping the returned future before the stream ends discards the partial result.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::BloomFilter;
    /// use futures::executor::block_on;
    /// use futures::stream;
    ///
    /// let empty = BloomFilter::new(10, 0.01);
    /// let filter = block_on(empty.async_batch_insert(stream::iter(vec!["foo", "bar"])));
    ///
    /// assert!(filter.lookup("foo"));
    /// assert!(filter.lookup("bar"));
    /// ```
    pub async fn async_batch_insert<S>(&self, items: S) -> Self
    where
        S: Stream,
        S::Item: AsRef<[u8]>,
        H: Clone,
    {
        let mut next = self.clone();
        let mut count = 0usize;
        pin_mut!(items);
        while let Some(item) = items.next().await {
            next.set(item.as_ref());
            count += 1;
        }
        trace!(count, "stream inserted into bloom filter");
        next
    }

    /// Returns a filter with the same parameters and bits that hashes with `hasher` from now on.
    ///
    /// Existing bits are not rehashed, so lookups of items inserted under the previous hash
    /// function are meaningless after a swap. Swap before populating the filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::BloomFilter;
    /// use bloom_dump::SipHasherBuilder;
    ///
    /// let filter = BloomFilter::new(10, 0.01).swap(SipHasherBuilder::from_seed(1, 2));
    /// assert!(filter.insert("foo").lookup("foo"));
    /// ```
    pub fn swap<G>(&self, hasher: G) -> BloomFilter<G>
    where
        G: BucketHasher,
    {
        BloomFilter {
            parameters: self.parameters,
            bit_field: self.bit_field.clone(),
            hasher,
        }
    }

    /// Returns an in-place filter with the same parameters, bits and hash function.
    pub fn thaw(self) -> MutableBloomFilter<H> {
        MutableBloomFilter::from(self)
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

    /// Returns the estimated false positive probability of the bloom filter: the fraction of set
    /// bits raised to the `k`th power. This value will increase as more items are added.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bloom::BloomFilter;
    ///
    /// let filter = BloomFilter::new(100, 0.01);
    /// assert!(filter.estimated_fpp() < std::f64::EPSILON);
    ///
    /// let filter = filter.insert("foo");
    /// assert!(filter.estimated_fpp() > 0.0);
    /// assert!(filter.estimated_fpp() < 0.01);
    /// ```
    pub fn estimated_fpp(&self) -> f64 {
        estimated_fpp(&self.bit_field, self.parameters.k)
    }

    fn set(&mut self, item: &[u8]) {
        buckets::set(&self.parameters, &self.hasher, &mut self.bit_field, item);
    }
}

pub(super) fn estimated_fpp(bit_field: &BitField, k: u64) -> f64 {
    if bit_field.is_empty() {
        return 0.0;
    }
    let single_fpp = bit_field.count_ones() as f64 / bit_field.bit_len() as f64;
    single_fpp.powf(k as f64)
}

#[cfg(test)]
mod tests {
    use super::BloomFilter;
    use crate::bloom::FilterParameters;
    use crate::error::BloomError;
    use crate::util::tests::{fnv1a, sample};
    use crate::util::{Murmur3, SipHasherBuilder};
    use futures::executor::block_on;
    use futures::stream;

    #[test]
    fn test_new() {
        let filter = BloomFilter::new(4000, 0.000_000_1);

        assert_eq!(filter.k(), 23);
        assert_eq!(filter.size(), 16775);
        assert_eq!(filter.bit_field().len(), 16775);
        assert_eq!(filter.count_ones(), 0);
        assert_eq!(filter.count_zeros(), 16775 * 8);
    }

    #[test]
    fn test_insert_and_lookup() {
        let filter = BloomFilter::new(4000, 0.000_000_1).insert("hello world");

        assert!(filter.lookup("hello world"));
        assert!(!filter.lookup("hello world2"));
    }

    #[test]
    fn test_insert_sets_at_most_k_bits() {
        let filter = BloomFilter::new(4000, 0.000_000_1).insert("hello world");

        assert!(filter.count_ones() >= 1);
        assert!(filter.count_ones() as u64 <= filter.k());
    }

    #[test]
    fn test_immutability() {
        let a = BloomFilter::new(100, 0.01);
        let b = a.insert("foo");
        let c = b.insert("bar");

        assert!(!a.lookup("foo"));
        assert_eq!(a.count_ones(), 0);
        assert!(b.lookup("foo"));
        assert!(!b.lookup("bar"));
        assert!(c.lookup("foo"));
        assert!(c.lookup("bar"));
    }

    #[test]
    fn test_reinsert_shares_storage() {
        let a = BloomFilter::new(100, 0.01).insert("foo");
        let b = a.insert("foo");

        assert_eq!(a, b);
        assert!(a.bit_field().shares_storage(b.bit_field()));
        assert!(!a.insert("bar").bit_field().shares_storage(a.bit_field()));
    }

    #[test]
    fn test_no_false_negatives() {
        let items = sample(4000, 1);
        let filter = BloomFilter::new(4000, 1e-9).batch_insert(&items);

        assert!(items.iter().all(|item| filter.lookup(item)));
        assert!(sample(20, 2).iter().all(|item| !filter.lookup(item)));
    }

    #[test]
    fn test_batch_insert_order_independent() {
        let items = sample(200, 3);
        let mut reversed = items.clone();
        reversed.reverse();

        let empty = BloomFilter::new(200, 0.001);
        let forward = empty.batch_insert(&items);
        let backward = empty.batch_insert(&reversed);
        let one_by_one = items.iter().fold(empty.clone(), |filter, item| filter.insert(item));

        assert_eq!(forward, backward);
        assert_eq!(forward, one_by_one);
    }

    #[test]
    fn test_async_batch_insert() {
        let items = sample(50, 4);
        let empty = BloomFilter::new(50, 1e-9);

        let filter = block_on(empty.async_batch_insert(stream::iter(items.clone())));

        assert!(items.iter().all(|item| filter.lookup(item)));
        assert_eq!(filter, empty.batch_insert(&items));
        assert_eq!(empty.count_ones(), 0);
    }

    #[test]
    fn test_dump_round_trip() {
        let filter = BloomFilter::new(4000, 0.000_000_1).insert("hello world");
        let dump = filter.dump();

        assert_eq!(dump.len(), 16 + 16775);
        let restored = BloomFilter::from_dump(&dump);
        assert!(restored.lookup("hello world"));
        assert_eq!(restored, filter);
        assert_eq!(restored.dump(), dump);
        assert_eq!(BloomFilter::try_from_dump(&dump), Ok(filter));
    }

    #[test]
    fn test_truncated_dump() {
        let filter = BloomFilter::new(100, 0.01).batch_insert(sample(100, 5));
        let dump = filter.dump();

        let truncated = BloomFilter::from_dump(&dump[..40]);
        assert_eq!(truncated.size(), filter.size());
        assert_eq!(truncated.bit_field().len(), 24);

        let redump = truncated.dump();
        assert_eq!(redump.len(), 16 + 121);
        assert_eq!(&redump[..40], &dump[..40]);
        assert!(redump[40..].iter().all(|&byte| byte == 0));
        assert_eq!(
            BloomFilter::try_from_dump(&dump[..40]),
            Err(BloomError::TruncatedBody {
                declared: filter.size(),
                actual: 24,
            }),
        );
    }

    #[test]
    fn test_empty_filter() {
        let filter = BloomFilter::from_parameters(FilterParameters::new(7, 0), Murmur3);
        let inserted = filter.insert("foo").batch_insert(sample(10, 6));

        assert!(!inserted.lookup("foo"));
        assert_eq!(inserted, filter);
        assert_eq!(inserted.estimated_fpp(), 0.0);
        assert_eq!(inserted.dump(), vec![7u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(!BloomFilter::from_dump(&[]).insert("foo").lookup("foo"));
    }

    #[test]
    fn test_zero_hash_rounds() {
        let filter = BloomFilter::from_parameters(FilterParameters::new(0, 8), Murmur3);
        let inserted = filter.insert("foo");

        assert!(!inserted.lookup("foo"));
        assert!(!inserted.lookup("bar"));
        assert_eq!(inserted.count_ones(), 0);
    }

    #[test]
    fn test_hasher_substitutability() {
        let items = sample(500, 7);
        let empty = BloomFilter::new(500, 1e-6);

        let murmur = empty.batch_insert(&items);
        let sip = empty
            .swap(SipHasherBuilder::from_seed(0, 0))
            .batch_insert(&items);
        let fnv = empty.swap(fnv1a).batch_insert(&items);

        assert!(items.iter().all(|item| murmur.lookup(item)));
        assert!(items.iter().all(|item| sip.lookup(item)));
        assert!(items.iter().all(|item| fnv.lookup(item)));
        assert_ne!(murmur.bit_field(), sip.bit_field());
    }

    #[test]
    fn test_swap_keeps_bits() {
        let filter = BloomFilter::new(100, 0.01).insert("foo");
        let swapped = filter.swap(SipHasherBuilder::from_seed(0, 0));

        assert_eq!(swapped.parameters(), filter.parameters());
        assert_eq!(swapped.bit_field(), filter.bit_field());
        assert!(swapped.swap(Murmur3).lookup("foo"));
    }

    #[test]
    fn test_try_new() {
        assert!(BloomFilter::try_new(100, 0.01).is_ok());
        assert_eq!(
            BloomFilter::try_new(0, 0.01),
            Err(BloomError::InvalidItemCount(0)),
        );
        assert_eq!(
            BloomFilter::try_new(100, 2.0),
            Err(BloomError::InvalidFalsePositiveRate(2.0)),
        );
    }

    #[test]
    fn test_estimated_fpp() {
        let filter = BloomFilter::from_parameters(FilterParameters::new(2, 2), Murmur3);
        assert!(filter.estimated_fpp() < std::f64::EPSILON);

        let filter = filter.insert("foo");
        let expected_fpp = (filter.count_ones() as f64 / 16.0).powi(2);
        assert!((filter.estimated_fpp() - expected_fpp).abs() < std::f64::EPSILON);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_ser_de() {
        let filter = BloomFilter::new(100, 0.01).insert("foo");

        let serialized_filter = bincode::serialize(&filter).unwrap();
        let de_filter: BloomFilter = bincode::deserialize(&serialized_filter).unwrap();

        assert!(de_filter.lookup("foo"));
        assert_eq!(filter, de_filter);
    }
}
