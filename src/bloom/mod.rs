//! Space-efficient probabilistic data structure for approximate membership queries in a set.
//!
//! Two filters are provided. [`BloomFilter`] is persistent: inserting returns a new filter and
//! leaves the old one intact. [`MutableBloomFilter`] updates itself in place. Both size
//! themselves with [`FilterParameters::from_rate`], place items with [`buckets`] and dump to the
//! same [`codec`] format, so a dump written by one can be read by the other.

mod bloom_filter;
mod buckets;
pub mod codec;
mod mutable_bloom_filter;
mod parameters;

pub use self::bloom_filter::BloomFilter;
pub use self::buckets::{buckets, BucketCoordinate, Buckets};
pub use self::mutable_bloom_filter::MutableBloomFilter;
pub use self::parameters::FilterParameters;
