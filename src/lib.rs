//! # bloom-dump
//!
//! `bloom-dump` contains bloom filters over byte strings that are sized from an expected item
//! count and a target false positive rate, and that can be dumped to and rebuilt from a flat
//! binary format.
//!
//! A filter built for `n` items at false positive rate `p` uses `ceil(-n * ln(p) / ln(2)^2)`
//! bits (plus one spare byte) and `k = round(bits / n * ln(2))` hash rounds. Inserted items are
//! always found again; other items are reported present with a probability close to `p`.
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! bloom-dump = "*"
//! ```
//!
//! ```rust
//! use bloom_dump::bloom::{BloomFilter, MutableBloomFilter};
//!
//! let filter = BloomFilter::new(4000, 1e-7).insert("hello world");
//! assert!(filter.lookup("hello world"));
//!
//! let mut rehydrated = MutableBloomFilter::from_dump(&filter.dump());
//! rehydrated.insert("hello again");
//! assert!(rehydrated.lookup("hello world"));
//! assert!(rehydrated.lookup("hello again"));
//! ```
//!
//! Hash functions are pluggable: anything implementing [`BucketHasher`], including plain
//! `Fn(&[u8], u32) -> u32` closures, can replace the default [`Murmur3`]. The dump format does
//! not record the hash function, so a dump must be read back with the one that populated it.
//!
//! ## References
//!
//!  - [Space/time trade-offs in hash coding with allowable errors](https://dl.acm.org/citation.cfm?id=362692)
//!  > Bloom, Burton H. 1970. “Space/Time Trade-Offs in Hash Coding with Allowable Errors.” *Commun. ACM* 13 (7). New York, NY, USA: ACM: 422–26. doi:[10.1145/362686.362692](https://doi.org/10.1145/362686.362692).

#![warn(missing_docs)]

pub mod bit_field;
pub mod bloom;
mod error;
mod util;

pub use error::BloomError;
pub use util::{BucketHasher, Murmur3, SipHasherBuilder};
