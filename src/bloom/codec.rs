//! Flat binary dump format shared by every filter variant.
//!
//! ```text
//! bytes [0, 8)           k     u64, little-endian
//! bytes [8, 16)          size  u64, little-endian
//! bytes [16, 16 + size)  the bit array, verbatim
//! ```

use super::FilterParameters;
use crate::error::BloomError;
use byteorder::{ByteOrder, LittleEndian};
use std::cmp;
use std::convert::TryFrom;
use tracing::debug;

/// Length of the `k` and `size` header that precedes the bit array.
pub const HEADER_LEN: usize = 16;

/// Encodes `parameters` followed by the bit array `bytes`.
///
/// The body is always exactly `parameters.size` bytes: a shorter `bytes` is zero-padded and a
/// longer one is cut off.
///
/// # Panics
///
/// Panics if `parameters.size` bytes cannot be allocated.
///
/// # Examples
///
/// ```
/// use bloom_dump::bloom::{codec, FilterParameters};
///
/// let dump = codec::encode(&FilterParameters::new(2, 3), &[0xAA, 0, 1]);
/// assert_eq!(
///     dump,
///     vec![2, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0xAA, 0, 1],
/// );
///
/// let padded = codec::encode(&FilterParameters::new(2, 3), &[0xAA]);
/// assert_eq!(&padded[16..], &[0xAA, 0, 0]);
/// ```
pub fn encode(parameters: &FilterParameters, bytes: &[u8]) -> Vec<u8> {
    let size = usize::try_from(parameters.size).expect("filter size exceeds address space");
    let copied = cmp::min(size, bytes.len());

    let mut dump = vec![0; HEADER_LEN + size];
    LittleEndian::write_u64(&mut dump[0..8], parameters.k);
    LittleEndian::write_u64(&mut dump[8..16], parameters.size);
    dump[HEADER_LEN..HEADER_LEN + copied].copy_from_slice(&bytes[..copied]);
    dump
}

/// Decodes a dump into its parameters and bit array.
///
/// Decoding never fails. Header bytes missing from a short dump read as zero, and a dump holding
/// fewer than `size` bit array bytes yields a correspondingly shorter slice; bits past its end
/// behave as unset. `k` is taken as declared, so a hand-crafted dump can ask for an absurd number
/// of hash rounds per item; use [`try_decode`] for untrusted input.
///
/// # Examples
///
/// ```
/// use bloom_dump::bloom::{codec, FilterParameters};
///
/// let dump = codec::encode(&FilterParameters::new(2, 3), &[0xAA, 0, 1]);
///
/// let (parameters, bytes) = codec::decode(&dump);
/// assert_eq!(parameters, FilterParameters::new(2, 3));
/// assert_eq!(bytes, &[0xAA, 0, 1]);
///
/// let (parameters, bytes) = codec::decode(&dump[..17]);
/// assert_eq!(parameters, FilterParameters::new(2, 3));
/// assert_eq!(bytes, &[0xAA]);
/// ```
pub fn decode(dump: &[u8]) -> (FilterParameters, &[u8]) {
    let k = read_u64_padded(dump.get(0..cmp::min(8, dump.len())).unwrap_or(&[]));
    let size = read_u64_padded(dump.get(8..cmp::min(HEADER_LEN, dump.len())).unwrap_or(&[]));

    let body = dump.get(HEADER_LEN..).unwrap_or(&[]);
    let body = match usize::try_from(size) {
        Ok(size) if size <= body.len() => &body[..size],
        _ => {
            debug!(
                declared = size,
                actual = body.len(),
                "bloom filter dump is shorter than its declared size"
            );
            body
        }
    };

    (FilterParameters { k, size }, body)
}

/// Same as [`decode`], but rejects dumps that are shorter than their header or than the bit
/// array size the header declares, and dumps declaring more than `u32::MAX` hash rounds.
///
/// # Examples
///
/// ```
/// use bloom_dump::bloom::{codec, FilterParameters};
/// use bloom_dump::BloomError;
///
/// let dump = codec::encode(&FilterParameters::new(2, 3), &[0xAA, 0, 1]);
///
/// assert!(codec::try_decode(&dump).is_ok());
/// assert_eq!(
///     codec::try_decode(&dump[..17]),
///     Err(BloomError::TruncatedBody { declared: 3, actual: 1 }),
/// );
/// ```
pub fn try_decode(dump: &[u8]) -> Result<(FilterParameters, &[u8]), BloomError> {
    if dump.len() < HEADER_LEN {
        return Err(BloomError::TruncatedHeader { len: dump.len() });
    }

    let (parameters, body) = decode(dump);
    if parameters.k > u64::from(u32::MAX) {
        return Err(BloomError::InvalidHashCount(parameters.k));
    }
    if (body.len() as u64) < parameters.size {
        return Err(BloomError::TruncatedBody {
            declared: parameters.size,
            actual: body.len(),
        });
    }
    Ok((parameters, body))
}

/// Reads up to eight bytes as a little-endian integer, treating missing high bytes as zero.
fn read_u64_padded(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    LittleEndian::read_u64(&buf)
}
