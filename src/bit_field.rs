//! Fixed-size list of bytes addressed bit by bit.

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use std::sync::Arc;

const BLOCK_BIT_COUNT: usize = 8;

/// A fixed-size byte buffer whose bits back a bloom filter.
///
/// Every accessor is bounds-checked and total: reading past the end yields `None` (or an unset
/// bit) and writing past the end is a silent no-op. The buffer is reference counted, so cloning a
/// `BitField` is cheap and the copying primitives only duplicate the bytes when a write lands in
/// range.
///
/// # Examples
///
/// ```
/// use bloom_dump::bit_field::BitField;
///
/// let empty = BitField::new(2);
/// let written = empty.write_copy(1, 0b0000_0101);
///
/// assert_eq!(empty.as_bytes(), &[0, 0]);
/// assert_eq!(written.as_bytes(), &[0, 0b0000_0101]);
/// assert!(written.get_bit(1, 2));
///
/// // Out of range writes hand back the same buffer.
/// let unchanged = written.write_copy(5, 0xFF);
/// assert_eq!(unchanged, written);
/// assert_eq!(unchanged.read(5), None);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitField {
    bytes: Arc<Vec<u8>>,
}

impl BitField {
    /// Constructs a new `BitField` of `size` bytes. All bits are initialized to zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bit_field::BitField;
    ///
    /// let bf = BitField::new(3);
    /// assert_eq!(bf.as_bytes(), &[0, 0, 0]);
    /// ```
    pub fn new(size: usize) -> Self {
        Self::from_bytes(vec![0; size])
    }

    /// Constructs a `BitField` that takes ownership of `bytes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bit_field::BitField;
    ///
    /// let bf = BitField::from_bytes(vec![0b1000_0001]);
    /// assert!(bf.get_bit(0, 0));
    /// assert!(bf.get_bit(0, 7));
    /// assert!(!bf.get_bit(0, 1));
    /// ```
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        BitField {
            bytes: Arc::new(bytes),
        }
    }

    /// Returns the number of bytes in the `BitField`.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the `BitField` holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the number of addressable bits.
    pub fn bit_len(&self) -> usize {
        self.len() * BLOCK_BIT_COUNT
    }

    /// Returns the byte at `index`, or `None` if `index` is out of bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bit_field::BitField;
    ///
    /// let bf = BitField::from_bytes(vec![7]);
    /// assert_eq!(bf.read(0), Some(7));
    /// assert_eq!(bf.read(1), None);
    /// ```
    #[inline]
    pub fn read(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// Returns a `BitField` equal to `self` except that byte `index` is `value`. `self` is left
    /// untouched. If `index` is out of bounds the result is `self` unchanged.
    pub fn write_copy(&self, index: usize, value: u8) -> Self {
        self.modify_copy(index, |_| value)
    }

    /// Returns a `BitField` equal to `self` except that byte `index` is replaced by `f` applied to
    /// its current value. `self` is left untouched. If `index` is out of bounds `f` is not called
    /// and the result is `self` unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bit_field::BitField;
    ///
    /// let bf = BitField::from_bytes(vec![0b01, 0]);
    /// let next = bf.modify_copy(0, |byte| byte | 0b10);
    ///
    /// assert_eq!(bf.as_bytes(), &[0b01, 0]);
    /// assert_eq!(next.as_bytes(), &[0b11, 0]);
    /// ```
    pub fn modify_copy<F>(&self, index: usize, f: F) -> Self
    where
        F: FnOnce(u8) -> u8,
    {
        let mut next = self.clone();
        next.modify(index, f);
        next
    }

    /// Sets byte `index` to `value` in place. Returns `false`, and does nothing, if `index` is
    /// out of bounds.
    pub fn write(&mut self, index: usize, value: u8) -> bool {
        self.modify(index, |_| value)
    }

    /// Replaces byte `index` with `f` applied to its current value, in place. Returns `false`,
    /// and does nothing, if `index` is out of bounds.
    ///
    /// If the underlying buffer is shared with other clones, it is copied first so the clones
    /// keep observing the old contents.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bit_field::BitField;
    ///
    /// let mut bf = BitField::new(1);
    /// let snapshot = bf.clone();
    ///
    /// assert!(bf.modify(0, |byte| byte ^ 0xFF));
    /// assert!(!bf.modify(1, |byte| byte ^ 0xFF));
    ///
    /// assert_eq!(bf.as_bytes(), &[0xFF]);
    /// assert_eq!(snapshot.as_bytes(), &[0]);
    /// ```
    pub fn modify<F>(&mut self, index: usize, f: F) -> bool
    where
        F: FnOnce(u8) -> u8,
    {
        match self.read(index) {
            Some(value) => {
                Arc::make_mut(&mut self.bytes)[index] = f(value);
                true
            }
            None => false,
        }
    }

    /// Returns the bit at `position` (0 is the least significant bit) of byte `index`. Bits
    /// outside the buffer read as unset.
    #[inline]
    pub fn get_bit(&self, index: usize, position: u8) -> bool {
        let mask = 1 << (position as usize % BLOCK_BIT_COUNT);
        self.read(index).map_or(false, |byte| byte & mask != 0)
    }

    /// Sets the bit at `position` of byte `index` in place. Returns `true` if the bit was
    /// previously unset.
    ///
    /// A bit that is already set, or lies outside the buffer, leaves the buffer untouched, so a
    /// shared buffer is not copied.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bit_field::BitField;
    ///
    /// let mut bf = BitField::new(2);
    ///
    /// assert!(bf.set_bit(1, 3));
    /// assert!(!bf.set_bit(1, 3));
    /// assert!(!bf.set_bit(2, 0));
    /// assert_eq!(bf.as_bytes(), &[0, 0b1000]);
    /// ```
    #[inline]
    pub fn set_bit(&mut self, index: usize, position: u8) -> bool {
        if self.get_bit(index, position) {
            return false;
        }
        let mask = 1 << (position as usize % BLOCK_BIT_COUNT);
        self.modify(index, |byte| byte | mask)
    }

    /// Resets every bit to zero, keeping the length.
    pub fn clear(&mut self) {
        match Arc::get_mut(&mut self.bytes) {
            Some(bytes) => bytes.iter_mut().for_each(|byte| *byte = 0),
            None => self.bytes = Arc::new(vec![0; self.bytes.len()]),
        }
    }

    /// Returns the number of set bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloom_dump::bit_field::BitField;
    ///
    /// let bf = BitField::from_bytes(vec![0b1011, 0b1]);
    /// assert_eq!(bf.count_ones(), 4);
    /// assert_eq!(bf.count_zeros(), 12);
    /// ```
    pub fn count_ones(&self) -> usize {
        self.bytes
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .sum()
    }

    /// Returns the number of unset bits.
    pub fn count_zeros(&self) -> usize {
        self.bit_len() - self.count_ones()
    }

    /// Returns `true` if `self` and `other` currently share the same underlying buffer.
    pub fn shares_storage(&self, other: &BitField) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the `BitField` and returns its bytes, copying them only if the buffer is shared.
    pub fn into_bytes(self) -> Vec<u8> {
        Arc::try_unwrap(self.bytes).unwrap_or_else(|shared| shared.as_ref().clone())
    }
}

impl From<Vec<u8>> for BitField {
    fn from(bytes: Vec<u8>) -> Self {
        BitField::from_bytes(bytes)
    }
}

impl From<&[u8]> for BitField {
    fn from(bytes: &[u8]) -> Self {
        BitField::from_bytes(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::BitField;

    #[test]
    fn test_new() {
        let bf = BitField::new(4);
        assert_eq!(bf.len(), 4);
        assert_eq!(bf.bit_len(), 32);
        assert_eq!(bf.count_ones(), 0);
        assert_eq!(bf.count_zeros(), 32);
        assert!(!bf.is_empty());
    }

    #[test]
    fn test_empty() {
        let mut bf = BitField::new(0);
        assert!(bf.is_empty());
        assert_eq!(bf.read(0), None);
        assert!(!bf.get_bit(0, 0));
        assert!(!bf.set_bit(0, 0));
        assert!(!bf.write(0, 1));
        assert_eq!(bf.write_copy(0, 1), BitField::new(0));
        assert_eq!(bf.count_zeros(), 0);
    }

    #[test]
    fn test_write_copy_leaves_original() {
        let original = BitField::from_bytes(vec![1, 2, 3]);
        let next = original.write_copy(2, 9);

        assert_eq!(original.as_bytes(), &[1, 2, 3]);
        assert_eq!(next.as_bytes(), &[1, 2, 9]);
        assert!(!next.shares_storage(&original));
    }

    #[test]
    fn test_out_of_range_copy_shares_storage() {
        let original = BitField::from_bytes(vec![1, 2, 3]);
        let mut called = false;
        let next = original.modify_copy(3, |byte| {
            called = true;
            byte
        });

        assert!(!called);
        assert!(next.shares_storage(&original));
    }

    #[test]
    fn test_bits_across_byte_boundaries() {
        let mut bf = BitField::new(3);
        for (index, position) in &[(0, 7), (1, 0), (1, 7), (2, 0)] {
            assert!(bf.set_bit(*index, *position));
        }

        assert_eq!(bf.as_bytes(), &[0b1000_0000, 0b1000_0001, 0b0000_0001]);
        assert!(bf.get_bit(0, 7));
        assert!(!bf.get_bit(0, 6));
        assert!(bf.get_bit(1, 0));
        assert!(bf.get_bit(2, 0));
        assert!(!bf.get_bit(2, 1));
        assert_eq!(bf.count_ones(), 4);
    }

    #[test]
    fn test_set_present_bit_does_not_copy() {
        let mut bf = BitField::from_bytes(vec![0b10]);
        let snapshot = bf.clone();

        assert!(!bf.set_bit(0, 1));
        assert!(bf.shares_storage(&snapshot));

        assert!(bf.set_bit(0, 0));
        assert!(!bf.shares_storage(&snapshot));
        assert_eq!(snapshot.as_bytes(), &[0b10]);
        assert_eq!(bf.as_bytes(), &[0b11]);
    }

    #[test]
    fn test_clear() {
        let mut bf = BitField::from_bytes(vec![0xFF, 0x0F]);
        let snapshot = bf.clone();

        bf.clear();
        assert_eq!(bf.as_bytes(), &[0, 0]);
        assert_eq!(snapshot.as_bytes(), &[0xFF, 0x0F]);

        let mut owned = BitField::from_bytes(vec![0xFF]);
        owned.clear();
        assert_eq!(owned.count_ones(), 0);
    }

    #[test]
    fn test_into_bytes() {
        let bf = BitField::from(&[1u8, 2][..]);
        let shared = bf.clone();

        assert_eq!(bf.into_bytes(), vec![1, 2]);
        assert_eq!(shared.into_bytes(), vec![1, 2]);
    }
}
