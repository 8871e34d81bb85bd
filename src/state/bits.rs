//! Fixed-length bit vectors.
//!
//! Bits past `len` in the last word are always zero; every mutation checks its
//! index against `len`, so scans never report a position outside the vector.

use std::ops::Range;

const WORD_BITS: usize = 64;

/// A fixed-length vector of bits packed into `u64` words.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Bits {
    /// Backing storage, least significant bit first.
    words: Vec<u64>,

    /// Number of addressable bits.
    len: usize,
}

impl Bits {
    /// Create a vector of `len` cleared bits.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Bits {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// Number of addressable bits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the vector has no addressable bits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, u64) {
        assert!(
            index < self.len,
            "bit {index} out of range for length {}",
            self.len
        );
        (index / WORD_BITS, 1 << (index % WORD_BITS))
    }

    /// Read one bit.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        let (word, mask) = self.locate(index);
        self.words[word] & mask != 0
    }

    /// Write one bit.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        let (word, mask) = self.locate(index);
        if value {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
    }

    /// Set one bit.
    #[inline]
    pub fn insert(&mut self, index: usize) {
        self.set(index, true);
    }

    /// Clear one bit.
    #[inline]
    pub fn remove(&mut self, index: usize) {
        self.set(index, false);
    }

    /// Write every bit in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range ends past `len`.
    pub fn set_range(&mut self, range: Range<usize>, value: bool) {
        assert!(
            range.end <= self.len,
            "range end {} out of range for length {}",
            range.end,
            self.len
        );
        let mut index = range.start;
        while index < range.end {
            let word = index / WORD_BITS;
            let offset = index % WORD_BITS;
            let span = (WORD_BITS - offset).min(range.end - index);
            let mask = if span == WORD_BITS {
                u64::MAX
            } else {
                ((1u64 << span) - 1) << offset
            };
            if value {
                self.words[word] |= mask;
            } else {
                self.words[word] &= !mask;
            }
            index += span;
        }
    }

    /// Overwrite this vector with `other`, which must have the same length.
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    pub fn copy_from(&mut self, other: &Bits) {
        assert_eq!(self.len, other.len, "bit vector length mismatch");
        self.words.copy_from_slice(&other.words);
    }

    /// Number of set bits.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// First set bit at or after `from`.
    #[must_use]
    pub fn next_set(&self, from: usize) -> Option<usize> {
        self.scan(from, |word| self.words[word])
    }

    /// First clear bit at or after `from`.
    #[must_use]
    pub fn next_clear(&self, from: usize) -> Option<usize> {
        self.scan(from, |word| !self.words[word])
    }

    /// First bit at or after `from` that is set here and clear in `mask`.
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    #[must_use]
    pub fn next_set_excluding(&self, mask: &Bits, from: usize) -> Option<usize> {
        assert_eq!(self.len, mask.len, "bit vector length mismatch");
        self.scan(from, |word| self.words[word] & !mask.words[word])
    }

    /// First bit at or after `from` that is set both here and in `mask`.
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    #[must_use]
    pub fn next_set_within(&self, mask: &Bits, from: usize) -> Option<usize> {
        assert_eq!(self.len, mask.len, "bit vector length mismatch");
        self.scan(from, |word| self.words[word] & mask.words[word])
    }

    #[inline]
    fn scan(&self, from: usize, word_at: impl Fn(usize) -> u64) -> Option<usize> {
        if from >= self.len {
            return None;
        }
        let mut word = from / WORD_BITS;
        let mut bits = word_at(word) & (u64::MAX << (from % WORD_BITS));
        loop {
            if bits != 0 {
                let index = word * WORD_BITS + bits.trailing_zeros() as usize;
                return (index < self.len).then_some(index);
            }
            word += 1;
            if word >= self.words.len() {
                return None;
            }
            bits = word_at(word);
        }
    }

    /// Iterate over the positions of set bits in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        let mut cursor = 0;
        std::iter::from_fn(move || {
            let index = self.next_set(cursor)?;
            cursor = index + 1;
            Some(index)
        })
    }
}
