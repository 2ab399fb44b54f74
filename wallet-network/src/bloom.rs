//! The BIP37 bloom filter a wallet loads into each peer connection so that
//! peer only relays blocks and transactions touching watched scripts.

use std::io::Cursor;

use crate::protocol::external::types::{Filter, Tweak};

/// Hard caps from BIP37: filter size in bytes, and hash function count.
const MAX_FILTER_BYTES: usize = 36_000;
const MAX_HASH_FUNCS: u32 = 50;

/// BIP37's per-hash seed constant.
const SEED_MULTIPLIER: u32 = 0xFBA4_C795;

/// A bloom filter sized by BIP37's false-positive-rate formula and loaded
/// with a fixed set of watched elements (scripts, outpoints).
pub struct BloomFilter {
    bits: Vec<u8>,
    hash_functions_count: u32,
    tweak: u32,
}

impl BloomFilter {
    /// Size a filter for `elements.len()` items at `false_positive_rate`,
    /// then insert every element.
    pub fn new(elements: &[Vec<u8>], false_positive_rate: f64, tweak: u32) -> BloomFilter {
        let n = (elements.len().max(1)) as f64;

        let filter_bits = (-1.0 / (std::f64::consts::LN_2 * std::f64::consts::LN_2)
            * n
            * false_positive_rate.ln())
        .max(8.0)
        .min((MAX_FILTER_BYTES * 8) as f64);
        let filter_bytes = ((filter_bits / 8.0).ceil() as usize).max(1);

        let hash_functions_count = (((filter_bytes * 8) as f64 / n) * std::f64::consts::LN_2)
            .max(1.0)
            .min(MAX_HASH_FUNCS as f64) as u32;

        let mut filter = BloomFilter {
            bits: vec![0u8; filter_bytes],
            hash_functions_count,
            tweak,
        };
        for element in elements {
            filter.insert(element);
        }
        filter
    }

    fn bit_index(&self, element: &[u8], hash_index: u32) -> usize {
        let seed = hash_index.wrapping_mul(SEED_MULTIPLIER).wrapping_add(self.tweak);
        let hash = murmur3::murmur3_32(&mut Cursor::new(element), seed)
            .expect("hashing an in-memory byte slice cannot fail");
        (hash as usize) % (self.bits.len() * 8)
    }

    pub fn insert(&mut self, element: &[u8]) {
        for i in 0..self.hash_functions_count {
            let bit = self.bit_index(element, i);
            self.bits[bit / 8] |= 1 << (bit % 8);
        }
    }

    pub fn contains(&self, element: &[u8]) -> bool {
        (0..self.hash_functions_count).all(|i| {
            let bit = self.bit_index(element, i);
            self.bits[bit / 8] & (1 << (bit % 8)) != 0
        })
    }

    /// Consume the filter into the wire fields of a `filterload` message.
    pub fn into_parts(self) -> (Filter, u32, Tweak) {
        (Filter(self.bits), self.hash_functions_count, Tweak(self.tweak))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_elements_are_found() {
        let elements = vec![b"abc".to_vec(), b"watched-script".to_vec()];
        let filter = BloomFilter::new(&elements, 0.001, 0);
        assert!(filter.contains(b"abc"));
        assert!(filter.contains(b"watched-script"));
    }

    #[test]
    fn differing_tweaks_change_the_bit_pattern() {
        let elements = vec![b"abc".to_vec()];
        let a = BloomFilter::new(&elements, 0.001, 0);
        let b = BloomFilter::new(&elements, 0.001, 0xDEADBEEF);
        let (filter_a, _, _) = a.into_parts();
        let (filter_b, _, _) = b.into_parts();
        assert_ne!(filter_a.0, filter_b.0);
    }

    #[test]
    fn filter_size_is_capped_at_the_bip37_maximum() {
        let elements: Vec<Vec<u8>> = (0..1_000_000u32).map(|i| i.to_le_bytes().to_vec()).collect();
        let filter = BloomFilter::new(&elements, 0.0001, 0);
        let (filter, _, _) = filter.into_parts();
        assert!(filter.0.len() <= MAX_FILTER_BYTES);
    }
}
