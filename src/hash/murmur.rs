//! MurmurHash2, 32-bit variant.
//!
//! Blocks are read little-endian. Tail bytes are folded in as *signed* bytes
//! (sign-extended before shifting); dumps written with [`HashKind::Murmur`]
//! depend on that, so it must not be "fixed".
//!
//! [`HashKind::Murmur`]: crate::hash::HashKind::Murmur

const M: u32 = 0x5bd1_e995;
const R: u32 = 24;

/// Hash `data` with the given seed.
#[must_use]
pub fn hash(data: &[u8], seed: i32) -> i32 {
    let mut h = (seed as u32) ^ (data.len() as u32);

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let mut k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        if tail.len() >= 3 {
            h ^= (i32::from(tail[2] as i8) << 16) as u32;
        }
        if tail.len() >= 2 {
            h ^= (i32::from(tail[1] as i8) << 8) as u32;
        }
        h ^= i32::from(tail[0] as i8) as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_zero_seed() {
        // h = 0 ^ 0, then only the final avalanche runs.
        assert_eq!(hash(b"", 0), 0);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(hash(b"jxq", 0), hash(b"jxq", 0));
    }

    #[test]
    fn test_seed_changes_output() {
        assert_ne!(hash(b"jxq", 0), hash(b"jxq", 1));
    }

    #[test]
    fn test_high_tail_bytes_are_sign_extended() {
        // Manual evaluation of a single 0xff tail byte with seed 0.
        let mut h: u32 = 1;
        h ^= 0xffff_ffff;
        h = h.wrapping_mul(M);
        h ^= h >> 13;
        h = h.wrapping_mul(M);
        h ^= h >> 15;
        assert_eq!(hash(&[0xff], 0), h as i32);
    }

    #[test]
    fn test_tail_lengths_differ() {
        let data = b"abcdefg";
        let hashes: Vec<i32> = (1..=data.len()).map(|n| hash(&data[..n], 0)).collect();
        for i in 0..hashes.len() {
            for j in (i + 1)..hashes.len() {
                assert_ne!(hashes[i], hashes[j]);
            }
        }
    }
}
