//! Bob Jenkins' lookup3 32-bit hash (`hashlittle`, byte-oriented path).
//!
//! Produces the same values as the reference C implementation when bytes are
//! read little-endian, which keeps dump files portable across platforms.
//!
//! # References
//!
//! - Bob Jenkins (2006): "lookup3.c, by Bob Jenkins, May 2006, Public Domain"

#[inline]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(4);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(6);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(8);
    *b = b.wrapping_add(*a);
    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(16);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(19);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(4);
    *b = b.wrapping_add(*a);
}

#[inline]
fn finalize(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(14));
    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(11));
    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(25));
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(16));
    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(4));
    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(14));
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(24));
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Hash `key` with the given initial value.
///
/// The result is returned as `i32` so callers can chain it back in as the
/// next seed without conversions.
#[must_use]
pub fn hash(key: &[u8], initval: i32) -> i32 {
    let init = 0xdead_beef_u32
        .wrapping_add(key.len() as u32)
        .wrapping_add(initval as u32);
    let (mut a, mut b, mut c) = (init, init, init);

    let mut rest = key;
    while rest.len() > 12 {
        a = a.wrapping_add(read_u32_le(&rest[0..4]));
        b = b.wrapping_add(read_u32_le(&rest[4..8]));
        c = c.wrapping_add(read_u32_le(&rest[8..12]));
        mix(&mut a, &mut b, &mut c);
        rest = &rest[12..];
    }

    if rest.is_empty() {
        return c as i32;
    }

    // Last block (1..=12 bytes) affects all 32 bits of c.
    for (i, &byte) in rest.iter().enumerate() {
        let value = u32::from(byte) << ((i % 4) * 8);
        match i / 4 {
            0 => a = a.wrapping_add(value),
            1 => b = b.wrapping_add(value),
            _ => c = c.wrapping_add(value),
        }
    }

    finalize(&mut a, &mut b, &mut c);
    c as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_returns_seeded_constant() {
        assert_eq!(hash(b"", 0) as u32, 0xdead_beef);
    }

    #[test]
    fn test_reference_vectors() {
        let text = b"Four score and seven years ago";
        assert_eq!(hash(text, 0) as u32, 0x1777_0551);
        assert_eq!(hash(text, 1) as u32, 0xcd62_8161);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(hash(b"toupiao:1:1001", 7), hash(b"toupiao:1:1001", 7));
    }

    #[test]
    fn test_seed_changes_output() {
        assert_ne!(hash(b"jxq", 0), hash(b"jxq", 1));
    }

    #[test]
    fn test_block_boundaries() {
        // 12, 13 and 24 bytes exercise the full-block and tail paths.
        let data: Vec<u8> = (0u8..24).collect();
        let h12 = hash(&data[..12], 0);
        let h13 = hash(&data[..13], 0);
        let h24 = hash(&data, 0);
        assert_ne!(h12, h13);
        assert_ne!(h13, h24);
    }
}
