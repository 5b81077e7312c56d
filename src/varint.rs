//! LEB128 varints and zigzag mapping.

/// Appends `n` to `dest` in the unsigned LEB128 varint format used for tags,
/// lengths and all varint scalars.
pub fn unsigned_varint_encode(mut n: u64, dest: &mut Vec<u8>) {
    let mut buf = [0u8; 10];
    let mut len = 0;
    loop {
        // Low 7 bits, continuation bit set while more follow
        let mut b = (n & 0b0111_1111) as u8;
        n >>= 7;
        if n != 0 {
            b |= 0b1000_0000;
        }
        buf[len] = b;
        len += 1;
        if n == 0 {
            break;
        }
    }
    dest.extend_from_slice(&buf[0..len]);
}

/// Number of bytes [`unsigned_varint_encode`] produces for `n`.
#[inline]
pub fn varint_len(n: u64) -> usize {
    // 1 byte per started group of 7 significant bits, at least one byte
    let bits = 64 - (n | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

#[inline]
pub fn to_zigzag32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub fn to_zigzag64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn encoded(n: u64) -> Vec<u8> {
        let mut out = Vec::new();
        unsigned_varint_encode(n, &mut out);
        out
    }

    #[test]
    fn unsigned_varint_encode_works() {
        // https://protobuf.dev/programming-guides/encoding/#varints
        assert_eq!(encoded(0), hex!("00"));
        assert_eq!(encoded(1), hex!("01"));
        assert_eq!(encoded(127), hex!("7f"));
        assert_eq!(encoded(128), hex!("8001"));
        assert_eq!(encoded(150), hex!("9601"));
        assert_eq!(encoded(u32::MAX as u64), hex!("ffffffff0f"));
        assert_eq!(encoded(u64::MAX), hex!("ffffffffffffffffff01"));
    }

    #[test]
    fn varint_len_matches_encoding() {
        for n in [0, 1, 127, 128, 16383, 16384, u32::MAX as u64, 1 << 56, u64::MAX] {
            assert_eq!(varint_len(n), encoded(n).len(), "Errored for value: {n}");
        }
    }

    #[test]
    fn to_zigzag32_works() {
        // values from https://protobuf.dev/programming-guides/encoding/
        assert_eq!(to_zigzag32(0), 0);
        assert_eq!(to_zigzag32(-1), 1);
        assert_eq!(to_zigzag32(1), 2);
        assert_eq!(to_zigzag32(-2), 3);
        assert_eq!(to_zigzag32(0x7fffffff), 0xfffffffe);
        assert_eq!(to_zigzag32(-0x80000000), 0xffffffff);
    }

    #[test]
    fn to_zigzag64_works() {
        assert_eq!(to_zigzag64(0), 0);
        assert_eq!(to_zigzag64(-1), 1);
        assert_eq!(to_zigzag64(1), 2);
        assert_eq!(to_zigzag64(-2), 3);
        assert_eq!(to_zigzag64(i64::MAX), u64::MAX - 1);
        assert_eq!(to_zigzag64(i64::MIN), u64::MAX);
    }
}
