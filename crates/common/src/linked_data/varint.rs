//! Unsigned LEB128 varints, the integer encoding used across multiformats
//! (CID version and codec prefixes, multihash code and digest length).

/// A `u64` never needs more than ten 7-bit groups.
pub const MAX_VARINT_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VarintError {
    #[error("varint is truncated")]
    Truncated,
    #[error("varint overflows u64")]
    Overflow,
    #[error("varint is not minimally encoded")]
    NotMinimal,
}

/// Encode `value` as an unsigned varint.
pub fn encode(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN);
    encode_into(value, &mut out);
    out
}

/// Append the varint encoding of `value` to `out`.
pub fn encode_into(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Decode a varint from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed. Trailing bytes
/// after the varint are left untouched.
pub fn decode(bytes: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut value: u64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(VarintError::Overflow);
        }
        let group = u64::from(byte & 0x7f);
        // the tenth group only has room for the top bit of a u64
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(VarintError::Overflow);
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            if i > 0 && *byte == 0 {
                return Err(VarintError::NotMinimal);
            }
            return Ok((value, i + 1));
        }
    }
    Err(VarintError::Truncated)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode_zero() {
        assert_eq!(encode(0), vec![0x00]);
    }

    #[test]
    fn test_encode_300() {
        assert_eq!(encode(300), vec![0xac, 0x02]);
    }

    #[test]
    fn test_encode_blake2b_code() {
        assert_eq!(encode(0xb220), vec![0xa0, 0xe4, 0x02]);
    }

    #[test]
    fn test_boundary_sweep() {
        let values = [
            0u64,
            1,
            127,
            128,
            255,
            300,
            16_383,
            16_384,
            2_097_151,
            2_097_152,
            u32::MAX as u64,
            u64::MAX >> 1,
            u64::MAX,
        ];
        for value in values {
            let encoded = encode(value);
            let (decoded, read) = decode(&encoded).unwrap();
            assert_eq!(decoded, value, "value {value}");
            assert_eq!(read, encoded.len(), "value {value}");
        }
    }

    #[test]
    fn test_encoded_lengths() {
        assert_eq!(encode(127).len(), 1);
        assert_eq!(encode(128).len(), 2);
        assert_eq!(encode(16_383).len(), 2);
        assert_eq!(encode(16_384).len(), 3);
        assert_eq!(encode(u64::MAX).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn test_decode_leaves_trailing_bytes() {
        let (value, read) = decode(&[0xac, 0x02, 0xff, 0xff]).unwrap();
        assert_eq!(value, 300);
        assert_eq!(read, 2);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode(&[]), Err(VarintError::Truncated));
        assert_eq!(decode(&[0x80, 0x80]), Err(VarintError::Truncated));
        assert_eq!(decode(&[0x80, 0x00]), Err(VarintError::NotMinimal));
        assert_eq!(decode(&[0xff; 11]), Err(VarintError::Overflow));
        let mut too_big = vec![0xff; 9];
        too_big.push(0x02);
        assert_eq!(decode(&too_big), Err(VarintError::Overflow));
    }
}
