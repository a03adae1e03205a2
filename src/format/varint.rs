//! String length prefixes
//!
//! 7 bits per byte, low group first, high bit set on every byte but the last.
//! Capped at 4 bytes, so the largest encodable length is 2^28 - 1.

/// Maximum bytes in an encoded length prefix
pub const MAX_VARINT_BYTES: usize = 4;

/// Largest value representable in [`MAX_VARINT_BYTES`]
pub const MAX_VARINT_VALUE: u32 = (1 << (7 * MAX_VARINT_BYTES)) - 1;

/// Number of bytes `value` occupies once encoded
pub fn varint_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        _ => 4,
    }
}

/// Encode `value` into `buf`. Values above [`MAX_VARINT_VALUE`] are the
/// caller's responsibility to reject.
pub fn encode_varint(mut value: u32, buf: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// Decode a prefix from the start of `bytes`, returning (value, bytes_consumed).
///
/// Returns `None` if the buffer ends mid-prefix or the prefix runs past
/// [`MAX_VARINT_BYTES`].
pub fn decode_varint(bytes: &[u8]) -> Option<(u32, usize)> {
    let mut result: u32 = 0;
    for (i, &byte) in bytes.iter().take(MAX_VARINT_BYTES).enumerate() {
        result |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_boundaries() {
        for &value in &[0u32, 1, 127, 128, 16383, 16384, 0x1F_FFFF, 0x20_0000, MAX_VARINT_VALUE] {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            assert_eq!(buf.len(), varint_len(value));
            assert_eq!(decode_varint(&buf), Some((value, buf.len())));
        }
    }

    #[test]
    fn test_varint_single_byte_layout() {
        let mut buf = Vec::new();
        encode_varint(300, &mut buf);
        assert_eq!(buf, vec![0xAC, 0x02]);
    }

    #[test]
    fn test_varint_rejects_truncated_and_overlong() {
        assert_eq!(decode_varint(&[]), None);
        assert_eq!(decode_varint(&[0x80]), None);
        assert_eq!(decode_varint(&[0xFF; 5]), None);
    }
}
