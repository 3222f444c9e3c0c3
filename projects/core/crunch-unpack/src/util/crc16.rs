//! CRC-16/CCITT as used by the CRN header and data checksums.
//!
//! Polynomial 0x1021, initial value 0xFFFF, final XOR 0xFFFF, no reflection.

/// Continues a CRC-16 over `data`, starting from a previously returned value.
///
/// Start with `0` for a fresh checksum.
pub fn crc16(crc: u16, data: &[u8]) -> u16 {
    let mut crc = !crc;
    for &byte in data {
        let q = (byte as u16) ^ (crc >> 8);
        let r = q ^ (q >> 4);
        crc = (crc << 8) ^ r ^ (r << 5) ^ (r << 12);
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"", 0x0000)]
    #[case(b"123456789", 0xD64E)]
    fn matches_known_values(#[case] data: &[u8], #[case] expected: u16) {
        assert_eq!(crc16(0, data), expected);
    }

    #[test]
    fn can_be_computed_incrementally() {
        let data = b"crunched texture data";
        let (left, right) = data.split_at(7);
        assert_eq!(crc16(crc16(0, left), right), crc16(0, data));
    }
}
