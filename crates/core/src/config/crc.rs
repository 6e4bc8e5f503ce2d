//! CRC-32 integrity code for the persisted configuration record.

use crc::{Crc, CRC_32_ISO_HDLC};

/// CRC-32 algorithm (ISO HDLC / Ethernet / ZIP).
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Computes the integrity code over `data`.
pub fn calculate_crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Checks `data` against a stored integrity code.
pub fn validate_crc32(data: &[u8], expected: u32) -> bool {
    calculate_crc32(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(calculate_crc32(b""), 0x0000_0000);
        assert_eq!(calculate_crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn validate_matches_calculate() {
        let data = b"persisted configuration record";
        let crc = calculate_crc32(data);
        assert!(validate_crc32(data, crc));
        assert!(!validate_crc32(data, crc ^ 1));
    }

    #[test]
    fn single_bit_flip_detected() {
        let mut data = [0x5A_u8; 64];
        let crc = calculate_crc32(&data);
        data[37] ^= 0x01;
        assert!(!validate_crc32(&data, crc));
    }
}
