//! CRC-16/CCITT-FALSE checksum shared by status and command packets.
//!
//! Parameters: init `0xFFFF`, polynomial `0x1021`, MSB first, no output
//! reflection, no final XOR. The `crc` catalogue lists this variant as
//! `CRC_16_IBM_3740`.

use crc::{CRC_16_IBM_3740, Crc};

const CCITT_FALSE: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Compute the packet checksum over `data`.
///
/// An empty slice yields `0` rather than the raw CRC register value; the
/// amplifier never checksums an empty region, and callers treat `0` as "no
/// data".
///
/// # Example
///
/// ```
/// use devimote_protocol::crc::checksum16;
///
/// assert_eq!(checksum16(b"123456789"), 0x29B1);
/// assert_eq!(checksum16(&[]), 0);
/// ```
pub fn checksum16(data: &[u8]) -> u16 {
    if data.is_empty() {
        return 0;
    }
    CCITT_FALSE.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bitwise reference implementation used to pin the catalogue entry.
    fn reference(data: &[u8]) -> u16 {
        let mut crc: u16 = 0xFFFF;
        for &byte in data {
            crc ^= u16::from(byte) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ 0x1021
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    #[test]
    fn check_value() {
        assert_eq!(checksum16(b"123456789"), 0x29B1);
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(checksum16(&[]), 0);
    }

    #[test]
    fn single_bytes() {
        assert_eq!(checksum16(&[0x00]), reference(&[0x00]));
        assert_eq!(checksum16(&[0xFF]), reference(&[0xFF]));
        assert_eq!(checksum16(b"A"), 0xB915);
    }

    #[test]
    fn matches_bitwise_reference() {
        let header = [
            0x44, 0x72, 0x00, 0x05, 0x00, 0x02, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(checksum16(&header), reference(&header));

        let ramp: Vec<u8> = (0..=255).collect();
        assert_eq!(checksum16(&ramp), reference(&ramp));
    }

    #[test]
    fn deterministic() {
        let data = b"Expert 220 Pro";
        assert_eq!(checksum16(data), checksum16(data));
    }
}
