//! Byte frames exchanged with the BL0939 over UART (4800 baud, 8N1).
//!
//! Reads are two bytes, `0x5{addr}` and a register selector, and are not
//! checksummed. The IC answers with the register data followed by a checksum
//! that also covers the read command, so the address is part of every
//! response check. Writes carry their own checksum.

use core::{fmt, iter};

use super::registers::{Reg, FULL_PACKET};
use crate::config::DeviceAddress;

pub const READ_COMMAND: u8 = 0x50;
pub const WRITE_COMMAND: u8 = 0xA0;
pub const PACKET_HEADER: u8 = 0x55;

/// header, eleven 24 bit fields, checksum
pub const RESPONSE_LEN: usize = 1 + 3 * FIELD_COUNT + 1;
/// three data bytes and checksum
pub const REGISTER_REPLY_LEN: usize = 4;

const FIELD_COUNT: usize = 11;

pub type RequestFrame = [u8; 2];
pub type WriteFrame = [u8; 6];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    Length { expected: usize, received: usize },
    Checksum { expected: u8, received: u8 },
    Header(u8),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Length { expected, received } => {
                write!(f, "expected {expected} bytes, received {received}")
            }
            FrameError::Checksum { expected, received } => {
                write!(f, "invalid checksum {received:#04x}, expected {expected:#04x}")
            }
            FrameError::Header(h) => write!(f, "invalid packet header {h:#04x}"),
        }
    }
}

/// Fields of the full data packet, in wire order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    IaFastRms = 0,
    IaRms,
    IbRms,
    VRms,
    IbFastRms,
    AWatt,
    BWatt,
    CfaCnt,
    CfbCnt,
    Tps1,
    Tps2,
}

/// A full data packet that passed length, checksum and header checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResponsePacket([u8; RESPONSE_LEN]);

impl ResponsePacket {
    pub fn as_bytes(&self) -> &[u8; RESPONSE_LEN] {
        &self.0
    }

    fn field(&self, field: Field) -> [u8; 3] {
        let offset = 1 + 3 * field as usize;
        [self.0[offset], self.0[offset + 1], self.0[offset + 2]]
    }

    /// 24 bit little endian value
    pub fn unsigned(&self, field: Field) -> u32 {
        let [l, m, h] = self.field(field);
        u32::from_le_bytes([l, m, h, 0])
    }

    /// 24 bit little endian two's complement value
    pub fn signed(&self, field: Field) -> i32 {
        // move the sign bit to bit 31 and shift back arithmetically
        ((self.unsigned(field) << 8) as i32) >> 8
    }
}

pub fn read_command(address: DeviceAddress) -> u8 {
    READ_COMMAND | address.get()
}

pub fn write_command(address: DeviceAddress) -> u8 {
    WRITE_COMMAND | address.get()
}

/// Inverted modulo-256 sum of `bytes`.
pub fn checksum<'a>(bytes: impl IntoIterator<Item = &'a u8>) -> u8 {
    !bytes.into_iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Checksum the IC appends to a reply, `payload` is everything it sent before it.
pub fn response_checksum(address: DeviceAddress, payload: &[u8]) -> u8 {
    checksum(iter::once(&read_command(address)).chain(payload))
}

pub fn build_request(address: DeviceAddress) -> RequestFrame {
    [read_command(address), FULL_PACKET]
}

pub fn build_register_request(address: DeviceAddress, reg: Reg) -> RequestFrame {
    [read_command(address), reg.addr()]
}

/// Register write, value is sent as 24 bit little endian.
pub fn build_write(address: DeviceAddress, reg: Reg, value: u32) -> WriteFrame {
    let [d0, d1, d2, _] = value.to_le_bytes();
    let mut frame = [write_command(address), reg.addr(), d0, d1, d2, 0];
    frame[5] = checksum(&frame[..5]);
    frame
}

pub fn parse_response(address: DeviceAddress, bytes: &[u8]) -> Result<ResponsePacket, FrameError> {
    let Ok(raw) = <[u8; RESPONSE_LEN]>::try_from(bytes) else {
        return Err(FrameError::Length {
            expected: RESPONSE_LEN,
            received: bytes.len(),
        });
    };

    let expected = response_checksum(address, &raw[..RESPONSE_LEN - 1]);
    let received = raw[RESPONSE_LEN - 1];
    if expected != received {
        return Err(FrameError::Checksum { expected, received });
    }

    if raw[0] != PACKET_HEADER {
        return Err(FrameError::Header(raw[0]));
    }

    Ok(ResponsePacket(raw))
}

/// Reply to [`build_register_request`]: three data bytes, little endian.
pub fn parse_register_read(address: DeviceAddress, reg: Reg, bytes: &[u8]) -> Result<u32, FrameError> {
    let Ok([d0, d1, d2, received]) = <[u8; REGISTER_REPLY_LEN]>::try_from(bytes) else {
        return Err(FrameError::Length {
            expected: REGISTER_REPLY_LEN,
            received: bytes.len(),
        });
    };

    let expected = response_checksum(address, &[reg.addr(), d0, d1, d2]);
    if expected != received {
        return Err(FrameError::Checksum { expected, received });
    }

    Ok(u32::from_le_bytes([d0, d1, d2, 0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(a: u8) -> DeviceAddress {
        DeviceAddress::new(a).unwrap()
    }

    /// packet with every field set to `fill` and a valid checksum
    fn packet(address: DeviceAddress, fill: u8) -> [u8; RESPONSE_LEN] {
        let mut raw = [fill; RESPONSE_LEN];
        raw[0] = PACKET_HEADER;
        raw[RESPONSE_LEN - 1] = response_checksum(address, &raw[..RESPONSE_LEN - 1]);
        raw
    }

    #[test]
    fn request_is_deterministic() {
        for a in 0..=DeviceAddress::MAX {
            let request = build_request(addr(a));
            assert_eq!(request, [0x50 | a, 0xAA]);
            assert_eq!(request, build_request(addr(a)));
        }
    }

    #[test]
    fn response_checksum_covers_address() {
        for a in 0..=DeviceAddress::MAX {
            let raw = packet(addr(a), 0x12);
            assert!(parse_response(addr(a), &raw).is_ok());
            // the same bytes do not validate for any other address
            let other = addr((a + 1) % 16);
            assert!(matches!(
                parse_response(other, &raw),
                Err(FrameError::Checksum { .. })
            ));
        }
    }

    #[test]
    fn checksum_bit_flips_are_rejected() {
        let address = addr(5);
        for fill in [0x00, 0x7f, 0x80, 0xff] {
            let raw = packet(address, fill);
            for bit in 0..8 {
                let mut corrupted = raw;
                corrupted[RESPONSE_LEN - 1] ^= 1 << bit;
                assert_eq!(
                    parse_response(address, &corrupted),
                    Err(FrameError::Checksum {
                        expected: raw[RESPONSE_LEN - 1],
                        received: corrupted[RESPONSE_LEN - 1],
                    })
                );
            }
        }
    }

    #[test]
    fn wrong_length_is_rejected_before_checksum() {
        let address = addr(5);
        let raw = packet(address, 0x33);
        for len in [0, 1, RESPONSE_LEN - 1] {
            assert_eq!(
                parse_response(address, &raw[..len]),
                Err(FrameError::Length {
                    expected: RESPONSE_LEN,
                    received: len,
                })
            );
        }

        // a longer buffer whose trailing byte is a valid checksum
        let mut long = [0u8; RESPONSE_LEN + 1];
        long[..RESPONSE_LEN - 1].copy_from_slice(&raw[..RESPONSE_LEN - 1]);
        long[RESPONSE_LEN] = response_checksum(address, &long[..RESPONSE_LEN]);
        assert_eq!(
            parse_response(address, &long),
            Err(FrameError::Length {
                expected: RESPONSE_LEN,
                received: RESPONSE_LEN + 1,
            })
        );
    }

    #[test]
    fn header_is_checked() {
        let address = addr(0);
        let mut raw = packet(address, 0x01);
        raw[0] = 0x56;
        raw[RESPONSE_LEN - 1] = response_checksum(address, &raw[..RESPONSE_LEN - 1]);
        assert_eq!(parse_response(address, &raw), Err(FrameError::Header(0x56)));
    }

    #[test]
    fn field_decoding() {
        let address = addr(5);
        let mut raw = packet(address, 0x00);
        // V_RMS = 0x8a2b3c, little endian on the wire
        raw[1 + 3 * 3..1 + 3 * 4].copy_from_slice(&[0x3c, 0x2b, 0x8a]);
        // A_WATT = -2
        raw[1 + 3 * 5..1 + 3 * 6].copy_from_slice(&[0xfe, 0xff, 0xff]);
        // B_WATT = +0x7fffff
        raw[1 + 3 * 6..1 + 3 * 7].copy_from_slice(&[0xff, 0xff, 0x7f]);
        raw[RESPONSE_LEN - 1] = response_checksum(address, &raw[..RESPONSE_LEN - 1]);

        let packet = parse_response(address, &raw).unwrap();
        assert_eq!(packet.unsigned(Field::VRms), 0x8a2b3c);
        assert_eq!(packet.signed(Field::AWatt), -2);
        assert_eq!(packet.unsigned(Field::AWatt), 0xfffffe);
        assert_eq!(packet.signed(Field::BWatt), 0x7fffff);
        assert_eq!(packet.signed(Field::IaRms), 0);
    }

    #[test]
    fn init_write_frames() {
        let address = addr(5);
        assert_eq!(
            build_write(address, Reg::SOFT_RESET, 0x5A5A5A),
            [0xA5, 0x19, 0x5A, 0x5A, 0x5A, 0x33]
        );
        assert_eq!(
            build_write(address, Reg::USR_WRPROT, 0x55),
            [0xA5, 0x1A, 0x55, 0x00, 0x00, 0xEB]
        );
        assert_eq!(
            build_write(addr(0), Reg::MODE, 0x300),
            [0xA0, 0x18, 0x00, 0x03, 0x00, !(0xA0u8 + 0x18 + 0x03)]
        );
    }

    #[test]
    fn register_read_reply() {
        let address = addr(5);
        let data = [0x00, 0x01, 0x00];
        let sum = response_checksum(address, &[Reg::MODE.addr(), data[0], data[1], data[2]]);
        let reply = [data[0], data[1], data[2], sum];

        assert_eq!(build_register_request(address, Reg::MODE), [0x55, 0x18]);
        assert_eq!(parse_register_read(address, Reg::MODE, &reply), Ok(0x100));
        assert_eq!(
            parse_register_read(address, Reg::MODE, &reply[..3]),
            Err(FrameError::Length {
                expected: REGISTER_REPLY_LEN,
                received: 3,
            })
        );

        let mut bad = reply;
        bad[1] ^= 0x10;
        assert!(matches!(
            parse_register_read(address, Reg::MODE, &bad),
            Err(FrameError::Checksum { .. })
        ));
    }
}
