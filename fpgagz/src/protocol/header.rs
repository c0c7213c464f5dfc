//! Request header sent ahead of every compression request.
//!
//! ## Frame Format
//!
//! ```text
//! +-------------------------+--------------+----------+
//! |          Magic          |    Length    | Reserved |
//! +-------------------------+--------------+----------+
//! |         8 bytes         |   3 bytes    |  1 byte  |
//! +-------------------------+--------------+----------+
//! | EB 9A FC 1D 98 30 B7 06 | LE, LSB 1st  |   0x00   |
//! +-------------------------+--------------+----------+
//! ```
//!
//! The magic lets the device's packet parser tell a new request apart from
//! stray bytes left on the line. Everything after the header is raw payload
//! with no further framing.

use {
    crate::error::{Error, Result},
    byteorder::{ByteOrder, LittleEndian},
};

/// Header magic, matched byte-for-byte by the device.
pub const HEADER_MAGIC: [u8; 8] = [0xEB, 0x9A, 0xFC, 0x1D, 0x98, 0x30, 0xB7, 0x06];

/// Total header length in bytes.
pub const HEADER_LEN: usize = 12;

/// Exclusive upper bound on the payload length (the length field is 24 bits).
pub const MAX_PAYLOAD_LEN: usize = 1 << 24;

const LENGTH_OFFSET: usize = 8;
const RESERVED_OFFSET: usize = 11;

/// Header announcing a compression request of a given length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    payload_len: u32,
}

impl RequestHeader {
    /// Create the header for a payload of `len` bytes.
    ///
    /// Fails with [`Error::PayloadTooLarge`] if `len` does not fit in 24 bits.
    pub fn for_payload(len: usize) -> Result<Self> {
        if len >= MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge {
                len,
                max: MAX_PAYLOAD_LEN,
            });
        }

        // Bounded by MAX_PAYLOAD_LEN above
        #[allow(clippy::cast_possible_truncation)]
        let payload_len = len as u32;
        Ok(Self { payload_len })
    }

    /// Payload length announced by this header.
    pub fn payload_len(&self) -> usize {
        self.payload_len as usize
    }

    /// Encode the header for the wire.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[..LENGTH_OFFSET].copy_from_slice(&HEADER_MAGIC);
        LittleEndian::write_u24(&mut buf[LENGTH_OFFSET..RESERVED_OFFSET], self.payload_len);
        buf[RESERVED_OFFSET] = 0x00;
        buf
    }

    /// Decode a header as the device would.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::Protocol(format!(
                "header too short: need {HEADER_LEN} bytes, got {}",
                data.len()
            )));
        }

        if data[..LENGTH_OFFSET] != HEADER_MAGIC {
            return Err(Error::Protocol(format!(
                "invalid header magic: {:02X?}",
                &data[..LENGTH_OFFSET]
            )));
        }

        if data[RESERVED_OFFSET] != 0 {
            return Err(Error::Protocol(format!(
                "reserved header byte must be 0, got 0x{:02X}",
                data[RESERVED_OFFSET]
            )));
        }

        Ok(Self {
            payload_len: LittleEndian::read_u24(&data[LENGTH_OFFSET..RESERVED_OFFSET]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = RequestHeader::for_payload(0x0A_0B_0C).unwrap();
        assert_eq!(
            header.to_bytes(),
            [
                0xEB, 0x9A, 0xFC, 0x1D, 0x98, 0x30, 0xB7, 0x06, // magic
                0x0C, 0x0B, 0x0A, // length, LSB first
                0x00, // reserved
            ]
        );
    }

    #[test]
    fn test_header_length_decodes_back() {
        for len in [
            0usize,
            1,
            255,
            256,
            16384,
            50_000,
            65_535,
            65_536,
            1_000_000,
            MAX_PAYLOAD_LEN - 1,
        ] {
            let bytes = RequestHeader::for_payload(len)
                .unwrap()
                .to_bytes();
            assert_eq!(bytes.len(), HEADER_LEN);
            let decoded = usize::from(bytes[8])
                | (usize::from(bytes[9]) << 8)
                | (usize::from(bytes[10]) << 16);
            assert_eq!(decoded, len, "length {len} should survive encoding");
            assert_eq!(bytes[11], 0);
        }
    }

    #[test]
    fn test_header_rejects_oversized_payload() {
        for len in [MAX_PAYLOAD_LEN, MAX_PAYLOAD_LEN + 1, usize::MAX] {
            match RequestHeader::for_payload(len) {
                Err(Error::PayloadTooLarge { len: got, max }) => {
                    assert_eq!(got, len);
                    assert_eq!(max, 16_777_216);
                },
                other => panic!("expected PayloadTooLarge, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_header_parse() {
        let header = RequestHeader::for_payload(12_345).unwrap();
        let parsed = RequestHeader::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.payload_len(), 12_345);
    }

    #[test]
    fn test_header_parse_rejects_bad_magic() {
        let mut bytes = RequestHeader::for_payload(10)
            .unwrap()
            .to_bytes();
        bytes[0] = 0xEC;
        assert!(matches!(
            RequestHeader::parse(&bytes),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_header_parse_rejects_short_input() {
        assert!(matches!(
            RequestHeader::parse(&HEADER_MAGIC),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_header_parse_rejects_reserved_byte() {
        let mut bytes = RequestHeader::for_payload(10)
            .unwrap()
            .to_bytes();
        bytes[11] = 0x01;
        assert!(matches!(
            RequestHeader::parse(&bytes),
            Err(Error::Protocol(_))
        ));
    }
}
