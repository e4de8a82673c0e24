//! Serial wire framing: start-of-frame byte, length, type, payload, XOR checksum, and the
//! single-byte ACK/NACK/CAN control bytes (§4.A, §6).
//!
//! This is the lowest layer; it knows nothing about command classes or sessions, only about
//! turning a `Frame` into bytes and back.

use crate::error::{Result, ZnetError};

pub const SOF: u8 = 0x01;
pub const ACK: u8 = 0x06;
pub const NACK: u8 = 0x15;
pub const CAN: u8 = 0x18;

/// Request vs response, carried in the frame's one type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Request,
    Response,
}

impl FrameType {
    fn to_byte(self) -> u8 {
        match self {
            FrameType::Request => 0x00,
            FrameType::Response => 0x01,
        }
    }

    fn from_byte(b: u8) -> Self {
        // Anything nonzero is treated as a response; the radio never sends an unrecognized type.
        if b == 0x00 {
            FrameType::Request
        } else {
            FrameType::Response
        }
    }
}

/// A decoded data frame (as opposed to the single-byte ACK/NACK/CAN control bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameType,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(kind: FrameType, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    /// Checksum over length-through-payload: `0xFF XOR length XOR type XOR all payload bytes`.
    fn checksum(length: u8, kind: FrameType, payload: &[u8]) -> u8 {
        let mut acc = 0xFFu8 ^ length ^ kind.to_byte();
        for &b in payload {
            acc ^= b;
        }
        acc
    }

    /// Serialize into `SOF | length | type | payload | checksum`.
    pub fn encode(&self) -> Vec<u8> {
        let length = (1 + self.payload.len()) as u8;
        let checksum = Self::checksum(length, self.kind, &self.payload);

        let mut out = Vec::with_capacity(3 + self.payload.len() + 1);
        out.push(SOF);
        out.push(length);
        out.push(self.kind.to_byte());
        out.extend_from_slice(&self.payload);
        out.push(checksum);
        out
    }

    /// Parse a complete frame body (everything after the `SOF` byte: `length | type | payload |
    /// checksum`). Returns `Err(ChecksumMismatch)` on a bad checksum; the caller emits NACK in that
    /// case. Returns `Err(ShortFrame)` if `body` doesn't contain a full frame yet.
    pub fn decode_body(body: &[u8]) -> Result<Self> {
        if body.len() < 3 {
            return Err(ZnetError::ShortFrame {
                have: body.len(),
                need: 3,
            });
        }
        let length = body[0];
        let need = 1 + length as usize + 1;
        if body.len() < need {
            return Err(ZnetError::ShortFrame {
                have: body.len(),
                need,
            });
        }

        let type_byte = body[1];
        let payload_len = length as usize - 1;
        let payload = &body[2..2 + payload_len];
        let checksum = body[1 + length as usize];

        let expected = Self::checksum(length, FrameType::from_byte(type_byte), payload);
        if checksum != expected {
            return Err(ZnetError::ChecksumMismatch);
        }

        Ok(Frame {
            kind: FrameType::from_byte(type_byte),
            payload: payload.to_vec(),
        })
    }

    /// Total encoded length in bytes (`SOF | length | type | payload | checksum`).
    pub fn encoded_len(&self) -> usize {
        3 + self.payload.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let f = Frame::new(FrameType::Request, vec![0x25, 0x01, 0xFF]);
        let bytes = f.encode();
        assert_eq!(bytes[0], SOF);
        let decoded = Frame::decode_body(&bytes[1..]).unwrap();
        assert_eq!(decoded, f);
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let f = Frame::new(FrameType::Request, vec![0x25, 0x01, 0xFF]);
        let mut bytes = f.encode();
        *bytes.last_mut().unwrap() ^= 0xFF;
        let err = Frame::decode_body(&bytes[1..]).unwrap_err();
        assert_eq!(err, ZnetError::ChecksumMismatch);
    }

    #[test]
    fn short_body_reports_need() {
        let f = Frame::new(FrameType::Request, vec![0x25, 0x01, 0xFF]);
        let bytes = f.encode();
        let err = Frame::decode_body(&bytes[1..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, ZnetError::ShortFrame { .. }));
    }
}
