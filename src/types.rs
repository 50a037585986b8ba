//! Types shared across the crate.

use crate::{multisig::MultiSignature, scheme::Scheme};
use bytes::{Buf, BufMut, Bytes};

/// Error that may be encountered when interacting with the aggregation
/// engine or one of its components.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Construction Errors
    /// The configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The identity table does not contain the requested index.
    #[error("Unknown identity {0}")]
    UnknownIdentity(u32),
    /// The identity table cannot serve the requested range.
    #[error("Invalid identity range {0}..{1}")]
    InvalidRange(u32, u32),

    // Protocol Errors
    /// The level is outside the [1, bitsize] window of the identity space.
    #[error("Invalid level {0}")]
    InvalidLevel(u32),
    /// The two contributor sets have different capacities and cannot be merged.
    #[error("Capacity mismatch: {0} != {1}")]
    CapacityMismatch(usize, usize),

    // Wire Errors
    /// A message could not be decoded.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(&'static str),
    /// A decoded aggregate claims no contributors.
    #[error("Empty contributor set")]
    EmptySignature,

    // P2P Errors
    /// The transport failed to dispatch a message.
    #[error("Unable to send message: {0}")]
    Network(String),
}

/// A packet exchanged between peers.
///
/// The aggregate payload is opaque to the transport: it is decoded against
/// the signature scheme (and the capacity implied by `level`) only once the
/// packet reaches an engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Index of the sender in the identity table.
    pub origin: u32,
    /// Level the aggregate is addressed to, from the receiver's viewpoint.
    pub level: u8,
    /// Encoded [MultiSignature].
    pub multisig: Bytes,
}

impl Packet {
    /// Serializes the packet for transports that ship raw bytes.
    pub fn write(&self, buf: &mut impl BufMut) {
        buf.put_u32(self.origin);
        buf.put_u8(self.level);
        buf.put_slice(&self.multisig);
    }

    /// Deserializes a packet, treating all trailing bytes as the aggregate
    /// payload.
    pub fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        if buf.remaining() < 5 {
            return Err(Error::InvalidEncoding("packet header"));
        }
        let origin = buf.get_u32();
        let level = buf.get_u8();
        let multisig = buf.copy_to_bytes(buf.remaining());
        Ok(Self {
            origin,
            level,
            multisig,
        })
    }

    /// Serializes the packet into a freshly-allocated buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = Vec::with_capacity(5 + self.multisig.len());
        self.write(&mut buf);
        buf.into()
    }
}

/// A decoded aggregate that passed cryptographic verification, in the order
/// it was admitted to the verification pipeline.
#[derive(Clone, Debug)]
pub struct Verified<S: Scheme> {
    /// Index of the sender in the identity table.
    pub origin: u32,
    /// Level the aggregate is addressed to.
    pub level: u8,
    /// The verified aggregate.
    pub multisig: MultiSignature<S>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_codec() {
        let packet = Packet {
            origin: 7,
            level: 3,
            multisig: Bytes::from_static(&[1, 2, 3, 4]),
        };
        let encoded = packet.encode();
        let decoded = Packet::read(&mut &encoded[..]).unwrap();
        assert_eq!(packet, decoded);
    }

    #[test]
    fn test_packet_truncated() {
        let buf = [0u8; 4];
        assert!(matches!(
            Packet::read(&mut &buf[..]),
            Err(Error::InvalidEncoding("packet header"))
        ));
    }

    #[test]
    fn test_packet_empty_payload() {
        let packet = Packet {
            origin: 0,
            level: 1,
            multisig: Bytes::new(),
        };
        let decoded = Packet::read(&mut &packet.encode()[..]).unwrap();
        assert_eq!(decoded.multisig.len(), 0);
    }
}
