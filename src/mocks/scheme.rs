//! An insecure [Scheme] for deterministic tests.
//!
//! A "signature" is the set of contributor ids plus a checksum of the
//! message; combining is set union, and verification demands that the
//! signer set matches the key set exactly. Anyone can forge anything: the
//! point is to exercise aggregation plumbing cheaply, not to be secure.

use crate::{scheme::Scheme, types::Error};
use bytes::{Buf, BufMut};
use std::collections::BTreeSet;

/// Largest contributor count a decoded signature may claim. Bounds
/// allocation on malformed input.
const MAX_SIGNERS: usize = 1 << 16;

/// A set of participant ids standing in for a public key (or a combination
/// of public keys).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    members: BTreeSet<u32>,
}

/// A set of participant ids plus a message checksum standing in for an
/// (aggregate) signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    signers: BTreeSet<u32>,
    checksum: u64,
}

/// [Scheme] implementation backed by set arithmetic. Provides no security.
#[derive(Clone, Debug)]
pub struct Insecure {
    id: u32,
}

impl Insecure {
    /// Creates the scheme for the participant with the given id.
    pub fn new(id: u32) -> Self {
        Self { id }
    }
}

/// Returns the "public key" of the participant with the given id.
pub fn public_key(id: u32) -> PublicKey {
    PublicKey {
        members: BTreeSet::from([id]),
    }
}

impl Scheme for Insecure {
    type PublicKey = PublicKey;
    type Signature = Signature;

    fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            signers: BTreeSet::from([self.id]),
            checksum: checksum(message),
        }
    }

    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        signature.checksum == checksum(message) && signature.signers == public_key.members
    }

    fn combine_signatures(&self, left: &Signature, right: &Signature) -> Signature {
        Signature {
            signers: left.signers.union(&right.signers).copied().collect(),
            // Combining signatures over different messages yields garbage,
            // just like a real scheme.
            checksum: if left.checksum == right.checksum {
                left.checksum
            } else {
                left.checksum ^ right.checksum
            },
        }
    }

    fn combine_public_keys(&self, left: &PublicKey, right: &PublicKey) -> PublicKey {
        PublicKey {
            members: left.members.union(&right.members).copied().collect(),
        }
    }

    fn write_signature(&self, signature: &Signature, buf: &mut impl BufMut) {
        buf.put_u32(signature.signers.len() as u32);
        for id in &signature.signers {
            buf.put_u32(*id);
        }
        buf.put_u64(signature.checksum);
    }

    fn read_signature(&self, buf: &mut impl Buf) -> Result<Signature, Error> {
        if buf.remaining() < 4 {
            return Err(Error::InvalidEncoding("mock signature truncated"));
        }
        let count = buf.get_u32() as usize;
        if count > MAX_SIGNERS || buf.remaining() < count * 4 + 8 {
            return Err(Error::InvalidEncoding("mock signature truncated"));
        }
        let mut signers = BTreeSet::new();
        for _ in 0..count {
            signers.insert(buf.get_u32());
        }
        let checksum = buf.get_u64();
        Ok(Signature { signers, checksum })
    }
}

/// FNV-1a over the message.
fn checksum(message: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for byte in message {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &[u8] = b"attest to this";

    #[test]
    fn test_sign_verify() {
        let scheme = Insecure::new(4);
        let signature = scheme.sign(MESSAGE);
        assert!(scheme.verify(&public_key(4), MESSAGE, &signature));
        assert!(!scheme.verify(&public_key(5), MESSAGE, &signature));
        assert!(!scheme.verify(&public_key(4), b"other", &signature));
    }

    #[test]
    fn test_aggregate_verify() {
        let scheme = Insecure::new(0);
        let signature = scheme.combine_signatures(
            &scheme.sign(MESSAGE),
            &Insecure::new(1).sign(MESSAGE),
        );
        let key = scheme.combine_public_keys(&public_key(0), &public_key(1));
        assert!(scheme.verify(&key, MESSAGE, &signature));

        // A subset key does not cover the aggregate.
        assert!(!scheme.verify(&public_key(0), MESSAGE, &signature));
    }

    #[test]
    fn test_codec() {
        let scheme = Insecure::new(0);
        let signature = scheme.combine_signatures(
            &scheme.sign(MESSAGE),
            &Insecure::new(7).sign(MESSAGE),
        );
        let mut buf = Vec::new();
        scheme.write_signature(&signature, &mut buf);
        let decoded = scheme.read_signature(&mut &buf[..]).unwrap();
        assert_eq!(signature, decoded);
        assert!(scheme.read_signature(&mut &buf[..3]).is_err());
    }
}
