//! BLS12-381 implementation of [Scheme].
//!
//! Uses the `min_sig` configuration: signatures live in G1 (48 bytes
//! compressed), public keys in G2 (96 bytes compressed). Aggregation of both
//! signatures and public keys is point addition, so any subset of
//! contributions can be rolled up into a single constant-size signature that
//! verifies against the sum of the subset's public keys.
//!
//! All participants sign the same message, which makes the scheme vulnerable
//! to rogue-key attacks unless key registration enforces proofs of
//! possession. Key registration is outside this crate; deployments must not
//! accept unproven keys into the identity table.

use crate::{scheme::Scheme, types::Error};
use blst::min_sig::{AggregatePublicKey, AggregateSignature, SecretKey};
use blst::BLST_ERROR;
use bytes::{Buf, BufMut};
use rand::{CryptoRng, RngCore};
use std::fmt;

/// Domain separation tag for the hash-to-curve ciphersuite.
const DST: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_";

/// Compressed signature size in bytes.
pub const SIGNATURE_LENGTH: usize = 48;

/// Compressed public key size in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 96;

/// A BLS12-381 public key (possibly an aggregate of several keys).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(blst::min_sig::PublicKey);

impl PublicKey {
    /// Serializes the key in compressed form.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0.to_bytes()
    }

    /// Deserializes a key from compressed form, checking that the bytes
    /// describe a point in the correct subgroup.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        blst::min_sig::PublicKey::key_validate(bytes)
            .map(Self)
            .map_err(|_| Error::InvalidEncoding("bls12381 public key"))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex(&self.to_bytes()[..8]))
    }
}

/// A BLS12-381 signature (possibly an aggregate of several signatures).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(blst::min_sig::Signature);

impl Signature {
    /// Serializes the signature in compressed form.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        self.0.to_bytes()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex(&self.to_bytes()[..8]))
    }
}

/// [Scheme] implementation holding a local BLS12-381 signing key.
#[derive(Clone)]
pub struct Bls12381 {
    secret: SecretKey,
}

impl Bls12381 {
    /// Wraps an existing secret key.
    pub fn new(secret: SecretKey) -> Self {
        Self { secret }
    }

    /// Generates a fresh keypair from the given source of randomness.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> (Self, PublicKey) {
        let mut ikm = [0u8; 32];
        rng.fill_bytes(&mut ikm);
        let secret = SecretKey::key_gen(&ikm, &[]).expect("ikm is 32 bytes");
        let scheme = Self { secret };
        let public = scheme.public_key();
        (scheme, public)
    }

    /// Returns the public key matching the local signing key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.secret.sk_to_pk())
    }
}

impl Scheme for Bls12381 {
    type PublicKey = PublicKey;
    type Signature = Signature;

    fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.secret.sign(message, DST, &[]))
    }

    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        // Decoding only uncompresses, so group-check the signature here.
        signature.0.verify(true, message, DST, &[], &public_key.0, false)
            == BLST_ERROR::BLST_SUCCESS
    }

    fn combine_signatures(&self, left: &Signature, right: &Signature) -> Signature {
        let mut aggregate = AggregateSignature::from_signature(&left.0);
        aggregate
            .add_signature(&right.0, false)
            .expect("group check disabled");
        Signature(aggregate.to_signature())
    }

    fn combine_public_keys(&self, left: &PublicKey, right: &PublicKey) -> PublicKey {
        let mut aggregate = AggregatePublicKey::from_public_key(&left.0);
        aggregate
            .add_public_key(&right.0, false)
            .expect("group check disabled");
        PublicKey(aggregate.to_public_key())
    }

    fn write_signature(&self, signature: &Signature, buf: &mut impl BufMut) {
        buf.put_slice(&signature.to_bytes());
    }

    fn read_signature(&self, buf: &mut impl Buf) -> Result<Signature, Error> {
        if buf.remaining() < SIGNATURE_LENGTH {
            return Err(Error::InvalidEncoding("bls12381 signature truncated"));
        }
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        buf.copy_to_slice(&mut bytes);
        blst::min_sig::Signature::from_bytes(&bytes)
            .map(Signature)
            .map_err(|_| Error::InvalidEncoding("bls12381 signature"))
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
