//! Signature schemes usable for aggregation.
//!
//! The protocol requires an *aggregatable* scheme: a single fixed-size
//! signature can represent the combined contribution of any subset of
//! signers, and the matching verification key is the combination of the
//! subset's public keys. The engine never inspects key or signature
//! internals; it only signs the shared message once at startup, combines
//! contributions, and verifies aggregates against combined keys.
//!
//! # Available Schemes
//!
//! - [`bls12381`]: BLS signatures over BLS12-381 (min_sig: 48-byte
//!   signatures in G1, 96-byte public keys in G2).
//! - [`crate::mocks::Insecure`]: cheap set-arithmetic stand-in for
//!   deterministic tests. Provides no security.

use crate::types::Error;
use bytes::{Buf, BufMut};
use std::fmt::Debug;

pub mod bls12381;

/// An aggregatable signature scheme bound to a local signing key.
///
/// Implementations must be cheap to clone (the verification worker holds its
/// own copy) and combining must be associative and commutative so that
/// aggregates of aggregates verify against the matching combined key.
pub trait Scheme: Clone + Send + Sync + 'static {
    /// A public key, or a combination of public keys.
    type PublicKey: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// A signature, or a combination of signatures.
    type Signature: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Signs the message with the local signing key.
    fn sign(&self, message: &[u8]) -> Self::Signature;

    /// Verifies an (aggregate) signature against an (aggregate) public key.
    ///
    /// This is the expensive operation of the protocol and is only invoked
    /// from the verification worker.
    fn verify(
        &self,
        public_key: &Self::PublicKey,
        message: &[u8],
        signature: &Self::Signature,
    ) -> bool;

    /// Combines two signatures into one.
    fn combine_signatures(
        &self,
        left: &Self::Signature,
        right: &Self::Signature,
    ) -> Self::Signature;

    /// Combines two public keys into one.
    fn combine_public_keys(
        &self,
        left: &Self::PublicKey,
        right: &Self::PublicKey,
    ) -> Self::PublicKey;

    /// Serializes a signature.
    fn write_signature(&self, signature: &Self::Signature, buf: &mut impl BufMut);

    /// Deserializes a signature.
    fn read_signature(&self, buf: &mut impl Buf) -> Result<Self::Signature, Error>;
}
