//! Verification pipeline.
//!
//! A bounded FIFO between the engine and a single verification worker. The
//! engine admits decoded aggregates on the producer side without blocking
//! (overflow drops); the worker performs the cryptographic check and
//! forwards survivors on the consumer side in admission order. The worker
//! holds no engine state, so verification never delays packet intake or
//! dissemination.

use crate::{metrics::Metrics, registry::Registry, scheme::Scheme, types::Verified};
use bytes::Bytes;
use futures::{channel::mpsc, SinkExt, StreamExt};
use std::ops::Range;
use tokio::task::JoinHandle;
use tracing::debug;

/// Single-worker verification stage.
pub struct Verifier<S: Scheme, R: Registry<PublicKey = S::PublicKey>> {
    scheme: S,
    registry: R,
    message: Bytes,
    // Id interval contributors may fall in, per level (index 0 is the
    // anchor's own slot and never receives submissions).
    ranges: Vec<Range<u32>>,
    incoming: mpsc::Receiver<Verified<S>>,
    verified: mpsc::Sender<Verified<S>>,
    metrics: Metrics,
}

impl<S: Scheme, R: Registry<PublicKey = S::PublicKey>> Verifier<S, R> {
    /// Creates a verifier and the channel endpoints the engine drives it
    /// with: a bounded admission sender and the verified-output receiver.
    #[allow(clippy::type_complexity)]
    pub fn new(
        scheme: S,
        registry: R,
        message: Bytes,
        ranges: Vec<Range<u32>>,
        backlog: usize,
        metrics: Metrics,
    ) -> (Self, mpsc::Sender<Verified<S>>, mpsc::Receiver<Verified<S>>) {
        let (submit_tx, submit_rx) = mpsc::channel(backlog);
        let (verified_tx, verified_rx) = mpsc::channel(backlog);
        (
            Self {
                scheme,
                registry,
                message,
                ranges,
                incoming: submit_rx,
                verified: verified_tx,
                metrics,
            },
            submit_tx,
            verified_rx,
        )
    }

    /// Spawns the worker. It exits when the admission side closes or the
    /// consumer goes away.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while let Some(item) = self.incoming.next().await {
            if !self.verify(&item) {
                self.metrics.signatures_rejected.inc();
                debug!(
                    origin = item.origin,
                    level = item.level,
                    "dropping invalid aggregate"
                );
                continue;
            }
            self.metrics.signatures_verified.inc();
            if self.verified.send(item).await.is_err() {
                break;
            }
        }
    }

    /// Checks that all contributors fall in the level's candidate interval
    /// and that the aggregate verifies against the combination of their
    /// public keys.
    fn verify(&self, item: &Verified<S>) -> bool {
        let Some(range) = self.ranges.get(item.level as usize) else {
            return false;
        };
        if item.multisig.capacity() != self.registry.size() as usize {
            return false;
        }

        let mut key: Option<S::PublicKey> = None;
        for id in item.multisig.signers.iter_ones() {
            if !range.contains(&(id as u32)) {
                return false;
            }
            let Some(identity) = self.registry.identity(id as u32) else {
                return false;
            };
            key = Some(match key {
                Some(acc) => self.scheme.combine_public_keys(&acc, &identity.public_key),
                None => identity.public_key.clone(),
            });
        }
        let Some(key) = key else {
            return false;
        };
        self.scheme
            .verify(&key, &self.message, &item.multisig.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mocks::{self, Insecure},
        multisig::MultiSignature,
        registry::ArrayRegistry,
    };

    const MESSAGE: &[u8] = b"attest to this";

    // Verifier for anchor 0 in an id space of 4: level 1 covers {1},
    // level 2 covers [2, 4).
    #[allow(clippy::type_complexity)]
    fn verifier() -> (
        Verifier<Insecure, ArrayRegistry<mocks::PublicKey>>,
        mpsc::Sender<Verified<Insecure>>,
        mpsc::Receiver<Verified<Insecure>>,
    ) {
        let (registry, _) = mocks::fixture(4);
        let ranges = vec![0..1, 1..2, 2..4];
        Verifier::new(
            Insecure::new(0),
            registry,
            Bytes::from_static(MESSAGE),
            ranges,
            16,
            Metrics::default(),
        )
    }

    fn submission(origin: u32, level: u8, signers: &[u32]) -> Verified<Insecure> {
        let mut multisig: Option<MultiSignature<Insecure>> = None;
        for id in signers {
            let one =
                MultiSignature::individual(4, *id as usize, Insecure::new(*id).sign(MESSAGE));
            multisig = Some(match multisig {
                Some(mut acc) => {
                    acc.merge(&one, &Insecure::new(0)).unwrap();
                    acc
                }
                None => one,
            });
        }
        Verified {
            origin,
            level,
            multisig: multisig.unwrap(),
        }
    }

    #[tokio::test]
    async fn test_preserves_admission_order() {
        let (verifier, mut submit, mut verified) = verifier();
        verifier.start();

        let items = [
            submission(1, 1, &[1]),
            submission(2, 2, &[2]),
            submission(3, 2, &[3]),
            submission(2, 2, &[2, 3]),
        ];
        for item in &items {
            submit.send(item.clone()).await.unwrap();
        }
        for item in &items {
            let out = verified.next().await.unwrap();
            assert_eq!(out.origin, item.origin);
            assert_eq!(out.level, item.level);
            assert_eq!(
                out.multisig.signers.iter_ones().collect::<Vec<_>>(),
                item.multisig.signers.iter_ones().collect::<Vec<_>>()
            );
        }
    }

    #[tokio::test]
    async fn test_drops_invalid() {
        let (verifier, mut submit, mut verified) = verifier();
        let metrics = verifier.metrics.clone();
        verifier.start();

        // A signature from node 3 claiming to be node 2's contribution.
        let mut forged = submission(2, 2, &[2]);
        forged.multisig.signature = Insecure::new(3).sign(MESSAGE);
        submit.send(forged).await.unwrap();

        // A contributor outside the level's interval.
        submit.send(submission(1, 1, &[2])).await.unwrap();

        // A contributor set over the wrong id space.
        let mut narrow = submission(1, 1, &[1]);
        narrow.multisig = MultiSignature::individual(2, 1, Insecure::new(1).sign(MESSAGE));
        submit.send(narrow).await.unwrap();

        // A level beyond the candidate tree.
        let mut unknown = submission(2, 2, &[2]);
        unknown.level = 9;
        submit.send(unknown).await.unwrap();

        // Only the valid follow-up comes out.
        submit.send(submission(3, 2, &[3])).await.unwrap();
        let out = verified.next().await.unwrap();
        assert_eq!(out.origin, 3);
        assert_eq!(metrics.signatures_rejected.get(), 4);
        assert_eq!(metrics.signatures_verified.get(), 1);
    }

    #[tokio::test]
    async fn test_stops_when_admission_closes() {
        let (verifier, submit, mut verified) = verifier();
        let handle = verifier.start();
        drop(submit);
        assert!(verified.next().await.is_none());
        handle.await.unwrap();
    }
}
