//! Engine driving the aggregation protocol for one participant.

use crate::{
    config::Config,
    ingress::{Mailbox, Message},
    level::Level,
    metrics::Metrics,
    multisig::MultiSignature,
    net::Network,
    partition::Partitioner,
    registry::{Identity, Registry},
    scheme::Scheme,
    store::SignatureStore,
    tree,
    types::{Error, Packet, Verified},
    verifier::Verifier,
};
use futures::{channel::mpsc, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

/// Observers dispatched, in registration order, after every verified
/// aggregate lands in the store.
#[derive(Clone, Copy, Debug)]
enum Actor {
    /// Marks completed levels and cascades fresh rolled-up aggregates to
    /// the levels above.
    CompletedLevel,
    /// Emits the full aggregate whenever it improves past the threshold.
    FinalSignature,
}

/// Instance of the engine.
///
/// All protocol state (levels, store, current best) is owned by a single
/// task: inbound packets, verified aggregates, and ticks are serialized
/// through one event loop, and the verification worker runs on the side
/// without touching engine state. Progress is best-effort; results surface
/// exclusively on the output stream returned by [Engine::new].
pub struct Engine<S, R>
where
    S: Scheme,
    R: Registry<PublicKey = S::PublicKey>,
{
    // ---------- Configuration ----------
    scheme: S,
    local: Identity<S::PublicKey>,
    size: u32,
    max_level: u32,
    threshold: u32,
    candidate_count: usize,
    update_period: Duration,
    level_timeout: Duration,

    // ---------- State ----------
    levels: Vec<Level<S::PublicKey>>,
    store: SignatureStore<S>,
    actors: Vec<Actor>,
    best: Option<MultiSignature<S>>,

    // ---------- Messaging ----------
    mailbox: mpsc::Receiver<Message>,
    listener: Mailbox,
    verifier: Option<Verifier<S, R>>,
    submissions: mpsc::Sender<Verified<S>>,
    verified: mpsc::Receiver<Verified<S>>,
    outputs: mpsc::UnboundedSender<MultiSignature<S>>,

    // ---------- Metrics ----------
    metrics: Metrics,
}

impl<S, R> Engine<S, R>
where
    S: Scheme,
    R: Registry<PublicKey = S::PublicKey>,
{
    /// Creates a new engine from the given configuration.
    ///
    /// Returns the engine, the [Mailbox] for feeding and stopping it, and
    /// the stream of final aggregates. Every aggregate emitted carries at
    /// least the configured threshold of contributions, and cardinalities
    /// are non-decreasing; consumers typically keep the last one.
    #[allow(clippy::type_complexity)]
    pub fn new<P: Partitioner<PublicKey = S::PublicKey>>(
        cfg: Config<S, R, P>,
    ) -> Result<
        (
            Self,
            Mailbox,
            mpsc::UnboundedReceiver<MultiSignature<S>>,
        ),
        Error,
    > {
        cfg.assert();
        let size = cfg.registry.size();
        if size < 2 {
            return Err(Error::InvalidConfig(
                "registry must contain at least two identities",
            ));
        }
        let local = cfg
            .registry
            .identity(cfg.local)
            .ok_or(Error::UnknownIdentity(cfg.local))?
            .clone();
        let max_level = tree::log2(size);
        if cfg.partitioner.max_level() != max_level {
            return Err(Error::InvalidConfig(
                "partitioner disagrees with registry size",
            ));
        }
        let threshold = (cfg.contributions_threshold)(size);
        if threshold == 0 || threshold > size {
            return Err(Error::InvalidConfig("threshold outside [1, size]"));
        }

        // Slot 0 covers the local node itself; slot k covers level k.
        let mut ranges = Vec::with_capacity(max_level as usize + 1);
        ranges.push(cfg.local..cfg.local + 1);
        let mut levels = Vec::with_capacity(max_level as usize);
        for level in 1..=max_level {
            ranges.push(cfg.partitioner.range(level)?);
            levels.push(Level::new(level, cfg.partitioner.candidates(level)?));
        }

        // Seed the store with the local contribution.
        let metrics = Metrics::default();
        let mut store = SignatureStore::new(cfg.scheme.clone(), size, max_level as usize + 1);
        let own = MultiSignature::individual(
            size as usize,
            cfg.local as usize,
            cfg.scheme.sign(&cfg.message),
        );
        store.store(0, own)?;

        let (verifier, submissions, verified) = Verifier::new(
            cfg.scheme.clone(),
            cfg.registry.clone(),
            cfg.message.clone(),
            ranges,
            cfg.verify_backlog,
            metrics.clone(),
        );
        let (mailbox_tx, mailbox_rx) = mpsc::channel(cfg.mailbox_size);
        let (outputs_tx, outputs_rx) = mpsc::unbounded();

        Ok((
            Self {
                scheme: cfg.scheme,
                local,
                size,
                max_level,
                threshold,
                candidate_count: cfg.candidate_count,
                update_period: cfg.update_period,
                level_timeout: cfg.level_timeout,
                levels,
                store,
                actors: vec![Actor::CompletedLevel, Actor::FinalSignature],
                best: None,
                mailbox: mailbox_rx,
                listener: Mailbox::new(mailbox_tx.clone()),
                verifier: Some(verifier),
                submissions,
                verified,
                outputs: outputs_tx,
                metrics,
            },
            Mailbox::new(mailbox_tx),
            outputs_rx,
        ))
    }

    /// Returns a handle to the engine's counters. Cloning shares state, so
    /// the handle keeps observing the engine after it starts.
    pub fn metrics(&self) -> Metrics {
        self.metrics.clone()
    }

    /// Registers the engine as the network's listener and runs it until
    /// stopped.
    ///
    /// The engine will handle:
    /// - Parsing and admitting inbound packets
    /// - Storing verified aggregates and dispatching the registered actors
    /// - Activating levels on schedule and periodically contacting peers
    pub fn start<N: Network<PublicKey = S::PublicKey>>(mut self, network: N) -> JoinHandle<()> {
        network.register_listener(Arc::new(self.listener.clone()));
        if let Some(verifier) = self.verifier.take() {
            verifier.start();
        }
        tokio::spawn(self.run(network))
    }

    /// Inner run loop called by `start`.
    async fn run<N: Network<PublicKey = S::PublicKey>>(mut self, network: N) {
        let started = Instant::now();
        let mut ticker = interval(self.update_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Inbound packet or shutdown request
                message = self.mailbox.next() => {
                    match message {
                        Some(Message::Packet(packet)) => self.handle_packet(packet),
                        Some(Message::Stop) | None => {
                            debug!("shutdown");
                            break;
                        }
                    }
                },

                // Verified aggregate out of the pipeline
                item = self.verified.next() => {
                    let Some(item) = item else {
                        warn!("verification pipeline terminated");
                        break;
                    };
                    self.handle_verified(&network, item).await;
                },

                // Periodic dissemination sweep
                _ = ticker.tick() => {
                    self.handle_tick(&network, started.elapsed()).await;
                },
            }
        }
        // Dropping the engine closes the output stream and the pipeline's
        // admission side; in-flight verifications are discarded.
    }

    // ---------- Handling ----------

    /// Parses an inbound packet and admits it to the verification pipeline.
    fn handle_packet(&mut self, packet: Packet) {
        self.metrics.messages_received.inc();

        let level = packet.level as u32;
        if packet.origin >= self.size || level < 1 || level > self.max_level {
            debug!(
                origin = packet.origin,
                level = packet.level,
                "dropping packet outside id space"
            );
            self.metrics.messages_invalid.inc();
            return;
        }

        let mut buf = packet.multisig.clone();
        let multisig = match MultiSignature::read(&self.scheme, self.size as usize, &mut buf) {
            Ok(multisig) => multisig,
            Err(err) => {
                debug!(?err, origin = packet.origin, "dropping malformed packet");
                self.metrics.messages_invalid.inc();
                return;
            }
        };
        if !buf.is_empty() {
            debug!(origin = packet.origin, "dropping packet with trailing bytes");
            self.metrics.messages_invalid.inc();
            return;
        }

        let item = Verified {
            origin: packet.origin,
            level: packet.level,
            multisig,
        };
        if self.submissions.try_send(item).is_err() {
            debug!(origin = packet.origin, "verification backlog full");
            self.metrics.backlog_dropped.inc();
        }
    }

    /// Stores a verified aggregate and dispatches the registered actors.
    async fn handle_verified<N: Network<PublicKey = S::PublicKey>>(
        &mut self,
        network: &N,
        item: Verified<S>,
    ) {
        if matches!(
            self.store.store(item.level as u32, item.multisig.clone()),
            Ok(true)
        ) {
            self.metrics.signatures_stored.inc();
        }
        let actors = self.actors.clone();
        for actor in actors {
            match actor {
                Actor::CompletedLevel => self.check_completed_level(network, &item).await,
                Actor::FinalSignature => self.check_final_signature(),
            }
        }
    }

    /// Marks the aggregate's level completed if it covers the whole
    /// candidate interval, then refreshes every level above it with the
    /// latest rolled-up aggregate, dispatching immediately to any level the
    /// refresh completed.
    async fn check_completed_level<N: Network<PublicKey = S::PublicKey>>(
        &mut self,
        network: &N,
        item: &Verified<S>,
    ) {
        let index = (item.level - 1) as usize;
        if item.multisig.cardinality() == self.levels[index].candidates.len()
            && !self.levels[index].rcv_completed
        {
            debug!(level = item.level, "level receive completed");
            self.levels[index].rcv_completed = true;
        }

        for upper in (item.level as u32 + 1)..=self.max_level {
            let Some(combined) = self.store.combined(upper) else {
                continue;
            };
            if self.levels[(upper - 1) as usize].update_sig_to_send(combined.cardinality()) {
                self.send_update(network, upper, self.candidate_count).await;
            }
        }
    }

    /// Emits the full aggregate if it passes the threshold and improves on
    /// the best emitted so far.
    fn check_final_signature(&mut self) {
        let Some(full) = self.store.full_signature() else {
            return;
        };
        if (full.cardinality() as u32) < self.threshold {
            return;
        }
        if let Some(best) = &self.best {
            if full.cardinality() <= best.cardinality() {
                return;
            }
        }
        debug!(cardinality = full.cardinality(), "improved full aggregate");
        self.best = Some(full.clone());
        self.metrics.emitted.inc();
        let _ = self.outputs.unbounded_send(full);
    }

    /// Activates levels whose startup delay has elapsed, then contacts one
    /// further peer per level.
    async fn handle_tick<N: Network<PublicKey = S::PublicKey>>(
        &mut self,
        network: &N,
        elapsed: Duration,
    ) {
        for level in self.levels.iter_mut() {
            if !level.send_started && elapsed >= self.level_timeout * (level.id - 1) {
                debug!(level = level.id, "activating level on timeout");
                level.send_started = true;
            }
        }
        for level in 1..=self.max_level {
            self.send_update(network, level, 1).await;
        }
    }

    /// Sends the rolled-up aggregate for the given level to its next
    /// `count` candidates.
    ///
    /// A no-op while the level is inactive or once every candidate has seen
    /// the current best; a send failure is logged and the cursor still
    /// advances.
    async fn send_update<N: Network<PublicKey = S::PublicKey>>(
        &mut self,
        network: &N,
        level: u32,
        count: usize,
    ) {
        let index = (level - 1) as usize;
        if !self.levels[index].send_started || self.levels[index].exhausted() {
            return;
        }
        let Some(multisig) = self.store.combined(level) else {
            return;
        };
        let peers = self.levels[index].pick_next(count);
        if peers.is_empty() {
            return;
        }

        let packet = Packet {
            origin: self.local.id,
            level: level as u8,
            multisig: multisig.encode(&self.scheme),
        };
        self.metrics.messages_sent.inc_by(peers.len() as u64);
        if let Err(err) = network.send(&peers, packet).await {
            warn!(?err, level, "failed to send aggregate");
        }
    }
}
