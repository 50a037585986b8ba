//! In-memory transport for tests.
//!
//! A [Router] connects any number of per-node [Network] handles and
//! delivers packets synchronously to the registered listeners. Loss is
//! modeled deterministically: a lossy router drops every `n`-th packet on
//! each directed link, so repeated sends on a link always make progress and
//! runs are reproducible without seeding.

use crate::{
    net::{Listener, Network as NetworkTrait},
    registry::Identity,
    types::{Error, Packet},
};
use std::{
    collections::HashMap,
    fmt::Debug,
    marker::PhantomData,
    sync::{Arc, Mutex},
};
use tracing::trace;

/// Shared hub connecting all in-memory [Network] handles.
pub struct Router {
    inner: Mutex<Inner>,
    // Drop every n-th packet per directed link (None: reliable).
    drop_every: Option<u64>,
}

struct Inner {
    listeners: HashMap<u32, Arc<dyn Listener>>,
    // Packets sent so far per directed link.
    sent: HashMap<(u32, u32), u64>,
}

impl Router {
    /// Creates a reliable router.
    pub fn new() -> Arc<Self> {
        Self::with_drop(None)
    }

    /// Creates a router that drops every `every`-th packet on each directed
    /// link (`every = 3` loses roughly a third of all traffic).
    pub fn lossy(every: u64) -> Arc<Self> {
        assert!(every >= 2, "drop interval must leave some packets through");
        Self::with_drop(Some(every))
    }

    fn with_drop(drop_every: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                listeners: HashMap::new(),
                sent: HashMap::new(),
            }),
            drop_every,
        })
    }

    /// Returns the [Network] handle for the node with the given id.
    pub fn network<P>(self: &Arc<Self>, local: u32) -> Network<P> {
        Network {
            local,
            router: self.clone(),
            _public_key: PhantomData,
        }
    }

    fn deliver(&self, from: u32, to: u32, packet: Packet) {
        let listener = {
            let mut inner = self.inner.lock().expect("router poisoned");
            if let Some(every) = self.drop_every {
                let sent = inner.sent.entry((from, to)).or_insert(0);
                *sent += 1;
                if *sent % every == 0 {
                    trace!(from, to, "dropping packet");
                    return;
                }
            }
            inner.listeners.get(&to).cloned()
        };
        let Some(listener) = listener else {
            trace!(from, to, "no listener registered");
            return;
        };
        listener.new_packet(packet);
    }
}

/// Per-node handle into a [Router].
pub struct Network<P> {
    local: u32,
    router: Arc<Router>,
    _public_key: PhantomData<P>,
}

impl<P> Clone for Network<P> {
    fn clone(&self) -> Self {
        Self {
            local: self.local,
            router: self.router.clone(),
            _public_key: PhantomData,
        }
    }
}

impl<P: Clone + Debug + PartialEq + Send + Sync + 'static> NetworkTrait for Network<P> {
    type PublicKey = P;

    fn register_listener(&self, listener: Arc<dyn Listener>) {
        self.router
            .inner
            .lock()
            .expect("router poisoned")
            .listeners
            .insert(self.local, listener);
    }

    async fn send(&self, recipients: &[Identity<P>], packet: Packet) -> Result<(), Error> {
        for recipient in recipients {
            self.router.deliver(self.local, recipient.id, packet.clone());
        }
        Ok(())
    }
}
