//! Outstanding retrievals.
//!
//! A `get` that misses locally registers here, naming the peers it is about
//! to ask. The dispatch loop records each reply against the peer that sent
//! it; the retrieval completes on the first reply that delivered content, or
//! once every peer it asked has answered without it.
//!
//! Answers are counted per peer. A peer that still owes a reply to a
//! retrieval that already gave up (or completed) has that reply written off
//! when it arrives, so a late `NotFound` never counts against a newer
//! retrieval of the same key.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;

#[derive(Debug, Default)]
struct Pending {
    /// Replies each peer still owes for this key.
    owed: HashMap<String, usize>,
    /// Part of `owed` that no waiting retrieval is counting on.
    stale: HashMap<String, usize>,
    waiters: Vec<(u64, oneshot::Sender<bool>)>,
}

impl Pending {
    /// Replies that live retrievals are still waiting for.
    fn live(&self) -> usize {
        let owed: usize = self.owed.values().sum();
        let stale: usize = self.stale.values().sum();
        owed.saturating_sub(stale)
    }

    /// Resolve every waiter; anything still owed becomes stale.
    fn complete(&mut self, delivered: bool) {
        for (_, waiter) in self.waiters.drain(..) {
            let _ = waiter.send(delivered);
        }
        self.stale = self.owed.clone();
    }

    fn mark_stale(&mut self, peer: &str) {
        let owed = self.owed.get(peer).copied().unwrap_or(0);
        let stale = self.stale.entry(peer.to_string()).or_insert(0);
        if *stale < owed {
            *stale += 1;
        }
    }

    /// Take one reply owed by `peer`. Returns `None` if it owed nothing,
    /// otherwise whether the reply was stale.
    fn take_reply(&mut self, peer: &str) -> Option<bool> {
        let owed = self.owed.get_mut(peer)?;
        *owed -= 1;
        if *owed == 0 {
            self.owed.remove(peer);
        }

        let stale = match self.stale.get_mut(peer) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        };
        if self.stale.get(peer) == Some(&0) {
            self.stale.remove(peer);
        }
        Some(stale)
    }

    fn settle_if_exhausted(&mut self) {
        if !self.waiters.is_empty() && self.live() == 0 {
            self.complete(false);
        }
    }

    fn is_idle(&self) -> bool {
        self.waiters.is_empty() && self.owed.is_empty()
    }
}

/// Handle returned by [`PendingRetrievals::register`].
#[derive(Debug)]
pub struct RetrievalTicket {
    id: u64,
    key: String,
    peers: Vec<String>,
    /// Resolves to `true` if content was delivered, `false` if every peer
    /// answered without it.
    pub completion: oneshot::Receiver<bool>,
}

impl RetrievalTicket {
    /// Key the retrieval is for.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Retrievals awaiting answers, keyed by blob key.
///
/// Concurrent retrievals of the same key share one entry: their expected
/// answers add up and all of them complete together.
#[derive(Debug, Default)]
pub struct PendingRetrievals {
    entries: Mutex<HashMap<String, Pending>>,
    next_id: Mutex<u64>,
}

impl PendingRetrievals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect one reply for `key` from each of `peers`.
    pub fn register<I, S>(&self, key: &str, peers: I) -> RetrievalTicket
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        let (tx, rx) = oneshot::channel();
        let peers: Vec<String> = peers.into_iter().map(Into::into).collect();

        let mut entries = self.entries.lock();
        let entry = entries.entry(key.to_string()).or_default();
        for peer in &peers {
            *entry.owed.entry(peer.clone()).or_insert(0) += 1;
        }
        entry.waiters.push((id, tx));
        entry.settle_if_exhausted();
        if entry.is_idle() {
            entries.remove(key);
        }

        RetrievalTicket {
            id,
            key: key.to_string(),
            peers,
            completion: rx,
        }
    }

    /// Record a reply for `key` from `peer`.
    ///
    /// Returns `false` if `peer` owed no reply for `key` (unsolicited).
    /// Delivered content completes every waiter; a `NotFound` owed to a
    /// retrieval that is no longer waiting is discarded.
    pub fn answer(&self, key: &str, peer: &str, delivered: bool) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        let Some(stale) = entry.take_reply(peer) else {
            return false;
        };

        if delivered && !entry.waiters.is_empty() {
            entry.complete(true);
        } else if !stale {
            entry.settle_if_exhausted();
        }

        if entry.is_idle() {
            entries.remove(key);
        }
        true
    }

    /// Withdraw a retrieval that gave up waiting.
    ///
    /// The replies it was counting on stay owed and are discarded when they
    /// arrive.
    pub fn abandon(&self, ticket: &RetrievalTicket) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&ticket.key) else {
            return;
        };

        let before = entry.waiters.len();
        entry.waiters.retain(|(id, _)| *id != ticket.id);
        if entry.waiters.len() < before {
            for peer in &ticket.peers {
                entry.mark_stale(peer);
            }
            entry.settle_if_exhausted();
        }

        if entry.is_idle() {
            entries.remove(&ticket.key);
        }
    }

    /// Drop every reply owed by `peer`; it will not answer any more.
    pub fn forget_peer(&self, peer: &str) {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| {
            entry.owed.remove(peer);
            entry.stale.remove(peer);
            entry.settle_if_exhausted();
            !entry.is_idle()
        });
    }

    /// Whether a retrieval for `key` is still waiting.
    pub fn is_pending(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| !entry.waiters.is_empty())
    }

    /// Number of keys with a waiting retrieval.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|entry| !entry.waiters.is_empty())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
