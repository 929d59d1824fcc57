//! Ownership and lifecycle of active monitoring subscriptions.

use crate::fetcher::Fetch;
use crate::monitor::PollLoop;
use crate::notify::{NotificationGate, Notify};
use crate::seen::SeenSet;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Identity of one monitoring registration.
///
/// Equality and hashing are structural; the registry guarantees at most
/// one running subscription per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    /// Category page being monitored.
    pub target: Url,
    /// Keyword matched against item titles.
    pub keyword: String,
    /// Requester the notifications are addressed to.
    pub chat_id: i64,
}

/// Outcome of a registration attempt. `AlreadyRunning` is a normal
/// outcome reported to the caller, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A fresh polling task was started for the key.
    Started,
    /// A subscription with this key is already running; nothing changed.
    AlreadyRunning,
}

/// Outcome of a removal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The subscription was cancelled and erased.
    Removed,
    /// No subscription with this key was registered.
    NotFound,
}

struct WatchHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the set of active subscriptions, each bound to one cancellable
/// polling task.
///
/// All operations are callable from concurrent command-handling contexts;
/// the key table is the registry's only mutable state and every mutation
/// happens under one lock, with no awaiting inside the critical section.
pub struct SubscriptionRegistry {
    fetcher: Arc<dyn Fetch>,
    notifier: Arc<dyn Notify>,
    seen: Arc<SeenSet>,
    interval: Duration,
    watches: Mutex<HashMap<SubscriptionKey, WatchHandle>>,
}

impl SubscriptionRegistry {
    /// Wires a registry with its shared collaborators.
    ///
    /// The dedup set is injected (not created here) because it is shared
    /// process-wide across every subscription the registry will start.
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        notifier: Arc<dyn Notify>,
        seen: Arc<SeenSet>,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            notifier,
            seen,
            interval,
            watches: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a subscription and starts its polling task.
    ///
    /// Idempotent-safe: a second `add` for a live key starts nothing and
    /// reports `AlreadyRunning`.
    pub fn add(&self, key: SubscriptionKey) -> AddOutcome {
        let mut watches = self
            .watches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if watches.contains_key(&key) {
            return AddOutcome::AlreadyRunning;
        }

        let cancel = CancellationToken::new();
        let gate = NotificationGate::new(
            Arc::clone(&self.seen),
            Arc::clone(&self.notifier),
            key.chat_id,
            &key.target,
        );
        let poll = PollLoop::new(
            Arc::clone(&self.fetcher),
            key.target.clone(),
            key.keyword.clone(),
            self.interval,
            cancel.clone(),
        );
        let task = tokio::spawn(poll.run(gate));

        info!(target = %key.target, keyword = %key.keyword, chat_id = key.chat_id,
            "subscription started");
        watches.insert(key, WatchHandle { cancel, task });
        AddOutcome::Started
    }

    /// Cancels and erases a subscription.
    ///
    /// Signals the polling task and returns immediately; the task's own
    /// teardown completes asynchronously relative to this call.
    pub fn remove(&self, key: &SubscriptionKey) -> RemoveOutcome {
        let handle = {
            let mut watches = self
                .watches
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            watches.remove(key)
        };

        match handle {
            Some(handle) => {
                handle.cancel.cancel();
                debug!(target = %key.target, keyword = %key.keyword,
                    already_finished = handle.task.is_finished(),
                    "subscription cancelled");
                RemoveOutcome::Removed
            }
            None => RemoveOutcome::NotFound,
        }
    }

    /// Enumerates the registered (target, keyword) pairs for one requester.
    pub fn list_for(&self, chat_id: i64) -> Vec<(Url, String)> {
        self.watches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .filter(|key| key.chat_id == chat_id)
            .map(|key| (key.target.clone(), key.keyword.clone()))
            .collect()
    }

    /// Number of active subscriptions across all requesters.
    pub fn len(&self) -> usize {
        self.watches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// True when no subscription is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels every subscription; used on process shutdown.
    pub fn shutdown(&self) {
        let mut watches = self
            .watches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (key, handle) in watches.drain() {
            handle.cancel.cancel();
            debug!(target = %key.target, keyword = %key.keyword, "subscription cancelled");
        }
    }
}
