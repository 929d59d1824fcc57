//! Process-lifetime dedup set shared by every polling task.

use std::collections::HashSet;
use std::sync::Mutex;

/// Records which item identifiers have already been notified.
///
/// One instance is shared across all subscriptions; the set grows
/// monotonically for the life of the process and never evicts. Unlike a
/// cooperatively scheduled single-threaded runtime, polling tasks here may
/// run on parallel threads, so admission must be an atomic check-and-set.
#[derive(Debug, Default)]
pub struct SeenSet {
    inner: Mutex<HashSet<String>>,
}

impl SeenSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-admission gate: true exactly once per identifier.
    ///
    /// The first caller for a given id observes `true` and the id is
    /// recorded in the same critical section; every later caller observes
    /// `false`, forever.
    pub fn first_sighting(&self, id: &str) -> bool {
        let mut seen = self.inner.lock().unwrap_or_else(|poisoned| {
            // The set stays coherent even if a holder panicked mid-insert.
            poisoned.into_inner()
        });
        seen.insert(id.to_string())
    }

    /// Number of identifiers recorded so far.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// True when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
