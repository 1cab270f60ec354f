//! Per-sender dialogue slots.
//!
//! The store hands out one slot per sender. A caller locks the slot for the
//! whole read-advance-persist-write turn, so concurrent messages from the
//! same sender are serialized and at most one review can be persisted per
//! dialogue run. Slots for distinct senders are independent.
//!
//! The source system kept abandoned dialogues in memory forever. That
//! behavior is preserved by default; `evict_idle` plus the sweep loop in
//! `main` make expiry available as an opt-in deviation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{error, info};

use super::state::DialogueState;

/// One sender's dialogue slot.
///
/// `None` means no dialogue in progress: the next message starts a fresh
/// one. Every access stamps the slot for idle eviction.
#[derive(Debug)]
pub struct Slot {
    state: Option<DialogueState>,
    last_activity: Instant,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: None,
            last_activity: Instant::now(),
        }
    }

    /// Current state, if a dialogue is in progress.
    pub fn state(&self) -> Option<&DialogueState> {
        self.state.as_ref()
    }

    /// Take the current state, leaving the slot empty.
    pub fn take_state(&mut self) -> Option<DialogueState> {
        self.touch();
        self.state.take()
    }

    /// Store the state for the sender's next message.
    pub fn put_state(&mut self, state: DialogueState) {
        self.touch();
        self.state = Some(state);
    }

    /// Mark the dialogue finished. Idempotent: clearing an already empty
    /// slot is a no-op.
    pub fn clear_state(&mut self) {
        self.touch();
        self.state = None;
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// Process-wide map of dialogue slots, keyed by sender identifier.
pub struct DialogueStore {
    slots: StdMutex<HashMap<String, Arc<Mutex<Slot>>>>,
}

impl Default for DialogueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogueStore {
    pub fn new() -> Self {
        Self {
            slots: StdMutex::new(HashMap::new()),
        }
    }

    /// The outer map lock is only held for map lookups, never across await
    /// points. A poisoned lock means a handler panicked mid-lookup; the map
    /// is reset so the next message from any sender starts cleanly instead
    /// of wedging every request.
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<Slot>>>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("dialogue slot map poisoned, resetting all in-flight dialogues");
                let mut guard = poisoned.into_inner();
                guard.clear();
                guard
            }
        }
    }

    /// Get the slot for a sender, creating an empty one if absent.
    pub fn slot(&self, sender: &str) -> Arc<Mutex<Slot>> {
        let mut slots = self.lock_slots();
        slots
            .entry(sender.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Slot::new())))
            .clone()
    }

    /// Number of senders with a dialogue in progress.
    pub fn active_count(&self) -> usize {
        let slots = self.lock_slots();
        slots
            .values()
            .filter(|slot| {
                slot.try_lock()
                    .map(|guard| guard.state.is_some())
                    .unwrap_or(true)
            })
            .count()
    }

    /// Drop slots that are empty or idle longer than `max_idle`.
    ///
    /// Slots currently locked by an in-flight request are skipped. Returns
    /// the number of abandoned dialogues that were evicted (empty slots are
    /// dropped too but not counted).
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut slots = self.lock_slots();
        let mut evicted = 0;
        slots.retain(|sender, slot| {
            let Ok(guard) = slot.try_lock() else {
                return true;
            };
            if guard.state.is_none() {
                return false;
            }
            if guard.last_activity.elapsed() >= max_idle {
                info!(
                    "evicting idle dialogue for {} at step {}",
                    sender,
                    guard.state().map(|s| s.step_name()).unwrap_or("none")
                );
                evicted += 1;
                return false;
            }
            true
        });
        evicted
    }
}

/// Background sweep that evicts abandoned dialogues.
///
/// Only spawned when a TTL is configured; without it the store matches the
/// source system's keep-forever behavior.
pub async fn eviction_loop(dialogues: Arc<DialogueStore>, max_idle: Duration) {
    let period = max_idle.min(Duration::from_secs(60)).max(Duration::from_secs(1));
    loop {
        tokio::time::sleep(period).await;
        let evicted = dialogues.evict_idle(max_idle);
        if evicted > 0 {
            info!("evicted {} abandoned dialogues", evicted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slot_is_created_empty() {
        let store = DialogueStore::new();
        let slot = store.slot("+15551234");
        let guard = slot.lock().await;
        assert_eq!(guard.state(), None);
    }

    #[tokio::test]
    async fn test_slot_returns_same_slot_for_same_sender() {
        let store = DialogueStore::new();
        let a = store.slot("+15551234");
        let b = store.slot("+15551234");
        assert!(Arc::ptr_eq(&a, &b));

        let other = store.slot("+15559999");
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = DialogueStore::new();
        let slot = store.slot("+15551234");
        let mut guard = slot.lock().await;

        // Clearing a never-set state is a no-op, not an error.
        guard.clear_state();
        assert_eq!(guard.state(), None);

        guard.put_state(DialogueState::AwaitingProduct);
        guard.clear_state();
        guard.clear_state();
        assert_eq!(guard.state(), None);
    }

    #[tokio::test]
    async fn test_take_state_empties_slot() {
        let store = DialogueStore::new();
        let slot = store.slot("+15551234");
        let mut guard = slot.lock().await;

        guard.put_state(DialogueState::AwaitingProduct);
        assert_eq!(guard.take_state(), Some(DialogueState::AwaitingProduct));
        assert_eq!(guard.take_state(), None);
    }

    #[tokio::test]
    async fn test_active_count() {
        let store = DialogueStore::new();
        assert_eq!(store.active_count(), 0);

        store
            .slot("a")
            .lock()
            .await
            .put_state(DialogueState::AwaitingProduct);
        store.slot("b");
        assert_eq!(store.active_count(), 1);
    }

    #[tokio::test]
    async fn test_evict_idle_drops_stale_and_empty_slots() {
        let store = DialogueStore::new();
        store
            .slot("stale")
            .lock()
            .await
            .put_state(DialogueState::AwaitingProduct);
        store.slot("empty");

        // Nothing is older than an hour yet.
        assert_eq!(store.evict_idle(Duration::from_secs(3600)), 0);
        {
            let slots = store.lock_slots();
            assert!(slots.contains_key("stale"));
            // Empty slots are dropped on every sweep.
            assert!(!slots.contains_key("empty"));
        }

        // With a zero TTL the in-progress dialogue counts as abandoned.
        assert_eq!(store.evict_idle(Duration::ZERO), 1);
        let slots = store.lock_slots();
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn test_evict_idle_skips_locked_slots() {
        let store = DialogueStore::new();
        let slot = store.slot("busy");
        let mut guard = slot.lock().await;
        guard.put_state(DialogueState::AwaitingProduct);

        // The slot is locked by an in-flight turn; the sweep must not touch it.
        assert_eq!(store.evict_idle(Duration::ZERO), 0);
        drop(guard);
        assert!(store.lock_slots().contains_key("busy"));
    }

    /// A slot lock held across a turn serializes same-sender access.
    #[tokio::test]
    async fn test_same_sender_turns_are_serialized() {
        let store = Arc::new(DialogueStore::new());
        let observed = Arc::new(StdMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let observed = observed.clone();
            handles.push(tokio::spawn(async move {
                let slot = store.slot("+15551234");
                let mut guard = slot.lock().await;
                observed.lock().unwrap().push((i, "enter"));
                // Simulate the await on the durable write mid-turn.
                tokio::task::yield_now().await;
                guard.put_state(DialogueState::AwaitingProduct);
                observed.lock().unwrap().push((i, "exit"));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Every enter must be immediately followed by the same task's exit.
        let observed = observed.lock().unwrap();
        for pair in observed.chunks(2) {
            assert_eq!(pair[0].0, pair[1].0, "turns interleaved: {:?}", *observed);
            assert_eq!(pair[0].1, "enter");
            assert_eq!(pair[1].1, "exit");
        }
    }
}
