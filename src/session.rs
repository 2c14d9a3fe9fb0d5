//! # Session Store Module
//!
//! Per-user dialogue state, injected into the front controller.
//!
//! Each identity owns one slot behind its own async mutex. Handling an event
//! holds that slot's guard from start to finish, so two events from the same
//! user never interleave while different users proceed independently.
//!
//! A slot only lives while a flow is in progress or someone is waiting on it.
//! Releasing a guard that holds [`DialogueState::Idle`] removes the slot.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::dialogue::DialogueState;

type Slot = Arc<AsyncMutex<DialogueState>>;
type SlotMap = Arc<Mutex<HashMap<i64, Slot>>>;

fn lock_map(slots: &Mutex<HashMap<i64, Slot>>) -> MutexGuard<'_, HashMap<i64, Slot>> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct SessionStore {
    slots: SlotMap,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: i64) -> Slot {
        // the outer lock is only held for the lookup, never across an await
        lock_map(&self.slots).entry(user_id).or_default().clone()
    }

    /// Wait for and take this user's slot
    pub async fn lock(&self, user_id: i64) -> SessionGuard {
        let guard = self.slot(user_id).lock_owned().await;
        SessionGuard {
            user_id,
            guard: Some(guard),
            slots: Arc::clone(&self.slots),
        }
    }

    /// Current state, without holding the slot
    pub async fn snapshot(&self, user_id: i64) -> DialogueState {
        self.lock(user_id).await.clone()
    }

    /// Whether a flow is in progress for this user
    pub async fn is_active(&self, user_id: i64) -> bool {
        !matches!(*self.lock(user_id).await, DialogueState::Idle)
    }

    /// Number of users holding a slot
    pub fn slot_count(&self) -> usize {
        lock_map(&self.slots).len()
    }
}

/// Exclusive access to one user's dialogue state
pub struct SessionGuard {
    user_id: i64,
    guard: Option<OwnedMutexGuard<DialogueState>>,
    slots: SlotMap,
}

impl Deref for SessionGuard {
    type Target = DialogueState;

    fn deref(&self) -> &DialogueState {
        match &self.guard {
            Some(guard) => guard,
            None => unreachable!("session guard is only taken on drop"),
        }
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut DialogueState {
        match &mut self.guard {
            Some(guard) => guard,
            None => unreachable!("session guard is only taken on drop"),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        if !matches!(*guard, DialogueState::Idle) {
            return;
        }

        // holding the map lock stops new waiters from cloning the slot
        let mut slots = lock_map(&self.slots);
        let slot = OwnedMutexGuard::mutex(&guard);
        // one reference in the map, one in this guard; more means someone waits
        if Arc::strong_count(slot) == 2 {
            if let Some(current) = slots.get(&self.user_id) {
                if Arc::ptr_eq(current, slot) {
                    slots.remove(&self.user_id);
                }
            }
        }
        drop(slots);
        drop(guard);
    }
}

/// Drop whatever flow the guard holds
pub fn destroy(guard: &mut SessionGuard) {
    **guard = DialogueState::Idle;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::AddCategoryStep;
    use std::time::Duration;

    #[tokio::test]
    async fn test_new_user_is_idle() {
        let store = SessionStore::new();
        assert!(!store.is_active(1).await);
    }

    #[tokio::test]
    async fn test_destroy_resets_to_idle() {
        let store = SessionStore::new();
        {
            let mut guard = store.lock(1).await;
            *guard = DialogueState::AddCategory(AddCategoryStep::Name);
        }
        assert!(store.is_active(1).await);

        let mut guard = store.lock(1).await;
        destroy(&mut guard);
        drop(guard);
        assert_eq!(store.snapshot(1).await, DialogueState::Idle);
    }

    #[tokio::test]
    async fn test_same_user_is_serialized_other_users_are_not() {
        let store = Arc::new(SessionStore::new());
        let held = store.lock(7).await;

        // another user is not blocked
        let other = tokio::time::timeout(Duration::from_millis(100), store.lock(8)).await;
        assert!(other.is_ok());

        // the same user waits
        let same = tokio::time::timeout(Duration::from_millis(50), store.lock(7)).await;
        assert!(same.is_err());

        drop(held);
        let same = tokio::time::timeout(Duration::from_millis(100), store.lock(7)).await;
        assert!(same.is_ok());
    }

    #[tokio::test]
    async fn test_idle_slots_are_released() {
        let store = SessionStore::new();
        for user_id in 0..1000 {
            let mut guard = store.lock(user_id).await;
            destroy(&mut guard);
        }
        assert_eq!(store.slot_count(), 0);

        assert!(!store.is_active(42).await);
        assert_eq!(store.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_flow_in_progress_keeps_its_slot() {
        let store = SessionStore::new();
        {
            let mut guard = store.lock(1).await;
            *guard = DialogueState::AddCategory(AddCategoryStep::Name);
        }
        assert_eq!(store.slot_count(), 1);
        assert!(store.is_active(1).await);

        let mut guard = store.lock(1).await;
        destroy(&mut guard);
        drop(guard);
        assert_eq!(store.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_waiter_keeps_slot_alive() {
        let store = Arc::new(SessionStore::new());
        let held = store.lock(3).await;

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let mut guard = store.lock(3).await;
                *guard = DialogueState::AddCategory(AddCategoryStep::Name);
            })
        };
        // let the waiter queue on the slot
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);
        waiter.await.unwrap();

        assert!(store.is_active(3).await);
        assert_eq!(store.slot_count(), 1);
    }
}
