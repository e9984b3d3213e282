use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

/// Shared between a subscription handle and its delivery task.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionSlot {
    active: Mutex<bool>,
    cancelled: Notify,
}

impl SubscriptionSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            active: Mutex::new(true),
            cancelled: Notify::new(),
        })
    }

    pub(crate) fn cancel(&self) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.cancelled.notify_one();
    }

    pub(crate) fn is_active(&self) -> bool {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `deliver` only while the slot is still active.
    ///
    /// The lock is held across the callback so `cancel` returning means no
    /// delivery is running or will run afterwards.
    pub(crate) fn deliver_if_active<F: FnOnce()>(&self, deliver: F) -> bool {
        let guard = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !*guard {
            return false;
        }
        deliver();
        true
    }

    pub(crate) async fn cancelled(&self) {
        self.cancelled.notified().await;
    }
}

/// Handle for the session change listener. Dropping it unsubscribes.
///
/// The callback must not drop or unsubscribe its own handle.
#[derive(Debug)]
pub struct Subscription {
    slot: Arc<SubscriptionSlot>,
}

impl Subscription {
    pub(crate) fn new(slot: Arc<SubscriptionSlot>) -> Self {
        Self { slot }
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_active()
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.slot.cancel();
    }
}
