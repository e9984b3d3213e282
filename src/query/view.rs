use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Liveness flag of a consuming view.
///
/// Results that arrive after `unmount` are not delivered.
#[derive(Debug, Clone)]
pub struct ViewGuard {
    mounted: Arc<AtomicBool>,
}

impl Default for ViewGuard {
    fn default() -> Self {
        Self::mount()
    }
}

impl ViewGuard {
    pub fn mount() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }
}
