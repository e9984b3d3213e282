//! Active project scope.
//!
//! A single-writer observable cell: `set_scope` is the only write path and
//! every write replaces the previous value and wakes all watchers.

use tokio::sync::watch;
use tracing::info;

use crate::models::ProjectId;

#[derive(Debug)]
pub struct ScopeContext {
    tx: watch::Sender<Option<ProjectId>>,
}

impl Default for ScopeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeContext {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn get_scope(&self) -> Option<ProjectId> {
        self.tx.borrow().clone()
    }

    pub fn set_scope(&self, scope: Option<ProjectId>) {
        match &scope {
            Some(project_id) => info!(%project_id, "project scope selected"),
            None => info!("project scope cleared"),
        }
        self.tx.send_replace(scope);
    }

    pub fn clear(&self) {
        if self.tx.borrow().is_some() {
            self.set_scope(None);
        }
    }

    pub fn watch(&self) -> watch::Receiver<Option<ProjectId>> {
        self.tx.subscribe()
    }
}
