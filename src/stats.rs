use serde_json::Value;
use std::sync::{Arc, RwLock};

/// The most recent broker statistics document, replaced wholesale on every
/// statistics callback. Last-writer-wins; readers clone an `Arc` and never
/// hold the lock across any other work.
#[derive(Debug, Default)]
pub struct SharedStats {
    slot: RwLock<Option<Arc<Value>>>,
}

impl SharedStats {
    pub fn record(&self, snapshot: Value) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(snapshot));
    }

    /// Returns `None` until the first statistics callback has fired.
    pub fn latest(&self) -> Option<Arc<Value>> {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
