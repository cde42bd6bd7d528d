//! Locally displayable references to image bytes.
//!
//! A [`DisplayHandle`] is what the presentation layer renders from. Each one
//! is registered with the [`HandleRegistry`] that issued it and is released
//! when the last clone goes away, so a handle can never be freed while a
//! snapshot still points at it.

use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use tracing::trace;
use uuid::Uuid;

type LiveSet = Mutex<HashSet<Uuid>>;

fn lock_live(live: &LiveSet) -> MutexGuard<'_, HashSet<Uuid>> {
    live.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct HandleRegistry {
    live: Arc<LiveSet>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> DisplayHandle {
        let id = Uuid::new_v4();
        lock_live(&self.live).insert(id);
        trace!(handle = %id, "display handle acquired");
        DisplayHandle {
            inner: Arc::new(HandleInner {
                id,
                mime_type: mime_type.into(),
                bytes: bytes.into(),
                registry: Arc::downgrade(&self.live),
            }),
        }
    }

    pub fn live_count(&self) -> usize {
        lock_live(&self.live).len()
    }

    pub fn is_live(&self, handle: &DisplayHandle) -> bool {
        lock_live(&self.live).contains(&handle.inner.id)
    }
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

#[derive(Clone)]
pub struct DisplayHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: Uuid,
    mime_type: String,
    bytes: Arc<[u8]>,
    registry: Weak<LiveSet>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if let Some(live) = self.registry.upgrade() {
            lock_live(&live).remove(&self.id);
        }
        trace!(handle = %self.id, "display handle released");
    }
}

impl DisplayHandle {
    pub fn locator(&self) -> String {
        format!("blob:translator/{}", self.inner.id)
    }

    pub fn mime_type(&self) -> &str {
        &self.inner.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.inner.bytes
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.inner.bytes)
    }

    pub fn len(&self) -> usize {
        self.inner.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.bytes.is_empty()
    }

    pub fn same_handle(&self, other: &DisplayHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayHandle")
            .field("locator", &self.locator())
            .field("mime_type", &self.inner.mime_type)
            .field("len", &self.inner.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_released_when_last_clone_drops() {
        let registry = HandleRegistry::new();
        let handle = registry.acquire(vec![1u8, 2, 3], "image/png");
        let rendered = handle.clone();
        assert_eq!(registry.live_count(), 1);

        drop(handle);
        assert!(registry.is_live(&rendered));

        drop(rendered);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn every_handle_gets_its_own_locator() {
        let registry = HandleRegistry::new();
        let a = registry.acquire(vec![7u8], "image/png");
        let b = registry.acquire(vec![7u8], "image/png");
        assert_ne!(a.locator(), b.locator());
        assert!(!a.same_handle(&b));
        assert!(a.locator().starts_with("blob:translator/"));
        assert_eq!(a.bytes(), b.bytes());
    }

    #[test]
    fn handle_outliving_registry_does_not_panic() {
        let registry = HandleRegistry::new();
        let handle = registry.acquire(vec![0u8; 4], "image/jpeg");
        drop(registry);
        assert_eq!(handle.len(), 4);
        drop(handle);
    }
}
