//! Per-request diagnostic context.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};

/// Diagnostic key/value context accumulated while a request is handled.
///
/// Cloned handles share the same map, so a handler can add context through
/// its copy and the reporting middleware sees it. A fresh context is created
/// for every request, which keeps concurrent requests isolated.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    values: Arc<RwLock<Map<String, Value>>>,
    clears: Arc<AtomicUsize>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Copy of the current context.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove every entry. Safe to call any number of times.
    pub fn clear(&self) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    /// How many times `clear` ran on this context, across all handles.
    pub fn times_cleared(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Arm a guard that clears this context when dropped.
    pub fn guard(&self) -> ContextGuard {
        ContextGuard {
            context: self.clone(),
        }
    }
}

/// Clears its context on drop, including during unwinding.
#[must_use = "the context is cleared as soon as the guard is dropped"]
pub struct ContextGuard {
    context: RequestContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.context.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let context = RequestContext::new();
        let handle = context.clone();
        handle.insert("user_id", 42);
        assert_eq!(context.get("user_id"), Some(Value::from(42)));
        assert_eq!(context.snapshot().len(), 1);
    }

    #[test]
    fn test_guard_clears_on_drop() {
        let context = RequestContext::new();
        {
            let _guard = context.guard();
            context.insert("step", "checkout");
        }
        assert!(context.is_empty());
        assert_eq!(context.times_cleared(), 1);

        // Clearing twice is harmless.
        context.clear();
        assert!(context.is_empty());
        assert_eq!(context.times_cleared(), 2);
    }

    #[test]
    fn test_guard_clears_during_panic() {
        let context = RequestContext::new();
        let inner = context.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = inner.guard();
            inner.insert("step", "payment");
            panic!("payment gateway down");
        });
        assert!(result.is_err());
        assert!(context.is_empty());
        assert_eq!(context.times_cleared(), 1);
    }
}
