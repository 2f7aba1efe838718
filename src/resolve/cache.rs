//! Per-run resolution cache
//!
//! Memoizes one value per key for the process lifetime, with an
//! at-most-once guarantee under concurrent first access: each key owns a
//! slot lock held while its value is computed, so a second caller for the
//! same key blocks and then reads the stored result instead of repeating
//! oracle calls. Distinct keys resolve independently. Errors are not
//! cached; a later call retries.

use crate::error::StalecheckResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Slot<T> = Arc<Mutex<Option<T>>>;

/// Keyed single-flight memoization
#[derive(Debug)]
pub struct ResolutionCache<T> {
    slots: Mutex<HashMap<String, Slot<T>>>,
}

impl<T: Clone> ResolutionCache<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, computing it with `resolve` on
    /// first access.
    ///
    /// `resolve` must not re-enter the cache for the same key; resolving
    /// one image never does (the chain walk reads the catalog directly).
    pub fn get_or_try_insert_with<F>(&self, key: &str, resolve: F) -> StalecheckResult<T>
    where
        F: FnOnce() -> StalecheckResult<T>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(key.to_string()).or_default())
        };

        let mut value = slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = value.as_ref() {
            return Ok(cached.clone());
        }
        let resolved = resolve()?;
        *value = Some(resolved.clone());
        Ok(resolved)
    }

    /// Number of keys with a slot (resolved or in flight)
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for ResolutionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
