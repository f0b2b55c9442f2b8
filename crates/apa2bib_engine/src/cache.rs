use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Successful conversions keyed by the trimmed input text.
///
/// Entries are never evicted; the map grows with every distinct reference
/// converted during the lifetime of the owning converter.
#[derive(Debug, Default)]
pub struct ConversionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl ConversionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, bibtex: impl Into<String>) {
        self.entries().insert(key.into(), bibtex.into());
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
