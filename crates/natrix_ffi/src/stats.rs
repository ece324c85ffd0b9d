//! Store instrumentation.
//!
//! Every object, owned entry and iterator a store hands out keeps a shared
//! reference to the store's counters, so releases are counted even after the
//! store itself is gone.

use crate::types::NxStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one store.
#[derive(Debug, Default)]
pub struct StoreStats {
    objects_created: AtomicU64,
    objects_freed: AtomicU64,
    objects_duplicated: AtomicU64,
    entries_created: AtomicU64,
    entries_freed: AtomicU64,
    iterators_created: AtomicU64,
    iterators_freed: AtomicU64,
}

impl StoreStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_object_created(&self) {
        self.objects_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_object_freed(&self) {
        self.objects_freed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_object_duplicated(&self) {
        self.objects_duplicated.fetch_add(1, Ordering::Relaxed);
        self.objects_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_entry_created(&self) {
        self.entries_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_entry_freed(&self) {
        self.entries_freed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_iterator_created(&self) {
        self.iterators_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_iterator_freed(&self) {
        self.iterators_freed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> NxStats {
        NxStats {
            objects_created: self.objects_created.load(Ordering::Relaxed),
            objects_freed: self.objects_freed.load(Ordering::Relaxed),
            objects_duplicated: self.objects_duplicated.load(Ordering::Relaxed),
            entries_created: self.entries_created.load(Ordering::Relaxed),
            entries_freed: self.entries_freed.load(Ordering::Relaxed),
            iterators_created: self.iterators_created.load(Ordering::Relaxed),
            iterators_freed: self.iterators_freed.load(Ordering::Relaxed),
        }
    }
}
