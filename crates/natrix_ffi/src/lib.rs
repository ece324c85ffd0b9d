//! # Natrix FFI
//!
//! A small handle-based native library with a stable C ABI.
//!
//! This crate provides:
//! - Content-addressed object stores with name/value entries and conflicts
//! - Output-pointer constructors, direct accessors and fixed-size outputs
//! - Iterators terminated by `NX_ITEROVER`, with owned and lent items
//! - A thread-local last-error record
//! - Reference-counted global init/shutdown
//! - Per-store instrumentation counters
//! - Registration of all of the above with `natrix_core`
//!
//! It mirrors the conventions of libraries such as libgit2 and serves as the
//! end-to-end target for the adapter's tests and benchmarks.

#![warn(missing_docs)]

pub mod bindings;
pub mod error;
pub mod iterator;
pub mod library;
pub mod object;
pub mod stats;
pub mod store;
pub mod types;

pub use bindings::{tagged_objects, Natrix};
pub use error::*;
pub use iterator::*;
pub use library::*;
pub use object::*;
pub use stats::StoreStats;
pub use store::{
    nx_entry_free, nx_store_add_conflict, nx_store_free, nx_store_get_entry,
    nx_store_object_count, nx_store_open, nx_store_put, nx_store_set_entry, nx_store_stats,
};
pub use types::*;

#[cfg(test)]
static TEST_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

/// Serializes tests that depend on the global init depth.
#[cfg(test)]
pub(crate) fn test_lock() -> parking_lot::MutexGuard<'static, ()> {
    TEST_LOCK.lock()
}

/// Holds the test lock with the library initialized.
#[cfg(test)]
pub(crate) struct Initialized {
    _lock: parking_lot::MutexGuard<'static, ()>,
}

#[cfg(test)]
pub(crate) fn initialized() -> Initialized {
    let lock = test_lock();
    library::nx_init();
    Initialized { _lock: lock }
}

#[cfg(test)]
impl Drop for Initialized {
    fn drop(&mut self) {
        library::nx_shutdown();
    }
}
