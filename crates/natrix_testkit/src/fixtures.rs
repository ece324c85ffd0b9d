//! Test fixtures and store helpers.
//!
//! Provides sessions of the reference library, stores with automatic
//! cleanup, and common store scenarios.

use natrix_core::{Handle, NativeResult, Session};
use natrix_ffi::{
    nx_conflict_iterator_new, nx_entry_iterator_new, nx_id_walk_new, nx_object_iterator_new,
    nx_object_lookup, nx_store_add_conflict, nx_store_get_entry, nx_store_object_count,
    nx_store_open, nx_store_put, nx_store_set_entry, nx_store_stats, Natrix, NxConflictIterator,
    NxEntry, NxEntryIterator, NxIdWalk, NxKind, NxObject, NxObjectIterator, NxOid, NxStats,
    NxStore, NX_KIND_ANY,
};
use parking_lot::{Mutex, MutexGuard};
use std::ffi::CString;
use std::ptr;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Serializes tests that observe the library's global init depth.
pub fn session_lock() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = parking_lot::const_mutex(());
    LOCK.lock()
}

fn c_string(value: &str) -> CString {
    CString::new(value).expect("test strings must not contain nul bytes")
}

/// A store with its own library session.
pub struct TestStore {
    /// The store handle.
    pub store: Handle<NxStore>,
    // Dropped after the store.
    _session: Session<Natrix>,
}

impl TestStore {
    /// Opens an empty store.
    pub fn new() -> Self {
        Self::named("test")
    }

    /// Opens an empty store with the given name.
    pub fn named(name: &str) -> Self {
        init_tracing();
        let session = Session::<Natrix>::acquire().expect("Failed to initialize natrix");
        let c_name = c_string(name);
        let store = session
            .alloc(|out| unsafe { nx_store_open(out, c_name.as_ptr()) })
            .expect("Failed to open store");
        tracing::debug!(store = name, "test store opened");
        Self {
            store,
            _session: session,
        }
    }

    /// Stores an object and returns its id.
    pub fn put(&mut self, kind: NxKind, data: &[u8]) -> NxOid {
        self.store
            .call_fixed_mut(|out, s| unsafe { nx_store_put(out, s, kind, data.as_ptr(), data.len()) })
            .expect("Failed to put object")
    }

    /// Sets an entry.
    pub fn set_entry(&mut self, name: &str, value: &str) {
        let (name, value) = (c_string(name), c_string(value));
        self.store
            .call_status_mut(|s| unsafe { nx_store_set_entry(s, name.as_ptr(), value.as_ptr()) })
            .expect("Failed to set entry");
    }

    /// Records a conflict.
    pub fn add_conflict(&mut self, path: &str, ancestor: Option<&str>, ours: &str, theirs: &str) {
        let path = c_string(path);
        let ancestor = ancestor.map(c_string);
        let (ours, theirs) = (c_string(ours), c_string(theirs));
        self.store
            .call_status_mut(|s| unsafe {
                nx_store_add_conflict(
                    s,
                    path.as_ptr(),
                    ancestor.as_ref().map_or(ptr::null(), |a| a.as_ptr()),
                    ours.as_ptr(),
                    theirs.as_ptr(),
                )
            })
            .expect("Failed to add conflict");
    }

    /// Looks up an object of any kind.
    pub fn lookup(&self, id: &NxOid) -> NativeResult<Handle<NxObject>> {
        self.store
            .call_alloc(|out, s| unsafe { nx_object_lookup(out, s, id, NX_KIND_ANY) })
    }

    /// Looks up an owned copy of an entry.
    pub fn entry(&self, name: &str) -> NativeResult<Handle<NxEntry>> {
        let name = c_string(name);
        self.store
            .call_alloc(|out, s| unsafe { nx_store_get_entry(out, s, name.as_ptr()) })
    }

    /// Returns the number of stored objects.
    pub fn object_count(&self) -> usize {
        self.store.call_direct(|s| unsafe { nx_store_object_count(s) })
    }

    /// Returns the store's instrumentation counters.
    pub fn stats(&self) -> NxStats {
        self.store
            .call_fixed(|out, s| unsafe { nx_store_stats(out, s) })
            .expect("Failed to read store stats")
    }

    /// Creates an object iterator.
    pub fn objects(&self) -> Handle<NxObjectIterator> {
        self.store
            .call_alloc(|out, s| unsafe { nx_object_iterator_new(out, s) })
            .expect("Failed to create object iterator")
    }

    /// Creates an id walk.
    pub fn ids(&self) -> Handle<NxIdWalk> {
        self.store
            .call_alloc(|out, s| unsafe { nx_id_walk_new(out, s) })
            .expect("Failed to create id walk")
    }

    /// Creates an entry iterator.
    pub fn entries(&self) -> Handle<NxEntryIterator> {
        self.store
            .call_alloc(|out, s| unsafe { nx_entry_iterator_new(out, s) })
            .expect("Failed to create entry iterator")
    }

    /// Creates a conflict iterator.
    pub fn conflicts(&self) -> Handle<NxConflictIterator> {
        self.store
            .call_alloc(|out, s| unsafe { nx_conflict_iterator_new(out, s) })
            .expect("Failed to create conflict iterator")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = Handle<NxStore>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl std::ops::DerefMut for TestStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

/// Runs a test with a temporary store.
///
/// # Example
///
/// ```rust,ignore
/// use natrix_testkit::with_store;
///
/// #[test]
/// fn my_test() {
///     with_store(|store| {
///         let id = store.put(NX_KIND_BLOB, b"hello");
///         assert!(store.lookup(&id).is_ok());
///     });
/// }
/// ```
pub fn with_store<F, R>(f: F) -> R
where
    F: FnOnce(&mut TestStore) -> R,
{
    let mut store = TestStore::new();
    f(&mut store)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use natrix_ffi::{NX_KIND_BLOB, NX_KIND_COMMIT, NX_KIND_TREE};

    /// Creates a store holding `count` objects, cycling through the kinds.
    ///
    /// Returns the ids in insertion order.
    pub fn populated_store(count: usize) -> (TestStore, Vec<NxOid>) {
        let mut store = TestStore::new();
        let kinds = [NX_KIND_BLOB, NX_KIND_TREE, NX_KIND_COMMIT];
        let ids = (0..count)
            .map(|i| {
                let data = format!("object-{i}");
                store.put(kinds[i % kinds.len()], data.as_bytes())
            })
            .collect();
        tracing::debug!(count, "populated test store");
        (store, ids)
    }

    /// Creates a store with entries `key{i} = value{i}`.
    pub fn store_with_entries(count: usize) -> TestStore {
        let mut store = TestStore::new();
        for i in 0..count {
            store.set_entry(&format!("key{i:03}"), &format!("value{i}"));
        }
        tracing::debug!(count, "test store entries set");
        store
    }

    /// Creates a store with one conflict that has an ancestor and one that
    /// does not.
    pub fn store_with_conflicts() -> TestStore {
        let mut store = TestStore::new();
        store.add_conflict("a.txt", Some("base"), "ours", "theirs");
        store.add_conflict("b.txt", None, "added here", "added there");
        tracing::debug!(conflicts = 2, "test store conflicts recorded");
        store
    }
}
