//! Object stores.

use crate::error::{clear_last_error, fail, LibraryError, NX_OK};
use crate::library::is_initialized;
use crate::stats::StoreStats;
use crate::types::{kind_name, NxEntry, NxKind, NxOid, NxStats, NxStore};
use std::collections::BTreeMap;
use std::ffi::{c_char, c_int, CStr, CString};
use std::sync::Arc;

/// An object's content, shared between the store and handed-out objects.
#[derive(Debug, Clone)]
pub(crate) struct StoredObject {
    pub(crate) kind: NxKind,
    pub(crate) data: Arc<[u8]>,
}

/// One merge conflict: a path with up to three sides.
#[derive(Debug, Clone)]
pub(crate) struct Conflict {
    pub(crate) path: CString,
    pub(crate) ancestor: Option<CString>,
    pub(crate) ours: CString,
    pub(crate) theirs: CString,
}

/// Internal store state behind an `NxStore` pointer.
#[derive(Debug)]
pub(crate) struct Store {
    name: String,
    pub(crate) objects: BTreeMap<NxOid, StoredObject>,
    pub(crate) entries: BTreeMap<CString, CString>,
    pub(crate) conflicts: BTreeMap<CString, Conflict>,
    pub(crate) stats: Arc<StoreStats>,
}

impl Store {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: BTreeMap::new(),
            entries: BTreeMap::new(),
            conflicts: BTreeMap::new(),
            stats: Arc::new(StoreStats::new()),
        }
    }

    /// Stores `data` under its content address. Storing the same content
    /// twice yields the same id.
    pub(crate) fn put(&mut self, kind: NxKind, data: &[u8]) -> Result<NxOid, LibraryError> {
        let name = kind_name(kind)
            .ok_or_else(|| LibraryError::Invalid(format!("unknown object kind {kind}")))?;
        let id = NxOid::hash(name, data);
        self.objects.entry(id).or_insert_with(|| StoredObject {
            kind,
            data: Arc::from(data),
        });
        Ok(id)
    }

    pub(crate) fn get(&self, id: &NxOid, kind: NxKind) -> Result<&StoredObject, LibraryError> {
        match self.objects.get(id) {
            Some(object) if kind == crate::types::NX_KIND_ANY || object.kind == kind => Ok(object),
            _ => Err(LibraryError::ObjectNotFound(id.to_hex())),
        }
    }

    /// Sets an entry, returning true if it replaced an existing value.
    pub(crate) fn set_entry(&mut self, name: CString, value: CString) -> Result<bool, LibraryError> {
        if name.as_bytes().is_empty() {
            return Err(LibraryError::Invalid("entry name is empty".into()));
        }
        Ok(self.entries.insert(name, value).is_some())
    }

    pub(crate) fn entry(&self, name: &CStr) -> Result<&CString, LibraryError> {
        self.entries
            .get(name)
            .ok_or_else(|| LibraryError::EntryNotFound(name.to_string_lossy().into_owned()))
    }

    pub(crate) fn add_conflict(&mut self, conflict: Conflict) -> Result<(), LibraryError> {
        if self.conflicts.contains_key(&conflict.path) {
            return Err(LibraryError::ConflictExists(
                conflict.path.to_string_lossy().into_owned(),
            ));
        }
        self.conflicts.insert(conflict.path.clone(), conflict);
        Ok(())
    }
}

/// An entry owned by the caller. `entry` must stay the first field: the
/// public pointer is `*mut NxEntry`.
#[repr(C)]
pub(crate) struct OwnedEntry {
    entry: NxEntry,
    // Back `entry`'s pointers.
    _name: CString,
    _value: CString,
    stats: Arc<StoreStats>,
}

impl OwnedEntry {
    pub(crate) fn into_raw(name: CString, value: CString, stats: Arc<StoreStats>) -> *mut NxEntry {
        stats.record_entry_created();
        let owned = Box::new(Self {
            entry: NxEntry {
                name: name.as_ptr(),
                value: value.as_ptr(),
            },
            _name: name,
            _value: value,
            stats,
        });
        Box::into_raw(owned).cast()
    }
}

pub(crate) unsafe fn store_ref<'a>(store: *const NxStore) -> Option<&'a Store> {
    store.cast::<Store>().as_ref()
}

pub(crate) unsafe fn store_mut<'a>(store: *mut NxStore) -> Option<&'a mut Store> {
    store.cast::<Store>().as_mut()
}

pub(crate) unsafe fn c_string(ptr: *const c_char, what: &'static str) -> Result<CString, LibraryError> {
    if ptr.is_null() {
        return Err(LibraryError::NullPointer(what));
    }
    Ok(CStr::from_ptr(ptr).to_owned())
}

/// Opens a new, empty store.
///
/// Fails with `NX_EUNINIT` unless `nx_init` has been called.
///
/// # Safety
///
/// - `out` must be valid for writes
/// - `name` must be a null-terminated string
#[no_mangle]
pub unsafe extern "C" fn nx_store_open(out: *mut *mut NxStore, name: *const c_char) -> c_int {
    clear_last_error();

    if out.is_null() {
        return fail(LibraryError::NullPointer("out"));
    }
    if !is_initialized() {
        return fail(LibraryError::Uninitialized);
    }
    let name = match c_string(name, "name") {
        Ok(name) if !name.as_bytes().is_empty() => name,
        Ok(_) => return fail(LibraryError::Invalid("store name is empty".into())),
        Err(err) => return fail(err),
    };

    let store = Store::new(name.to_string_lossy());
    tracing::debug!(store = %store.name, "store opened");
    *out = Box::into_raw(Box::new(store)).cast();
    NX_OK
}

/// Releases a store.
///
/// Objects, entries and iterators obtained from the store stay valid.
///
/// # Safety
///
/// `store` must come from `nx_store_open` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn nx_store_free(store: *mut NxStore) {
    if store.is_null() {
        return;
    }
    let store = Box::from_raw(store.cast::<Store>());
    tracing::debug!(store = %store.name, "store freed");
}

/// Stores an object and writes its id to `out`.
///
/// # Safety
///
/// - `out` must be valid for writes
/// - `store` must be a live store
/// - `data` must be valid for `len` bytes (it may be null when `len` is 0)
#[no_mangle]
pub unsafe extern "C" fn nx_store_put(
    out: *mut NxOid,
    store: *mut NxStore,
    kind: NxKind,
    data: *const u8,
    len: usize,
) -> c_int {
    clear_last_error();

    if out.is_null() {
        return fail(LibraryError::NullPointer("out"));
    }
    let Some(store) = store_mut(store) else {
        return fail(LibraryError::NullPointer("store"));
    };
    let bytes: &[u8] = if len == 0 {
        &[]
    } else if data.is_null() {
        return fail(LibraryError::NullPointer("data"));
    } else {
        std::slice::from_raw_parts(data, len)
    };

    match store.put(kind, bytes) {
        Ok(id) => {
            *out = id;
            NX_OK
        }
        Err(err) => fail(err),
    }
}

/// Sets a name/value entry.
///
/// Returns 1 if an existing entry was replaced, 0 if it was added.
///
/// # Safety
///
/// `store` must be a live store; `name` and `value` must be null-terminated
/// strings.
#[no_mangle]
pub unsafe extern "C" fn nx_store_set_entry(
    store: *mut NxStore,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    clear_last_error();

    let Some(store) = store_mut(store) else {
        return fail(LibraryError::NullPointer("store"));
    };
    let result = c_string(name, "name")
        .and_then(|name| Ok((name, c_string(value, "value")?)))
        .and_then(|(name, value)| store.set_entry(name, value));

    match result {
        Ok(replaced) => c_int::from(replaced),
        Err(err) => fail(err),
    }
}

/// Records a conflict for `path`. `ancestor` may be null.
///
/// # Safety
///
/// `store` must be a live store; the string arguments must be null-terminated.
#[no_mangle]
pub unsafe extern "C" fn nx_store_add_conflict(
    store: *mut NxStore,
    path: *const c_char,
    ancestor: *const c_char,
    ours: *const c_char,
    theirs: *const c_char,
) -> c_int {
    clear_last_error();

    let Some(store) = store_mut(store) else {
        return fail(LibraryError::NullPointer("store"));
    };
    let conflict = (|| -> Result<Conflict, LibraryError> {
        Ok(Conflict {
            path: c_string(path, "path")?,
            ancestor: if ancestor.is_null() {
                None
            } else {
                Some(c_string(ancestor, "ancestor")?)
            },
            ours: c_string(ours, "ours")?,
            theirs: c_string(theirs, "theirs")?,
        })
    })();

    match conflict.and_then(|c| store.add_conflict(c)) {
        Ok(()) => NX_OK,
        Err(err) => fail(err),
    }
}

/// Looks up an entry and writes an owned copy to `out`.
///
/// Release the copy with `nx_entry_free`.
///
/// # Safety
///
/// `out` must be valid for writes, `store` must be a live store and `name` a
/// null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn nx_store_get_entry(
    out: *mut *mut NxEntry,
    store: *const NxStore,
    name: *const c_char,
) -> c_int {
    clear_last_error();

    if out.is_null() {
        return fail(LibraryError::NullPointer("out"));
    }
    let Some(store) = store_ref(store) else {
        return fail(LibraryError::NullPointer("store"));
    };
    if name.is_null() {
        return fail(LibraryError::NullPointer("name"));
    }

    let name = CStr::from_ptr(name);
    match store.entry(name) {
        Ok(value) => {
            *out = OwnedEntry::into_raw(name.to_owned(), value.clone(), Arc::clone(&store.stats));
            NX_OK
        }
        Err(err) => fail(err),
    }
}

/// Releases an entry returned by `nx_store_get_entry`.
///
/// Entries produced by iterators must not be passed here.
///
/// # Safety
///
/// `entry` must come from `nx_store_get_entry` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn nx_entry_free(entry: *mut NxEntry) {
    if entry.is_null() {
        return;
    }
    let owned = Box::from_raw(entry.cast::<OwnedEntry>());
    owned.stats.record_entry_freed();
}

/// Returns the number of objects in the store, or 0 for a null store.
///
/// # Safety
///
/// `store` must be null or a live store.
#[no_mangle]
pub unsafe extern "C" fn nx_store_object_count(store: *const NxStore) -> usize {
    store_ref(store).map_or(0, |s| s.objects.len())
}

/// Copies the store's instrumentation counters into `out`.
///
/// # Safety
///
/// `out` must be valid for writes and `store` must be a live store.
#[no_mangle]
pub unsafe extern "C" fn nx_store_stats(out: *mut NxStats, store: *const NxStore) -> c_int {
    clear_last_error();

    if out.is_null() {
        return fail(LibraryError::NullPointer("out"));
    }
    let Some(store) = store_ref(store) else {
        return fail(LibraryError::NullPointer("store"));
    };
    *out = store.stats.snapshot();
    NX_OK
}
