//! Iterator FFI functions.
//!
//! Every iterator snapshots its store when created and reports
//! `NX_ITEROVER` once exhausted. Advance functions that return objects hand
//! out owned objects; entry and conflict iterators lend pointers into their
//! own storage that stay valid until the next advance.

use crate::error::{clear_last_error, fail, LibraryError, NX_ITEROVER, NX_OK};
use crate::object::Object;
use crate::stats::StoreStats;
use crate::store::{store_ref, Conflict, StoredObject};
use crate::types::{
    NxConflictIterator, NxEntry, NxEntryIterator, NxIdWalk, NxKind, NxObject, NxObjectIterator,
    NxOid, NxStore,
};
use std::ffi::{c_int, CString};
use std::ptr;
use std::sync::Arc;

const EMPTY_ENTRY: NxEntry = NxEntry {
    name: ptr::null(),
    value: ptr::null(),
};

/// Internal state behind an `NxObjectIterator` pointer.
pub(crate) struct ObjectIter {
    objects: Vec<(NxOid, StoredObject)>,
    position: usize,
    fail_after: Option<usize>,
    stats: Arc<StoreStats>,
}

impl ObjectIter {
    fn advance(&mut self) -> Result<Option<&(NxOid, StoredObject)>, LibraryError> {
        if self.fail_after.is_some_and(|n| self.position >= n) {
            return Err(LibraryError::IteratorFault(self.position));
        }
        let item = self.objects.get(self.position);
        if item.is_some() {
            self.position += 1;
        }
        Ok(item)
    }
}

/// Internal state behind an `NxIdWalk` pointer.
pub(crate) struct IdWalk {
    ids: Vec<NxOid>,
    position: usize,
    stats: Arc<StoreStats>,
}

/// Internal state behind an `NxEntryIterator` pointer.
pub(crate) struct EntryIter {
    entries: Vec<(CString, CString)>,
    position: usize,
    current: NxEntry,
    stats: Arc<StoreStats>,
}

/// Internal state behind an `NxConflictIterator` pointer.
pub(crate) struct ConflictIter {
    conflicts: Vec<Conflict>,
    position: usize,
    views: [NxEntry; 3],
    stats: Arc<StoreStats>,
}

unsafe fn new_iterator<S, T>(
    out: *mut *mut T,
    store: *const NxStore,
    build: impl FnOnce(&crate::store::Store, Arc<StoreStats>) -> S,
) -> c_int {
    clear_last_error();

    if out.is_null() {
        return fail(LibraryError::NullPointer("out"));
    }
    let Some(store) = store_ref(store) else {
        return fail(LibraryError::NullPointer("store"));
    };

    store.stats.record_iterator_created();
    let state = build(store, Arc::clone(&store.stats));
    *out = Box::into_raw(Box::new(state)).cast();
    NX_OK
}

unsafe fn free_iterator<S>(it: *mut S, stats: impl FnOnce(&S) -> &Arc<StoreStats>) {
    if it.is_null() {
        return;
    }
    let state = Box::from_raw(it);
    stats(&state).record_iterator_freed();
}

// === Object iterator ===

/// Creates an iterator over a store's objects, in id order.
///
/// # Safety
///
/// `out` must be valid for writes and `store` must be a live store.
#[no_mangle]
pub unsafe extern "C" fn nx_object_iterator_new(
    out: *mut *mut NxObjectIterator,
    store: *const NxStore,
) -> c_int {
    new_iterator(out, store, |store, stats| ObjectIter {
        objects: store
            .objects
            .iter()
            .map(|(id, object)| (*id, object.clone()))
            .collect(),
        position: 0,
        fail_after: None,
        stats,
    })
}

/// Makes the iterator fail once `count` objects have been produced.
///
/// # Safety
///
/// `it` must be a live object iterator.
#[no_mangle]
pub unsafe extern "C" fn nx_object_iterator_fail_after(
    it: *mut NxObjectIterator,
    count: usize,
) -> c_int {
    clear_last_error();

    match it.cast::<ObjectIter>().as_mut() {
        Some(state) => {
            state.fail_after = Some(count);
            NX_OK
        }
        None => fail(LibraryError::NullPointer("it")),
    }
}

/// Advances to the next object and writes an owned object to `out`.
///
/// Returns `NX_ITEROVER` when there are no more objects.
///
/// # Safety
///
/// `out` must be valid for writes and `it` must be a live object iterator.
#[no_mangle]
pub unsafe extern "C" fn nx_object_next(out: *mut *mut NxObject, it: *mut NxObjectIterator) -> c_int {
    nx_object_next_tagged(out, ptr::null_mut(), it)
}

/// Like `nx_object_next`, also writing the object's kind to `kind` when it
/// is not null.
///
/// # Safety
///
/// `out` must be valid for writes, `kind` null or valid for writes, and `it`
/// a live object iterator.
#[no_mangle]
pub unsafe extern "C" fn nx_object_next_tagged(
    out: *mut *mut NxObject,
    kind: *mut NxKind,
    it: *mut NxObjectIterator,
) -> c_int {
    clear_last_error();

    if out.is_null() {
        return fail(LibraryError::NullPointer("out"));
    }
    let Some(state) = it.cast::<ObjectIter>().as_mut() else {
        return fail(LibraryError::NullPointer("it"));
    };

    let stats = Arc::clone(&state.stats);
    match state.advance() {
        Ok(Some((id, object))) => {
            if !kind.is_null() {
                *kind = object.kind;
            }
            *out = Object::into_raw(*id, object, &stats);
            NX_OK
        }
        Ok(None) => NX_ITEROVER,
        Err(err) => fail(err),
    }
}

/// Releases an object iterator. Objects it produced stay valid.
///
/// # Safety
///
/// `it` must come from `nx_object_iterator_new` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn nx_object_iterator_free(it: *mut NxObjectIterator) {
    free_iterator(it.cast::<ObjectIter>(), |s| &s.stats);
}

// === Id walk ===

/// Creates a walk over a store's object ids, in id order.
///
/// # Safety
///
/// `out` must be valid for writes and `store` must be a live store.
#[no_mangle]
pub unsafe extern "C" fn nx_id_walk_new(out: *mut *mut NxIdWalk, store: *const NxStore) -> c_int {
    new_iterator(out, store, |store, stats| IdWalk {
        ids: store.objects.keys().copied().collect(),
        position: 0,
        stats,
    })
}

/// Copies the next id into `out`.
///
/// # Safety
///
/// `out` must be valid for writes and `walk` must be a live walk.
#[no_mangle]
pub unsafe extern "C" fn nx_id_walk_next(out: *mut NxOid, walk: *mut NxIdWalk) -> c_int {
    clear_last_error();

    if out.is_null() {
        return fail(LibraryError::NullPointer("out"));
    }
    let Some(state) = walk.cast::<IdWalk>().as_mut() else {
        return fail(LibraryError::NullPointer("walk"));
    };

    match state.ids.get(state.position) {
        Some(id) => {
            *out = *id;
            state.position += 1;
            NX_OK
        }
        None => NX_ITEROVER,
    }
}

/// Releases an id walk.
///
/// # Safety
///
/// `walk` must come from `nx_id_walk_new` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn nx_id_walk_free(walk: *mut NxIdWalk) {
    free_iterator(walk.cast::<IdWalk>(), |s| &s.stats);
}

// === Entry iterator ===

/// Creates an iterator over a store's entries, in name order.
///
/// # Safety
///
/// `out` must be valid for writes and `store` must be a live store.
#[no_mangle]
pub unsafe extern "C" fn nx_entry_iterator_new(
    out: *mut *mut NxEntryIterator,
    store: *const NxStore,
) -> c_int {
    new_iterator(out, store, |store, stats| EntryIter {
        entries: store
            .entries
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        position: 0,
        current: EMPTY_ENTRY,
        stats,
    })
}

/// Points `out` at the next entry.
///
/// The entry belongs to the iterator and is valid until the next call or
/// until the iterator is freed. It must not be passed to `nx_entry_free`.
///
/// # Safety
///
/// `out` must be valid for writes and `it` must be a live entry iterator.
#[no_mangle]
pub unsafe extern "C" fn nx_entry_next(out: *mut *mut NxEntry, it: *mut NxEntryIterator) -> c_int {
    clear_last_error();

    if out.is_null() {
        return fail(LibraryError::NullPointer("out"));
    }
    let Some(state) = it.cast::<EntryIter>().as_mut() else {
        return fail(LibraryError::NullPointer("it"));
    };

    let Some((name, value)) = state.entries.get(state.position) else {
        return NX_ITEROVER;
    };
    state.current = NxEntry {
        name: name.as_ptr(),
        value: value.as_ptr(),
    };
    state.position += 1;
    *out = ptr::addr_of_mut!(state.current);
    NX_OK
}

/// Releases an entry iterator and every entry it lent out.
///
/// # Safety
///
/// `it` must come from `nx_entry_iterator_new` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn nx_entry_iterator_free(it: *mut NxEntryIterator) {
    free_iterator(it.cast::<EntryIter>(), |s| &s.stats);
}

// === Conflict iterator ===

/// Creates an iterator over a store's conflicts, in path order.
///
/// # Safety
///
/// `out` must be valid for writes and `store` must be a live store.
#[no_mangle]
pub unsafe extern "C" fn nx_conflict_iterator_new(
    out: *mut *mut NxConflictIterator,
    store: *const NxStore,
) -> c_int {
    new_iterator(out, store, |store, stats| ConflictIter {
        conflicts: store.conflicts.values().cloned().collect(),
        position: 0,
        views: [EMPTY_ENTRY; 3],
        stats,
    })
}

/// Points `ancestor`, `ours` and `theirs` at the next conflict's sides.
///
/// Each side is an entry whose name is the conflicting path. `ancestor` is
/// set to null when the conflict has no common ancestor. The entries are
/// valid until the next call.
///
/// # Safety
///
/// The three outputs must be valid for writes and `it` must be a live
/// conflict iterator.
#[no_mangle]
pub unsafe extern "C" fn nx_conflict_next(
    ancestor: *mut *const NxEntry,
    ours: *mut *const NxEntry,
    theirs: *mut *const NxEntry,
    it: *mut NxConflictIterator,
) -> c_int {
    clear_last_error();

    if ancestor.is_null() || ours.is_null() || theirs.is_null() {
        return fail(LibraryError::NullPointer("ancestor, ours or theirs"));
    }
    let Some(state) = it.cast::<ConflictIter>().as_mut() else {
        return fail(LibraryError::NullPointer("it"));
    };

    let Some(conflict) = state.conflicts.get(state.position) else {
        return NX_ITEROVER;
    };
    let side = |value: &CString| NxEntry {
        name: conflict.path.as_ptr(),
        value: value.as_ptr(),
    };
    state.views = [
        conflict.ancestor.as_ref().map_or(EMPTY_ENTRY, side),
        side(&conflict.ours),
        side(&conflict.theirs),
    ];
    state.position += 1;

    *ancestor = if conflict.ancestor.is_some() {
        ptr::addr_of!(state.views[0])
    } else {
        ptr::null()
    };
    *ours = ptr::addr_of!(state.views[1]);
    *theirs = ptr::addr_of!(state.views[2]);
    NX_OK
}

/// Releases a conflict iterator.
///
/// # Safety
///
/// `it` must come from `nx_conflict_iterator_new` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn nx_conflict_iterator_free(it: *mut NxConflictIterator) {
    free_iterator(it.cast::<ConflictIter>(), |s| &s.stats);
}
