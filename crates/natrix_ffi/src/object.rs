//! Objects handed out by stores.

use crate::error::{clear_last_error, fail, LibraryError, NX_OK};
use crate::stats::StoreStats;
use crate::store::{store_ref, StoredObject};
use crate::types::{NxBlob, NxKind, NxObject, NxOid, NxStore, NX_KIND_BLOB};
use std::ffi::c_int;
use std::ptr;
use std::sync::Arc;

/// Internal object state behind an `NxObject` pointer.
#[derive(Debug)]
pub(crate) struct Object {
    pub(crate) id: NxOid,
    pub(crate) kind: NxKind,
    pub(crate) data: Arc<[u8]>,
    stats: Arc<StoreStats>,
}

impl Object {
    /// Hands out a new object, counting it as created.
    pub(crate) fn into_raw(id: NxOid, stored: &StoredObject, stats: &Arc<StoreStats>) -> *mut NxObject {
        stats.record_object_created();
        Box::into_raw(Box::new(Self {
            id,
            kind: stored.kind,
            data: Arc::clone(&stored.data),
            stats: Arc::clone(stats),
        }))
        .cast()
    }
}

unsafe fn object_ref<'a>(object: *const NxObject) -> Option<&'a Object> {
    object.cast::<Object>().as_ref()
}

/// Looks up an object by id.
///
/// `kind` may be `NX_KIND_ANY`; otherwise the object must have that kind.
///
/// # Safety
///
/// - `out` must be valid for writes
/// - `store` must be a live store
/// - `id` must point to a valid id
#[no_mangle]
pub unsafe extern "C" fn nx_object_lookup(
    out: *mut *mut NxObject,
    store: *const NxStore,
    id: *const NxOid,
    kind: NxKind,
) -> c_int {
    clear_last_error();

    if out.is_null() || id.is_null() {
        return fail(LibraryError::NullPointer("out or id"));
    }
    let Some(store) = store_ref(store) else {
        return fail(LibraryError::NullPointer("store"));
    };

    match store.get(&*id, kind) {
        Ok(stored) => {
            *out = Object::into_raw(*id, stored, &store.stats);
            NX_OK
        }
        Err(err) => fail(err),
    }
}

/// Creates an independent copy of an object.
///
/// # Safety
///
/// `out` must be valid for writes and `src` must be a live object.
#[no_mangle]
pub unsafe extern "C" fn nx_object_dup(out: *mut *mut NxObject, src: *const NxObject) -> c_int {
    clear_last_error();

    if out.is_null() {
        return fail(LibraryError::NullPointer("out"));
    }
    let Some(src) = object_ref(src) else {
        return fail(LibraryError::NullPointer("src"));
    };

    src.stats.record_object_duplicated();
    let copy = Object {
        id: src.id,
        kind: src.kind,
        data: Arc::clone(&src.data),
        stats: Arc::clone(&src.stats),
    };
    *out = Box::into_raw(Box::new(copy)).cast();
    NX_OK
}

/// Releases an object.
///
/// # Safety
///
/// `object` must come from this library and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn nx_object_free(object: *mut NxObject) {
    if object.is_null() {
        return;
    }
    let object = Box::from_raw(object.cast::<Object>());
    object.stats.record_object_freed();
}

/// Returns the object's id.
///
/// # Safety
///
/// `object` must be a live object. The id lives as long as the object.
#[no_mangle]
pub unsafe extern "C" fn nx_object_id(object: *const NxObject) -> *const NxOid {
    object_ref(object).map_or(ptr::null(), |o| ptr::addr_of!(o.id))
}

/// Returns the object's kind.
///
/// # Safety
///
/// `object` must be a live object.
#[no_mangle]
pub unsafe extern "C" fn nx_object_kind(object: *const NxObject) -> NxKind {
    object_ref(object).map_or(crate::types::NX_KIND_ANY, |o| o.kind)
}

/// Returns the size of the object's data.
///
/// # Safety
///
/// `object` must be a live object.
#[no_mangle]
pub unsafe extern "C" fn nx_object_size(object: *const NxObject) -> usize {
    object_ref(object).map_or(0, |o| o.data.len())
}

/// Returns the object's data, valid for `nx_object_size` bytes.
///
/// # Safety
///
/// `object` must be a live object.
#[no_mangle]
pub unsafe extern "C" fn nx_object_data(object: *const NxObject) -> *const u8 {
    object_ref(object).map_or(ptr::null(), |o| o.data.as_ptr())
}

/// Returns the size of a blob's content.
///
/// A blob is an object of kind `NX_KIND_BLOB` viewed through the blob type;
/// any other object reports 0.
///
/// # Safety
///
/// `blob` must be a live object.
#[no_mangle]
pub unsafe extern "C" fn nx_blob_size(blob: *const NxBlob) -> usize {
    match object_ref(blob.cast()) {
        Some(o) if o.kind == NX_KIND_BLOB => o.data.len(),
        _ => 0,
    }
}

/// Releases a blob.
///
/// # Safety
///
/// Same as `nx_object_free`.
#[no_mangle]
pub unsafe extern "C" fn nx_blob_free(blob: *mut NxBlob) {
    nx_object_free(blob.cast());
}
