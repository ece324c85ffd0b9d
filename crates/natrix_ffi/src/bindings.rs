//! Registration with `natrix_core`.
//!
//! Lets the library's C ABI be driven through `Handle`, `Session` and the
//! iterator adapters:
//!
//! ```rust,ignore
//! let session = Session::<Natrix>::acquire()?;
//! let mut store: Handle<NxStore> =
//!     session.alloc(|out| unsafe { nx_store_open(out, c"objects".as_ptr()) })?;
//! let id: NxOid = store.call_fixed_mut(|out, s| unsafe { nx_store_put(out, s, NX_KIND_BLOB, data.as_ptr(), data.len()) })?;
//! ```

use crate::error::{nx_error_last, NX_CLASS_NONE, NX_ITEROVER};
use crate::iterator::{
    nx_conflict_iterator_free, nx_conflict_next, nx_entry_iterator_free, nx_entry_next,
    nx_id_walk_free, nx_id_walk_next, nx_object_iterator_free, nx_object_next,
    nx_object_next_tagged,
};
use crate::library::{nx_init, nx_shutdown};
use crate::object::{nx_blob_free, nx_object_dup, nx_object_free};
use crate::store::{nx_entry_free, nx_store_free};
use crate::types::{
    NxBlob, NxConflictIterator, NxEntry, NxEntryIterator, NxIdWalk, NxKind, NxObject,
    NxObjectIterator, NxOid, NxStore,
};
use natrix_core::{
    BorrowedEntry, BorrowedStruct, ByValue, Iterable, LastError, Library, LibraryConfig, Paired,
    SessionCounter, SingleOwned,
};
use std::ffi::{c_int, CStr};

/// The natrix reference library.
#[derive(Debug)]
pub struct Natrix;

impl Library for Natrix {
    const CONFIG: LibraryConfig = LibraryConfig::new()
        .name("natrix")
        .iter_done(NX_ITEROVER)
        .fallback_message("natrix reported no error");

    fn last_error() -> Option<LastError> {
        let err = nx_error_last();
        // SAFETY: a non-null record and its message live until the next call
        // into the library on this thread.
        unsafe {
            if err.is_null() || (*err).klass == NX_CLASS_NONE {
                return None;
            }
            let message = CStr::from_ptr((*err).message).to_string_lossy().into_owned();
            Some(LastError::new((*err).klass, message))
        }
    }

    unsafe fn init() -> c_int {
        nx_init()
    }

    unsafe fn shutdown() -> c_int {
        nx_shutdown()
    }

    fn sessions() -> &'static SessionCounter {
        static SESSIONS: SessionCounter = SessionCounter::new();
        &SESSIONS
    }
}

natrix_core::resource!(Natrix;
    NxStore => nx_store_free,
    NxObject => nx_object_free,
    NxBlob => nx_blob_free,
    NxEntry => nx_entry_free,
    NxObjectIterator => nx_object_iterator_free,
    NxIdWalk => nx_id_walk_free,
    NxEntryIterator => nx_entry_iterator_free,
    NxConflictIterator => nx_conflict_iterator_free,
);

natrix_core::duplicate!(NxObject => |out, src| nx_object_dup(out, src));

impl Iterable for NxObjectIterator {
    type Protocol = SingleOwned<NxObjectIterator, NxObject>;

    fn protocol() -> Self::Protocol {
        SingleOwned::new(nx_object_next)
    }
}

impl Iterable for NxIdWalk {
    type Protocol = ByValue<NxIdWalk, NxOid>;

    fn protocol() -> Self::Protocol {
        ByValue::new(nx_id_walk_next)
    }
}

impl Iterable for NxEntryIterator {
    type Protocol = BorrowedEntry<NxEntryIterator, NxEntry>;

    fn protocol() -> Self::Protocol {
        BorrowedEntry::new(nx_entry_next)
    }
}

impl Iterable for NxConflictIterator {
    type Protocol = BorrowedStruct<NxConflictIterator, NxEntry>;

    fn protocol() -> Self::Protocol {
        BorrowedStruct::three(nx_conflict_next)
    }
}

/// Objects paired with their kind.
pub fn tagged_objects() -> Paired<NxObjectIterator, NxObject, NxKind> {
    Paired::new(nx_object_next_tagged)
}
