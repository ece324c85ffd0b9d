//! Status codes, error classes and the last-error slot.

use std::cell::RefCell;
use std::ffi::{c_char, c_int, CString};
use std::ptr;
use thiserror::Error;

/// Success.
pub const NX_OK: c_int = 0;
/// Generic error.
pub const NX_ERROR: c_int = -1;
/// Requested object or entry does not exist.
pub const NX_ENOTFOUND: c_int = -3;
/// Invalid argument.
pub const NX_EINVALID: c_int = -4;
/// Entry already exists.
pub const NX_EEXISTS: c_int = -5;
/// The library has not been initialized.
pub const NX_EUNINIT: c_int = -6;
/// An iterator has no more items.
pub const NX_ITEROVER: c_int = -31;

/// No error.
pub const NX_CLASS_NONE: c_int = 0;
/// Bad arguments.
pub const NX_CLASS_INVALID: c_int = 1;
/// Store-level failure.
pub const NX_CLASS_STORE: c_int = 2;
/// Object-level failure.
pub const NX_CLASS_OBJECT: c_int = 3;
/// Iterator failure.
pub const NX_CLASS_ITERATOR: c_int = 4;
/// Global initialization failure.
pub const NX_CLASS_INIT: c_int = 5;

/// The last error recorded on the calling thread.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NxError {
    /// Error class (`NX_CLASS_*`).
    pub klass: c_int,
    /// Null-terminated message, owned by the library.
    pub message: *const c_char,
}

/// Failures raised inside the library.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// `nx_init` has not been called.
    #[error("library is not initialized")]
    Uninitialized,

    /// `nx_shutdown` called more often than `nx_init`.
    #[error("shutdown without matching init")]
    UnbalancedShutdown,

    /// A required pointer argument was null.
    #[error("null pointer argument: {0}")]
    NullPointer(&'static str),

    /// An argument was malformed.
    #[error("invalid argument: {0}")]
    Invalid(String),

    /// An object does not exist.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// An entry does not exist.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// A conflict is already recorded for a path.
    #[error("conflict already recorded for {0}")]
    ConflictExists(String),

    /// An iterator was told to fail.
    #[error("iterator failed after {0} items")]
    IteratorFault(usize),
}

impl LibraryError {
    /// Returns the status code reported for this error.
    pub fn code(&self) -> c_int {
        match self {
            Self::Uninitialized | Self::UnbalancedShutdown => NX_EUNINIT,
            Self::NullPointer(_) | Self::Invalid(_) => NX_EINVALID,
            Self::ObjectNotFound(_) | Self::EntryNotFound(_) => NX_ENOTFOUND,
            Self::ConflictExists(_) => NX_EEXISTS,
            Self::IteratorFault(_) => NX_ERROR,
        }
    }

    /// Returns the error class reported for this error.
    pub fn class(&self) -> c_int {
        match self {
            Self::Uninitialized | Self::UnbalancedShutdown => NX_CLASS_INIT,
            Self::NullPointer(_) | Self::Invalid(_) => NX_CLASS_INVALID,
            Self::ObjectNotFound(_) => NX_CLASS_OBJECT,
            Self::EntryNotFound(_) | Self::ConflictExists(_) => NX_CLASS_STORE,
            Self::IteratorFault(_) => NX_CLASS_ITERATOR,
        }
    }
}

struct Slot {
    record: NxError,
    // Backs `record.message`.
    _message: CString,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<Slot>> = const { RefCell::new(None) };
}

/// Records `err` as the calling thread's last error and returns its code.
pub(crate) fn fail(err: LibraryError) -> c_int {
    set_last_error(err.class(), err.to_string());
    err.code()
}

/// Records a last error.
pub fn set_last_error(klass: c_int, message: impl Into<String>) {
    let message = CString::new(message.into())
        .unwrap_or_else(|_| CString::from(c"error message contained a nul byte"));
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(Slot {
            record: NxError {
                klass,
                message: message.as_ptr(),
            },
            _message: message,
        });
    });
}

/// Clears the last error.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Returns the calling thread's last error, or null if none is recorded.
///
/// The record is valid until the next call into the library on this thread.
#[no_mangle]
pub extern "C" fn nx_error_last() -> *const NxError {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(slot) => ptr::addr_of!(slot.record),
        None => ptr::null(),
    })
}

/// Clears the calling thread's last error.
#[no_mangle]
pub extern "C" fn nx_error_clear() {
    clear_last_error();
}
