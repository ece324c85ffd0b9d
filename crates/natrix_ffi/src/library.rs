//! Global initialization.

use crate::error::{clear_last_error, fail, LibraryError, NX_OK};
use crate::types::NxLibraryStats;
use parking_lot::Mutex;
use std::ffi::c_int;

struct LibraryState {
    depth: c_int,
    initializations: u64,
    shutdowns: u64,
}

static STATE: Mutex<LibraryState> = parking_lot::const_mutex(LibraryState {
    depth: 0,
    initializations: 0,
    shutdowns: 0,
});

/// Returns true while at least one `nx_init` is outstanding.
pub(crate) fn is_initialized() -> bool {
    STATE.lock().depth > 0
}

/// Initializes the library.
///
/// Calls nest; each must be matched by `nx_shutdown`. Returns the new
/// initialization depth.
#[no_mangle]
pub extern "C" fn nx_init() -> c_int {
    clear_last_error();
    let mut state = STATE.lock();
    state.depth += 1;
    if state.depth == 1 {
        state.initializations += 1;
        tracing::debug!("natrix library initialized");
    }
    state.depth
}

/// Undoes one `nx_init`.
///
/// Returns the remaining depth, or `NX_EUNINIT` if the library is not
/// initialized.
#[no_mangle]
pub extern "C" fn nx_shutdown() -> c_int {
    clear_last_error();
    let mut state = STATE.lock();
    if state.depth == 0 {
        return fail(LibraryError::UnbalancedShutdown);
    }
    state.depth -= 1;
    if state.depth == 0 {
        state.shutdowns += 1;
        tracing::debug!("natrix library shut down");
    }
    state.depth
}

/// Returns the current initialization depth.
#[no_mangle]
pub extern "C" fn nx_init_depth() -> c_int {
    STATE.lock().depth
}

/// Copies the global counters into `out`.
///
/// # Safety
///
/// `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn nx_library_stats(out: *mut NxLibraryStats) -> c_int {
    clear_last_error();
    if out.is_null() {
        return fail(LibraryError::NullPointer("out"));
    }

    let state = STATE.lock();
    *out = NxLibraryStats {
        depth: state.depth,
        initializations: state.initializations,
        shutdowns: state.shutdowns,
    };
    NX_OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NX_EUNINIT;

    fn stats() -> NxLibraryStats {
        let mut out = NxLibraryStats::default();
        assert_eq!(unsafe { nx_library_stats(&mut out) }, NX_OK);
        out
    }

    #[test]
    fn init_nests() {
        let _guard = crate::test_lock();
        let before = stats();
        assert_eq!(before.depth, 0);

        assert_eq!(nx_init(), 1);
        assert_eq!(nx_init(), 2);
        assert!(is_initialized());
        assert_eq!(nx_shutdown(), 1);
        assert!(is_initialized());
        assert_eq!(nx_shutdown(), 0);
        assert!(!is_initialized());

        let after = stats();
        assert_eq!(after.initializations, before.initializations + 1);
        assert_eq!(after.shutdowns, before.shutdowns + 1);
    }

    #[test]
    fn unbalanced_shutdown_is_an_error() {
        let _guard = crate::test_lock();
        assert_eq!(nx_init_depth(), 0);
        assert_eq!(nx_shutdown(), NX_EUNINIT);
        assert!(!crate::error::nx_error_last().is_null());
        assert_eq!(nx_init_depth(), 0);
    }

    #[test]
    fn stats_require_output() {
        assert!(unsafe { nx_library_stats(std::ptr::null_mut()) } < 0);
    }
}
