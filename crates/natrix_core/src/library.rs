//! Native library registration.
//!
//! A wrapped C library is described once, by implementing [`Library`] on a
//! marker type. Resource kinds then name their library through
//! [`Resource::Library`](crate::Resource::Library), which is how the call
//! dispatcher and the iterator adapter know where to read the last error and
//! which status means "iteration finished".

use crate::config::LibraryConfig;
use parking_lot::Mutex;
use std::ffi::c_int;

/// The contents of a library's last-error slot, copied out of native memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    /// Library-assigned error class.
    pub class: c_int,
    /// Human-readable message.
    pub message: String,
}

impl LastError {
    /// Creates a new last-error record.
    pub fn new(class: c_int, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}

/// Reference count of live [`Session`](crate::Session) guards for one library.
///
/// Declared as a `static` by each [`Library`] implementation.
#[derive(Debug)]
pub struct SessionCounter {
    live: Mutex<usize>,
}

impl SessionCounter {
    /// Creates a counter with no live sessions.
    pub const fn new() -> Self {
        Self {
            live: parking_lot::const_mutex(0),
        }
    }

    /// Returns the number of live sessions.
    pub fn get(&self) -> usize {
        *self.live.lock()
    }

    pub(crate) fn lock(&self) -> parking_lot::MutexGuard<'_, usize> {
        self.live.lock()
    }
}

impl Default for SessionCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// A native library wrapped by natrix.
///
/// # Example
///
/// ```rust,ignore
/// struct Git2;
///
/// impl Library for Git2 {
///     const CONFIG: LibraryConfig = LibraryConfig::new().name("git2").iter_done(-31);
///
///     fn last_error() -> Option<LastError> { /* read git_error_last() */ }
///     unsafe fn init() -> c_int { git_libgit2_init() }
///     unsafe fn shutdown() -> c_int { git_libgit2_shutdown() }
///
///     fn sessions() -> &'static SessionCounter {
///         static SESSIONS: SessionCounter = SessionCounter::new();
///         &SESSIONS
///     }
/// }
/// ```
pub trait Library: 'static {
    /// Static description of the library's conventions.
    const CONFIG: LibraryConfig;

    /// Reads the library's last-error slot.
    ///
    /// Called immediately after a failing call, before any other call into
    /// the library can overwrite the slot. Returns `None` if the slot is empty.
    fn last_error() -> Option<LastError>;

    /// Performs global library initialization.
    ///
    /// # Safety
    ///
    /// Only called by [`Session`](crate::Session), under the session lock.
    unsafe fn init() -> c_int;

    /// Performs global library teardown.
    ///
    /// # Safety
    ///
    /// Only called by [`Session`](crate::Session), once per successful `init`.
    unsafe fn shutdown() -> c_int;

    /// The process-wide session counter for this library.
    fn sessions() -> &'static SessionCounter;
}
