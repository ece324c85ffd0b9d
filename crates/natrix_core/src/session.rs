//! Reference-counted global library initialization.

use crate::dispatch;
use crate::error::{check, NativeError, NativeResult};
use crate::handle::{Handle, Resource};
use crate::library::Library;
use std::ffi::c_int;
use std::fmt;
use std::marker::PhantomData;

/// A guard that keeps library `L` globally initialized.
///
/// The first live session calls `L::init()`; the last one to drop calls
/// `L::shutdown()`. Sessions may be acquired from any thread.
///
/// ```rust,ignore
/// let session = Session::<Git2>::acquire()?;
/// let repo: Handle<git_repository> =
///     session.alloc(|out| unsafe { git_repository_open(out, path.as_ptr()) })?;
/// ```
#[must_use = "the library is shut down again when the session is dropped"]
pub struct Session<L: Library> {
    _library: PhantomData<fn() -> L>,
}

impl<L: Library> Session<L> {
    /// Acquires a session, initializing the library if none is live.
    pub fn acquire() -> NativeResult<Self> {
        let mut live = L::sessions().lock();
        if *live == 0 {
            // SAFETY: called under the session lock with no live session.
            let status = unsafe { L::init() };
            check::<L>(status).map_err(NativeError::session)?;
            tracing::debug!(library = L::CONFIG.name, status, "native library initialized");
        }
        *live += 1;
        Ok(Self {
            _library: PhantomData,
        })
    }

    /// Returns the number of live sessions for `L`.
    pub fn active() -> usize {
        L::sessions().get()
    }

    /// Calls an allocating function that has no receiver.
    pub fn alloc<U>(&self, f: impl FnOnce(*mut *mut U) -> c_int) -> NativeResult<Handle<U>>
    where
        U: Resource<Library = L>,
    {
        dispatch::alloc(f)
    }

    /// Calls a fixed-output function that has no receiver.
    pub fn fixed<V: Copy>(&self, f: impl FnOnce(*mut V) -> c_int) -> NativeResult<V> {
        dispatch::fixed::<L, V>(f)
    }

    /// Calls a status-only function that has no receiver.
    pub fn status(&self, f: impl FnOnce() -> c_int) -> NativeResult<c_int> {
        dispatch::status::<L>(f)
    }
}

impl<L: Library> Clone for Session<L> {
    fn clone(&self) -> Self {
        // A live session exists, so this only increments the count.
        *L::sessions().lock() += 1;
        Self {
            _library: PhantomData,
        }
    }
}

impl<L: Library> Drop for Session<L> {
    fn drop(&mut self) {
        let mut live = L::sessions().lock();
        *live = live.saturating_sub(1);
        if *live == 0 {
            // SAFETY: this was the last live session, and init succeeded for it.
            let status = unsafe { L::shutdown() };
            if status < 0 {
                tracing::warn!(library = L::CONFIG.name, status, "native library shutdown failed");
            } else {
                tracing::debug!(library = L::CONFIG.name, "native library shut down");
            }
        }
    }
}

impl<L: Library> fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("library", &L::CONFIG.name)
            .field("active", &Self::active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LibraryConfig;
    use crate::library::{LastError, SessionCounter};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    // Each test gets its own library so the process-wide counters are not
    // shared between parallel tests.
    macro_rules! test_library {
        ($name:ident) => {
            struct $name;

            impl $name {
                fn events() -> &'static Mutex<Vec<&'static str>> {
                    static EVENTS: Mutex<Vec<&'static str>> = parking_lot::const_mutex(Vec::new());
                    &EVENTS
                }

                fn init_status() -> &'static AtomicI32 {
                    static STATUS: AtomicI32 = AtomicI32::new(0);
                    &STATUS
                }

                fn log() -> Vec<&'static str> {
                    Self::events().lock().clone()
                }
            }

            impl Library for $name {
                const CONFIG: LibraryConfig = LibraryConfig::new().name(stringify!($name));

                fn last_error() -> Option<LastError> {
                    Some(LastError::new(9, "init refused"))
                }

                unsafe fn init() -> c_int {
                    Self::events().lock().push("init");
                    Self::init_status().load(Ordering::SeqCst)
                }

                unsafe fn shutdown() -> c_int {
                    Self::events().lock().push("shutdown");
                    0
                }

                fn sessions() -> &'static SessionCounter {
                    static SESSIONS: SessionCounter = SessionCounter::new();
                    &SESSIONS
                }
            }
        };
    }

    #[test]
    fn nested_sessions_init_and_shutdown_once() {
        test_library!(Nested);

        let outer = Session::<Nested>::acquire().unwrap();
        assert_eq!(Session::<Nested>::active(), 1);
        let inner = Session::<Nested>::acquire().unwrap();
        assert_eq!(Session::<Nested>::active(), 2);
        assert_eq!(Nested::log(), vec!["init"]);

        drop(inner);
        assert_eq!(Nested::log(), vec!["init"]);
        drop(outer);
        assert_eq!(Session::<Nested>::active(), 0);
        assert_eq!(Nested::log(), vec!["init", "shutdown"]);
    }

    #[test]
    fn release_order_does_not_matter() {
        test_library!(Reordered);

        let first = Session::<Reordered>::acquire().unwrap();
        let second = Session::<Reordered>::acquire().unwrap();
        drop(first);
        assert_eq!(Reordered::log(), vec!["init"]);
        drop(second);
        assert_eq!(Reordered::log(), vec!["init", "shutdown"]);
    }

    #[test]
    fn reacquire_after_shutdown_reinitializes() {
        test_library!(Cycled);

        drop(Session::<Cycled>::acquire().unwrap());
        drop(Session::<Cycled>::acquire().unwrap());
        assert_eq!(Cycled::log(), vec!["init", "shutdown", "init", "shutdown"]);
    }

    #[test]
    fn failed_init_is_a_session_error() {
        test_library!(Refusing);
        Refusing::init_status().store(-3, Ordering::SeqCst);

        let err = Session::<Refusing>::acquire().unwrap_err();
        assert!(matches!(err, NativeError::Session(_)));
        assert_eq!(err.code(), -3);
        assert_eq!(err.message(), "init refused");
        assert_eq!(Session::<Refusing>::active(), 0);
        assert_eq!(Refusing::log(), vec!["init"]);

        // A later successful init starts counting from zero.
        Refusing::init_status().store(0, Ordering::SeqCst);
        let session = Session::<Refusing>::acquire().unwrap();
        assert_eq!(Session::<Refusing>::active(), 1);
        drop(session);
        assert_eq!(Refusing::log(), vec!["init", "init", "shutdown"]);
    }

    #[test]
    fn clone_is_a_nested_acquire() {
        test_library!(Cloned);

        let session = Session::<Cloned>::acquire().unwrap();
        let copy = session.clone();
        assert_eq!(Session::<Cloned>::active(), 2);
        drop(session);
        assert_eq!(Cloned::log(), vec!["init"]);
        drop(copy);
        assert_eq!(Cloned::log(), vec!["init", "shutdown"]);
    }

    #[test]
    fn sessions_cross_threads() {
        test_library!(Threaded);

        let session = Session::<Threaded>::acquire().unwrap();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let nested = Session::<Threaded>::acquire().unwrap();
                    drop(nested);
                });
            }
        });
        assert_eq!(Threaded::log(), vec!["init"]);
        drop(session);
        assert_eq!(Threaded::log(), vec!["init", "shutdown"]);
    }

    #[test]
    fn unbound_calls_through_session() {
        test_library!(Unbound);

        let session = Session::<Unbound>::acquire().unwrap();
        let value = session
            .fixed(|out: *mut u32| {
                unsafe { *out = 5 };
                0
            })
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(session.status(|| 2).unwrap(), 2);
        assert!(format!("{session:?}").contains("Unbound"));
        assert_eq!(Unbound::log(), vec!["init"]);

        drop(session);
        assert_eq!(Unbound::log(), vec!["init", "shutdown"]);
    }
}
