//! Session lifetime tests against the reference library.
//!
//! Every test holds `session_lock()` because the library's init depth is
//! process-wide.

use natrix_core::{dispatch, Handle, Session};
use natrix_ffi::{
    nx_init_depth, nx_library_stats, nx_store_open, Natrix, NxLibraryStats, NxStore,
    NX_CLASS_INIT, NX_EUNINIT,
};
use natrix_testkit::{init_tracing, session_lock};
use std::thread;

fn library_stats() -> NxLibraryStats {
    dispatch::fixed::<Natrix, _>(|out| unsafe { nx_library_stats(out) }).unwrap()
}

#[test]
fn nested_sessions_initialize_once() {
    let _lock = session_lock();
    init_tracing();
    let before = library_stats();
    assert_eq!(before.depth, 0);

    let outer = Session::<Natrix>::acquire().unwrap();
    let inner = Session::<Natrix>::acquire().unwrap();
    assert_eq!(Session::<Natrix>::active(), 2);
    assert_eq!(nx_init_depth(), 1);

    drop(outer);
    assert_eq!(nx_init_depth(), 1);
    drop(inner);
    assert_eq!(nx_init_depth(), 0);

    let after = library_stats();
    assert_eq!(after.initializations, before.initializations + 1);
    assert_eq!(after.shutdowns, before.shutdowns + 1);
}

#[test]
fn reacquire_after_shutdown_initializes_again() {
    let _lock = session_lock();
    let before = library_stats();

    drop(Session::<Natrix>::acquire().unwrap());
    drop(Session::<Natrix>::acquire().unwrap());

    let after = library_stats();
    assert_eq!(after.initializations, before.initializations + 2);
    assert_eq!(after.shutdowns, before.shutdowns + 2);
    assert_eq!(Session::<Natrix>::active(), 0);
}

#[test]
fn clones_share_the_initialization() {
    let _lock = session_lock();
    let session = Session::<Natrix>::acquire().unwrap();
    let copy = session.clone();
    assert_eq!(Session::<Natrix>::active(), 2);

    drop(session);
    assert_eq!(nx_init_depth(), 1);
    drop(copy);
    assert_eq!(nx_init_depth(), 0);
}

#[test]
fn store_requires_a_live_session() {
    let _lock = session_lock();
    assert_eq!(nx_init_depth(), 0);

    let err = dispatch::alloc::<NxStore>(|out| unsafe { nx_store_open(out, c"early".as_ptr()) })
        .unwrap_err();
    assert_eq!(err.code(), NX_EUNINIT);
    assert_eq!(err.class(), Some(NX_CLASS_INIT));

    let session = Session::<Natrix>::acquire().unwrap();
    let store: Handle<NxStore> = session
        .alloc(|out| unsafe { nx_store_open(out, c"late".as_ptr()) })
        .unwrap();
    assert!(!store.is_null());
}

#[test]
fn sessions_from_many_threads() {
    let _lock = session_lock();
    let before = library_stats();
    let anchor = Session::<Natrix>::acquire().unwrap();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            thread::spawn(|| {
                for _ in 0..50 {
                    let session = Session::<Natrix>::acquire().unwrap();
                    let _store: Handle<NxStore> = session
                        .alloc(|out| unsafe { nx_store_open(out, c"worker".as_ptr()) })
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(Session::<Natrix>::active(), 1);
    drop(anchor);

    let after = library_stats();
    assert_eq!(after.initializations, before.initializations + 1);
    assert_eq!(after.depth, 0);
}

#[test]
fn session_can_move_between_threads() {
    let _lock = session_lock();
    let session = Session::<Natrix>::acquire().unwrap();
    thread::spawn(move || drop(session)).join().unwrap();
    assert_eq!(nx_init_depth(), 0);
}
