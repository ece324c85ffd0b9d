//! # Natrix Testkit
//!
//! Test utilities for natrix.
//!
//! This crate provides:
//! - Fixtures: library sessions, populated stores, tracing setup
//! - Property-based test generators using proptest
//! - Cross-crate integration tests (under `tests/`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use natrix_testkit::prelude::*;
//!
//! #[test]
//! fn objects_are_released() {
//!     with_store(|store| {
//!         store.put(NX_KIND_BLOB, b"data");
//!         // ... drive the store through natrix_core
//!     });
//! }
//! ```

#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use natrix_core::{
        Handle, IterState, Iterable, NativeError, NativeIter, NativeResult, Session,
    };
    pub use natrix_ffi::{
        Natrix, NxEntry, NxKind, NxObject, NxOid, NxStats, NxStore, NX_KIND_ANY, NX_KIND_BLOB,
        NX_KIND_COMMIT, NX_KIND_TREE,
    };
}

pub use fixtures::*;
pub use generators::*;
