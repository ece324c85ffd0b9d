//! # Natrix Core
//!
//! Adaptation layer between handle-based C libraries and Rust.
//!
//! This crate provides:
//! - Owned handles with compile-time destroyer and duplicator registration
//! - Call dispatch for allocating, direct, fixed-output and status calls
//! - Iterator adapters for five native "next item" protocols
//! - Translation of negative status codes into typed errors
//! - Reference-counted global library initialization
//!
//! ## Usage
//!
//! ```rust,ignore
//! use natrix_core::libgit2::{sys::*, Git2};
//! use natrix_core::{Handle, Session};
//!
//! let session = Session::<Git2>::acquire()?;
//! let mut repo: Handle<git_repository> =
//!     session.alloc(|out| unsafe { git_repository_open(out, path.as_ptr()) })?;
//! let head: Handle<git_reference> = repo.call_alloc_mut(|out, r| unsafe { git_repository_head(out, r) })?;
//!
//! let mut refs: Handle<git_reference_iterator> =
//!     repo.call_alloc_mut(|out, r| unsafe { git_reference_iterator_new(out, r) })?;
//! for reference in &mut refs {
//!     let reference = reference?;
//!     // ...
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handle;
pub mod iter;
pub mod library;
pub mod session;

#[cfg(feature = "libgit2")]
pub mod libgit2;

#[cfg(test)]
mod testing;

pub use config::{LibraryConfig, DEFAULT_ITER_DONE};
pub use error::{check, translate, NativeError, NativeResult, StatusError};
pub use handle::{Duplicate, Handle, NoFree, Resource};
pub use iter::{
    BorrowedEntry, BorrowedStruct, BorrowedViews, ByValue, IterState, Iterable, Lent, NativeIter,
    Paired, Protocol, SingleOwned, Step,
};
pub use library::{LastError, Library, SessionCounter};
pub use session::Session;
