//! libgit2 registration.
//!
//! Registers libgit2 as a [`Library`], the destroyers and duplicators of its
//! resource kinds, and the advance protocols of its iterators. The raw API is
//! re-exported as [`sys`].
//!
//! ```rust,ignore
//! use natrix_core::libgit2::{sys::*, Git2};
//!
//! let session = Session::<Git2>::acquire()?;
//! let mut repo: Handle<git_repository> =
//!     session.alloc(|out| unsafe { git_repository_open(out, path.as_ptr()) })?;
//! let mut walk: Handle<git_revwalk> = repo.call_alloc_mut(|out, r| unsafe { git_revwalk_new(out, r) })?;
//! walk.call_status_mut(|w| unsafe { git_revwalk_push_head(w) })?;
//! for oid in walk {
//!     let oid = oid?;
//! }
//! ```

pub use libgit2_sys as sys;

use crate::config::LibraryConfig;
use crate::iter::{BorrowedEntry, BorrowedStruct, ByValue, Iterable, Paired, SingleOwned};
use crate::library::{LastError, Library, SessionCounter};
use std::ffi::{c_int, CStr};
use sys::*;

/// libgit2's "no more items" status.
pub const GIT_ITEROVER: c_int = -31;

/// The libgit2 library.
#[derive(Debug)]
pub struct Git2;

impl Library for Git2 {
    const CONFIG: LibraryConfig = LibraryConfig::new()
        .name("libgit2")
        .iter_done(GIT_ITEROVER)
        .fallback_message("libgit2 reported no error");

    fn last_error() -> Option<LastError> {
        // SAFETY: the returned record is thread-local and valid until the next
        // libgit2 call on this thread; it is copied before returning.
        unsafe {
            let err = git_error_last();
            if err.is_null() || (*err).klass == GIT_ERROR_NONE as c_int {
                return None;
            }
            let message = if (*err).message.is_null() {
                String::new()
            } else {
                CStr::from_ptr((*err).message).to_string_lossy().into_owned()
            };
            Some(LastError::new((*err).klass, message))
        }
    }

    unsafe fn init() -> c_int {
        git_libgit2_init()
    }

    unsafe fn shutdown() -> c_int {
        git_libgit2_shutdown()
    }

    fn sessions() -> &'static SessionCounter {
        static SESSIONS: SessionCounter = SessionCounter::new();
        &SESSIONS
    }
}

crate::resource!(Git2;
    git_annotated_commit => git_annotated_commit_free,
    git_blame => git_blame_free,
    git_blob => git_blob_free,
    git_branch_iterator => git_branch_iterator_free,
    git_commit => git_commit_free,
    git_config => git_config_free,
    git_config_entry => git_config_entry_free,
    git_config_iterator => git_config_iterator_free,
    git_describe_result => git_describe_result_free,
    git_diff => git_diff_free,
    git_diff_stats => git_diff_stats_free,
    git_index => git_index_free,
    git_index_conflict_iterator => git_index_conflict_iterator_free,
    git_indexer => git_indexer_free,
    git_note => git_note_free,
    git_note_iterator => git_note_iterator_free,
    git_object => git_object_free,
    git_odb => git_odb_free,
    git_odb_object => git_odb_object_free,
    git_odb_stream => git_odb_stream_free,
    git_packbuilder => git_packbuilder_free,
    git_patch => git_patch_free,
    git_pathspec => git_pathspec_free,
    git_pathspec_match_list => git_pathspec_match_list_free,
    git_rebase => git_rebase_free,
    git_refdb => git_refdb_free,
    git_reference => git_reference_free,
    git_reference_iterator => git_reference_iterator_free,
    git_reflog => git_reflog_free,
    git_remote => git_remote_free,
    git_repository => git_repository_free,
    git_revwalk => git_revwalk_free,
    git_signature => git_signature_free,
    git_status_list => git_status_list_free,
    git_submodule => git_submodule_free,
    git_tag => git_tag_free,
    git_tree => git_tree_free,
    git_tree_entry => git_tree_entry_free,
    git_treebuilder => git_treebuilder_free,
);

crate::duplicate!(
    git_object => |out, src| git_object_dup(out, src.cast_mut()),
    git_odb_object => |out, src| git_odb_object_dup(out, src.cast_mut()),
    git_remote => |out, src| git_remote_dup(out, src.cast_mut()),
    git_signature => |out, src| git_signature_dup(out, src.cast_mut()),
    git_tree_entry => |out, src| git_tree_entry_dup(out, src.cast_mut()),
    // Object subtypes share git_object's reference-counted duplicate.
    git_blob => |out, src| git_object_dup(out.cast(), src.cast_mut().cast()),
    git_commit => |out, src| git_object_dup(out.cast(), src.cast_mut().cast()),
    git_tag => |out, src| git_object_dup(out.cast(), src.cast_mut().cast()),
    git_tree => |out, src| git_object_dup(out.cast(), src.cast_mut().cast()),
);

/// Commit ids from a revision walk, by value.
impl Iterable for git_revwalk {
    type Protocol = ByValue<git_revwalk, git_oid>;

    fn protocol() -> Self::Protocol {
        ByValue::new(git_revwalk_next)
    }
}

/// Owned references.
impl Iterable for git_reference_iterator {
    type Protocol = SingleOwned<git_reference_iterator, git_reference>;

    fn protocol() -> Self::Protocol {
        SingleOwned::new(git_reference_next)
    }
}

/// Owned branch references paired with their branch type.
impl Iterable for git_branch_iterator {
    type Protocol = Paired<git_branch_iterator, git_reference, git_branch_t>;

    fn protocol() -> Self::Protocol {
        Paired::new(git_branch_next)
    }
}

/// Config entries owned by the iterator. Drive with
/// [`NativeIter::next_item`](crate::NativeIter::next_item).
impl Iterable for git_config_iterator {
    type Protocol = BorrowedEntry<git_config_iterator, git_config_entry>;

    fn protocol() -> Self::Protocol {
        BorrowedEntry::new(git_config_next)
    }
}

/// Ancestor, ours and theirs index entries; the ancestor may be absent.
/// Drive with [`NativeIter::next_item`](crate::NativeIter::next_item).
impl Iterable for git_index_conflict_iterator {
    type Protocol = BorrowedStruct<git_index_conflict_iterator, git_index_entry>;

    fn protocol() -> Self::Protocol {
        BorrowedStruct::three(git_index_conflict_next)
    }
}
