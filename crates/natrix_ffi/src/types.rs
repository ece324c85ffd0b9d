//! Type definitions for FFI.

use sha2::{Digest, Sha256};
use std::ffi::{c_char, c_int};
use std::fmt;

/// An opaque object store.
#[repr(C)]
pub struct NxStore {
    _private: [u8; 0],
}

/// An opaque stored object.
#[repr(C)]
pub struct NxObject {
    _private: [u8; 0],
}

/// A blob view of an object. Shares `NxObject`'s representation.
#[repr(C)]
pub struct NxBlob {
    _private: [u8; 0],
}

/// An opaque iterator over a store's objects.
#[repr(C)]
pub struct NxObjectIterator {
    _private: [u8; 0],
}

/// An opaque iterator over a store's object ids.
#[repr(C)]
pub struct NxIdWalk {
    _private: [u8; 0],
}

/// An opaque iterator over a store's entries.
#[repr(C)]
pub struct NxEntryIterator {
    _private: [u8; 0],
}

/// An opaque iterator over a store's conflicts.
#[repr(C)]
pub struct NxConflictIterator {
    _private: [u8; 0],
}

/// Object kind.
pub type NxKind = c_int;

/// Matches any kind in lookups.
pub const NX_KIND_ANY: NxKind = 0;
/// Raw bytes.
pub const NX_KIND_BLOB: NxKind = 1;
/// A directory listing.
pub const NX_KIND_TREE: NxKind = 2;
/// A snapshot record.
pub const NX_KIND_COMMIT: NxKind = 3;

/// Returns the name of a concrete kind.
pub fn kind_name(kind: NxKind) -> Option<&'static str> {
    match kind {
        NX_KIND_BLOB => Some("blob"),
        NX_KIND_TREE => Some("tree"),
        NX_KIND_COMMIT => Some("commit"),
        _ => None,
    }
}

/// Object id as a 20-byte array.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NxOid {
    /// The id bytes.
    pub bytes: [u8; 20],
}

impl NxOid {
    /// Creates an id from bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self { bytes }
    }

    /// Computes the content address of an object: the first 20 bytes of
    /// SHA-256 over `"{kind} {len}\0"` followed by the data.
    pub fn hash(kind: &str, data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b" ");
        hasher.update(data.len().to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(data);
        let digest = hasher.finalize();

        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self { bytes }
    }

    /// Returns the lowercase hex form.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for NxOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NxOid({})", self.to_hex())
    }
}

impl fmt::Display for NxOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A name/value entry.
///
/// Entries returned by `nx_store_get_entry` are owned by the caller and
/// released with `nx_entry_free`. Entries produced by iterators belong to the
/// iterator.
#[repr(C)]
#[derive(Debug)]
pub struct NxEntry {
    /// Null-terminated name.
    pub name: *const c_char,
    /// Null-terminated value.
    pub value: *const c_char,
}

/// Per-store instrumentation snapshot.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NxStats {
    /// Objects handed out by lookups, duplicates and iterators.
    pub objects_created: u64,
    /// Objects released.
    pub objects_freed: u64,
    /// Objects produced by `nx_object_dup`.
    pub objects_duplicated: u64,
    /// Owned entries handed out.
    pub entries_created: u64,
    /// Owned entries released.
    pub entries_freed: u64,
    /// Iterators created.
    pub iterators_created: u64,
    /// Iterators released.
    pub iterators_freed: u64,
}

impl NxStats {
    /// Objects handed out and not yet released.
    pub fn live_objects(&self) -> u64 {
        self.objects_created - self.objects_freed
    }

    /// Iterators created and not yet released.
    pub fn live_iterators(&self) -> u64 {
        self.iterators_created - self.iterators_freed
    }
}

/// Global library counters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NxLibraryStats {
    /// Current initialization depth.
    pub depth: c_int,
    /// Calls to `nx_init` that moved the depth from zero to one.
    pub initializations: u64,
    /// Calls to `nx_shutdown` that moved the depth from one to zero.
    pub shutdowns: u64,
}
