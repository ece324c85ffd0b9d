//! Library configuration.

use std::ffi::c_int;

/// Status conventionally used by C libraries to mean "no more items".
pub const DEFAULT_ITER_DONE: c_int = -31;

/// Describes how a wrapped native library reports its outcomes.
///
/// Every [`Library`](crate::Library) exposes one of these as a constant, so
/// the values are fixed at compile time for each wrapped library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Display name used in error messages and log fields.
    pub name: &'static str,

    /// Status returned by advance functions once an iterator is exhausted.
    pub iter_done: c_int,

    /// Message reported when a call fails and the last-error slot is empty.
    pub fallback_message: &'static str,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: "native",
            iter_done: DEFAULT_ITER_DONE,
            fallback_message: "no error message available",
        }
    }

    /// Sets the display name.
    #[must_use]
    pub const fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Sets the iteration-done sentinel.
    #[must_use]
    pub const fn iter_done(mut self, status: c_int) -> Self {
        self.iter_done = status;
        self
    }

    /// Sets the message used when no native error is recorded.
    #[must_use]
    pub const fn fallback_message(mut self, message: &'static str) -> Self {
        self.fallback_message = message;
        self
    }

    /// Returns true if `status` is the iteration-done sentinel.
    #[must_use]
    pub const fn is_iter_done(&self, status: c_int) -> bool {
        status == self.iter_done
    }
}
