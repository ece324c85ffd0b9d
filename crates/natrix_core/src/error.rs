//! Error types and native status translation.

use crate::library::Library;
use std::ffi::c_int;
use thiserror::Error;

/// Result type for adapter operations.
pub type NativeResult<T> = Result<T, NativeError>;

/// A negative native status together with the library's last-error record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{library} error {code}{}: {message}", class_suffix(.class))]
pub struct StatusError {
    /// The status code returned by the native call.
    pub code: c_int,
    /// Library-assigned error class, if the last-error slot was set.
    pub class: Option<c_int>,
    /// Message copied from the last-error slot, or the library's fallback.
    pub message: String,
    /// Name of the library that produced the status.
    pub library: &'static str,
}

fn class_suffix(class: &Option<c_int>) -> String {
    class.map_or_else(String::new, |class| format!("/{class}"))
}

/// Errors surfaced by the adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NativeError {
    /// An allocating, fixed-output, status or duplicate call failed.
    #[error("{0}")]
    Call(StatusError),

    /// An iterator's advance function failed.
    #[error("iteration failed: {0}")]
    Iteration(StatusError),

    /// Global library initialization failed.
    #[error("session initialization failed: {0}")]
    Session(StatusError),
}

impl NativeError {
    /// Creates a call error.
    pub fn call(status: StatusError) -> Self {
        Self::Call(status)
    }

    /// Creates an iteration error.
    pub fn iteration(status: StatusError) -> Self {
        Self::Iteration(status)
    }

    /// Creates a session error.
    pub fn session(status: StatusError) -> Self {
        Self::Session(status)
    }

    /// Returns the underlying native status.
    pub fn status(&self) -> &StatusError {
        match self {
            Self::Call(status) | Self::Iteration(status) | Self::Session(status) => status,
        }
    }

    /// Returns the native status code.
    pub fn code(&self) -> c_int {
        self.status().code
    }

    /// Returns the library-assigned error class.
    pub fn class(&self) -> Option<c_int> {
        self.status().class
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.status().message
    }

    /// Returns true if this error was raised while advancing an iterator.
    pub fn is_iteration(&self) -> bool {
        matches!(self, Self::Iteration(_))
    }
}

/// Builds a [`StatusError`] for `code` from `L`'s last-error slot.
///
/// Must be called right after the failing native call: the slot is only
/// valid until the next call into the library.
pub fn translate<L: Library>(code: c_int) -> StatusError {
    let (class, message) = match L::last_error() {
        Some(last) => (Some(last.class), last.message),
        None => (None, L::CONFIG.fallback_message.to_owned()),
    };

    tracing::debug!(
        library = L::CONFIG.name,
        code,
        class,
        error = %message,
        "native call failed"
    );

    StatusError {
        code,
        class,
        message,
        library: L::CONFIG.name,
    }
}

/// Checks a native status code.
///
/// Non-negative statuses are successes and are returned unchanged.
pub fn check<L: Library>(status: c_int) -> Result<c_int, StatusError> {
    if status >= 0 {
        Ok(status)
    } else {
        Err(translate::<L>(status))
    }
}
