//! Calling native functions with a bound resource.
//!
//! Native functions follow one of a few calling shapes. Each shape is a
//! separately named method on [`Handle`], so the call site states the shape
//! it expects:
//!
//! | Shape      | Native signature                             | Method                               |
//! |------------|----------------------------------------------|--------------------------------------|
//! | allocating | `int f(U **out, T *self, ...)`               | [`call_alloc`](Handle::call_alloc)   |
//! | direct     | `R f(T *self, ...)`                          | [`call_direct`](Handle::call_direct) |
//! | fixed      | `int f(V *out, T *self, ...)`                | [`call_fixed`](Handle::call_fixed)   |
//! | status     | `int f(T *self, ...)`                        | [`call_status`](Handle::call_status) |
//!
//! The plain forms borrow the handle shared and pass a `*const T`; the `_mut`
//! forms need an exclusive borrow and pass a `*mut T`. A function that
//! modifies its receiver therefore cannot be reached through a shared handle.
//!
//! The closure performs the native call itself, so call-specific arguments
//! are captured rather than forwarded:
//!
//! ```rust,ignore
//! let tree: Handle<git_tree> = commit.call_alloc(|out, c| unsafe { git_commit_tree(out, c) })?;
//! let parents = commit.call_direct(|c| unsafe { git_commit_parentcount(c) });
//! let oid: git_oid = index.call_fixed_mut(|out, i| unsafe { git_index_write_tree(out, i) })?;
//! ```
//!
//! Failures are translated with the receiver's library. A failed allocating
//! call produces no handle: the native contract leaves `*out` unowned on
//! failure, so nothing is destroyed.

use crate::error::{check, NativeError, NativeResult};
use crate::handle::{Handle, Resource};
use crate::library::Library;
use std::ffi::c_int;
use std::mem::MaybeUninit;
use std::ptr;

impl<T: Resource> Handle<T> {
    /// Calls an allocating function with the resource as a const receiver.
    pub fn call_alloc<U: Resource>(
        &self,
        f: impl FnOnce(*mut *mut U, *const T) -> c_int,
    ) -> NativeResult<Handle<U>> {
        self.debug_assert_live();
        alloc_with::<T::Library, U>(|out| f(out, self.as_const_ptr()))
    }

    /// Calls an allocating function with the resource as a mutable receiver.
    pub fn call_alloc_mut<U: Resource>(
        &mut self,
        f: impl FnOnce(*mut *mut U, *mut T) -> c_int,
    ) -> NativeResult<Handle<U>> {
        self.debug_assert_live();
        let receiver = self.as_ptr();
        alloc_with::<T::Library, U>(|out| f(out, receiver))
    }

    /// Calls a function whose return value is the result, verbatim.
    pub fn call_direct<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
        self.debug_assert_live();
        f(self.as_const_ptr())
    }

    /// Calls a function whose return value is the result, with a mutable
    /// receiver.
    pub fn call_direct_mut<R>(&mut self, f: impl FnOnce(*mut T) -> R) -> R {
        self.debug_assert_live();
        f(self.as_ptr())
    }

    /// Calls a function that writes a fixed-size value into caller storage.
    pub fn call_fixed<V: Copy>(
        &self,
        f: impl FnOnce(*mut V, *const T) -> c_int,
    ) -> NativeResult<V> {
        self.debug_assert_live();
        fixed::<T::Library, V>(|out| f(out, self.as_const_ptr()))
    }

    /// Calls a function that writes a fixed-size value into caller storage,
    /// with a mutable receiver.
    pub fn call_fixed_mut<V: Copy>(
        &mut self,
        f: impl FnOnce(*mut V, *mut T) -> c_int,
    ) -> NativeResult<V> {
        self.debug_assert_live();
        let receiver = self.as_ptr();
        fixed::<T::Library, V>(|out| f(out, receiver))
    }

    /// Calls a function that only reports a status.
    ///
    /// Returns the non-negative status.
    pub fn call_status(&self, f: impl FnOnce(*const T) -> c_int) -> NativeResult<c_int> {
        self.debug_assert_live();
        status::<T::Library>(|| f(self.as_const_ptr()))
    }

    /// Calls a function that only reports a status, with a mutable receiver.
    pub fn call_status_mut(&mut self, f: impl FnOnce(*mut T) -> c_int) -> NativeResult<c_int> {
        self.debug_assert_live();
        let receiver = self.as_ptr();
        status::<T::Library>(|| f(receiver))
    }

    fn debug_assert_live(&self) {
        debug_assert!(
            !self.is_null(),
            "native call through a null handle of {}",
            std::any::type_name::<T>()
        );
    }
}

/// Calls an allocating function that has no receiver, such as a constructor.
pub fn alloc<U: Resource>(f: impl FnOnce(*mut *mut U) -> c_int) -> NativeResult<Handle<U>> {
    alloc_with::<U::Library, U>(f)
}

fn alloc_with<L: Library, U: Resource>(
    f: impl FnOnce(*mut *mut U) -> c_int,
) -> NativeResult<Handle<U>> {
    let mut out = ptr::null_mut();
    check::<L>(f(&mut out)).map_err(NativeError::call)?;
    // SAFETY: the call succeeded, so the caller owns `out`.
    Ok(unsafe { Handle::from_raw(out) })
}

/// Calls a fixed-output function that has no receiver.
pub fn fixed<L: Library, V: Copy>(f: impl FnOnce(*mut V) -> c_int) -> NativeResult<V> {
    let mut out = MaybeUninit::<V>::uninit();
    check::<L>(f(out.as_mut_ptr())).map_err(NativeError::call)?;
    // SAFETY: a successful fixed-output call initializes `out`.
    Ok(unsafe { out.assume_init() })
}

/// Calls a status-only function that has no receiver.
pub fn status<L: Library>(f: impl FnOnce() -> c_int) -> NativeResult<c_int> {
    check::<L>(f()).map_err(NativeError::call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, MockLib, Widget};

    fn widget(id: u32) -> Handle<Widget> {
        alloc(|out| unsafe { testing::widget_new(out, id) }).unwrap()
    }

    #[test]
    fn alloc_success_returns_owned_handle() {
        testing::reset();
        let handle = widget(21);
        assert!(!handle.is_null());
        assert_eq!(handle.id, 21);
        drop(handle);
        assert_eq!(testing::freed(), vec![21]);
    }

    #[test]
    fn alloc_failure_reports_last_error() {
        testing::reset();
        let err = alloc::<Widget>(|out| unsafe { testing::widget_new(out, 0) }).unwrap_err();
        assert!(matches!(err, NativeError::Call(_)));
        assert_eq!(err.code(), -1);
        assert_eq!(err.class(), Some(1));
        assert_eq!(err.message(), "invalid widget id");
        assert!(testing::freed().is_empty());
    }

    #[test]
    fn bound_alloc_passes_const_receiver() {
        testing::reset();
        let parent = widget(10);
        let child = parent
            .call_alloc(|out, p| unsafe { testing::widget_child(out, p, 5) })
            .unwrap();
        assert_eq!(child.id, 15);
        assert_eq!(parent.id, 10);
    }

    #[test]
    fn bound_alloc_failure_is_a_call_error() {
        testing::reset();
        let parent = widget(1);
        let err = parent
            .call_alloc(|out, p| unsafe { testing::widget_child(out, p, u32::MAX) })
            .unwrap_err();
        assert_eq!(err.code(), -1);
        assert_eq!(err.message(), "invalid widget id");
        drop(parent);
        assert_eq!(testing::freed(), vec![1]);
    }

    #[test]
    fn mutable_alloc_modifies_receiver() {
        testing::reset();
        let mut parent = widget(9);
        let child = parent
            .call_alloc_mut(|out, p| unsafe { testing::widget_split(out, p) })
            .unwrap();
        assert_eq!(parent.id, 4);
        assert_eq!(child.id, 5);
    }

    #[test]
    fn direct_value_is_returned_verbatim() {
        testing::reset();
        let handle = widget(33);
        let id = handle.call_direct(|w| unsafe { testing::widget_id(w) });
        assert_eq!(id, 33);
    }

    #[test]
    fn direct_mut_returns_raw_status_untranslated() {
        testing::reset();
        let mut handle = widget(2);
        let status = handle.call_direct_mut(|w| unsafe { testing::widget_set_id(w, 0) });
        assert_eq!(status, -1);
        assert_eq!(handle.id, 2);
    }

    #[test]
    fn fixed_output_is_copied_out() {
        testing::reset();
        let handle = widget(0x0102_0304);
        let bytes = handle
            .call_fixed(|out, w| unsafe { testing::widget_fingerprint(out, w) })
            .unwrap();
        assert_eq!(bytes, [1, 2, 3, 4]);
    }

    #[test]
    fn fixed_output_failure() {
        testing::reset();
        let handle = widget(u32::MAX);
        let err = handle
            .call_fixed(|out, w| unsafe { testing::widget_fingerprint(out, w) })
            .unwrap_err();
        assert_eq!(err.code(), -2);
        assert_eq!(err.class(), Some(2));
        assert_eq!(err.message(), "fingerprint unavailable");
    }

    #[test]
    fn status_call_returns_non_negative_status() {
        testing::reset();
        let mut handle = widget(3);
        let status = handle
            .call_status_mut(|w| unsafe { testing::widget_set_id(w, 8) })
            .unwrap();
        assert_eq!(status, 1);
        assert_eq!(handle.id, 8);

        let err = handle
            .call_status_mut(|w| unsafe { testing::widget_set_id(w, 0) })
            .unwrap_err();
        assert_eq!(err.message(), "invalid widget id");
    }

    #[test]
    fn shared_status_call() {
        testing::reset();
        let handle = widget(4);
        let status = handle.call_status(|w| unsafe { testing::widget_id(w) as c_int });
        assert_eq!(status.unwrap(), 4);
    }

    #[test]
    fn unbound_fixed_and_status() {
        testing::reset();
        let value = fixed::<MockLib, u64>(|out| {
            unsafe { *out = 77 };
            0
        })
        .unwrap();
        assert_eq!(value, 77);

        testing::set_last_error(None);
        let err = status::<MockLib>(|| -4).unwrap_err();
        assert_eq!(err.code(), -4);
        assert_eq!(err.message(), "mock reported no error");
    }
}
