//! Owned native resources.
//!
//! A [`Handle<T>`] exclusively owns one `*mut T` produced by a native library
//! and releases it with `T`'s registered destroyer when dropped. The
//! destroyer and the optional duplicator are resolved at compile time through
//! the [`Resource`] and [`Duplicate`] traits, which are usually implemented
//! with the [`resource!`](crate::resource) and [`duplicate!`](crate::duplicate)
//! macros.
//!
//! ```rust,ignore
//! natrix_core::resource!(Git2; git_commit => git_commit_free);
//! natrix_core::duplicate!(git_commit => |out, src| git_object_dup(out.cast(), src as *mut _));
//! ```

use crate::error::{check, NativeError, NativeResult};
use crate::library::Library;
use std::ffi::c_int;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::{self, NonNull};

/// A native resource kind with a destroyer.
///
/// # Safety
///
/// `destroy` must release a pointer produced by `Library` for this kind, and
/// must be the only release required for it.
pub unsafe trait Resource {
    /// The library the resource belongs to.
    type Library: Library;

    /// Releases the resource.
    ///
    /// # Safety
    ///
    /// `ptr` is non-null, owned by the caller, and never used afterwards.
    unsafe fn destroy(ptr: *mut Self);
}

/// A native resource kind that supports independent copies.
///
/// # Safety
///
/// On success, `duplicate` must store in `*out` a pointer the caller owns and
/// that is independent of `src`.
pub unsafe trait Duplicate: Resource {
    /// Duplicates `src` into `*out`, returning a native status.
    ///
    /// # Safety
    ///
    /// `out` is writable and `src` is a live resource of this kind.
    unsafe fn duplicate(out: *mut *mut Self, src: *const Self) -> c_int;
}

/// Registers destroyers for native resource kinds of one library.
#[macro_export]
macro_rules! resource {
    ($lib:ty; $($kind:ty => $free:path),+ $(,)?) => {
        $(
            unsafe impl $crate::Resource for $kind {
                type Library = $lib;

                unsafe fn destroy(ptr: *mut Self) {
                    $free(ptr)
                }
            }
        )+
    };
}

/// Registers a duplicator for a native resource kind.
///
/// The body receives `out: *mut *mut Kind` and `src: *const Kind` and runs
/// inside an `unsafe` context.
#[macro_export]
macro_rules! duplicate {
    ($($kind:ty => |$out:ident, $src:ident| $body:expr),+ $(,)?) => {
        $(
            unsafe impl $crate::Duplicate for $kind {
                unsafe fn duplicate(
                    $out: *mut *mut Self,
                    $src: *const Self,
                ) -> ::std::ffi::c_int {
                    $body
                }
            }
        )+
    };
}

/// Exclusive owner of one native resource.
///
/// A handle is either null or owns exactly one resource, which is destroyed
/// once when the handle is dropped.
///
/// Opaque kinds, such as the uninhabited enums `libgit2-sys` declares, are
/// only reached through [`as_ptr`](Handle::as_ptr) and the dispatch methods.
/// [`get`](Handle::get) and `Deref` form a `&T` and are limited to kinds
/// whose Rust layout describes the native memory.
///
/// Only kinds registered with [`duplicate!`](crate::duplicate) can be cloned:
///
/// ```compile_fail
/// use natrix_core::{Handle, LastError, Library, LibraryConfig, SessionCounter};
/// use std::ffi::c_int;
///
/// struct Quiet;
///
/// impl Library for Quiet {
///     const CONFIG: LibraryConfig = LibraryConfig::new().name("quiet");
///
///     fn last_error() -> Option<LastError> {
///         None
///     }
///
///     unsafe fn init() -> c_int {
///         0
///     }
///
///     unsafe fn shutdown() -> c_int {
///         0
///     }
///
///     fn sessions() -> &'static SessionCounter {
///         static SESSIONS: SessionCounter = SessionCounter::new();
///         &SESSIONS
///     }
/// }
///
/// struct Plain;
///
/// unsafe fn free_plain(_: *mut Plain) {}
///
/// natrix_core::resource!(Quiet; Plain => free_plain);
///
/// let handle: Handle<Plain> = Handle::null();
/// let _copy = handle.clone();
/// ```
pub struct Handle<T: Resource> {
    ptr: Option<NonNull<T>>,
    _owns: PhantomData<T>,
}

impl<T: Resource> Handle<T> {
    /// Creates a null handle.
    pub const fn null() -> Self {
        Self {
            ptr: None,
            _owns: PhantomData,
        }
    }

    /// Takes ownership of a raw pointer, which may be null.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be a live resource of kind `T` that nothing else
    /// will release.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self {
            ptr: NonNull::new(ptr),
            _owns: PhantomData,
        }
    }

    /// Returns true if the handle owns nothing.
    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    /// Returns the owned pointer, or null.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Returns the owned pointer as a const pointer, or null.
    pub fn as_const_ptr(&self) -> *const T {
        self.as_ptr().cast_const()
    }

    /// Borrows the resource, or `None` for a null handle.
    ///
    /// Only meaningful for kinds with a visible, inhabited layout. Never call
    /// it on an opaque kind; pass [`as_ptr`](Handle::as_ptr) to the library
    /// instead.
    pub fn get(&self) -> Option<&T> {
        // SAFETY: a non-null handle points at a live resource it owns.
        self.ptr.map(|p| unsafe { &*p.as_ptr() })
    }

    /// Moves the resource out, leaving this handle null.
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            ptr: self.ptr.take(),
            _owns: PhantomData,
        }
    }

    /// Releases ownership without destroying the resource.
    #[must_use]
    pub fn into_raw(mut self) -> *mut T {
        self.ptr.take().map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Transfers ownership to a handle of a different kind.
    ///
    /// Nothing checks that `U` and `T` are compatible, and the resource
    /// will be released with `U`'s destroyer.
    ///
    /// # Safety
    ///
    /// The resource must be a valid `U` and `U::destroy` must be a correct
    /// way to release it.
    pub unsafe fn cast<U: Resource>(self) -> Handle<U> {
        Handle::from_raw(self.into_raw().cast::<U>())
    }

    /// Borrows the resource as a different kind, without transferring
    /// ownership. Nothing checks that `U` and `T` are compatible.
    ///
    /// # Safety
    ///
    /// The resource must be valid to read as a `U`.
    pub unsafe fn view<U>(&self) -> Option<&U> {
        self.ptr.map(|p| &*p.as_ptr().cast::<U>())
    }
}

impl<T: Duplicate> Handle<T> {
    /// Creates an independent copy through `T`'s duplicator.
    ///
    /// A null handle copies to a null handle without calling the library.
    pub fn try_clone(&self) -> NativeResult<Self> {
        let Some(src) = self.ptr else {
            return Ok(Self::null());
        };

        let mut out = ptr::null_mut();
        // SAFETY: `out` is a local slot and `src` is owned by this handle.
        let status = unsafe { T::duplicate(&mut out, src.as_ptr()) };
        check::<T::Library>(status).map_err(NativeError::call)?;

        // SAFETY: the duplicator succeeded, so the caller owns `out`.
        Ok(unsafe { Self::from_raw(out) })
    }
}

impl<T: Duplicate> Clone for Handle<T> {
    /// # Panics
    ///
    /// Panics if the native duplicator fails; use
    /// [`try_clone`](Handle::try_clone) to handle that case.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(handle) => handle,
            Err(err) => panic!("failed to duplicate native resource: {err}"),
        }
    }
}

impl<T: Resource> Drop for Handle<T> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: the handle owned `ptr` and gives it up here, once.
            unsafe { T::destroy(ptr.as_ptr()) }
        }
    }
}

impl<T: Resource> Default for Handle<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: Resource> Deref for Handle<T> {
    type Target = T;

    /// Carries the same layout requirement as [`get`](Handle::get).
    ///
    /// # Panics
    ///
    /// Panics if the handle is null. Check [`is_null`](Handle::is_null) or
    /// use [`get`](Handle::get) first.
    fn deref(&self) -> &T {
        match self.get() {
            Some(resource) => resource,
            None => panic!(
                "dereferenced a null handle of {}",
                std::any::type_name::<T>()
            ),
        }
    }
}

impl<T: Resource> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle")
            .field(&std::any::type_name::<T>())
            .field(&self.as_ptr())
            .finish()
    }
}

/// A resource whose memory belongs to someone else.
///
/// `Handle<NoFree<T>>` looks like an owned `T` but its destroyer does nothing.
/// Iterators whose advance function lends out pointers into their own storage
/// wrap those pointers this way.
#[repr(transparent)]
pub struct NoFree<T>(T);

unsafe impl<T: Resource> Resource for NoFree<T> {
    type Library = T::Library;

    unsafe fn destroy(_ptr: *mut Self) {}
}

impl<T> Deref for NoFree<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}
