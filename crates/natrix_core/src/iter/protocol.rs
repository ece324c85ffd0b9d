use super::{Protocol, Step};
use crate::handle::{Handle, NoFree, Resource};
use std::ffi::c_int;
use std::fmt;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ops::Deref;
use std::ptr;

/// Advance writes one owned item: `fn(out: *mut *mut T, it: *mut I)`.
pub struct SingleOwned<I, T> {
    next: unsafe extern "C" fn(*mut *mut T, *mut I) -> c_int,
}

impl<I, T> SingleOwned<I, T> {
    /// Wraps a native advance function.
    pub const fn new(next: unsafe extern "C" fn(*mut *mut T, *mut I) -> c_int) -> Self {
        Self { next }
    }
}

impl<I: Resource, T: Resource> Protocol for SingleOwned<I, T> {
    type Source = I;
    type Item<'a> = Handle<T> where Self: 'a;

    unsafe fn advance<'a>(&self, source: *mut I) -> Step<Self::Item<'a>>
    where
        Self: 'a,
    {
        let mut out = ptr::null_mut();
        let status = (self.next)(&mut out, source);
        match Step::from_status::<I::Library>(status) {
            Step::Item(()) => Step::Item(Handle::from_raw(out)),
            Step::Done => Step::Done,
            Step::Failed(err) => Step::Failed(err),
        }
    }
}

/// Advance writes an owned item and a plain value:
/// `fn(out: *mut *mut T, kind: *mut K, it: *mut I)`.
pub struct Paired<I, T, K> {
    next: unsafe extern "C" fn(*mut *mut T, *mut K, *mut I) -> c_int,
}

impl<I, T, K: Copy> Paired<I, T, K> {
    /// Wraps a native advance function.
    pub const fn new(next: unsafe extern "C" fn(*mut *mut T, *mut K, *mut I) -> c_int) -> Self {
        Self { next }
    }
}

impl<I: Resource, T: Resource, K: Copy> Protocol for Paired<I, T, K> {
    type Source = I;
    type Item<'a> = (Handle<T>, K) where Self: 'a;

    unsafe fn advance<'a>(&self, source: *mut I) -> Step<Self::Item<'a>>
    where
        Self: 'a,
    {
        let mut out = ptr::null_mut();
        let mut extra = MaybeUninit::<K>::uninit();
        let status = (self.next)(&mut out, extra.as_mut_ptr(), source);
        match Step::from_status::<I::Library>(status) {
            // The native contract fills both slots on success.
            Step::Item(()) => Step::Item((Handle::from_raw(out), extra.assume_init())),
            Step::Done => Step::Done,
            Step::Failed(err) => Step::Failed(err),
        }
    }
}

/// Advance copies a plain value into a caller slot: `fn(out: *mut V, it: *mut I)`.
pub struct ByValue<I, V> {
    next: unsafe extern "C" fn(*mut V, *mut I) -> c_int,
}

impl<I, V: Copy> ByValue<I, V> {
    /// Wraps a native advance function.
    pub const fn new(next: unsafe extern "C" fn(*mut V, *mut I) -> c_int) -> Self {
        Self { next }
    }
}

impl<I: Resource, V: Copy> Protocol for ByValue<I, V> {
    type Source = I;
    type Item<'a> = V where Self: 'a;

    unsafe fn advance<'a>(&self, source: *mut I) -> Step<Self::Item<'a>>
    where
        Self: 'a,
    {
        let mut out = MaybeUninit::<V>::uninit();
        let status = (self.next)(out.as_mut_ptr(), source);
        match Step::from_status::<I::Library>(status) {
            Step::Item(()) => Step::Item(out.assume_init()),
            Step::Done => Step::Done,
            Step::Failed(err) => Step::Failed(err),
        }
    }
}

/// Advance lends a pointer into the iterator's own storage:
/// `fn(out: *mut *mut T, it: *mut I)`. Items are never destroyed.
pub struct BorrowedEntry<I, T> {
    next: unsafe extern "C" fn(*mut *mut T, *mut I) -> c_int,
}

impl<I, T> BorrowedEntry<I, T> {
    /// Wraps a native advance function.
    pub const fn new(next: unsafe extern "C" fn(*mut *mut T, *mut I) -> c_int) -> Self {
        Self { next }
    }
}

impl<I: Resource, T: Resource> Protocol for BorrowedEntry<I, T> {
    type Source = I;
    type Item<'a> = Lent<'a, Handle<NoFree<T>>> where Self: 'a;

    unsafe fn advance<'a>(&self, source: *mut I) -> Step<Self::Item<'a>>
    where
        Self: 'a,
    {
        let mut out = ptr::null_mut();
        let status = (self.next)(&mut out, source);
        match Step::from_status::<I::Library>(status) {
            Step::Item(()) => Step::Item(Lent::new(Handle::from_raw(out.cast::<NoFree<T>>()))),
            Step::Done => Step::Done,
            Step::Failed(err) => Step::Failed(err),
        }
    }
}

/// An item that is only valid until its iterator advances again.
pub struct Lent<'a, H> {
    value: H,
    _source: PhantomData<&'a mut ()>,
}

impl<H> Lent<'_, H> {
    fn new(value: H) -> Self {
        Self {
            value,
            _source: PhantomData,
        }
    }
}

impl<H> Deref for Lent<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.value
    }
}

impl<H: fmt::Debug> fmt::Debug for Lent<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Lent").field(&self.value).finish()
    }
}

enum Views<I, T> {
    One(unsafe extern "C" fn(*mut *const T, *mut I) -> c_int),
    Two(unsafe extern "C" fn(*mut *const T, *mut *const T, *mut I) -> c_int),
    Three(unsafe extern "C" fn(*mut *const T, *mut *const T, *mut *const T, *mut I) -> c_int),
}

/// Advance fills one to three borrowed pointers into a native struct, any of
/// which may be null.
pub struct BorrowedStruct<I, T> {
    next: Views<I, T>,
}

impl<I, T> BorrowedStruct<I, T> {
    /// Advance with one view.
    pub const fn one(next: unsafe extern "C" fn(*mut *const T, *mut I) -> c_int) -> Self {
        Self {
            next: Views::One(next),
        }
    }

    /// Advance with two views.
    pub const fn two(
        next: unsafe extern "C" fn(*mut *const T, *mut *const T, *mut I) -> c_int,
    ) -> Self {
        Self {
            next: Views::Two(next),
        }
    }

    /// Advance with three views.
    pub const fn three(
        next: unsafe extern "C" fn(*mut *const T, *mut *const T, *mut *const T, *mut I) -> c_int,
    ) -> Self {
        Self {
            next: Views::Three(next),
        }
    }
}

impl<I: Resource, T> Protocol for BorrowedStruct<I, T> {
    type Source = I;
    type Item<'a> = BorrowedViews<'a, T> where Self: 'a;

    unsafe fn advance<'a>(&self, source: *mut I) -> Step<Self::Item<'a>>
    where
        Self: 'a,
    {
        let mut slots: [*const T; 3] = [ptr::null(); 3];
        let [a, b, c] = &mut slots;
        let (status, len) = match self.next {
            Views::One(next) => (next(a, source), 1),
            Views::Two(next) => (next(a, b, source), 2),
            Views::Three(next) => (next(a, b, c, source), 3),
        };

        match Step::from_status::<I::Library>(status) {
            Step::Item(()) => Step::Item(BorrowedViews {
                views: slots.map(|p| p.as_ref()),
                len,
            }),
            Step::Done => Step::Done,
            Step::Failed(err) => Step::Failed(err),
        }
    }
}

/// Borrowed views produced by one advance of a [`BorrowedStruct`] protocol.
///
/// A slot is `None` when the library left that pointer null.
pub struct BorrowedViews<'a, T> {
    views: [Option<&'a T>; 3],
    len: usize,
}

impl<'a, T> BorrowedViews<'a, T> {
    /// Returns the number of views the protocol produces.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the protocol produces no views.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns view `index`, or `None` if it is null or out of range.
    pub fn get(&self, index: usize) -> Option<&'a T> {
        self.as_slice().get(index).copied().flatten()
    }

    /// Returns all views in order.
    pub fn as_slice(&self) -> &[Option<&'a T>] {
        &self.views[..self.len]
    }

    /// Iterates over all views in order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&'a T>> + '_ {
        self.as_slice().iter().copied()
    }
}

impl<T: fmt::Debug> fmt::Debug for BorrowedViews<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
