//! Iteration over native "next item" protocols.
//!
//! C libraries expose iteration as an iterator resource plus an advance
//! function that writes the next item through output pointers and returns a
//! status: success, a distinguished "done" sentinel, or an error. The shapes
//! of the output parameters vary; this module keeps one state machine
//! ([`NativeIter`]) and models each shape as a [`Protocol`]:
//!
//! | Protocol            | Advance signature                          | Item                              |
//! |---------------------|--------------------------------------------|-----------------------------------|
//! | [`SingleOwned`]     | `fn(*mut *mut T, *mut I) -> c_int`         | [`Handle<T>`]                     |
//! | [`BorrowedStruct`]  | `fn(*mut *const T, .., *mut I) -> c_int`   | [`BorrowedViews<'_, T>`]          |
//! | [`Paired`]          | `fn(*mut *mut T, *mut K, *mut I) -> c_int` | `(Handle<T>, K)`                  |
//! | [`ByValue`]         | `fn(*mut V, *mut I) -> c_int`              | `V`                               |
//! | [`BorrowedEntry`]   | `fn(*mut *mut T, *mut I) -> c_int`         | [`Lent<'_, Handle<NoFree<T>>>`]   |
//!
//! Owned protocols implement [`Iterator`]. Borrowed protocols lend items that
//! are only valid until the next advance, so they are driven with
//! [`NativeIter::next_item`]:
//!
//! ```rust,ignore
//! let mut conflicts = index_conflicts.iterate(conflict_protocol());
//! while let Some(views) = conflicts.next_item() {
//!     let views = views?;
//!     // use views before the next advance
//! }
//! ```
//!
//! [`NoFree<T>`]: crate::NoFree

mod protocol;

pub use protocol::{
    BorrowedEntry, BorrowedStruct, BorrowedViews, ByValue, Lent, Paired, SingleOwned,
};

use crate::error::{translate, NativeError, NativeResult, StatusError};
use crate::handle::{Handle, Resource};
use crate::library::Library;
use std::borrow::BorrowMut;
use std::ffi::c_int;
use std::iter::FusedIterator;

/// Outcome of one call to a native advance function.
#[derive(Debug)]
pub enum Step<T> {
    /// The advance succeeded and produced an item.
    Item(T),
    /// The advance returned the library's iteration-done sentinel.
    Done,
    /// The advance failed; the last error has already been captured.
    Failed(StatusError),
}

impl Step<()> {
    /// Classifies an advance status for library `L`.
    ///
    /// Translates failures immediately, while the last-error slot still
    /// belongs to this call.
    pub fn from_status<L: Library>(status: c_int) -> Self {
        if L::CONFIG.is_iter_done(status) {
            Step::Done
        } else if status < 0 {
            Step::Failed(translate::<L>(status))
        } else {
            Step::Item(())
        }
    }
}

impl<T> Step<T> {
    /// Maps the produced item.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Step<U> {
        match self {
            Step::Item(item) => Step::Item(f(item)),
            Step::Done => Step::Done,
            Step::Failed(status) => Step::Failed(status),
        }
    }
}

/// A native advance protocol.
pub trait Protocol {
    /// The native iterator resource being advanced.
    type Source: Resource;

    /// The item produced by one successful advance.
    type Item<'a>
    where
        Self: 'a;

    /// Calls the native advance function once.
    ///
    /// # Safety
    ///
    /// `source` must be a live iterator of kind `Source`, and items borrowing
    /// from it must not outlive `'a` or the next call to `advance`.
    unsafe fn advance<'a>(&self, source: *mut Self::Source) -> Step<Self::Item<'a>>
    where
        Self: 'a;
}

/// A native iterator kind with a default protocol.
///
/// Implementing this lets `for item in handle` drive the native iterator.
pub trait Iterable: Resource + Sized {
    /// The protocol used to advance this iterator kind.
    type Protocol: Protocol<Source = Self>;

    /// Returns the protocol value, which carries the native advance function.
    fn protocol() -> Self::Protocol;
}

/// State of a [`NativeIter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterState {
    /// No advance has been attempted yet.
    Fresh,
    /// At least one item was produced and the sequence may continue.
    Active,
    /// The advance function reported the done sentinel.
    Exhausted,
    /// The advance function failed.
    Failed,
}

impl IterState {
    /// Returns true if no further items will be produced.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted | Self::Failed)
    }
}

/// Single-pass iteration over a native iterator resource.
///
/// `S` is either an owned `Handle<P::Source>` or a `&mut` borrow of one.
/// Dropping a `NativeIter` at any point is safe: an owned source is released
/// exactly once and the native sequence is not drained.
pub struct NativeIter<P: Protocol, S = Handle<<P as Protocol>::Source>> {
    source: S,
    protocol: P,
    state: IterState,
    produced: usize,
}

impl<P, S> NativeIter<P, S>
where
    P: Protocol,
    S: BorrowMut<Handle<P::Source>>,
{
    /// Creates an iterator over `source` using `protocol`.
    pub fn new(source: S, protocol: P) -> Self {
        Self {
            source,
            protocol,
            state: IterState::Fresh,
            produced: 0,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> IterState {
        self.state
    }

    /// Returns the number of items produced so far.
    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Returns the source iterator handle.
    pub fn source(&self) -> &Handle<P::Source> {
        self.source.borrow()
    }

    /// Gives back the source without advancing it further.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Advances the native iterator once.
    ///
    /// Returns `None` once the sequence is exhausted or has failed; the error
    /// itself is returned exactly once, at the step that failed.
    pub fn next_item(&mut self) -> Option<NativeResult<P::Item<'_>>> {
        if self.state.is_terminal() {
            return None;
        }

        let source = self.source.borrow_mut().as_ptr();
        if source.is_null() {
            self.state = IterState::Exhausted;
            return None;
        }

        // SAFETY: `source` is owned or exclusively borrowed by `self`, and the
        // returned item borrows `self` until the caller advances again.
        match unsafe { self.protocol.advance(source) } {
            Step::Item(item) => {
                self.state = IterState::Active;
                self.produced += 1;
                Some(Ok(item))
            }
            Step::Done => {
                self.state = IterState::Exhausted;
                tracing::trace!(
                    library = library_name::<P>(),
                    produced = self.produced,
                    "native iterator exhausted"
                );
                None
            }
            Step::Failed(status) => {
                self.state = IterState::Failed;
                tracing::debug!(
                    library = library_name::<P>(),
                    produced = self.produced,
                    code = status.code,
                    "native iterator failed"
                );
                Some(Err(NativeError::iteration(status)))
            }
        }
    }
}

fn library_name<P: Protocol>() -> &'static str {
    <<P::Source as Resource>::Library as Library>::CONFIG.name
}

impl<I, T, S> Iterator for NativeIter<SingleOwned<I, T>, S>
where
    I: Resource,
    T: Resource,
    S: BorrowMut<Handle<I>>,
{
    type Item = NativeResult<Handle<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item()
    }
}

impl<I, T, S> FusedIterator for NativeIter<SingleOwned<I, T>, S>
where
    I: Resource,
    T: Resource,
    S: BorrowMut<Handle<I>>,
{
}

impl<I, T, K, S> Iterator for NativeIter<Paired<I, T, K>, S>
where
    I: Resource,
    T: Resource,
    K: Copy,
    S: BorrowMut<Handle<I>>,
{
    type Item = NativeResult<(Handle<T>, K)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item()
    }
}

impl<I, T, K, S> FusedIterator for NativeIter<Paired<I, T, K>, S>
where
    I: Resource,
    T: Resource,
    K: Copy,
    S: BorrowMut<Handle<I>>,
{
}

impl<I, V, S> Iterator for NativeIter<ByValue<I, V>, S>
where
    I: Resource,
    V: Copy,
    S: BorrowMut<Handle<I>>,
{
    type Item = NativeResult<V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item()
    }
}

impl<I, V, S> FusedIterator for NativeIter<ByValue<I, V>, S>
where
    I: Resource,
    V: Copy,
    S: BorrowMut<Handle<I>>,
{
}

impl<T: Resource> Handle<T> {
    /// Iterates this native iterator with `protocol`, taking ownership of it.
    pub fn iterate<P: Protocol<Source = T>>(self, protocol: P) -> NativeIter<P> {
        NativeIter::new(self, protocol)
    }

    /// Iterates this native iterator with `protocol`, borrowing it.
    pub fn iterate_mut<P: Protocol<Source = T>>(
        &mut self,
        protocol: P,
    ) -> NativeIter<P, &mut Handle<T>> {
        NativeIter::new(self, protocol)
    }
}

impl<T> IntoIterator for Handle<T>
where
    T: Iterable,
    NativeIter<T::Protocol>: Iterator,
{
    type Item = <NativeIter<T::Protocol> as Iterator>::Item;
    type IntoIter = NativeIter<T::Protocol>;

    fn into_iter(self) -> Self::IntoIter {
        NativeIter::new(self, T::protocol())
    }
}

impl<'h, T> IntoIterator for &'h mut Handle<T>
where
    T: Iterable,
    NativeIter<T::Protocol, &'h mut Handle<T>>: Iterator,
{
    type Item = <NativeIter<T::Protocol, &'h mut Handle<T>> as Iterator>::Item;
    type IntoIter = NativeIter<T::Protocol, &'h mut Handle<T>>;

    fn into_iter(self) -> Self::IntoIter {
        NativeIter::new(self, T::protocol())
    }
}
