//! An in-process mock native library for unit tests.
//!
//! Counters are thread-local: the test harness runs every test on its own
//! thread, so tests never observe each other's releases.

use crate::config::LibraryConfig;
use crate::iter::{
    BorrowedEntry, BorrowedStruct, ByValue, Iterable, Paired, SingleOwned,
};
use crate::library::{LastError, Library, SessionCounter};
use crate::Handle;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ffi::c_int;
use std::ptr;

pub(crate) const DONE: c_int = -31;

pub(crate) struct MockLib;

impl Library for MockLib {
    const CONFIG: LibraryConfig = LibraryConfig::new()
        .name("mock")
        .iter_done(DONE)
        .fallback_message("mock reported no error");

    fn last_error() -> Option<LastError> {
        LAST_ERROR.with(|e| {
            e.borrow()
                .as_ref()
                .map(|(class, message)| LastError::new(*class, message.clone()))
        })
    }

    unsafe fn init() -> c_int {
        0
    }

    unsafe fn shutdown() -> c_int {
        0
    }

    fn sessions() -> &'static SessionCounter {
        static SESSIONS: SessionCounter = SessionCounter::new();
        &SESSIONS
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<(c_int, String)>> = const { RefCell::new(None) };
    static FREED: RefCell<Vec<u32>> = const { RefCell::new(Vec::new()) };
    static GADGETS_FREED: RefCell<Vec<u32>> = const { RefCell::new(Vec::new()) };
    static DUPLICATED: Cell<usize> = const { Cell::new(0) };
    static DUP_FAILURE: Cell<Option<c_int>> = const { Cell::new(None) };
    static SCRIPTS_FREED: Cell<usize> = const { Cell::new(0) };
}

pub(crate) fn set_last_error(error: Option<(c_int, &str)>) {
    LAST_ERROR.with(|e| *e.borrow_mut() = error.map(|(c, m)| (c, m.to_owned())));
}

pub(crate) fn reset() {
    set_last_error(None);
    FREED.with(|f| f.borrow_mut().clear());
    GADGETS_FREED.with(|f| f.borrow_mut().clear());
    DUPLICATED.with(|d| d.set(0));
    DUP_FAILURE.with(|d| d.set(None));
    SCRIPTS_FREED.with(|s| s.set(0));
}

pub(crate) fn freed() -> Vec<u32> {
    FREED.with(|f| f.borrow().clone())
}

pub(crate) fn gadgets_freed() -> Vec<u32> {
    GADGETS_FREED.with(|f| f.borrow().clone())
}

pub(crate) fn duplicated() -> usize {
    DUPLICATED.with(Cell::get)
}

pub(crate) fn scripts_freed() -> usize {
    SCRIPTS_FREED.with(Cell::get)
}

pub(crate) fn fail_next_duplicate(code: c_int) {
    DUP_FAILURE.with(|d| d.set(Some(code)));
}

/// A native object.
#[repr(C)]
pub(crate) struct Widget {
    pub(crate) id: u32,
}

/// A kind that shares `Widget`'s layout, used to test reinterpretation.
#[repr(C)]
pub(crate) struct Gadget {
    pub(crate) id: u32,
}

crate::resource!(MockLib;
    Widget => widget_free,
    Gadget => gadget_free,
    Script => script_free,
);

crate::duplicate!(Widget => |out, src| widget_dup(out, src));

pub(crate) unsafe extern "C" fn widget_new(out: *mut *mut Widget, id: u32) -> c_int {
    if id == 0 {
        set_last_error(Some((1, "invalid widget id")));
        return -1;
    }
    *out = Box::into_raw(Box::new(Widget { id }));
    0
}

pub(crate) unsafe extern "C" fn widget_free(widget: *mut Widget) {
    let widget = Box::from_raw(widget);
    FREED.with(|f| f.borrow_mut().push(widget.id));
}

pub(crate) unsafe extern "C" fn gadget_free(gadget: *mut Gadget) {
    let gadget = Box::from_raw(gadget);
    GADGETS_FREED.with(|f| f.borrow_mut().push(gadget.id));
}

pub(crate) unsafe extern "C" fn widget_dup(out: *mut *mut Widget, src: *const Widget) -> c_int {
    if let Some(code) = DUP_FAILURE.with(|d| d.take()) {
        set_last_error(Some((3, "duplicate refused")));
        return code;
    }
    DUPLICATED.with(|d| d.set(d.get() + 1));
    *out = Box::into_raw(Box::new(Widget { id: (*src).id }));
    0
}

pub(crate) unsafe extern "C" fn widget_id(widget: *const Widget) -> u32 {
    (*widget).id
}

pub(crate) unsafe extern "C" fn widget_set_id(widget: *mut Widget, id: u32) -> c_int {
    if id == 0 {
        set_last_error(Some((1, "invalid widget id")));
        return -1;
    }
    (*widget).id = id;
    1
}

pub(crate) unsafe extern "C" fn widget_fingerprint(out: *mut [u8; 4], widget: *const Widget) -> c_int {
    if (*widget).id == u32::MAX {
        set_last_error(Some((2, "fingerprint unavailable")));
        return -2;
    }
    *out = (*widget).id.to_be_bytes();
    0
}

pub(crate) unsafe extern "C" fn widget_child(
    out: *mut *mut Widget,
    parent: *const Widget,
    offset: u32,
) -> c_int {
    widget_new(out, (*parent).id.wrapping_add(offset))
}

pub(crate) unsafe extern "C" fn widget_split(out: *mut *mut Widget, parent: *mut Widget) -> c_int {
    let id = (*parent).id;
    (*parent).id = id / 2;
    widget_new(out, id - id / 2)
}

/// A scripted native iterator: yields `items`, then returns `terminal`.
pub(crate) struct Script {
    items: VecDeque<u32>,
    terminal: c_int,
    calls: usize,
    lent: Widget,
    views: [Widget; 3],
}

pub(crate) fn script(items: &[u32], terminal: c_int) -> Handle<Script> {
    let script = Box::new(Script {
        items: items.iter().copied().collect(),
        terminal,
        calls: 0,
        lent: Widget { id: 0 },
        views: [Widget { id: 0 }, Widget { id: 0 }, Widget { id: 0 }],
    });
    unsafe { Handle::from_raw(Box::into_raw(script)) }
}

pub(crate) fn calls(script: &Handle<Script>) -> usize {
    script.calls
}

pub(crate) unsafe extern "C" fn script_free(script: *mut Script) {
    drop(Box::from_raw(script));
    SCRIPTS_FREED.with(|s| s.set(s.get() + 1));
}

unsafe fn script_step(script: *mut Script) -> Result<u32, c_int> {
    let script = &mut *script;
    script.calls += 1;
    match script.items.pop_front() {
        Some(id) => Ok(id),
        None => {
            if script.terminal != DONE {
                set_last_error(Some((4, "script failed")));
            }
            Err(script.terminal)
        }
    }
}

pub(crate) unsafe extern "C" fn script_next_widget(out: *mut *mut Widget, it: *mut Script) -> c_int {
    match script_step(it) {
        Ok(id) => widget_new(out, id),
        Err(status) => status,
    }
}

pub(crate) unsafe extern "C" fn script_next_tagged(
    out: *mut *mut Widget,
    tag: *mut u8,
    it: *mut Script,
) -> c_int {
    match script_step(it) {
        Ok(id) => {
            *tag = (id % 3) as u8;
            widget_new(out, id)
        }
        Err(status) => status,
    }
}

pub(crate) unsafe extern "C" fn script_next_value(out: *mut u32, it: *mut Script) -> c_int {
    match script_step(it) {
        Ok(id) => {
            *out = id;
            0
        }
        Err(status) => status,
    }
}

pub(crate) unsafe extern "C" fn script_next_lent(out: *mut *mut Widget, it: *mut Script) -> c_int {
    match script_step(it) {
        Ok(id) => {
            (*it).lent.id = id;
            *out = ptr::addr_of_mut!((*it).lent);
            0
        }
        Err(status) => status,
    }
}

unsafe fn fill_views(it: *mut Script, id: u32) {
    for (i, view) in (*it).views.iter_mut().enumerate() {
        view.id = id * 10 + i as u32;
    }
}

pub(crate) unsafe extern "C" fn script_next_one(a: *mut *const Widget, it: *mut Script) -> c_int {
    match script_step(it) {
        Ok(id) => {
            fill_views(it, id);
            *a = ptr::addr_of!((*it).views[0]);
            0
        }
        Err(status) => status,
    }
}

pub(crate) unsafe extern "C" fn script_next_two(
    a: *mut *const Widget,
    b: *mut *const Widget,
    it: *mut Script,
) -> c_int {
    match script_step(it) {
        Ok(id) => {
            fill_views(it, id);
            *a = ptr::addr_of!((*it).views[0]);
            *b = ptr::addr_of!((*it).views[1]);
            0
        }
        Err(status) => status,
    }
}

/// The first view is null for odd ids, like a conflict with no ancestor.
pub(crate) unsafe extern "C" fn script_next_three(
    a: *mut *const Widget,
    b: *mut *const Widget,
    c: *mut *const Widget,
    it: *mut Script,
) -> c_int {
    match script_step(it) {
        Ok(id) => {
            fill_views(it, id);
            *a = if id % 2 == 1 {
                ptr::null()
            } else {
                ptr::addr_of!((*it).views[0])
            };
            *b = ptr::addr_of!((*it).views[1]);
            *c = ptr::addr_of!((*it).views[2]);
            0
        }
        Err(status) => status,
    }
}

pub(crate) fn single() -> SingleOwned<Script, Widget> {
    SingleOwned::new(script_next_widget)
}

pub(crate) fn paired() -> Paired<Script, Widget, u8> {
    Paired::new(script_next_tagged)
}

pub(crate) fn by_value() -> ByValue<Script, u32> {
    ByValue::new(script_next_value)
}

pub(crate) fn lent() -> BorrowedEntry<Script, Widget> {
    BorrowedEntry::new(script_next_lent)
}

pub(crate) fn triple() -> BorrowedStruct<Script, Widget> {
    BorrowedStruct::three(script_next_three)
}

impl Iterable for Script {
    type Protocol = SingleOwned<Script, Widget>;

    fn protocol() -> Self::Protocol {
        single()
    }
}
