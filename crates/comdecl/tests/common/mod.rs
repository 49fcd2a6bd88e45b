//! Hand-built COM objects for driving the binder without an OS runtime.
#![allow(dead_code)]

use std::ffi::c_void;
use std::ptr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use comdecl::GUID;
use comdecl::com::{E_NOINTERFACE, E_NOTIMPL, E_POINTER, HRESULT, S_OK};

/// A COM object whose vtable is assembled slot by slot.
///
/// The object starts with one reference. Slots 0..3 implement IUnknown;
/// every other slot returns `E_NOTIMPL` until replaced.
#[repr(C)]
pub struct MockObject {
    vtable: *const *const c_void,
    pub refs: AtomicUsize,
    pub add_refs: AtomicUsize,
    pub releases: AtomicUsize,
    /// Status returned by slots that consult it.
    pub status: AtomicI32,
    /// Calls recorded by test slots.
    pub log: Mutex<Vec<String>>,
    /// Interfaces answered by QueryInterface; null target means this object.
    answers: Mutex<Vec<(GUID, *mut MockObject)>>,
}

pub struct MockBuilder {
    slots: Vec<*const c_void>,
}

impl MockBuilder {
    pub fn new(slot_count: usize) -> Self {
        let mut slots = vec![not_implemented as *const c_void; slot_count.max(3)];
        slots[0] = query_interface as *const c_void;
        slots[1] = add_ref as *const c_void;
        slots[2] = release as *const c_void;
        Self { slots }
    }

    pub fn slot(mut self, index: usize, function: *const c_void) -> Self {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, not_implemented as *const c_void);
        }
        self.slots[index] = function;
        self
    }

    /// Leak the vtable and the object; tests inspect the object after every
    /// handle to it is gone.
    pub fn build(self) -> *mut MockObject {
        let vtable = Box::leak(self.slots.into_boxed_slice()).as_ptr();
        Box::into_raw(Box::new(MockObject {
            vtable,
            refs: AtomicUsize::new(1),
            add_refs: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            status: AtomicI32::new(S_OK),
            log: Mutex::new(Vec::new()),
            answers: Mutex::new(Vec::new()),
        }))
    }
}

impl MockObject {
    /// # Safety
    /// `ptr` must come from [`MockBuilder::build`].
    pub unsafe fn get<'a>(ptr: *mut c_void) -> &'a MockObject {
        unsafe { &*(ptr as *const MockObject) }
    }

    /// Make QueryInterface for `iid` succeed with `target` (null: this object).
    pub fn answer(&self, iid: GUID, target: *mut MockObject) {
        self.answers.lock().unwrap().push((iid, target));
    }

    pub fn refs(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn set_status(&self, status: HRESULT) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn status(&self) -> HRESULT {
        self.status.load(Ordering::SeqCst)
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

unsafe extern "system" fn query_interface(
    this: *mut c_void,
    riid: *const GUID,
    ppv: *mut *mut c_void,
) -> HRESULT {
    if riid.is_null() || ppv.is_null() {
        return E_POINTER;
    }
    let object = unsafe { MockObject::get(this) };
    let iid = unsafe { *riid };
    let target = object
        .answers
        .lock()
        .unwrap()
        .iter()
        .find(|(answered, _)| *answered == iid)
        .map(|&(_, target)| if target.is_null() { this } else { target.cast() });

    match target {
        Some(target) => {
            unsafe {
                add_ref(target);
                *ppv = target;
            }
            S_OK
        }
        None => {
            unsafe { *ppv = ptr::null_mut() };
            E_NOINTERFACE
        }
    }
}

unsafe extern "system" fn add_ref(this: *mut c_void) -> u32 {
    let object = unsafe { MockObject::get(this) };
    object.add_refs.fetch_add(1, Ordering::SeqCst);
    (object.refs.fetch_add(1, Ordering::SeqCst) + 1) as u32
}

unsafe extern "system" fn release(this: *mut c_void) -> u32 {
    let object = unsafe { MockObject::get(this) };
    object.releases.fetch_add(1, Ordering::SeqCst);
    (object.refs.fetch_sub(1, Ordering::SeqCst) - 1) as u32
}

unsafe extern "system" fn not_implemented(_this: *mut c_void) -> HRESULT {
    E_NOTIMPL
}

/// Records `name` and returns the object's status.
pub unsafe extern "system" fn record_no_args(this: *mut c_void) -> HRESULT {
    let object = unsafe { MockObject::get(this) };
    object.record("call()");
    object.status()
}

/// Read a NUL-terminated UTF-16 argument.
///
/// # Safety
/// `text` must be null or point to a NUL-terminated buffer.
pub unsafe fn wide_arg(text: *const u16) -> String {
    if text.is_null() {
        return String::from("<null>");
    }
    let mut len = 0;
    while unsafe { *text.add(len) } != 0 {
        len += 1;
    }
    String::from_utf16_lossy(unsafe { std::slice::from_raw_parts(text, len) })
}

/// Copy `text` into a caller-provided UTF-16 buffer of `cch` units.
///
/// # Safety
/// `buffer` must be valid for `cch` writes.
pub unsafe fn write_wide(buffer: *mut u16, cch: i32, text: &str) {
    let units: Vec<u16> = text.encode_utf16().chain(Some(0)).collect();
    let len = units.len().min(cch as usize);
    unsafe { ptr::copy_nonoverlapping(units.as_ptr(), buffer, len) };
}

/// An activator that hands out a fixed result and remembers what it was asked.
pub struct MockActivator {
    result: Result<*mut c_void, HRESULT>,
    pub requests: Mutex<Vec<(GUID, GUID)>>,
}

impl MockActivator {
    pub fn returning(object: *mut MockObject) -> Self {
        Self {
            result: Ok(object.cast()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(hresult: HRESULT) -> Self {
        Self {
            result: Err(hresult),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn null() -> Self {
        Self {
            result: Ok(ptr::null_mut()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl comdecl::Activator for MockActivator {
    fn create_instance(&self, clsid: &GUID, iid: &GUID) -> Result<*mut c_void, HRESULT> {
        self.requests.lock().unwrap().push((*clsid, *iid));
        self.result
    }
}
