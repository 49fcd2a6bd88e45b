//! OS COM runtime: apartment initialization and in-process activation.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr;

use tracing::debug;
use windows_sys::Win32::System::Com::{
    CLSCTX_INPROC_SERVER, COINIT_APARTMENTTHREADED, CoCreateInstance, CoInitializeEx,
    CoUninitialize,
};

use crate::binder::Activator;
use crate::com::{HRESULT, failed};
use crate::error::{ComError, Result};
use crate::guid::GUID;

/// Keeps COM initialized on the current thread.
///
/// Initialization is explicit and may be repeated: a second
/// [`initialize`](Self::initialize) on the same thread succeeds (the OS reports
/// `S_FALSE`) and is balanced by its own guard. Dropping the guard uninitializes.
#[derive(Debug)]
pub struct ComApartment {
    // CoUninitialize must run on the initializing thread.
    _not_send: PhantomData<*mut ()>,
}

impl ComApartment {
    /// Enter a single-threaded apartment on the current thread.
    pub fn initialize() -> Result<Self> {
        let hresult = unsafe { CoInitializeEx(ptr::null(), COINIT_APARTMENTTHREADED) };
        if failed(hresult) {
            return Err(ComError::NativeCallFailed {
                method: "CoInitializeEx".into(),
                hresult,
            });
        }
        debug!("COM initialized on current thread ({:#010x})", hresult);
        Ok(Self {
            _not_send: PhantomData,
        })
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        unsafe { CoUninitialize() };
        debug!("COM uninitialized on current thread");
    }
}

/// Activates in-process servers through `CoCreateInstance`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemActivator;

impl Activator for SystemActivator {
    fn create_instance(&self, clsid: &GUID, iid: &GUID) -> std::result::Result<*mut c_void, HRESULT> {
        let mut out: *mut c_void = ptr::null_mut();
        // GUID has the same layout as the OS GUID.
        let hresult = unsafe {
            CoCreateInstance(
                (clsid as *const GUID).cast(),
                ptr::null_mut(),
                CLSCTX_INPROC_SERVER,
                (iid as *const GUID).cast(),
                &mut out,
            )
        };
        if hresult == 0 { Ok(out) } else { Err(hresult) }
    }
}
