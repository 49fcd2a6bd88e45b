//! COM (Component Object Model) support types
//!
//! ## Key Types
//! - [`HRESULT`] - status code returned by every COM method
//! - [`IUnknownVTable`] - the three slots every COM vtable starts with
//! - [`ComInterface`] - implemented by every declared interface handle
//! - [`IUnknown`] - the root interface
//!
//! ## Example
//! ```ignore
//! use comdecl::prelude::*;
//!
//! #[com_interface(iid = "{12345678-1234-5678-9ABC-DEF012345678}", extends(IUnknown))]
//! pub trait IMyInterface {
//!     #[slot(3)]
//!     fn DoSomething(&self, x: i32);
//! }
//! ```

use std::ffi::c_void;

use crate::binder::{Activator, ComObject};
use crate::error::{DeclError, Result};
use crate::guid::GUID;
use crate::table::InterfaceDescriptor;

// =============================================================================
// HRESULT - COM status codes
// =============================================================================

/// COM status code. Zero (S_OK) is success, anything else is reported as failure.
pub type HRESULT = i32;

/// Success
pub const S_OK: HRESULT = 0;
/// Success, but returned false / nothing found
pub const S_FALSE: HRESULT = 1;
/// Not implemented
pub const E_NOTIMPL: HRESULT = 0x8000_4001_u32 as i32;
/// No such interface supported
pub const E_NOINTERFACE: HRESULT = 0x8000_4002_u32 as i32;
/// Invalid pointer
pub const E_POINTER: HRESULT = 0x8000_4003_u32 as i32;
/// Unspecified failure
pub const E_FAIL: HRESULT = 0x8000_4005_u32 as i32;
/// Out of memory
pub const E_OUTOFMEMORY: HRESULT = 0x8007_000E_u32 as i32;
/// Invalid argument
pub const E_INVALIDARG: HRESULT = 0x8007_0057_u32 as i32;
/// Class not registered
pub const REGDB_E_CLASSNOTREG: HRESULT = 0x8004_0154_u32 as i32;
/// Class does not support aggregation
pub const CLASS_E_NOAGGREGATION: HRESULT = 0x8004_0110_u32 as i32;

/// Check if an HRESULT indicates success (non-negative)
#[inline]
#[must_use]
pub const fn succeeded(hr: HRESULT) -> bool {
    hr >= 0
}

/// Check if an HRESULT indicates failure (negative)
#[inline]
#[must_use]
pub const fn failed(hr: HRESULT) -> bool {
    hr < 0
}

// =============================================================================
// IUnknown - Base COM interface
// =============================================================================

/// Slot of `IUnknown::QueryInterface`.
pub const SLOT_QUERY_INTERFACE: usize = 0;
/// Slot of `IUnknown::AddRef`.
pub const SLOT_ADD_REF: usize = 1;
/// Slot of `IUnknown::Release`.
pub const SLOT_RELEASE: usize = 2;

/// The first three entries of every COM vtable.
#[repr(C)]
pub struct IUnknownVTable {
    pub query_interface: unsafe extern "system" fn(
        this: *mut c_void,
        riid: *const GUID,
        ppv: *mut *mut c_void,
    ) -> HRESULT,
    pub add_ref: unsafe extern "system" fn(this: *mut c_void) -> u32,
    pub release: unsafe extern "system" fn(this: *mut c_void) -> u32,
}

/// IUnknown - base of all COM interfaces.
///
/// AddRef and Release are only recorded in the dispatch table; the handle
/// drives them itself through [`ComObject::add_ref`] and [`ComObject::release`]
/// so the one reference it owns is released exactly once.
#[crate::com_interface(iid = "{00000000-0000-0000-C000-000000000046}", internal)]
pub trait IUnknown {
    /// Retrieves pointers to the supported interfaces on an object.
    #[slot(0)]
    fn QueryInterface(&self, riid: crate::alt!(*const GUID, &GUID), ppv_object: *mut *mut c_void);

    /// Increments the reference count of the object.
    #[slot(1)]
    #[no_wrapper]
    fn AddRef(&self);

    /// Decrements the reference count of the object.
    #[slot(2)]
    #[no_wrapper]
    fn Release(&self);
}

// =============================================================================
// Helper trait for COM interface handles
// =============================================================================

/// A typed handle over one COM interface pointer.
///
/// Implemented by `#[com_interface]` and `define_interface!`.
pub trait ComInterface: Sized {
    /// Interface name as declared.
    const NAME: &'static str;

    /// The interface ID (IID) for this interface.
    const IID: GUID;

    /// The class activated by [`ComInterface::create`], if any.
    const CLSID: Option<GUID>;

    /// The compiled dispatch table, built on first use.
    fn descriptor() -> std::result::Result<&'static InterfaceDescriptor, DeclError>;

    /// Wrap a bound object of this interface.
    fn from_object(object: ComObject) -> Self;

    /// The bound object behind this handle.
    fn object(&self) -> &ComObject;

    /// Give up the handle and keep the bound object.
    fn into_object(self) -> ComObject;

    /// Activate a new object of [`Self::CLSID`] through `activator`.
    fn create_with(activator: &dyn Activator) -> Result<Self> {
        let descriptor = Self::descriptor()?;
        ComObject::activate(descriptor, activator).map(Self::from_object)
    }

    /// Activate a new in-process object through the OS.
    #[cfg(windows)]
    fn create() -> Result<Self> {
        Self::create_with(&crate::runtime::SystemActivator)
    }

    /// Adopt an interface pointer the caller already holds a reference for.
    ///
    /// # Safety
    /// `ptr` must be null or a live COM object implementing this interface.
    /// Ownership of one reference moves into the handle.
    unsafe fn from_raw(ptr: *mut c_void) -> Result<Self> {
        let descriptor = Self::descriptor()?;
        unsafe { ComObject::from_raw(ptr, descriptor) }.map(Self::from_object)
    }
}
