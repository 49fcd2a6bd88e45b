//! Binding descriptors to live COM objects.
//!
//! A [`ComObject`] owns exactly one reference to a COM interface pointer:
//!
//! ```text
//! Unbound ──activate / from_raw──▶ Activated ──read vtable──▶ Bound ──release / drop──▶ Released
//! ```
//!
//! Activation and binding happen inside the constructors, so a `ComObject`
//! is observed either `Bound` or `Released`. Method pointers are resolved
//! from the vtable on demand through the interface's [`InterfaceDescriptor`];
//! slot numbers are not checked against the real vtable size.

use std::ffi::c_void;
use std::fmt;
use std::ptr::{self, NonNull};

use tracing::debug;

use crate::com::{ComInterface, HRESULT, IUnknownVTable, S_OK, E_POINTER};
use crate::error::{ComError, Result};
use crate::guid::GUID;
use crate::signature::NativeArgs;
use crate::table::{InterfaceDescriptor, MethodSlot};

/// Creates COM objects from a class id.
pub trait Activator {
    /// Create an object of class `clsid` and return its `iid` interface.
    ///
    /// On success the caller owns one reference to the returned pointer.
    fn create_instance(&self, clsid: &GUID, iid: &GUID) -> std::result::Result<*mut c_void, HRESULT>;
}

/// Lifecycle state of a [`ComObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Bound,
    Released,
}

/// One owned COM interface pointer together with its dispatch table.
pub struct ComObject {
    ptr: Option<NonNull<c_void>>,
    vtable: *const *const c_void,
    descriptor: &'static InterfaceDescriptor,
}

impl ComObject {
    /// Create a new object of the descriptor's class and bind it.
    pub fn activate(
        descriptor: &'static InterfaceDescriptor,
        activator: &dyn Activator,
    ) -> Result<Self> {
        let clsid = descriptor.clsid().ok_or(ComError::NoClassId {
            interface: descriptor.name(),
        })?;

        debug!("activating {} of class {}", descriptor.name(), clsid);
        let ptr = activator
            .create_instance(&clsid, &descriptor.iid())
            .map_err(|hresult| ComError::Activation {
                interface: descriptor.name(),
                hresult,
            })?;

        // SAFETY: the activator handed us one reference to `ptr`; `from_raw` rejects null.
        unsafe { Self::from_raw(ptr, descriptor) }
    }

    /// Adopt `ptr` and bind it to `descriptor`.
    ///
    /// # Safety
    /// `ptr` must be null or a live COM object implementing `descriptor`'s
    /// interface. The caller's reference moves into the returned handle.
    /// A null `ptr` fails with [`ComError::Activation`] and `E_POINTER`.
    pub unsafe fn from_raw(ptr: *mut c_void, descriptor: &'static InterfaceDescriptor) -> Result<Self> {
        let ptr = NonNull::new(ptr).ok_or(ComError::Activation {
            interface: descriptor.name(),
            hresult: E_POINTER,
        })?;
        // The first machine word of every COM object is its vtable pointer.
        let vtable = unsafe { *(ptr.as_ptr() as *const *const *const c_void) };
        debug!("bound {} at {:p}", descriptor.name(), ptr);
        Ok(Self {
            ptr: Some(ptr),
            vtable,
            descriptor,
        })
    }

    #[must_use]
    pub fn descriptor(&self) -> &'static InterfaceDescriptor {
        self.descriptor
    }

    #[must_use]
    pub fn state(&self) -> HandleState {
        if self.ptr.is_some() {
            HandleState::Bound
        } else {
            HandleState::Released
        }
    }

    /// Whether the handle still holds a pointer.
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        self.ptr.is_some()
    }

    /// The interface pointer, or null once released.
    #[must_use]
    pub fn as_raw(&self) -> *mut c_void {
        self.ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Give up ownership of the pointer without releasing it.
    #[must_use]
    pub fn into_raw(mut self) -> *mut c_void {
        self.ptr.take().map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    fn this(&self) -> Result<NonNull<c_void>> {
        self.ptr.ok_or(ComError::Released)
    }

    fn iunknown(&self) -> Result<(NonNull<c_void>, &IUnknownVTable)> {
        let this = self.this()?;
        // SAFETY: every COM vtable starts with the three IUnknown slots.
        Ok((this, unsafe { &*(self.vtable as *const IUnknownVTable) }))
    }

    /// Resolve `name` through the effective dispatch table.
    pub fn method(&self, name: &str) -> Result<BoundMethod<'_>> {
        let entry = self
            .descriptor
            .get(name)
            .ok_or_else(|| ComError::UnknownMethod {
                interface: self.descriptor.name(),
                method: name.to_owned(),
            })?;
        self.bind(entry)
    }

    /// Every entry of the effective dispatch table, resolved against the vtable.
    pub fn bound_methods(&self) -> Result<Vec<BoundMethod<'_>>> {
        self.descriptor.iter().map(|entry| self.bind(entry)).collect()
    }

    fn bind<'a>(&'a self, entry: &'a MethodSlot) -> Result<BoundMethod<'a>> {
        let this = self.this()?;
        // SAFETY: the vtable is assumed to extend past every declared slot.
        let function = unsafe { *self.vtable.add(entry.slot) };
        Ok(BoundMethod {
            this: this.as_ptr(),
            function,
            entry,
        })
    }

    /// Call method `name` with `args`; any non-zero status is an error.
    ///
    /// # Safety
    /// The declared slot and signature of `name` must match the object's real
    /// vtable, and pointer arguments must be valid for the callee.
    pub unsafe fn invoke<A: NativeArgs>(&self, name: &str, args: A) -> Result<()> {
        let method = self.method(name)?;
        unsafe { method.call(args) }
    }

    /// Ask the object for another interface and bind the result to `target`.
    pub fn query_descriptor(&self, target: &'static InterfaceDescriptor) -> Result<ComObject> {
        let (this, vtable) = self.iunknown()?;
        let iid = target.iid();
        let mut out: *mut c_void = ptr::null_mut();
        let hresult = unsafe { (vtable.query_interface)(this.as_ptr(), &iid, &mut out) };
        debug!(
            "QueryInterface {} -> {} returned {:#010x}",
            self.descriptor.name(),
            target.name(),
            hresult
        );

        if hresult != S_OK || out.is_null() {
            return Err(ComError::InterfaceNotSupported {
                interface: target.name(),
                hresult,
            });
        }
        // SAFETY: QueryInterface succeeded, so `out` carries one reference to `target`.
        unsafe { Self::from_raw(out, target) }
    }

    /// Ask the object for interface `T`.
    pub fn query_interface<T: ComInterface>(&self) -> Result<T> {
        let descriptor = T::descriptor()?;
        self.query_descriptor(descriptor).map(T::from_object)
    }

    /// Take an extra reference on the object. Returns the new count.
    pub fn add_ref(&self) -> Result<u32> {
        let (this, vtable) = self.iunknown()?;
        Ok(unsafe { (vtable.add_ref)(this.as_ptr()) })
    }

    /// Hand out another handle to the same object, taking a new reference.
    pub fn try_clone(&self) -> Result<ComObject> {
        let this = self.this()?;
        self.add_ref()?;
        Ok(Self {
            ptr: Some(this),
            vtable: self.vtable,
            descriptor: self.descriptor,
        })
    }

    /// Release the reference held by this handle.
    ///
    /// Returns the count reported by the object, or `None` when the handle was
    /// already released. Release runs at most once per handle.
    pub fn release(&mut self) -> Option<u32> {
        let this = self.ptr.take()?;
        // SAFETY: the vtable was read from this live object when it was bound.
        let vtable = unsafe { &*(self.vtable as *const IUnknownVTable) };
        let remaining = unsafe { (vtable.release)(this.as_ptr()) };
        debug!("released {} ({} references left)", self.descriptor.name(), remaining);
        Some(remaining)
    }
}

impl Drop for ComObject {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ComObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComObject")
            .field("interface", &self.descriptor.name())
            .field("ptr", &self.as_raw())
            .field("state", &self.state())
            .finish()
    }
}

/// A method of a bound object: the object pointer plus the resolved function.
#[derive(Clone, Copy)]
pub struct BoundMethod<'a> {
    this: *mut c_void,
    function: *const c_void,
    entry: &'a MethodSlot,
}

impl BoundMethod<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    #[must_use]
    pub fn slot(&self) -> usize {
        self.entry.slot
    }

    #[must_use]
    pub fn entry(&self) -> &MethodSlot {
        self.entry
    }

    /// The function pointer read from the vtable.
    #[must_use]
    pub fn as_ptr(&self) -> *const c_void {
        self.function
    }

    /// Call with `args` and return the raw status.
    ///
    /// Fails without calling when the argument types differ from the declared
    /// signature.
    ///
    /// # Safety
    /// The declared slot and signature must match the object's real vtable,
    /// and pointer arguments must be valid for the callee.
    pub unsafe fn call_raw<A: NativeArgs>(&self, args: A) -> Result<HRESULT> {
        let actual = A::native_types();
        if actual != self.entry.signature.params {
            return Err(ComError::ArgumentMismatch {
                method: self.entry.name.clone(),
                expected: join(&self.entry.signature.params),
                actual: join(&actual),
            });
        }
        Ok(unsafe { args.invoke(self.function, self.this) })
    }

    /// Call with `args`; a non-zero status becomes [`ComError::NativeCallFailed`].
    ///
    /// # Safety
    /// See [`call_raw`](Self::call_raw).
    pub unsafe fn call<A: NativeArgs>(&self, args: A) -> Result<()> {
        match unsafe { self.call_raw(args) }? {
            S_OK => Ok(()),
            hresult => Err(ComError::NativeCallFailed {
                method: self.entry.name.clone(),
                hresult,
            }),
        }
    }
}

impl fmt::Debug for BoundMethod<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("name", &self.entry.name)
            .field("slot", &self.entry.slot)
            .field("signature", &self.entry.signature)
            .field("function", &self.function)
            .finish()
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
