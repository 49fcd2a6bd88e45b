//! Declarative COM interface bindings for Rust
//!
//! Declare a COM interface once, as a trait or as a method table, and get
//! slot lookup, signature checking and method dispatch derived from it.
//!
//! ## Proc-macro declarations
//! ```ignore
//! use comdecl::prelude::*;
//!
//! #[com_interface(
//!     iid = "{0000010B-0000-0000-C000-000000000046}",
//!     extends(IPersist),
//! )]
//! pub trait IPersistFile {
//!     #[slot(4)]
//!     fn IsDirty(&self);
//!     fn Load(&self, psz_file_name: alt!(*const u16, &str), dw_mode: u32);
//! }
//!
//! let file = IPersistFile::create_with(&activator)?;
//! unsafe { file.Load(path.as_ptr(), 0)? };
//! ```
//!
//! ## Declarative tables (`decl` module)
//! ```ignore
//! define_interface! {
//!     pub interface ITaskbarList : IUnknown {
//!         iid = "{56FDF342-FD6D-11D0-958A-006097C9A090}";
//!         methods {
//!             HrInit = 3 (),
//!             AddTab = 4 (HWND),
//!         }
//!     }
//! }
//! ```
//!
//! ## Pieces
//!
//! | Module | Role |
//! |--------|------|
//! | [`guid`] | GUID text codec |
//! | [`layout`] | native types, struct layouts, type registry |
//! | [`signature`] | parameter types and native signatures |
//! | [`table`] | dispatch-table compiler |
//! | [`binder`] | live objects, bound methods, reference ownership |
//! | `runtime` | apartment and `CoCreateInstance` (Windows only) |
//! | [`interfaces`] | shell and taskbar interfaces |

pub mod binder;
pub mod com;
pub mod decl;
pub mod error;
pub mod guid;
pub mod interfaces;
pub mod layout;
#[cfg(windows)]
pub mod runtime;
pub mod signature;
pub mod table;

pub use comdecl_macro::com_interface;

pub use binder::{Activator, BoundMethod, ComObject, HandleState};
pub use com::{ComInterface, HRESULT, IID_IUNKNOWN, IUnknown};
pub use error::{ComError, DeclError, FormatError, Result, SchemaError, SignatureError};
pub use guid::GUID;
pub use layout::{Native, NativeType, StructLayout, TypeRegistry};
#[cfg(windows)]
pub use runtime::{ComApartment, SystemActivator};
pub use signature::{NativeArgs, ParamDecl, Signature, TypeExpr};
pub use table::{CollisionPolicy, InterfaceDecl, InterfaceDescriptor, MethodSlot};

// Re-export paste for use by declarative macros
#[doc(hidden)]
pub use paste::paste;

/// Everything needed to declare and call interfaces.
pub mod prelude {
    pub use crate::com::{ComInterface, HRESULT, IUnknown, S_FALSE, S_OK};
    pub use crate::{
        Activator, ComError, ComObject, GUID, InterfaceDescriptor, Result, alt, com_interface,
        define_interface, native_struct,
    };
    #[cfg(windows)]
    pub use crate::{ComApartment, SystemActivator};
}
