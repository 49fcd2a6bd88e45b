//! Data-style interface declarations.
//!
//! `define_interface!` declares an interface from a method table instead of a
//! trait. It suits methods that are only ever called dynamically: no typed
//! wrappers are generated, calls go through [`ComObject::method`].
//!
//! Table entries are merged after everything inherited, so an entry that
//! reuses an inherited name overrides it (with a warning, or an error under
//! `collisions = Reject`).
//!
//! # Example
//! ```ignore
//! define_interface! {
//!     /// ITaskbarList
//!     pub interface ITaskbarList : IUnknown {
//!         iid = "{56FDF342-FD6D-11D0-958A-006097C9A090}";
//!         methods {
//!             HrInit = 3 (),
//!             AddTab = 4 (HWND),
//!             SetActiveAlt = 7 { hwnd: HWND },
//!         }
//!     }
//! }
//!
//! let taskbar = ITaskbarList::create()?;
//! unsafe { taskbar.method("HrInit")?.call(())? };
//! ```
//!
//! [`ComObject::method`]: crate::ComObject::method

use crate::error::DeclError;
use crate::signature::{ParamDecl, TypeExpr};

/// Parse the stringified parameter types of one table entry.
///
/// Unnamed parameters are called `arg0`, `arg1`, ... in declaration order.
#[doc(hidden)]
pub fn table_params(
    interface: &str,
    method: &str,
    params: &[(Option<&str>, &str)],
) -> Result<Vec<ParamDecl>, DeclError> {
    params
        .iter()
        .enumerate()
        .map(|(i, (name, ty))| {
            let name = name.map_or_else(|| format!("arg{i}"), str::to_owned);
            TypeExpr::parse(ty)
                .map(|ty| ParamDecl::new(name, ty))
                .map_err(|source| DeclError::Signature {
                    interface: interface.to_owned(),
                    method: method.to_owned(),
                    source,
                })
        })
        .collect()
}

/// Define a COM interface from a method table.
///
/// # Syntax
/// ```ignore
/// define_interface! {
///     pub interface IFoo : IParent {
///         iid = "{...}";
///         clsid = CLSID_FOO;           // optional, any GUID expression
///         collisions = Reject;         // optional, default Warn
///         methods {
///             Positional = 3 (HWND, INT),
///             Named = 4 { hwnd: HWND, flags: DWORD },
///             NoArgs = 5 (),
///         }
///     }
/// }
/// ```
///
/// Parameter types are names known to [`TypeRegistry::global`], raw pointers,
/// references, arrays or `alt!(...)` lists.
///
/// [`TypeRegistry::global`]: crate::TypeRegistry::global
#[macro_export]
macro_rules! define_interface {
    (@clsid) => { ::std::option::Option::None };
    (@clsid $clsid:expr) => { ::std::option::Option::Some($clsid) };

    (@params ( $($ty:ty),* $(,)? )) => {
        [$( (::std::option::Option::<&str>::None, stringify!($ty)) ),*]
    };
    (@params { $($param:ident : $ty:ty),* $(,)? }) => {
        [$( (::std::option::Option::Some(stringify!($param)), stringify!($ty)) ),*]
    };

    (@deref $name:ident) => {
        impl ::std::ops::Deref for $name {
            type Target = $crate::ComObject;

            fn deref(&self) -> &$crate::ComObject {
                &self.0
            }
        }
    };
    (@deref $name:ident : $base:path) => {
        impl ::std::ops::Deref for $name {
            type Target = $base;

            fn deref(&self) -> &$base {
                // SAFETY: both handles are #[repr(transparent)] over ComObject.
                unsafe { &*(self as *const Self as *const $base) }
            }
        }
    };

    (
        $(
            $(#[$meta:meta])*
            $vis:vis interface $name:ident $(: $base:path)? {
                iid = $iid:literal;
                $(clsid = $clsid:expr;)?
                $(collisions = $policy:ident;)?
                methods {
                    $($method:ident = $slot:literal $params:tt),* $(,)?
                }
            }
        )*
    ) => {
        $(
            $crate::paste! {
                /// COM Interface ID (GUID) for this interface
                $vis const [<IID_ $name:upper>]: $crate::GUID = $crate::GUID::from_braced($iid);
            }

            $(#[$meta])*
            #[repr(transparent)]
            #[derive(Debug)]
            $vis struct $name($crate::ComObject);

            impl $crate::ComInterface for $name {
                const NAME: &'static str = stringify!($name);
                const IID: $crate::GUID = $crate::GUID::from_braced($iid);
                const CLSID: ::std::option::Option<$crate::GUID> =
                    $crate::define_interface!(@clsid $($clsid)?);

                fn descriptor() -> ::std::result::Result<&'static $crate::InterfaceDescriptor, $crate::DeclError> {
                    static DESCRIPTOR: ::std::sync::OnceLock<
                        ::std::result::Result<$crate::InterfaceDescriptor, $crate::DeclError>,
                    > = ::std::sync::OnceLock::new();

                    DESCRIPTOR
                        .get_or_init(|| -> ::std::result::Result<$crate::InterfaceDescriptor, $crate::DeclError> {
                            let decl = $crate::InterfaceDecl::new(stringify!($name))
                                .iid(<Self as $crate::ComInterface>::IID);
                            let decl = match <Self as $crate::ComInterface>::CLSID {
                                ::std::option::Option::Some(clsid) => decl.clsid(clsid),
                                ::std::option::Option::None => decl,
                            };
                            $(
                                let decl = decl.extends(<$base as $crate::ComInterface>::descriptor()?);
                            )?
                            $(
                                let decl = decl.collisions($crate::CollisionPolicy::$policy);
                            )?
                            $(
                                let decl = decl.table_entry(
                                    stringify!($method),
                                    $slot,
                                    $crate::decl::table_params(
                                        stringify!($name),
                                        stringify!($method),
                                        &$crate::define_interface!(@params $params),
                                    )?,
                                );
                            )*
                            decl.compile($crate::TypeRegistry::global())
                        })
                        .as_ref()
                        .map_err(::std::clone::Clone::clone)
                }

                fn from_object(object: $crate::ComObject) -> Self {
                    Self(object)
                }

                fn object(&self) -> &$crate::ComObject {
                    &self.0
                }

                fn into_object(self) -> $crate::ComObject {
                    self.0
                }
            }

            $crate::define_interface!(@deref $name $(: $base)?);
        )*
    };
}
