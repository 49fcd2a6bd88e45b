//! Native struct layout for records that cross the COM boundary.
//!
//! Fields are laid out sequentially in declaration order, each at the next
//! offset that satisfies its natural alignment, and the total size is rounded
//! up to the largest field alignment. This is the C rule `#[repr(C)]` follows,
//! so a layout built from a `native_struct!` type always agrees with
//! `size_of` and `offset_of!`.

use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::{Arc, OnceLock};

use crate::error::SchemaError;
use crate::guid::GUID;
use crate::signature::TypeExpr;

/// A type with a fixed native representation.
#[derive(Clone, PartialEq, Eq)]
pub enum NativeType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Isize,
    Usize,
    F32,
    F64,
    /// Any data or interface pointer; the pointee does not affect the ABI.
    Pointer,
    Array(Box<NativeType>, usize),
    Struct(Arc<StructLayout>),
}

impl NativeType {
    /// Size in bytes on the current target, saturating at `usize::MAX`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.checked_size().unwrap_or(usize::MAX)
    }

    /// Size in bytes, or `None` if it does not fit in a `usize`.
    #[must_use]
    pub fn checked_size(&self) -> Option<usize> {
        match self {
            NativeType::I8 | NativeType::U8 => Some(1),
            NativeType::I16 | NativeType::U16 => Some(2),
            NativeType::I32 | NativeType::U32 | NativeType::F32 => Some(4),
            NativeType::I64 | NativeType::U64 | NativeType::F64 => Some(8),
            NativeType::Isize | NativeType::Usize | NativeType::Pointer => {
                Some(mem::size_of::<usize>())
            }
            NativeType::Array(elem, len) => elem.checked_size()?.checked_mul(*len),
            NativeType::Struct(layout) => Some(layout.size),
        }
    }

    /// Natural alignment in bytes on the current target.
    #[must_use]
    pub fn align(&self) -> usize {
        match self {
            NativeType::I64 => mem::align_of::<i64>(),
            NativeType::U64 => mem::align_of::<u64>(),
            NativeType::F64 => mem::align_of::<f64>(),
            NativeType::Array(elem, _) => elem.align(),
            NativeType::Struct(layout) => layout.align,
            NativeType::Isize | NativeType::Usize | NativeType::Pointer => {
                mem::align_of::<usize>()
            }
            other => other.size(),
        }
    }
}

impl fmt::Debug for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::I8 => f.write_str("i8"),
            NativeType::U8 => f.write_str("u8"),
            NativeType::I16 => f.write_str("i16"),
            NativeType::U16 => f.write_str("u16"),
            NativeType::I32 => f.write_str("i32"),
            NativeType::U32 => f.write_str("u32"),
            NativeType::I64 => f.write_str("i64"),
            NativeType::U64 => f.write_str("u64"),
            NativeType::Isize => f.write_str("isize"),
            NativeType::Usize => f.write_str("usize"),
            NativeType::F32 => f.write_str("f32"),
            NativeType::F64 => f.write_str("f64"),
            NativeType::Pointer => f.write_str("void*"),
            NativeType::Array(elem, len) => write!(f, "[{elem}; {len}]"),
            NativeType::Struct(layout) => f.write_str(&layout.name),
        }
    }
}

/// One field of a [`StructLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub ty: NativeType,
    pub offset: usize,
}

/// Sequential native layout of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub name: String,
    pub fields: Vec<FieldLayout>,
    pub size: usize,
    pub align: usize,
}

/// A record too large for the address space.
struct Overflow {
    fields: Vec<FieldLayout>,
    culprit: usize,
}

fn align_up(offset: usize, align: usize) -> Option<usize> {
    offset.div_ceil(align).checked_mul(align)
}

impl StructLayout {
    /// Lay out already-resolved fields in declaration order.
    ///
    /// Offsets and the total size saturate at `usize::MAX`; [`build`](Self::build)
    /// reports such a record as a [`SchemaError`] instead.
    pub fn from_native<N, I>(name: &str, fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, NativeType)>,
    {
        let fields: Vec<(String, NativeType)> =
            fields.into_iter().map(|(field, ty)| (field.into(), ty)).collect();
        Self::place(name, fields).unwrap_or_else(|overflow| {
            let align = overflow.fields.iter().map(|f| f.ty.align()).max().unwrap_or(1);
            Self {
                name: name.to_owned(),
                fields: overflow.fields,
                size: usize::MAX,
                align,
            }
        })
    }

    /// Checked placement. Fields after an overflow sit at `usize::MAX`.
    fn place(name: &str, fields: Vec<(String, NativeType)>) -> Result<Self, Overflow> {
        let mut offset = Some(0usize);
        let mut align = 1;
        let mut culprit = None;
        let fields: Vec<FieldLayout> = fields
            .into_iter()
            .enumerate()
            .map(|(i, (field, ty))| {
                let field_align = ty.align();
                align = align.max(field_align);
                let start = offset.and_then(|o| align_up(o, field_align));
                offset = start.and_then(|o| o.checked_add(ty.checked_size()?));
                if offset.is_none() && culprit.is_none() {
                    culprit = Some(i);
                }
                FieldLayout {
                    name: field,
                    offset: start.unwrap_or(usize::MAX),
                    ty,
                }
            })
            .collect();

        match offset.and_then(|o| align_up(o, align)) {
            Some(size) => Ok(Self {
                name: name.to_owned(),
                fields,
                size,
                align,
            }),
            None => {
                // Only the trailing padding overflowed.
                let culprit = culprit.unwrap_or(fields.len().saturating_sub(1));
                Err(Overflow { fields, culprit })
            }
        }
    }

    /// Resolve declared field types through `registry`, then lay them out.
    pub fn build(
        name: &str,
        fields: &[(&str, TypeExpr)],
        registry: &TypeRegistry,
    ) -> Result<Self, SchemaError> {
        let resolved = fields
            .iter()
            .map(|(field, expr)| {
                registry
                    .resolve(expr)
                    .map(|ty| ((*field).to_owned(), ty))
                    .ok_or_else(|| SchemaError {
                        structure: name.to_owned(),
                        field: (*field).to_owned(),
                        ty: expr.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::place(name, resolved).map_err(|overflow| {
            let culprit = overflow.fields.get(overflow.culprit);
            SchemaError {
                structure: name.to_owned(),
                field: culprit.map(|f| f.name.clone()).unwrap_or_default(),
                ty: culprit.map(|f| f.ty.to_string()).unwrap_or_default(),
            }
        })
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// =============================================================================
// Native - Rust types with a native representation
// =============================================================================

/// Rust types that can be passed across the COM boundary by value.
pub trait Native {
    /// The native representation of `Self`.
    fn native_type() -> NativeType;
}

macro_rules! impl_native_primitive {
    ($($ty:ty => $native:ident),* $(,)?) => {
        $(
            impl Native for $ty {
                #[inline]
                fn native_type() -> NativeType {
                    NativeType::$native
                }
            }
        )*
    };
}

impl_native_primitive! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    isize => Isize,
    usize => Usize,
    f32 => F32,
    f64 => F64,
}

impl<T: ?Sized> Native for *const T {
    fn native_type() -> NativeType {
        NativeType::Pointer
    }
}

impl<T: ?Sized> Native for *mut T {
    fn native_type() -> NativeType {
        NativeType::Pointer
    }
}

impl<T> Native for &T {
    fn native_type() -> NativeType {
        NativeType::Pointer
    }
}

impl<T> Native for &mut T {
    fn native_type() -> NativeType {
        NativeType::Pointer
    }
}

// Option of a reference is a nullable pointer.
impl<T> Native for Option<&T> {
    fn native_type() -> NativeType {
        NativeType::Pointer
    }
}

impl<T> Native for Option<&mut T> {
    fn native_type() -> NativeType {
        NativeType::Pointer
    }
}

impl<T: Native, const N: usize> Native for [T; N] {
    fn native_type() -> NativeType {
        NativeType::Array(Box::new(T::native_type()), N)
    }
}

impl Native for GUID {
    fn native_type() -> NativeType {
        static LAYOUT: OnceLock<Arc<StructLayout>> = OnceLock::new();
        let layout = LAYOUT.get_or_init(|| {
            Arc::new(StructLayout::from_native(
                "GUID",
                [
                    ("Data1", NativeType::U32),
                    ("Data2", NativeType::U16),
                    ("Data3", NativeType::U16),
                    ("Data4", NativeType::Array(Box::new(NativeType::U8), 8)),
                ],
            ))
        });
        NativeType::Struct(Arc::clone(layout))
    }
}

// =============================================================================
// TypeRegistry - names used by data-style declarations
// =============================================================================

/// Maps declared type names to their native representation.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, NativeType>,
}

impl TypeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rust primitive names plus the Windows aliases used by the shell and
    /// taskbar interfaces.
    #[must_use]
    pub fn windows() -> Self {
        let mut registry = Self::new();
        for (name, ty) in [
            ("i8", NativeType::I8),
            ("u8", NativeType::U8),
            ("i16", NativeType::I16),
            ("u16", NativeType::U16),
            ("i32", NativeType::I32),
            ("u32", NativeType::U32),
            ("i64", NativeType::I64),
            ("u64", NativeType::U64),
            ("isize", NativeType::Isize),
            ("usize", NativeType::Usize),
            ("f32", NativeType::F32),
            ("f64", NativeType::F64),
            ("BYTE", NativeType::U8),
            ("WORD", NativeType::U16),
            ("USHORT", NativeType::U16),
            ("WCHAR", NativeType::U16),
            ("DWORD", NativeType::U32),
            ("ULONG", NativeType::U32),
            ("UINT", NativeType::U32),
            ("INT", NativeType::I32),
            ("LONG", NativeType::I32),
            ("BOOL", NativeType::I32),
            ("HRESULT", NativeType::I32),
            ("TBPFLAG", NativeType::I32),
            ("ULONGLONG", NativeType::U64),
            ("HWND", NativeType::Pointer),
            ("HANDLE", NativeType::Pointer),
            ("LPVOID", NativeType::Pointer),
            ("LPCWSTR", NativeType::Pointer),
            ("LPWSTR", NativeType::Pointer),
            ("LPCOLESTR", NativeType::Pointer),
            ("REFIID", NativeType::Pointer),
            ("GUID", GUID::native_type()),
        ] {
            registry.register(name, ty);
        }
        crate::interfaces::register_shell_types(&mut registry);
        registry
    }

    /// Process-wide registry returned by [`TypeRegistry::windows`].
    pub fn global() -> &'static TypeRegistry {
        static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(TypeRegistry::windows)
    }

    /// Add or replace a named type.
    pub fn register(&mut self, name: impl Into<String>, ty: NativeType) -> &mut Self {
        self.types.insert(name.into(), ty);
        self
    }

    /// Add a struct under its layout name.
    pub fn register_struct(&mut self, layout: Arc<StructLayout>) -> &mut Self {
        let name = layout.name.clone();
        self.register(name, NativeType::Struct(layout))
    }

    /// Look up a named type.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&NativeType> {
        self.types.get(name)
    }

    /// Resolve a type expression: unions take their first alternative and
    /// references and pointers become [`NativeType::Pointer`].
    #[must_use]
    pub fn resolve(&self, expr: &TypeExpr) -> Option<NativeType> {
        match expr {
            TypeExpr::Native(ty) => Some(ty.clone()),
            TypeExpr::Named(name) => self.get(name).cloned(),
            TypeExpr::Pointer(_) | TypeExpr::ByRef(_) => Some(NativeType::Pointer),
            TypeExpr::Array(elem, len) => self
                .resolve(elem)
                .map(|elem| NativeType::Array(Box::new(elem), *len)),
            TypeExpr::Union(alternatives) => {
                alternatives.first().and_then(|first| self.resolve(first))
            }
        }
    }
}

/// Declare a `#[repr(C)]` struct together with its [`Native`] layout.
///
/// Field types must implement [`Native`], so the recorded layout is derived
/// from the same types the compiler lays out.
///
/// ```ignore
/// native_struct! {
///     pub struct FILETIME {
///         pub dwLowDateTime: u32,
///         pub dwHighDateTime: u32,
///     }
/// }
/// ```
#[macro_export]
macro_rules! native_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Clone, Copy)]
        #[allow(non_snake_case)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $name {
            /// Native layout of this struct.
            pub fn layout() -> ::std::sync::Arc<$crate::layout::StructLayout> {
                static LAYOUT: ::std::sync::OnceLock<
                    ::std::sync::Arc<$crate::layout::StructLayout>,
                > = ::std::sync::OnceLock::new();
                ::std::sync::Arc::clone(LAYOUT.get_or_init(|| {
                    ::std::sync::Arc::new($crate::layout::StructLayout::from_native(
                        stringify!($name),
                        [$(
                            (
                                stringify!($field),
                                <$ty as $crate::layout::Native>::native_type(),
                            )
                        ),*],
                    ))
                }))
            }
        }

        impl $crate::layout::Native for $name {
            fn native_type() -> $crate::layout::NativeType {
                $crate::layout::NativeType::Struct($name::layout())
            }
        }
    };
}
