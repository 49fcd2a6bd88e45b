//! Method signatures.
//!
//! Every COM method is called as `HRESULT (*)(void* this, T1, ..., Tn)`. The
//! declared return type never reaches the ABI, so extraction only looks at the
//! parameters after `self`.

use std::ffi::c_void;
use std::fmt;

use crate::com::HRESULT;
use crate::error::SignatureError;
use crate::layout::{Native, NativeType, TypeRegistry};

/// A declared parameter type, before it is resolved to a [`NativeType`].
#[derive(Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// Already resolved, usually from a Rust type through [`Native`].
    Native(NativeType),
    /// A type name looked up in a [`TypeRegistry`].
    Named(String),
    /// `*const T` / `*mut T`.
    Pointer(Box<TypeExpr>),
    /// `&T` / `&mut T`: an out-parameter passed by reference.
    ByRef(Box<TypeExpr>),
    /// `[T; N]`.
    Array(Box<TypeExpr>, usize),
    /// Accepted alternatives; only the first reaches the ABI.
    Union(Vec<TypeExpr>),
}

impl TypeExpr {
    /// The type expression of a Rust type.
    #[must_use]
    pub fn of<T: Native>() -> Self {
        TypeExpr::Native(T::native_type())
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    #[must_use]
    pub fn pointer(pointee: TypeExpr) -> Self {
        TypeExpr::Pointer(Box::new(pointee))
    }

    #[must_use]
    pub fn by_ref(target: TypeExpr) -> Self {
        TypeExpr::ByRef(Box::new(target))
    }

    #[must_use]
    pub fn array(elem: TypeExpr, len: usize) -> Self {
        TypeExpr::Array(Box::new(elem), len)
    }

    #[must_use]
    pub fn union<I: IntoIterator<Item = TypeExpr>>(alternatives: I) -> Self {
        TypeExpr::Union(alternatives.into_iter().collect())
    }

    /// Parse the textual form used by data-style declarations.
    ///
    /// Accepted: `Name`, `*const T`, `*mut T`, `&T`, `&mut T`, `[T; N]` and
    /// `alt!(A, B, ...)`. Whitespace between tokens is ignored, so the output
    /// of `stringify!` on a type parses.
    pub fn parse(text: &str) -> Result<Self, SignatureError> {
        let mut parser = TypeParser {
            text,
            rest: text.trim(),
        };
        let expr = parser.expr()?;
        if parser.rest.trim().is_empty() {
            Ok(expr)
        } else {
            Err(parser.error())
        }
    }
}

struct TypeParser<'a> {
    text: &'a str,
    rest: &'a str,
}

impl<'a> TypeParser<'a> {
    fn error(&self) -> SignatureError {
        SignatureError::Syntax {
            text: self.text.to_owned(),
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        let trimmed = self.rest.trim_start();
        match trimmed.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let trimmed = self.rest.trim_start();
        match trimmed.strip_prefix(keyword) {
            Some(rest) if !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') => {
                self.rest = rest;
                true
            }
            _ => false,
        }
    }

    fn ident(&mut self) -> Result<&'a str, SignatureError> {
        let trimmed = self.rest.trim_start();
        let end = trimmed
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
            .unwrap_or(trimmed.len());
        if end == 0 {
            return Err(self.error());
        }
        let (ident, rest) = trimmed.split_at(end);
        self.rest = rest;
        // Paths keep only their last segment.
        Ok(ident.rsplit("::").next().unwrap_or(ident))
    }

    fn expr(&mut self) -> Result<TypeExpr, SignatureError> {
        if self.eat("*") {
            if !(self.eat_keyword("const") || self.eat_keyword("mut")) {
                return Err(self.error());
            }
            return Ok(TypeExpr::pointer(self.expr()?));
        }
        if self.eat("&") {
            self.eat_keyword("mut");
            return Ok(TypeExpr::by_ref(self.expr()?));
        }
        if self.eat("[") {
            let elem = self.expr()?;
            if !self.eat(";") {
                return Err(self.error());
            }
            let trimmed = self.rest.trim_start();
            let end = trimmed
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(trimmed.len());
            let len = trimmed[..end].parse().map_err(|_| self.error())?;
            self.rest = &trimmed[end..];
            if !self.eat("]") {
                return Err(self.error());
            }
            return Ok(TypeExpr::array(elem, len));
        }

        let name = self.ident()?;
        if name == "alt" && self.eat("!") {
            if !self.eat("(") {
                return Err(self.error());
            }
            let mut alternatives = Vec::new();
            while !self.eat(")") {
                alternatives.push(self.expr()?);
                if !self.eat(",") && !self.rest.trim_start().starts_with(')') {
                    return Err(self.error());
                }
            }
            return Ok(TypeExpr::Union(alternatives));
        }
        Ok(TypeExpr::named(name))
    }
}

impl fmt::Debug for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Native(ty) => write!(f, "{ty}"),
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::Pointer(pointee) => write!(f, "*{pointee}"),
            TypeExpr::ByRef(target) => write!(f, "&{target}"),
            TypeExpr::Array(elem, len) => write!(f, "[{elem}; {len}]"),
            TypeExpr::Union(alternatives) => {
                f.write_str("alt!(")?;
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{alt}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A declared parameter: name and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeExpr,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Native parameter list of a COM method, `this` excluded.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub params: Vec<NativeType>,
}

impl Signature {
    /// Resolve declared parameters.
    ///
    /// Unions take their first alternative; pointers and by-reference
    /// parameters become raw pointers whatever they point to.
    pub fn extract(params: &[ParamDecl], registry: &TypeRegistry) -> Result<Self, SignatureError> {
        params
            .iter()
            .map(|param| resolve_param(param, registry))
            .collect::<Result<Vec<_>, _>>()
            .map(|params| Signature { params })
    }

    /// Number of parameters after `this`.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

fn resolve_param(param: &ParamDecl, registry: &TypeRegistry) -> Result<NativeType, SignatureError> {
    if let TypeExpr::Union(alternatives) = &param.ty
        && alternatives.is_empty()
    {
        return Err(SignatureError::EmptyUnion {
            param: param.name.clone(),
        });
    }
    registry
        .resolve(&param.ty)
        .ok_or_else(|| SignatureError::UnknownType {
            param: param.name.clone(),
            ty: param.ty.to_string(),
        })
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HRESULT (*)(void*")?;
        for param in &self.params {
            write!(f, ", {param}")?;
        }
        f.write_str(")")
    }
}

/// Type-position list of accepted alternatives; expands to the first one.
///
/// `#[com_interface]` records the whole list, so a parameter declared as
/// `alt!(*const u16, &str)` is documented as accepting either while the
/// native signature takes the pointer.
#[macro_export]
macro_rules! alt {
    ($first:ty $(, $rest:ty)* $(,)?) => {
        $first
    };
}

// =============================================================================
// NativeArgs - calling through a resolved function pointer
// =============================================================================

/// Argument tuples that can be passed to a COM method.
pub trait NativeArgs {
    /// Native types of the arguments, in order.
    fn native_types() -> Vec<NativeType>;

    /// Call `function` with `this` prepended.
    ///
    /// # Safety
    /// `function` must be a COM method taking exactly these arguments after
    /// `this`, and `this` must be an object whose vtable holds `function`.
    unsafe fn invoke(self, function: *const c_void, this: *mut c_void) -> HRESULT;
}

macro_rules! impl_native_args {
    ($($ty:ident $arg:ident),*) => {
        impl<$($ty: Native),*> NativeArgs for ($($ty,)*) {
            fn native_types() -> Vec<NativeType> {
                vec![$(<$ty as Native>::native_type()),*]
            }

            unsafe fn invoke(self, function: *const c_void, this: *mut c_void) -> HRESULT {
                let ($($arg,)*) = self;
                let function: unsafe extern "system" fn(*mut c_void $(, $ty)*) -> HRESULT =
                    unsafe { std::mem::transmute(function) };
                unsafe { function(this $(, $arg)*) }
            }
        }
    };
}

impl_native_args!();
impl_native_args!(A a);
impl_native_args!(A a, B b);
impl_native_args!(A a, B b, C c);
impl_native_args!(A a, B b, C c, D d);
impl_native_args!(A a, B b, C c, D d, E e);
impl_native_args!(A a, B b, C c, D d, E e, F f);
impl_native_args!(A a, B b, C c, D d, E e, F f, G g);
impl_native_args!(A a, B b, C c, D d, E e, F f, G g, H h);
