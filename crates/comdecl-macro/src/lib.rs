//! Procedural macros for comdecl
//!
//! Provides:
//! - `#[com_interface(...)]` - Declare a COM interface as a trait and get a typed handle
//!
//! ## What gets generated
//!
//! For `#[com_interface(iid = "{...}", extends(IUnknown))] pub trait IFoo { ... }`:
//! - `IID_IFOO` - the interface id as a `GUID` constant
//! - `IFoo` - a `#[repr(transparent)]` handle over `ComObject`
//! - `impl ComInterface for IFoo` - registration data compiled into the
//!   interface's dispatch table on first use
//! - one `unsafe fn` per method that dispatches by name through that table
//! - `Deref` to the parent handle (or to `ComObject` for a root interface)
//!
//! Slots are absolute vtable indices: `#[slot(N)]` places a method, an
//! unannotated method takes the slot after the previous one.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, Expr, ExprLit, FnArg, Ident, ItemTrait, Lit, Meta, Pat, Path, Token, TraitItem,
    Type, parse::Parser, punctuated::Punctuated, spanned::Spanned,
};

/// Returns the path to the comdecl crate.
///
/// When `internal` is true (used inside the comdecl crate itself), this returns `crate`.
/// When `internal` is false (external crates), this returns `::comdecl`.
fn crate_path(internal: bool) -> TokenStream2 {
    if internal {
        quote! { crate }
    } else {
        quote! { ::comdecl }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Class id given either as a GUID literal or as a path to a `GUID` constant.
enum ClassId {
    Literal(u32, u16, u16, [u8; 8]),
    Path(Expr),
}

#[derive(Default)]
struct InterfaceConfig {
    iid: Option<(u32, u16, u16, [u8; 8])>,
    clsid: Option<ClassId>,
    base: Option<Path>,
    internal: bool,
}

fn parse_config(attr: TokenStream) -> Result<InterfaceConfig, syn::Error> {
    let mut config = InterfaceConfig::default();
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse(attr)?;

    for meta in metas {
        match &meta {
            Meta::NameValue(nv) if nv.path.is_ident("iid") => {
                let text = string_literal(&nv.value).ok_or_else(|| {
                    syn::Error::new(nv.value.span(), "iid must be a GUID string literal")
                })?;
                config.iid = Some(
                    parse_guid_string(&text)
                        .map_err(|e| syn::Error::new(nv.value.span(), e))?,
                );
            }
            Meta::NameValue(nv) if nv.path.is_ident("clsid") => {
                config.clsid = Some(match string_literal(&nv.value) {
                    Some(text) => {
                        let (d1, d2, d3, d4) = parse_guid_string(&text)
                            .map_err(|e| syn::Error::new(nv.value.span(), e))?;
                        ClassId::Literal(d1, d2, d3, d4)
                    }
                    None => ClassId::Path(nv.value.clone()),
                });
            }
            Meta::List(list) if list.path.is_ident("extends") => {
                let parents = list.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)?;
                if parents.len() != 1 {
                    // https://learn.microsoft.com/en-us/windows/win32/com/interface-inheritance
                    return Err(syn::Error::new(
                        list.span(),
                        format!(
                            "multiple inheritance is not supported: a COM interface extends exactly one parent, found {}",
                            parents.len()
                        ),
                    ));
                }
                config.base = parents.into_iter().next();
            }
            Meta::Path(path) if path.is_ident("internal") => {
                config.internal = true;
            }
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "unknown option, expected 'iid = \"...\"', 'clsid = ...', 'extends(...)' or 'internal'",
                ));
            }
        }
    }

    Ok(config)
}

fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Some(s.value()),
        _ => None,
    }
}

/// Parse a GUID string into its four fields. Braces are optional.
fn parse_guid_string(s: &str) -> Result<(u32, u16, u16, [u8; 8]), String> {
    let inner = match s.strip_prefix('{') {
        Some(rest) => rest
            .strip_suffix('}')
            .ok_or_else(|| format!("Unbalanced braces in GUID: '{}'", s))?,
        None => s,
    };

    let parts: Vec<&str> = inner.split('-').collect();
    if parts.len() != 5 {
        return Err(format!(
            "Invalid GUID format: expected 5 parts separated by '-', got {}",
            parts.len()
        ));
    }

    let expected = [8, 4, 4, 4, 12];
    for (i, (part, len)) in parts.iter().zip(expected).enumerate() {
        if part.len() != len {
            return Err(format!(
                "Invalid GUID part {}: expected {} hex digits, got '{}'",
                i + 1,
                len,
                part
            ));
        }
    }

    let data1 = u32::from_str_radix(parts[0], 16)
        .map_err(|_| format!("Invalid GUID data1: '{}'", parts[0]))?;
    let data2 = u16::from_str_radix(parts[1], 16)
        .map_err(|_| format!("Invalid GUID data2: '{}'", parts[1]))?;
    let data3 = u16::from_str_radix(parts[2], 16)
        .map_err(|_| format!("Invalid GUID data3: '{}'", parts[2]))?;

    let tail = format!("{}{}", parts[3], parts[4]);
    let mut data4 = [0u8; 8];
    for (i, byte) in data4.iter_mut().enumerate() {
        let digits = &tail[i * 2..i * 2 + 2];
        *byte = u8::from_str_radix(digits, 16)
            .map_err(|_| format!("Invalid GUID data4[{}]: '{}'", i, digits))?;
    }

    Ok((data1, data2, data3, data4))
}

fn guid_tokens(krate: &TokenStream2, guid: &(u32, u16, u16, [u8; 8])) -> TokenStream2 {
    let (d1, d2, d3, d4) = guid;
    quote! { #krate::GUID::new(#d1, #d2, #d3, [#(#d4),*]) }
}

// =============================================================================
// Validation helpers for FFI-safety
// =============================================================================

/// Check if a type is known to be non-FFI-safe
fn check_ffi_safe_type(ty: &Type) -> Result<(), String> {
    match ty {
        Type::Path(type_path) => {
            if let Some(segment) = type_path.path.segments.last() {
                let name = segment.ident.to_string();
                match name.as_str() {
                    "String" => {
                        return Err(
                            "String is not FFI-safe. Use *const u16 or alt!(*const u16, &str) instead"
                                .into(),
                        );
                    }
                    "Vec" => {
                        return Err(
                            "Vec<T> is not FFI-safe. Use *const T and a length parameter instead"
                                .into(),
                        );
                    }
                    "Box" => return Err("Box<T> is not FFI-safe. Use *mut T instead".into()),
                    "Rc" | "Arc" => {
                        return Err(format!(
                            "{} is not FFI-safe. Use raw pointers instead",
                            name
                        ));
                    }
                    "Result" => {
                        return Err(
                            "Result<T, E> is not FFI-safe. Use out-parameters instead".into(),
                        );
                    }
                    "str" => {
                        return Err("str is unsized and not FFI-safe. Use *const u16 instead".into());
                    }
                    _ => {}
                }
            }
            Ok(())
        }
        Type::Slice(_) => Err("slices are not FFI-safe. Use *const T and a length instead".into()),
        Type::TraitObject(_) => Err("trait objects are not FFI-safe".into()),
        Type::ImplTrait(_) => Err("impl Trait is not allowed in COM method signatures".into()),
        Type::Tuple(tuple) if !tuple.elems.is_empty() => {
            Err("tuples are not FFI-safe. Declare a native_struct! instead".into())
        }
        _ => Ok(()),
    }
}

/// Validate a trait method signature for COM dispatch
fn validate_trait_method(method: &syn::TraitItemFn) -> Result<(), syn::Error> {
    let sig = &method.sig;

    if method.default.is_some() {
        return Err(syn::Error::new(
            method.span(),
            "COM interface methods are declarations only; remove the body",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "COM interface methods cannot be generic",
        ));
    }
    if sig.asyncness.is_some() {
        return Err(syn::Error::new(
            sig.asyncness.span(),
            "COM interface methods cannot be async",
        ));
    }
    if sig.variadic.is_some() {
        return Err(syn::Error::new(
            sig.variadic.span(),
            "COM interface methods cannot be variadic",
        ));
    }

    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new(
                sig.span(),
                "COM interface methods must take &self",
            ));
        }
    }

    for arg in sig.inputs.iter().skip(1) {
        if let FnArg::Typed(pat_type) = arg {
            if !matches!(pat_type.pat.as_ref(), Pat::Ident(_)) {
                return Err(syn::Error::new(
                    pat_type.pat.span(),
                    "parameters must be plain identifiers",
                ));
            }
            let ty = alternatives(&pat_type.ty)?
                .and_then(|alts| alts.into_iter().next())
                .unwrap_or_else(|| (*pat_type.ty).clone());
            check_ffi_safe_type(&ty).map_err(|msg| syn::Error::new(pat_type.ty.span(), msg))?;
        }
    }

    Ok(())
}

/// Parse `#[slot(N)]` from a list of attributes.
fn parse_slot_attr(attrs: &[Attribute]) -> Result<Option<usize>, syn::Error> {
    for attr in attrs {
        if attr.path().is_ident("slot") {
            let lit: syn::LitInt = attr.parse_args()?;
            return lit.base10_parse().map(Some);
        }
    }
    Ok(None)
}

fn has_flag(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

fn doc_attrs(attrs: &[Attribute]) -> Vec<&Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("doc")).collect()
}

// =============================================================================
// Parameter types
// =============================================================================

/// The alternatives of an `alt!(A, B, ...)` type, if `ty` is one.
fn alternatives(ty: &Type) -> Result<Option<Vec<Type>>, syn::Error> {
    match ty {
        Type::Macro(mac)
            if mac
                .mac
                .path
                .segments
                .last()
                .is_some_and(|seg| seg.ident == "alt") =>
        {
            let alts = mac
                .mac
                .parse_body_with(Punctuated::<Type, Token![,]>::parse_terminated)?;
            if alts.is_empty() {
                return Err(syn::Error::new(mac.span(), "alt!() needs at least one type"));
            }
            Ok(Some(alts.into_iter().collect()))
        }
        Type::Paren(paren) => alternatives(&paren.elem),
        Type::Group(group) => alternatives(&group.elem),
        _ => Ok(None),
    }
}

fn type_name(ty: &Type) -> String {
    quote!(#ty).to_string().replace(' ', "")
}

/// Build the `TypeExpr` describing a declared parameter type.
fn type_expr(krate: &TokenStream2, ty: &Type) -> Result<TokenStream2, syn::Error> {
    if let Some(alts) = alternatives(ty)? {
        let mut exprs = Vec::with_capacity(alts.len());
        for (i, alt) in alts.iter().enumerate() {
            if i == 0 {
                exprs.push(type_expr(krate, alt)?);
            } else {
                // Only the first alternative reaches the ABI.
                let name = type_name(alt);
                exprs.push(quote! { #krate::TypeExpr::named(#name) });
            }
        }
        return Ok(quote! { #krate::TypeExpr::union([#(#exprs),*]) });
    }

    match ty {
        Type::Reference(reference) => {
            let name = type_name(&reference.elem);
            Ok(quote! { #krate::TypeExpr::by_ref(#krate::TypeExpr::named(#name)) })
        }
        Type::Paren(paren) => type_expr(krate, &paren.elem),
        _ => Ok(quote! { #krate::TypeExpr::of::<#ty>() }),
    }
}

// =============================================================================
// Code generation
// =============================================================================

struct MethodInfo {
    slot: usize,
    name: Ident,
    params: Vec<(Ident, Type)>,
    wrapper: bool,
    docs: Vec<Attribute>,
}

fn collect_methods(config: &InterfaceConfig, input: &ItemTrait) -> Result<Vec<MethodInfo>, syn::Error> {
    let mut methods = Vec::new();
    let mut next_slot: Option<usize> = if config.base.is_none() { Some(0) } else { None };

    for item in &input.items {
        let TraitItem::Fn(method) = item else {
            return Err(syn::Error::new(
                item.span(),
                "COM interfaces may only declare methods",
            ));
        };
        validate_trait_method(method)?;

        let name = method.sig.ident.clone();
        let slot = match (parse_slot_attr(&method.attrs)?, next_slot) {
            (Some(explicit), Some(next)) if explicit < next => {
                return Err(syn::Error::new(
                    name.span(),
                    format!(
                        "slot({}) for method '{}' would overlap with previous slots (next available: {})",
                        explicit, name, next
                    ),
                ));
            }
            (Some(explicit), _) => explicit,
            (None, Some(next)) => next,
            (None, None) => {
                return Err(syn::Error::new(
                    name.span(),
                    format!(
                        "method '{}' needs #[slot(N)]: the first slot after the parent interface is not known here",
                        name
                    ),
                ));
            }
        };
        next_slot = Some(slot + 1);

        let params = method
            .sig
            .inputs
            .iter()
            .filter_map(|arg| {
                if let FnArg::Typed(pat_type) = arg
                    && let Pat::Ident(pat_ident) = pat_type.pat.as_ref()
                {
                    return Some((pat_ident.ident.clone(), (*pat_type.ty).clone()));
                }
                None
            })
            .collect();

        methods.push(MethodInfo {
            slot,
            name,
            params,
            wrapper: !has_flag(&method.attrs, "no_wrapper"),
            docs: doc_attrs(&method.attrs).into_iter().cloned().collect(),
        });
    }

    Ok(methods)
}

fn com_interface_internal(config: InterfaceConfig, input: ItemTrait) -> Result<TokenStream2, syn::Error> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "COM interfaces cannot be generic",
        ));
    }
    if !input.supertraits.is_empty() {
        return Err(syn::Error::new(
            input.supertraits.span(),
            "use extends(Parent) instead of supertraits",
        ));
    }

    let krate = crate_path(config.internal);
    let name = &input.ident;
    let name_str = name.to_string();
    let vis = &input.vis;
    let docs = doc_attrs(&input.attrs);

    let iid = config.iid.as_ref().ok_or_else(|| {
        syn::Error::new(name.span(), "missing iid = \"{...}\" in #[com_interface]")
    })?;
    let iid_const = format_ident!("IID_{}", name_str.to_uppercase());
    let iid_value = guid_tokens(&krate, iid);

    let clsid = match &config.clsid {
        Some(ClassId::Literal(d1, d2, d3, d4)) => {
            let guid = guid_tokens(&krate, &(*d1, *d2, *d3, *d4));
            quote! { ::std::option::Option::Some(#guid) }
        }
        Some(ClassId::Path(expr)) => quote! { ::std::option::Option::Some(#expr) },
        None => quote! { ::std::option::Option::None },
    };

    let methods = collect_methods(&config, &input)?;

    // Registration data
    let mut registrations = Vec::new();
    let mut wrappers = Vec::new();
    for method in &methods {
        let method_name = &method.name;
        let method_str = method_name.to_string();
        let slot = method.slot;

        let mut params = Vec::new();
        for (param, ty) in &method.params {
            let param_str = param.to_string();
            let expr = type_expr(&krate, ty)?;
            params.push(quote! { #krate::ParamDecl::new(#param_str, #expr) });
        }
        registrations.push(quote! {
            .method(
                #method_str,
                #slot,
                ::std::vec::Vec::<#krate::ParamDecl>::from([#(#params),*]),
            )
        });

        if method.wrapper {
            let docs = &method.docs;
            let param_names: Vec<_> = method.params.iter().map(|(n, _)| n).collect();
            let param_types: Vec<_> = method.params.iter().map(|(_, t)| t).collect();
            wrappers.push(quote! {
                #(#docs)*
                ///
                /// # Safety
                /// Pointer arguments must be valid for the callee, and the object's
                /// vtable must match the declared slot.
                #[inline]
                pub unsafe fn #method_name(&self #(, #param_names: #param_types)*) -> #krate::Result<()> {
                    unsafe { self.0.invoke(#method_str, (#(#param_names,)*)) }
                }
            });
        }
    }

    let (parent_stmt, deref_impl) = match &config.base {
        Some(base) => (
            quote! {
                let decl = decl.extends(<#base as #krate::ComInterface>::descriptor()?);
            },
            quote! {
                impl ::std::ops::Deref for #name {
                    type Target = #base;

                    fn deref(&self) -> &#base {
                        // SAFETY: both handles are #[repr(transparent)] over ComObject.
                        unsafe { &*(self as *const Self as *const #base) }
                    }
                }
            },
        ),
        None => (
            quote! {},
            quote! {
                impl ::std::ops::Deref for #name {
                    type Target = #krate::ComObject;

                    fn deref(&self) -> &#krate::ComObject {
                        &self.0
                    }
                }
            },
        ),
    };

    let expanded = quote! {
        /// COM Interface ID (GUID) for this interface
        #vis const #iid_const: #krate::GUID = #iid_value;

        #(#docs)*
        #[repr(transparent)]
        #[derive(Debug)]
        #vis struct #name(#krate::ComObject);

        impl #krate::ComInterface for #name {
            const NAME: &'static str = #name_str;
            const IID: #krate::GUID = #iid_const;
            const CLSID: ::std::option::Option<#krate::GUID> = #clsid;

            fn descriptor() -> ::std::result::Result<&'static #krate::InterfaceDescriptor, #krate::DeclError> {
                static DESCRIPTOR: ::std::sync::OnceLock<
                    ::std::result::Result<#krate::InterfaceDescriptor, #krate::DeclError>,
                > = ::std::sync::OnceLock::new();

                DESCRIPTOR
                    .get_or_init(|| -> ::std::result::Result<#krate::InterfaceDescriptor, #krate::DeclError> {
                        let decl = #krate::InterfaceDecl::new(#name_str)
                            .iid(#iid_const);
                        let decl = match <Self as #krate::ComInterface>::CLSID {
                            ::std::option::Option::Some(clsid) => decl.clsid(clsid),
                            ::std::option::Option::None => decl,
                        };
                        #parent_stmt
                        decl
                            #(#registrations)*
                            .compile(#krate::TypeRegistry::global())
                    })
                    .as_ref()
                    .map_err(::std::clone::Clone::clone)
            }

            fn from_object(object: #krate::ComObject) -> Self {
                Self(object)
            }

            fn object(&self) -> &#krate::ComObject {
                &self.0
            }

            fn into_object(self) -> #krate::ComObject {
                self.0
            }
        }

        #deref_impl

        #[allow(non_snake_case)]
        impl #name {
            #(#wrappers)*
        }
    };

    Ok(expanded)
}

/// Declare a COM interface.
///
/// # Options
/// - `iid = "{...}"` - interface id (required)
/// - `clsid = "{...}"` or `clsid = CONST` - class created by `ComInterface::create`
/// - `extends(Parent)` - single parent interface; more than one is rejected
/// - `internal` - use `crate::` paths (inside comdecl itself)
///
/// # Method attributes
/// - `#[slot(N)]` - absolute vtable slot
/// - `#[no_wrapper]` - record in the dispatch table without a typed wrapper
///
/// Parameter types may be `alt!(A, B, ...)`: the whole list is recorded and
/// `A` is passed across the ABI. The declared return type is ignored; every
/// COM method returns an HRESULT.
///
/// # Example
/// ```ignore
/// #[com_interface(
///     iid = "{0000010B-0000-0000-C000-000000000046}",
///     extends(IPersist),
/// )]
/// pub trait IPersistFile {
///     #[slot(5)]
///     fn Load(&self, psz_file_name: alt!(*const u16, &str), dw_mode: u32);
///     fn Save(&self, psz_file_name: *const u16, f_remember: i32);  // slot 6
/// }
/// ```
#[proc_macro_attribute]
pub fn com_interface(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemTrait);

    // Parse configuration from attributes
    let config = match parse_config(attr) {
        Ok(config) => config,
        Err(err) => return err.to_compile_error().into(),
    };

    match com_interface_internal(config, input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
