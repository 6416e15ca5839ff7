//! Procedural macros for Switchboard handler registration.
//!
//! This crate provides the `#[handlers]` attribute macro, which turns an
//! inherent `impl` block of a behavior provider into a handler table at
//! compile time.
//!
//! # Registration rules
//!
//! ```ignore
//! use switchboard::prelude::*;
//!
//! struct EditPanel;
//!
//! #[handlers]
//! impl EditPanel {
//!     /// Merge vertices
//!     #[handler(undoable)]
//!     fn tb000(&self, call: &Call<'_>) -> HandlerResult {
//!         call.host().execute("polyMergeVertex")?;
//!         Ok(())
//!     }
//!
//!     fn tb000_init(&self, call: &Call<'_>) -> HandlerResult {
//!         let menu = call.widget.option_menu()?;
//!         menu.add(CheckBox::new().object_name("chk000").text("Texture"))?;
//!         Ok(())
//!     }
//!
//!     fn helper(&self) -> u32 {
//!         3
//!     }
//! }
//! ```
//!
//! - Every method with the shape `fn(&self, &Call<'_>) -> HandlerResult`
//!   becomes a handler named after the method.
//! - A `_init` suffix registers the method as the lazy constructor paired
//!   with the handler of the stripped name (`header_init` pairs with
//!   `header`).
//! - Methods of any other shape are left alone.
//!
//! Method options (`#[handler(...)]`):
//! - `skip`: never register the method
//! - `name = "..."`: register under a different widget name
//! - `undoable`: run the handler inside an undo transaction
//! - `description = "..."`: history description; defaults to the first line
//!   of the doc comment, then to the handler name

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Expr, ExprLit, FnArg, ImplItem, ImplItemFn, ItemImpl, Lit, LitStr, Meta,
    ReturnType, parse_macro_input,
};

/// Register the methods of an inherent `impl` block as Switchboard handlers.
///
/// Generates an `impl switchboard::Handlers for Type` whose handler table
/// contains every handler and `_init` method of the block.
#[proc_macro_attribute]
pub fn handlers(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        let attr = TokenStream2::from(attr);
        return syn::Error::new_spanned(attr, "#[handlers] takes no arguments")
            .to_compile_error()
            .into();
    }
    let mut input = parse_macro_input!(item as ItemImpl);

    match impl_handlers(&mut input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Parsed registration of one method.
struct HandlerInfo {
    method: syn::Ident,
    /// Widget name the method is registered for (without `_init`).
    name: String,
    is_init: bool,
    undoable: bool,
    description: Option<String>,
}

/// Parsed `#[handler(...)]` options.
#[derive(Default)]
struct HandlerAttrs {
    present: bool,
    skip: bool,
    name: Option<String>,
    undoable: bool,
    description: Option<String>,
}

fn impl_handlers(input: &mut ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[handlers] only supports inherent impl blocks",
        ));
    }

    let mut infos = Vec::new();
    for item in input.items.iter_mut() {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let attrs = take_handler_attrs(&mut method.attrs)?;
        if attrs.skip {
            continue;
        }
        if !has_handler_shape(method) {
            if attrs.present {
                return Err(syn::Error::new_spanned(
                    &method.sig,
                    "handler methods must have the signature \
                     `fn(&self, &Call<'_>) -> HandlerResult`",
                ));
            }
            continue;
        }
        infos.push(parse_handler(method, attrs));
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    let registrations = infos.iter().map(generate_registration);

    Ok(quote! {
        #input

        impl #impl_generics ::switchboard::Handlers for #self_ty #where_clause {
            fn handler_table() -> ::switchboard::HandlerTable<Self> {
                ::switchboard::HandlerTable::<Self>::new()
                    #(#registrations)*
            }
        }
    })
}

/// Remove every `#[handler(...)]` attribute from a method and parse them.
fn take_handler_attrs(attrs: &mut Vec<Attribute>) -> syn::Result<HandlerAttrs> {
    let mut result = HandlerAttrs::default();
    let mut error = None;

    attrs.retain(|attr| {
        if !attr.path().is_ident("handler") {
            return true;
        }
        result.present = true;
        if let Meta::List(_) = &attr.meta {
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    result.skip = true;
                } else if meta.path.is_ident("undoable") {
                    result.undoable = true;
                } else if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else if meta.path.is_ident("description") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.description = Some(value.value());
                } else {
                    return Err(meta.error("unknown handler option"));
                }
                Ok(())
            });
            if let Err(err) = parsed {
                error.get_or_insert(err);
            }
        }
        false
    });

    match error {
        Some(err) => Err(err),
        None => Ok(result),
    }
}

/// `fn name(&self, call: &Call) -> HandlerResult`, non-generic.
///
/// `Result<(), _>` is accepted in place of `HandlerResult`.
fn has_handler_shape(method: &ImplItemFn) -> bool {
    let sig = &method.sig;
    if !sig.generics.params.is_empty() || sig.asyncness.is_some() {
        return false;
    }
    let returns_result = match &sig.output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => is_handler_result(ty),
    };
    let mut inputs = sig.inputs.iter();
    let receiver_ok = matches!(
        inputs.next(),
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none()
    );
    let call_ok = matches!(
        inputs.next(),
        Some(FnArg::Typed(arg)) if is_call_ref(&arg.ty)
    );
    returns_result && receiver_ok && call_ok && inputs.next().is_none()
}

fn last_segment(ty: &syn::Type) -> Option<&syn::PathSegment> {
    match ty {
        syn::Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        syn::Type::Group(group) => last_segment(&group.elem),
        syn::Type::Paren(paren) => last_segment(&paren.elem),
        _ => None,
    }
}

/// `&Call<'_>`, `&Call` or any path ending in `Call`.
fn is_call_ref(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Reference(reference) if reference.mutability.is_none() => {
            last_segment(&reference.elem).is_some_and(|segment| segment.ident == "Call")
        }
        _ => false,
    }
}

/// `HandlerResult` or `Result<(), E>`.
fn is_handler_result(ty: &syn::Type) -> bool {
    let Some(segment) = last_segment(ty) else {
        return false;
    };
    if segment.ident == "HandlerResult" {
        return true;
    }
    if segment.ident != "Result" {
        return false;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => matches!(
            args.args.first(),
            Some(syn::GenericArgument::Type(syn::Type::Tuple(unit))) if unit.elems.is_empty()
        ),
        _ => false,
    }
}

fn parse_handler(method: &ImplItemFn, attrs: HandlerAttrs) -> HandlerInfo {
    let method_name = method.sig.ident.to_string();
    let registered = attrs.name.unwrap_or(method_name);
    let (name, is_init) = match registered.strip_suffix("_init") {
        Some(base) if !base.is_empty() => (base.to_string(), true),
        _ => (registered, false),
    };
    let description = attrs.description.or_else(|| doc_summary(&method.attrs));

    HandlerInfo {
        method: method.sig.ident.clone(),
        name,
        is_init,
        undoable: attrs.undoable,
        description,
    }
}

/// First non-empty line of the doc comment.
fn doc_summary(attrs: &[Attribute]) -> Option<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .find(|line| !line.is_empty())
}

fn generate_registration(info: &HandlerInfo) -> TokenStream2 {
    let name = &info.name;
    let method = &info.method;

    if info.is_init {
        return quote! { .init(#name, Self::#method) };
    }

    let mut tokens = quote! { .handler(#name, Self::#method) };
    if let Some(description) = &info.description {
        tokens.extend(quote! { .describe(#name, #description) });
    }
    if info.undoable {
        tokens.extend(quote! { .undoable(#name) });
    }
    tokens
}
