use crate::error::{CodegenError, Result};
use heck::ToUpperCamelCase;
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::BTreeSet;

use super::names::normalize;

/// Convert a value string to a valid Rust variant or constant name
pub(super) fn value_to_variant_name(value: &str) -> String {
    let variant = normalize(value).to_upper_camel_case();

    if variant.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("_{}", variant)
    } else if variant.is_empty() {
        "Unknown".to_string()
    } else {
        variant
    }
}

/// Claim `base` in `taken`, appending `_2`, `_3`, ... until it is free
pub(super) fn unique_name(taken: &mut BTreeSet<String>, base: String) -> String {
    if taken.insert(base.clone()) {
        return base;
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| taken.insert(candidate.clone()))
        .unwrap_or(base)
}

/// Create an identifier, using a raw identifier if the name is a keyword
///
/// Names that cannot be raw identifiers (`self`, `crate`, `_`) get a trailing
/// underscore; anything still unusable becomes `__`.
pub(super) fn make_ident(s: &str) -> syn::Ident {
    syn::parse_str::<syn::Ident>(s)
        .or_else(|_| syn::parse_str::<syn::Ident>(&format!("r#{s}")))
        .or_else(|_| syn::parse_str::<syn::Ident>(&format!("{s}_")))
        .unwrap_or_else(|_| syn::Ident::new("__", proc_macro2::Span::call_site()))
}

/// Parse a rendered Rust type such as `Option<Box<ext::Item>>`
pub(super) fn parse_type(s: &str) -> Result<syn::Type> {
    syn::parse_str::<syn::Type>(s).map_err(|source| CodegenError::FormatError { source })
}

/// Doc attributes for schema documentation, one per trimmed line
pub(super) fn doc_comment(doc: &str) -> TokenStream {
    let lines = doc
        .lines()
        .map(str::trim)
        .skip_while(|line| line.is_empty())
        .map(|line| format!(" {line}"));
    quote! { #(#[doc = #lines])* }
}

/// Parse generated tokens as a file and pretty-print them
pub(super) fn format_tokens(tokens: TokenStream) -> Result<String> {
    let file = syn::parse2::<syn::File>(tokens).map_err(|source| CodegenError::FormatError { source })?;
    Ok(prettyplease::unparse(&file))
}
