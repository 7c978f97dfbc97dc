//! The [`Renderer`] capability and its Rust implementation.

use super::names::Sanitizer;
use super::router::Router;
use super::types::{SchemaScope, TypeMapper};
use super::utils::{format_tokens, make_ident};
use crate::corpus::SchemaSet;
use crate::error::{CodegenError, Result};
use crate::wsdl::ServiceDescription;
use crate::xsd::SchemaDocument;
use proc_macro2::{Literal, TokenStream};
use quote::quote;
use std::collections::BTreeSet;

/// Types rendered into one output module
#[derive(Debug, Clone, Copy)]
pub struct TypesContext<'a> {
    pub schemas: &'a SchemaSet,
    /// Namespaces routed to this module; `None` renders every schema
    pub namespaces: Option<&'a [String]>,
    /// Module name, empty for the single root module
    pub module: &'a str,
    pub router: &'a Router,
    pub sanitizer: &'a Sanitizer,
}

impl<'a> TypesContext<'a> {
    /// Schemas whose types belong to this module, in resolution order
    pub fn module_schemas(&self) -> impl Iterator<Item = &'a SchemaDocument> + use<'a> {
        let namespaces = self.namespaces;
        self.schemas.iter().filter(move |schema| {
            namespaces.is_none_or(|nss| nss.iter().any(|ns| *ns == schema.target_namespace))
        })
    }
}

/// Header of one output module
#[derive(Debug, Clone, Default)]
pub struct HeaderContext<'a> {
    /// Name shown in the banner
    pub module: &'a str,
    /// Path prefix under which sibling modules live
    pub base_path: Option<&'a str>,
    /// Sibling modules this module refers to
    pub imports: Vec<&'a str>,
}

/// Service-level rendering: operations and server scaffold
#[derive(Debug, Clone, Copy)]
pub struct ServiceContext<'a> {
    pub description: &'a ServiceDescription,
    pub schemas: &'a SchemaSet,
    pub router: &'a Router,
    pub sanitizer: &'a Sanitizer,
}

impl<'a> ServiceContext<'a> {
    /// Mapper for message types referenced from the root module
    pub(super) fn mapper(&self) -> TypeMapper<'a> {
        TypeMapper::new(
            self.router,
            self.sanitizer,
            SchemaScope::new("", &self.description.prefixes),
        )
    }
}

/// Turns the resolved model into source text
///
/// Implementations must be shareable across threads: generation units run in parallel.
pub trait Renderer: Sync {
    fn render_types(&self, ctx: &TypesContext<'_>) -> Result<Vec<u8>>;
    fn render_header(&self, ctx: &HeaderContext<'_>) -> Result<Vec<u8>>;
    fn render_operations(&self, ctx: &ServiceContext<'_>) -> Result<Vec<u8>>;
    fn render_server(&self, ctx: &ServiceContext<'_>) -> Result<Vec<u8>>;
    fn render_server_header(&self, ctx: &HeaderContext<'_>) -> Result<Vec<u8>>;
    fn render_embedded_description(&self, raw: &[u8]) -> Result<Vec<u8>>;
}

/// Renders Rust source with `quote`, formatted by `prettyplease`
///
/// Generated code depends on `serde`, `quick-xml` (with its `serialize`
/// feature) and `wsdlgen-runtime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustRenderer;

/// Runtime types every header imports
const RUNTIME_TYPES: &[&str] = &[
    "AnyType",
    "AnyUri",
    "NcName",
    "SoapFault",
    "XsdDate",
    "XsdDateTime",
    "XsdTime",
];

fn banner(module: &str) -> String {
    let module = if module.is_empty() { "root" } else { module };
    format!(
        "// @generated by wsdlgen. DO NOT EDIT.\n\
         //\n\
         // Module: {module}\n\
         //\n\
         // This file was generated from a WSDL/XML Schema description.\n\
         // Manual changes are overwritten on regeneration.\n\n"
    )
}

impl Renderer for RustRenderer {
    fn render_types(&self, ctx: &TypesContext<'_>) -> Result<Vec<u8>> {
        let mut declared = BTreeSet::new();
        let mut items = Vec::new();
        for schema in ctx.module_schemas() {
            let mut emitter = TypeEmitter::new(ctx, schema, &mut declared);
            emitter.emit_schema()?;
            items.extend(emitter.into_items());
        }

        if items.is_empty() {
            return Ok(Vec::new());
        }
        Ok(format_tokens(quote! { #(#items)* })?.into_bytes())
    }

    fn render_header(&self, ctx: &HeaderContext<'_>) -> Result<Vec<u8>> {
        let runtime = RUNTIME_TYPES.iter().map(|name| make_ident(name));
        let mut imports = Vec::new();
        if let Some(base) = ctx.base_path {
            for module in &ctx.imports {
                let path = syn::parse_str::<syn::Path>(&format!("{base}::{module}"))
                    .map_err(|source| CodegenError::FormatError { source })?;
                imports.push(quote! { use #path; });
            }
        }

        let tokens = quote! {
            #![allow(dead_code, non_camel_case_types, non_snake_case, unused_imports)]

            use wsdlgen_runtime::{#(#runtime),*};
            #(#imports)*
        };
        let mut text = banner(ctx.module);
        text.push_str(&format_tokens(tokens)?);
        Ok(text.into_bytes())
    }

    fn render_operations(&self, ctx: &ServiceContext<'_>) -> Result<Vec<u8>> {
        let tokens = super::operations::operations_tokens(ctx)?;
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        Ok(format_tokens(tokens)?.into_bytes())
    }

    fn render_server(&self, ctx: &ServiceContext<'_>) -> Result<Vec<u8>> {
        let tokens = super::operations::server_tokens(ctx)?;
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        Ok(format_tokens(tokens)?.into_bytes())
    }

    fn render_server_header(&self, ctx: &HeaderContext<'_>) -> Result<Vec<u8>> {
        let tokens = quote! {
            #![allow(dead_code, non_camel_case_types, non_snake_case, unused_imports)]

            use super::*;
            use wsdlgen_runtime::SoapFault;
        };
        let mut text = banner(&format!("{}::server", ctx.module));
        text.push_str(&format_tokens(tokens)?);
        Ok(text.into_bytes())
    }

    fn render_embedded_description(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let text = Literal::string(&String::from_utf8_lossy(raw));
        let tokens = quote! {
            /// The service description this module was generated from
            pub const WSDL: &str = #text;
        };
        Ok(format_tokens(tokens)?.into_bytes())
    }
}

/// Emits the type declarations of one schema into a module
pub(super) struct TypeEmitter<'c, 'd> {
    pub(super) schemas: &'c SchemaSet,
    pub(super) schema: &'c SchemaDocument,
    pub(super) sanitizer: &'c Sanitizer,
    pub(super) mapper: TypeMapper<'c>,
    module: &'c str,
    declared: &'d mut BTreeSet<String>,
    pub(super) items: Vec<TokenStream>,
}

impl<'c, 'd> TypeEmitter<'c, 'd> {
    pub(super) fn new(
        ctx: &TypesContext<'c>,
        schema: &'c SchemaDocument,
        declared: &'d mut BTreeSet<String>,
    ) -> Self {
        Self {
            schemas: ctx.schemas,
            schema,
            sanitizer: ctx.sanitizer,
            mapper: TypeMapper::new(ctx.router, ctx.sanitizer, SchemaScope::of(schema)),
            module: ctx.module,
            declared,
            items: Vec::new(),
        }
    }

    /// Simple types, then global elements, then complex types
    pub(super) fn emit_schema(&mut self) -> Result<()> {
        let schema = self.schema;
        for simple in &schema.simple_types {
            self.emit_simple_type(&simple.name, simple)?;
        }
        for element in &schema.elements {
            self.emit_global_element(element)?;
        }
        for complex in &schema.complex_types {
            self.emit_named_complex_type(complex)?;
        }
        Ok(())
    }

    pub(super) fn into_items(self) -> Vec<TokenStream> {
        self.items
    }

    /// Claim a type name in this module
    pub(super) fn declare(&mut self, type_name: &str) -> Result<()> {
        if self.declared.insert(type_name.to_string()) {
            Ok(())
        } else {
            Err(CodegenError::DuplicateType {
                name: type_name.to_string(),
                module: self.module.to_string(),
            })
        }
    }
}
