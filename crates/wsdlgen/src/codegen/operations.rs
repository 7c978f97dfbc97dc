//! Service operations: one trait per port type, its operation enum, port
//! addresses, and the dispatching server scaffold.

use super::render::ServiceContext;
use super::utils::{doc_comment, make_ident, parse_type, unique_name, value_to_variant_name};
use crate::error::Result;
use crate::wsdl::{PortType, ServiceDescription};
use crate::xsd::QName;
use heck::ToShoutySnakeCase;
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};
use std::collections::BTreeSet;
use tracing::debug;

use super::names::normalize;

/// One operation of a port type, resolved to Rust names and types
struct OperationItem {
    name: String,
    variant: syn::Ident,
    method: syn::Ident,
    soap_action: String,
    doc: TokenStream,
    request: Option<MessageType>,
    response: Option<MessageType>,
}

/// Rust type carried by a message and the XML root it travels under
struct MessageType {
    ty: syn::Type,
    root: String,
}

/// Port types with at least one operation, and their resolved operations
fn port_types<'a>(ctx: &ServiceContext<'a>) -> Result<Vec<(&'a PortType, Vec<OperationItem>)>> {
    let description = ctx.description;
    let mut out = Vec::new();
    for port_type in &description.port_types {
        if port_type.operations.is_empty() {
            continue;
        }

        let mut variants = BTreeSet::new();
        let mut methods = BTreeSet::new();
        let mut items = Vec::with_capacity(port_type.operations.len());
        for operation in &port_type.operations {
            let soap_action = description
                .find_soap_action(&operation.name, &port_type.name)
                .unwrap_or_default()
                .to_string();

            let mut doc = operation.doc.clone();
            if !soap_action.is_empty() {
                if !doc.is_empty() {
                    doc.push_str("\n\n");
                }
                doc.push_str(&format!("SOAP action: `{soap_action}`"));
            }
            if !operation.faults.is_empty() {
                let faults: Vec<_> = operation.faults.iter().map(|f| format!("`{}`", f.name)).collect();
                doc.push_str(&format!("\n\nFaults: {}", faults.join(", ")));
            }

            items.push(OperationItem {
                name: operation.name.clone(),
                variant: make_ident(&unique_name(&mut variants, value_to_variant_name(&operation.name))),
                method: make_ident(&unique_name(&mut methods, ctx.sanitizer.field_name(&operation.name))),
                soap_action,
                doc: doc_comment(&doc),
                request: message_type(ctx, operation.input.as_ref())?,
                response: message_type(ctx, operation.output.as_ref())?,
            });
        }
        out.push((port_type, items));
    }
    Ok(out)
}

fn message_type(ctx: &ServiceContext<'_>, message: Option<&QName>) -> Result<Option<MessageType>> {
    let Some(message) = message else {
        return Ok(None);
    };
    let Some(reference) = ctx.description.find_message_type(message, ctx.schemas) else {
        return Ok(None);
    };
    let mapped = ctx.mapper().map_type(&reference, false, None);
    Ok(Some(MessageType {
        ty: parse_type(&mapped.name)?,
        root: message_root(ctx.description, message),
    }))
}

/// XML root of a message body: the first part's element, else the part name
fn message_root(description: &ServiceDescription, message: &QName) -> String {
    description
        .find_message(&message.local)
        .and_then(|m| m.parts.first())
        .map(|part| match &part.element {
            Some(element) => element.local.clone(),
            None => part.name.clone(),
        })
        .unwrap_or_else(|| message.local.clone())
}

fn unit_or(message: &Option<MessageType>) -> TokenStream {
    match message {
        Some(message) => {
            let ty = &message.ty;
            quote! { #ty }
        }
        None => quote! { () },
    }
}

/// Operation traits, operation enums and port address constants
pub(super) fn operations_tokens(ctx: &ServiceContext<'_>) -> Result<TokenStream> {
    let mut tokens = TokenStream::new();

    for (port_type, items) in port_types(ctx)? {
        debug!(port_type = %port_type.name, operations = items.len(), "rendering operations");
        let trait_ident = make_ident(&ctx.sanitizer.type_name(&port_type.name));
        let enum_ident = format_ident!("{}Operation", trait_ident);

        let methods = items.iter().map(|item| {
            let doc = &item.doc;
            let method = &item.method;
            let request = unit_or(&item.request);
            let response = unit_or(&item.response);
            quote! {
                #doc
                fn #method(
                    &self,
                    request: #request,
                ) -> impl std::future::Future<Output = Result<#response, SoapFault>> + Send;
            }
        });

        let variants: Vec<_> = items.iter().map(|item| &item.variant).collect();
        let names = items.iter().map(|item| Literal::string(&item.name));
        let actions = items.iter().map(|item| Literal::string(&item.soap_action));

        let mut seen = BTreeSet::new();
        let lookup = items
            .iter()
            .filter(|item| !item.soap_action.is_empty() && seen.insert(item.soap_action.as_str()))
            .map(|item| {
                let action = Literal::string(&item.soap_action);
                let variant = &item.variant;
                quote! { #action => Some(Self::#variant), }
            });

        let trait_doc = doc_comment(&format!("Operations of the `{}` port type", port_type.name));
        let enum_doc = doc_comment(&format!("Operations of [`{trait_ident}`]"));
        tokens.extend(quote! {
            #trait_doc
            pub trait #trait_ident {
                #(#methods)*
            }

            #enum_doc
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum #enum_ident {
                #(#variants,)*
            }

            impl #enum_ident {
                pub const ALL: &'static [Self] = &[#(Self::#variants),*];

                /// Operation name as declared in the service description
                pub fn name(self) -> &'static str {
                    match self {
                        #(Self::#variants => #names,)*
                    }
                }

                /// Bound SOAP action, empty when the binding declares none
                pub fn soap_action(self) -> &'static str {
                    match self {
                        #(Self::#variants => #actions,)*
                    }
                }

                pub fn from_soap_action(action: &str) -> Option<Self> {
                    match action {
                        #(#lookup)*
                        _ => None,
                    }
                }
            }
        });
    }

    let mut constants = BTreeSet::new();
    for service in &ctx.description.services {
        for port in service.ports.iter().filter(|port| !port.address.is_empty()) {
            let base = normalize(&port.name).to_shouty_snake_case();
            let name = make_ident(&unique_name(&mut constants, format!("{base}_ADDRESS")));
            let address = Literal::string(&port.address);
            let doc = doc_comment(&format!("Address of the `{}` port of `{}`", port.name, service.name));
            tokens.extend(quote! {
                #doc
                pub const #name: &str = #address;
            });
        }
    }

    Ok(tokens)
}

/// Dispatcher structs routing SOAP requests to an operation trait implementation
pub(super) fn server_tokens(ctx: &ServiceContext<'_>) -> Result<TokenStream> {
    let mut tokens = TokenStream::new();

    for (port_type, items) in port_types(ctx)? {
        let trait_ident = make_ident(&ctx.sanitizer.type_name(&port_type.name));
        let enum_ident = format_ident!("{}Operation", trait_ident);
        let server_ident = format_ident!("{}Server", trait_ident);

        let arms = items.iter().map(|item| {
            let variant = &item.variant;
            let method = &item.method;
            let decode = match &item.request {
                Some(MessageType { ty, .. }) => quote! {
                    let request: #ty = quick_xml::de::from_str(body)
                        .map_err(|err| SoapFault::client(err.to_string()))?;
                },
                None => quote! { let request = (); },
            };
            let encode = match &item.response {
                Some(MessageType { root, .. }) => {
                    let root = Literal::string(root);
                    quote! {
                        quick_xml::se::to_string_with_root(#root, &response)
                            .map_err(|err| SoapFault::server(err.to_string()))
                    }
                }
                None => quote! {
                    let () = response;
                    Ok(String::new())
                },
            };
            quote! {
                #enum_ident::#variant => {
                    #decode
                    let response = self.service.#method(request).await?;
                    #encode
                }
            }
        });

        let doc = doc_comment(&format!(
            "Routes `{}` requests to a [`{trait_ident}`] implementation",
            port_type.name
        ));
        tokens.extend(quote! {
            #doc
            #[derive(Debug, Clone)]
            pub struct #server_ident<S> {
                service: S,
            }

            impl<S: #trait_ident> #server_ident<S> {
                pub fn new(service: S) -> Self {
                    Self { service }
                }

                pub fn service(&self) -> &S {
                    &self.service
                }

                /// Decode `body`, run the operation bound to `soap_action` and encode its response
                pub async fn dispatch(&self, soap_action: &str, body: &str) -> Result<String, SoapFault> {
                    match #enum_ident::from_soap_action(soap_action) {
                        Some(operation) => self.call(operation, body).await,
                        None => Err(SoapFault::client(format!("unknown SOAP action `{soap_action}`"))),
                    }
                }

                /// Decode `body`, run `operation` and encode its response
                pub async fn call(&self, operation: #enum_ident, body: &str) -> Result<String, SoapFault> {
                    match operation {
                        #(#arms)*
                    }
                }
            }
        });
    }

    Ok(tokens)
}
