//! # WSDL and XML Schema parsing, resolution and Rust code generation
//!
//! `wsdlgen` reads a WSDL 1.1 service description (or a bare XML Schema),
//! follows every `import`/`include` it references and renders Rust types, an
//! async operation trait per port type and a dispatching server scaffold.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p wsdlgen -- -p stockquote -d ./src/generated ./stockquote.wsdl
//! ```
//!
//! Settings can also live in a `wsdlgen.kdl` file passed with `-c`:
//!
//! ```kdl
//! input "https://example.com/orders?wsdl"
//! package "orders"
//! output "src/generated"
//! base-path "crate::generated::orders"
//! namespace "urn:example:items" package="items"
//! ```
//!
//! Generated code depends on `serde`, `quick-xml` (with the `serialize`
//! feature) and `wsdlgen-runtime`.
//!
//! ## Modules
//!
//! - [`location`] - Document locations and relative reference resolution
//! - [`xsd`] - The XML Schema model and its decoder
//! - [`wsdl`] - The WSDL envelope and the message/binding/service lookups
//! - [`fetch`] - Reading documents from disk, HTTP, or memory
//! - [`resolve`] - Following `import` and `include` references
//! - [`corpus`] - The merged schema set
//! - [`codegen`] - Type mapping, naming, rendering and orchestration
//! - [`config`] - Layered configuration

pub mod cli;
pub mod codegen;
pub mod config;
pub mod corpus;
pub mod error;
pub mod fetch;
pub mod location;
pub mod resolve;
pub mod wsdl;
pub mod xsd;

pub use codegen::{GenerationResult, Generator, LoadedService};
pub use config::Config;
pub use error::{CodegenError, Result};
