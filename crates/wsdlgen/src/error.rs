use miette::{Diagnostic, SourceSpan};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a [`Fetcher`](crate::fetch::Fetcher) while reading document bytes
#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    /// Reading a local file failed
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The HTTP request itself failed (connection, TLS, timeout)
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// The server answered with something other than 200 OK
    #[error("received response code {status}")]
    Status { status: u16 },

    /// An in-memory fetcher has no document under this key
    #[error("no document registered for {0}")]
    NotFound(String),
}

/// Errors raised while turning document bytes into a model
#[derive(Debug, Error, Diagnostic)]
pub enum DecodeError {
    /// Document bytes are not UTF-8
    #[error("document is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    /// Document is not well-formed XML
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Root element is neither `xs:schema` nor `wsdl:definitions`
    #[error("expected an xs:schema or wsdl:definitions root element, found <{found}>")]
    UnexpectedRoot { found: String },
}

impl DecodeError {
    /// Row/column (1-based) of the failure, when the XML parser reported one
    pub fn position(&self) -> Option<(u32, u32)> {
        match self {
            DecodeError::Xml(e) => {
                let pos = e.pos();
                Some((pos.row, pos.col))
            }
            _ => None,
        }
    }
}

/// Errors that can occur while loading, resolving or generating code
#[derive(Debug, Error, Diagnostic)]
pub enum CodegenError {
    /// IO error when writing generated files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A document could not be fetched
    #[error("Failed to fetch {location}")]
    #[diagnostic(
        code(wsdlgen::fetch_error),
        help("Check that the document exists and is reachable; pass --insecure for self-signed TLS certificates")
    )]
    Fetch {
        /// Location that failed
        location: String,
        #[source]
        source: FetchError,
    },

    /// A document could not be decoded
    #[error("Failed to decode {location}")]
    #[diagnostic(
        code(wsdlgen::decode_error),
        help("Check that the document is well-formed UTF-8 XML")
    )]
    Decode {
        #[source]
        source: DecodeError,
        /// Location of the document that failed to decode
        location: String,
        /// Source text that failed to decode
        #[source_code]
        src: Option<String>,
        /// Location of the error in the source
        #[label("decode error here")]
        span: Option<SourceSpan>,
    },

    /// A relative reference could not be resolved against its base
    #[error("Cannot resolve {reference:?} against {base}")]
    #[diagnostic(code(wsdlgen::invalid_location))]
    InvalidLocation {
        reference: String,
        base: String,
        #[source]
        source: url::ParseError,
    },

    /// Multi-module output requested but a schema namespace has no module
    #[error("No package mapping for namespace {namespace:?}")]
    #[diagnostic(
        code(wsdlgen::unresolved_namespace),
        help("Map the namespace with --pkg <module>=<namespace> or a `namespace` node in the config file")
    )]
    UnresolvedNamespace { namespace: String },

    /// Extension base did not resolve after external resolution
    #[error("Base type {base} of {type_name} does not resolve to a known type")]
    #[diagnostic(
        code(wsdlgen::unresolved_base),
        help("Make sure the schema declaring the base type is imported or included")
    )]
    UnresolvedBase {
        /// Base reference as written
        base: String,
        /// Type whose content extends the base
        type_name: String,
        /// Namespace the base was looked up in
        namespace: String,
    },

    /// Two declarations produce the same Rust type in one module
    #[error("Type {name} is declared more than once in module {module:?}")]
    #[diagnostic(
        code(wsdlgen::duplicate_type),
        help("Two schema documents declare the same type; map their namespaces to different modules or remove the duplicate")
    )]
    DuplicateType { name: String, module: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(wsdlgen::config))]
    Config { message: String },

    /// Code formatting error
    #[error("Failed to format generated code")]
    #[diagnostic(code(wsdlgen::format_error))]
    FormatError {
        #[source]
        source: syn::Error,
    },

    /// Generic error with context
    #[error("{message}")]
    #[diagnostic(code(wsdlgen::error))]
    Other {
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CodegenError {
    /// Create a fetch error for a location
    pub fn fetch(location: impl ToString, source: FetchError) -> Self {
        Self::Fetch {
            location: location.to_string(),
            source,
        }
    }

    /// Create a decode error, attaching the source text and error span when available
    pub fn decode(source: DecodeError, location: impl ToString, bytes: &[u8]) -> Self {
        let src = std::str::from_utf8(bytes).ok().map(str::to_string);
        let span = match (&src, source.position()) {
            (Some(text), Some((row, col))) => Some((byte_offset(text, row, col), 1).into()),
            _ => None,
        };

        Self::Decode {
            source,
            location: location.to_string(),
            src,
            span,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unresolved base error
    pub fn unresolved_base(
        base: impl Into<String>,
        type_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::UnresolvedBase {
            base: base.into(),
            type_name: type_name.into(),
            namespace: namespace.into(),
        }
    }
}

/// Byte offset of a 1-based row/column position
fn byte_offset(text: &str, row: u32, col: u32) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(row.saturating_sub(1) as usize)
        .map(str::len)
        .sum();
    let column: usize = text[line_start..]
        .chars()
        .take(col.saturating_sub(1) as usize)
        .map(char::len_utf8)
        .sum();
    (line_start + column).min(text.len().saturating_sub(1))
}

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, CodegenError>;
