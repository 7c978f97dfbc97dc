//! Schema type references to Rust types.

use super::names::{IdentContext, Sanitizer};
use super::router::Router;
use crate::xsd::{QName, SchemaDocument};
use std::collections::BTreeMap;
use std::fmt;

/// XML Schema built-in types, keyed by lower-cased local name
const BUILTIN_TYPES: &[(&str, &str)] = &[
    ("string", "String"),
    ("token", "String"),
    ("float", "f32"),
    ("double", "f64"),
    ("decimal", "f64"),
    ("integer", "i32"),
    ("int", "i32"),
    ("short", "i16"),
    ("byte", "i8"),
    ("long", "i64"),
    ("boolean", "bool"),
    ("datetime", "XsdDateTime"),
    ("date", "XsdDate"),
    ("time", "XsdTime"),
    ("base64binary", "Vec<u8>"),
    ("hexbinary", "Vec<u8>"),
    ("unsignedint", "u32"),
    ("nonnegativeinteger", "u32"),
    ("unsignedshort", "u16"),
    ("unsignedbyte", "u8"),
    ("unsignedlong", "u64"),
    ("anytype", "AnyType"),
    ("ncname", "NcName"),
    ("anyuri", "AnyUri"),
];

/// Rust type for a built-in XML Schema type name, compared case-insensitively
pub fn builtin_type(local: &str) -> Option<&'static str> {
    BUILTIN_TYPES
        .iter()
        .find(|(xsd, _)| xsd.eq_ignore_ascii_case(local))
        .map(|(_, rust)| *rust)
}

/// The schema a reference is being mapped from
#[derive(Debug, Clone, Copy)]
pub struct SchemaScope<'a> {
    pub namespace: &'a str,
    pub prefixes: &'a BTreeMap<String, String>,
}

impl<'a> SchemaScope<'a> {
    pub fn new(namespace: &'a str, prefixes: &'a BTreeMap<String, String>) -> Self {
        Self { namespace, prefixes }
    }

    pub fn of(schema: &'a SchemaDocument) -> Self {
        Self::new(&schema.target_namespace, &schema.prefixes)
    }

    /// Namespace a reference belongs to; unprefixed references stay in scope
    pub fn namespace_of<'q>(&self, reference: &'q QName) -> &'q str
    where
        'a: 'q,
    {
        match (&reference.namespace, &reference.prefix) {
            (Some(namespace), _) => namespace,
            (None, Some(prefix)) => self
                .prefixes
                .get(prefix.as_str())
                .map(String::as_str)
                .unwrap_or(self.namespace),
            (None, None) => self.namespace,
        }
    }
}

/// A reference mapped to a Rust type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    /// Type name, qualified with its module when it lives elsewhere
    pub name: String,
    pub builtin: bool,
    pub optional: bool,
    /// Foreign module the name is qualified with
    pub import: Option<String>,
}

impl MappedType {
    /// A required type that needs no declaration or import
    pub fn builtin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            builtin: true,
            optional: false,
            import: None,
        }
    }

    /// Field type for a single occurrence
    pub fn render(&self) -> String {
        match (self.optional, self.builtin) {
            (false, _) => self.name.clone(),
            (true, true) => format!("Option<{}>", self.name),
            (true, false) => format!("Option<Box<{}>>", self.name),
        }
    }

    /// Field type for an unbounded element
    pub fn repeated(&self) -> String {
        format!("Vec<{}>", self.name)
    }
}

impl fmt::Display for MappedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Maps references from one schema to Rust types
#[derive(Debug, Clone, Copy)]
pub struct TypeMapper<'a> {
    router: &'a Router,
    sanitizer: &'a Sanitizer,
    scope: SchemaScope<'a>,
}

impl<'a> TypeMapper<'a> {
    pub fn new(router: &'a Router, sanitizer: &'a Sanitizer, scope: SchemaScope<'a>) -> Self {
        Self {
            router,
            sanitizer,
            scope,
        }
    }

    pub fn scope(&self) -> SchemaScope<'a> {
        self.scope
    }

    /// The same mapper reading references written in another document
    pub fn with_scope(self, scope: SchemaScope<'a>) -> Self {
        Self { scope, ..self }
    }

    /// Map a reference; `nillable` or `min_occurs == Some("0")` makes it optional
    pub fn map_type(&self, reference: &QName, nillable: bool, min_occurs: Option<&str>) -> MappedType {
        let optional = nillable || min_occurs == Some("0");

        if let Some(rust) = builtin_type(&reference.local) {
            return MappedType {
                name: rust.to_string(),
                builtin: true,
                optional,
                import: None,
            };
        }

        let type_name = self.sanitizer.sanitize(&reference.local, IdentContext::TypeName);
        let namespace = self.scope.namespace_of(reference);
        let module = self.router.route(namespace);
        let qualify = (reference.prefix.is_some() || reference.namespace.is_some())
            && namespace != self.scope.namespace
            && !module.is_empty()
            && module != self.router.route(self.scope.namespace);

        if qualify {
            MappedType {
                name: format!("{module}::{type_name}"),
                builtin: false,
                optional,
                import: Some(module.to_string()),
            }
        } else {
            MappedType {
                name: type_name,
                builtin: false,
                optional,
                import: None,
            }
        }
    }
}
