//! # XML Schema model
//!
//! Structured representation of one decoded `xs:schema` document. The
//! grammar's structural ambiguity (choices nested in sequences, wildcards,
//! content extensions) is normalized by [`decode`] so code generation only
//! sees the shapes described here.
//!
//! Everything derives `Serialize` so the CLI can dump the decoded model.

pub mod decode;

pub use decode::{decode_schema, decode_schema_node};

use serde::Serialize;
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;
use std::fmt;

/// The XML Schema namespace
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// A qualified reference as written, plus the namespace its prefix resolved to
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub namespace: Option<String>,
}

impl QName {
    /// Split `prefix:local` without namespace resolution
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.split_once(':') {
            Some((prefix, local)) => QName {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
                namespace: None,
            },
            None => QName {
                prefix: None,
                local: raw.to_string(),
                namespace: None,
            },
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// One decoded `xs:schema`
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    pub target_namespace: String,
    /// Prefix → namespace URI in scope on the schema element; `""` is the default namespace
    pub prefixes: BTreeMap<String, String>,
    pub element_form_default: Option<String>,
    pub elements: Vec<ElementDecl>,
    pub complex_types: Vec<ComplexType>,
    pub simple_types: Vec<SimpleType>,
    pub attributes: Vec<Attribute>,
    /// Named model groups
    pub groups: Vec<Group>,
    pub imports: Vec<Import>,
    pub includes: Vec<Include>,
}

impl SchemaDocument {
    /// Whether this document still points at other documents
    pub fn has_externals(&self) -> bool {
        !self.imports.is_empty() || !self.includes.is_empty()
    }

    pub fn find_complex_type(&self, name: &str) -> Option<&ComplexType> {
        self.complex_types.iter().find(|t| t.name == name)
    }

    pub fn find_simple_type(&self, name: &str) -> Option<&SimpleType> {
        self.simple_types.iter().find(|t| t.name == name)
    }

    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn find_group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Namespace a reference written in this document points into
    ///
    /// An already resolved namespace wins; an unknown or missing prefix falls
    /// back to the target namespace.
    pub fn namespace_of<'a>(&'a self, reference: &'a QName) -> &'a str {
        match (&reference.namespace, &reference.prefix) {
            (Some(namespace), _) => namespace.as_str(),
            (None, Some(prefix)) => self
                .prefixes
                .get(prefix)
                .map(String::as_str)
                .unwrap_or(self.target_namespace.as_str()),
            (None, None) => self.target_namespace.as_str(),
        }
    }

    /// Whether a named complex or simple type is declared here
    pub fn declares_type(&self, name: &str) -> bool {
        self.find_complex_type(name).is_some() || self.find_simple_type(name).is_some()
    }

    /// Every type reference that type mapping will see while rendering this document
    ///
    /// Union member types are excluded since unions render as plain strings.
    pub fn type_references(&self) -> Vec<&QName> {
        let mut refs = Vec::new();
        for simple in &self.simple_types {
            collect_simple(simple, &mut refs);
        }
        for element in &self.elements {
            collect_element(element, &mut refs);
        }
        for complex in &self.complex_types {
            collect_complex(complex, &mut refs);
        }
        for attribute in &self.attributes {
            collect_attribute(attribute, &mut refs);
        }
        for group in &self.groups {
            collect_particles(&group.particles, &mut refs);
        }
        refs
    }
}

fn collect_element<'a>(element: &'a ElementDecl, refs: &mut Vec<&'a QName>) {
    match &element.kind {
        ElementKind::Ref(name) | ElementKind::Typed(name) => refs.push(name),
        ElementKind::Complex(complex) => collect_complex(complex, refs),
        ElementKind::Simple(simple) => collect_simple(simple, refs),
        ElementKind::Untyped => {}
    }
}

fn collect_complex<'a>(complex: &'a ComplexType, refs: &mut Vec<&'a QName>) {
    collect_particles(&complex.particles, refs);
    if let Some(content) = &complex.content {
        let extension = content.extension();
        if !extension.base.is_empty() {
            refs.push(&extension.base);
        }
        collect_particles(&extension.particles, refs);
        for attribute in &extension.attributes {
            collect_attribute(attribute, refs);
        }
    }
    for attribute in &complex.attributes {
        collect_attribute(attribute, refs);
    }
}

fn collect_particles<'a>(particles: &'a Particles, refs: &mut Vec<&'a QName>) {
    for element in particles.elements() {
        collect_element(element, refs);
    }
    for group in &particles.groups {
        collect_particles(&group.particles, refs);
    }
}

fn collect_attribute<'a>(attribute: &'a Attribute, refs: &mut Vec<&'a QName>) {
    if let Some(type_ref) = &attribute.type_ref {
        refs.push(type_ref);
    }
    if let Some(simple) = &attribute.simple_type {
        collect_simple(simple, refs);
    }
}

fn collect_simple<'a>(simple: &'a SimpleType, refs: &mut Vec<&'a QName>) {
    match &simple.derivation {
        Some(SimpleDerivation::Restriction(restriction)) if !restriction.base.is_empty() => {
            refs.push(&restriction.base)
        }
        Some(SimpleDerivation::List(list)) => {
            if let Some(item) = &list.item_type {
                refs.push(item);
            }
            if let Some(inline) = &list.simple_type {
                collect_simple(inline, refs);
            }
        }
        _ => {}
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Import {
    pub namespace: Option<String>,
    pub schema_location: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Include {
    pub schema_location: Option<String>,
}

/// An element declaration, global or local
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDecl {
    /// Empty for `ref` elements
    pub name: String,
    pub kind: ElementKind,
    pub nillable: bool,
    pub min_occurs: Option<String>,
    pub max_occurs: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

impl ElementDecl {
    /// `maxOccurs="unbounded"`
    pub fn is_repeated(&self) -> bool {
        self.max_occurs.as_deref() == Some("unbounded")
    }

    /// Declared name, or the local part of the referenced element
    pub fn xml_name(&self) -> &str {
        match &self.kind {
            ElementKind::Ref(target) if self.name.is_empty() => &target.local,
            _ => &self.name,
        }
    }
}

/// How an element gets its content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ElementKind {
    /// `ref="..."` to a global element
    Ref(QName),
    /// `type="..."`
    Typed(QName),
    /// Anonymous inline complex type
    Complex(Box<ComplexType>),
    /// Anonymous inline simple type
    Simple(Box<SimpleType>),
    Untyped,
}

/// A complex type, named or anonymous
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexType {
    /// Empty for anonymous types
    pub name: String,
    pub is_abstract: bool,
    pub mixed: bool,
    pub particles: Particles,
    pub content: Option<ContentModel>,
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

/// Element particles of a complex type or extension
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Particles {
    pub sequence: Vec<ElementDecl>,
    pub choice: Vec<ElementDecl>,
    pub all: Vec<ElementDecl>,
    pub any: Vec<Wildcard>,
    /// `xs:group` references, expanded when rendering
    pub groups: Vec<Group>,
}

impl Particles {
    /// Named elements in render order: sequence, choice, all
    pub fn elements(&self) -> impl Iterator<Item = &ElementDecl> {
        self.sequence
            .iter()
            .chain(self.choice.iter())
            .chain(self.all.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
            && self.choice.is_empty()
            && self.all.is_empty()
            && self.any.is_empty()
            && self.groups.is_empty()
    }
}

/// A model group: a named definition at schema level, or a `ref` to one
/// inside a content model
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Empty for references
    pub name: String,
    pub reference: Option<QName>,
    pub min_occurs: Option<String>,
    pub max_occurs: Option<String>,
    pub particles: Particles,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

/// `complexContent` or `simpleContent`; a type carries at most one
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "extension", rename_all = "camelCase")]
pub enum ContentModel {
    Complex(Extension),
    Simple(Extension),
}

impl ContentModel {
    pub fn extension(&self) -> &Extension {
        match self {
            ContentModel::Complex(ext) | ContentModel::Simple(ext) => ext,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extension {
    pub base: QName,
    pub particles: Particles,
    pub attributes: Vec<Attribute>,
}

/// `xs:any`
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wildcard {
    pub min_occurs: Option<String>,
    pub max_occurs: Option<String>,
    pub namespace: Option<String>,
    pub process_contents: Option<String>,
}

/// A simple type, named or anonymous
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimpleType {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doc: String,
    /// `None` when the type has no restriction, list or union
    pub derivation: Option<SimpleDerivation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SimpleDerivation {
    Restriction(Restriction),
    List(List),
    Union(Union),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Restriction {
    /// Empty when the base is given as an inline simple type
    pub base: QName,
    pub enumeration: Vec<EnumValue>,
    pub facets: Vec<Facet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnumValue {
    pub value: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

/// Restriction facet other than `enumeration`; recorded, not enforced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facet {
    pub kind: FacetKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FacetKind {
    Pattern,
    Length,
    MinLength,
    MaxLength,
    MinInclusive,
    MaxInclusive,
    MinExclusive,
    MaxExclusive,
    TotalDigits,
    FractionDigits,
    WhiteSpace,
}

impl FacetKind {
    /// Facet kind for an XML Schema element local name
    pub fn from_local_name(name: &str) -> Option<Self> {
        Some(match name {
            "pattern" => FacetKind::Pattern,
            "length" => FacetKind::Length,
            "minLength" => FacetKind::MinLength,
            "maxLength" => FacetKind::MaxLength,
            "minInclusive" => FacetKind::MinInclusive,
            "maxInclusive" => FacetKind::MaxInclusive,
            "minExclusive" => FacetKind::MinExclusive,
            "maxExclusive" => FacetKind::MaxExclusive,
            "totalDigits" => FacetKind::TotalDigits,
            "fractionDigits" => FacetKind::FractionDigits,
            "whiteSpace" => FacetKind::WhiteSpace,
            _ => return None,
        })
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub item_type: Option<QName>,
    pub simple_type: Option<Box<SimpleType>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Union {
    pub member_types: Vec<QName>,
    pub simple_types: Vec<SimpleType>,
}

/// An attribute declaration
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Empty for `ref` attributes
    pub name: String,
    pub reference: Option<QName>,
    pub type_ref: Option<QName>,
    pub simple_type: Option<SimpleType>,
    #[serde(rename = "use")]
    pub usage: Option<String>,
    pub fixed: Option<String>,
    pub default: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

impl Attribute {
    /// `use="required"`
    pub fn is_required(&self) -> bool {
        self.usage.as_deref() == Some("required")
    }

    /// Declared name, or the local part of the referenced attribute
    pub fn xml_name(&self) -> &str {
        match &self.reference {
            Some(target) if self.name.is_empty() => &target.local,
            _ => &self.name,
        }
    }
}
