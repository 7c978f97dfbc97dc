use crate::xsd::{Attribute, ElementDecl, ElementKind, Group, SchemaDocument};
use serde::Serialize;
use std::collections::BTreeSet;

/// The merged set of schema documents a generation run works from
///
/// Built once after external resolution and read-only afterwards. Several
/// documents may share a target namespace; lookups that take a namespace
/// search all of them.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct SchemaSet {
    schemas: Vec<SchemaDocument>,
}

impl SchemaSet {
    pub fn new(schemas: Vec<SchemaDocument>) -> Self {
        Self { schemas }
    }

    /// Iterate over all documents in resolution order
    pub fn iter(&self) -> impl Iterator<Item = &SchemaDocument> {
        self.schemas.iter()
    }

    /// Documents whose target namespace is `namespace`
    pub fn in_namespace<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a SchemaDocument> {
        self.schemas.iter().filter(move |s| s.target_namespace == namespace)
    }

    /// Distinct target namespaces, sorted
    pub fn namespaces(&self) -> BTreeSet<&str> {
        self.schemas.iter().map(|s| s.target_namespace.as_str()).collect()
    }

    /// Whether a complex or simple type named `name` is declared in `namespace`
    pub fn has_type(&self, namespace: &str, name: &str) -> bool {
        self.in_namespace(namespace).any(|s| s.declares_type(name))
    }

    /// Global attribute `name` declared in `namespace`
    pub fn find_attribute<'a>(&'a self, namespace: &'a str, name: &'a str) -> Option<&'a Attribute> {
        self.in_namespace(namespace).find_map(|s| s.find_attribute(name))
    }

    /// Named model group `name` in `namespace`, with the document declaring it
    pub fn find_group<'a>(&'a self, namespace: &'a str, name: &'a str) -> Option<(&'a SchemaDocument, &'a Group)> {
        self.in_namespace(namespace)
            .find_map(|schema| schema.find_group(name).map(|group| (schema, group)))
    }

    /// First global element whose name matches `name` ignoring case
    pub fn find_element_ignore_case(&self, name: &str) -> Option<(&SchemaDocument, &ElementDecl)> {
        self.schemas.iter().find_map(|schema| {
            schema
                .elements
                .iter()
                .find(|el| el.name.eq_ignore_ascii_case(name))
                .map(|el| (schema, el))
        })
    }

    /// Name of the first global element typed as `namespace`'s `type_name`
    ///
    /// Each element's type reference is resolved against the prefixes of the
    /// document declaring it.
    pub fn find_name_by_type(&self, namespace: &str, type_name: &str) -> Option<&str> {
        self.schemas.iter().find_map(|schema| {
            schema
                .elements
                .iter()
                .find(|el| {
                    matches!(&el.kind, ElementKind::Typed(t)
                        if t.local == type_name && schema.namespace_of(t) == namespace)
                })
                .map(|el| el.name.as_str())
        })
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl<'a> IntoIterator for &'a SchemaSet {
    type Item = &'a SchemaDocument;
    type IntoIter = std::slice::Iter<'a, SchemaDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.schemas.iter()
    }
}
