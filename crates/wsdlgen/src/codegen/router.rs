use super::names::Sanitizer;
use super::types::{SchemaScope, TypeMapper};
use crate::config::NamespaceMapping;
use crate::corpus::SchemaSet;
use std::collections::{BTreeMap, BTreeSet};

/// Routes namespaces to output modules and records which foreign modules each
/// namespace's generated code refers to
///
/// With an empty mapping every namespace lands in the single root module and
/// no imports are ever recorded.
#[derive(Debug, Clone, Default)]
pub struct Router {
    packages: NamespaceMapping,
    imports: BTreeMap<String, BTreeSet<String>>,
}

impl Router {
    pub fn new(packages: NamespaceMapping) -> Self {
        Self {
            packages,
            imports: BTreeMap::new(),
        }
    }

    pub fn is_multi_package(&self) -> bool {
        !self.packages.is_empty()
    }

    /// Module for `namespace`, empty if unmapped
    pub fn route(&self, namespace: &str) -> &str {
        self.packages.get(namespace).unwrap_or_default()
    }

    /// Record that code generated for `namespace` refers to `module`
    ///
    /// Returns whether the import was new.
    pub fn record_import(&mut self, namespace: &str, module: &str) -> bool {
        self.imports
            .entry(namespace.to_string())
            .or_default()
            .insert(module.to_string())
    }

    /// Foreign modules referenced from `namespace`, sorted
    pub fn imports(&self, namespace: &str) -> impl Iterator<Item = &str> {
        self.imports
            .get(namespace)
            .into_iter()
            .flat_map(|modules| modules.iter().map(String::as_str))
    }

    /// `(namespace, module)` pairs, sorted by namespace
    pub fn packages(&self) -> impl Iterator<Item = (&str, &str)> {
        self.packages.iter()
    }

    /// Walk every type reference in the set and record the foreign modules it needs
    ///
    /// Runs once before rendering so renderers only ever read the router.
    pub fn discover_imports(&mut self, set: &SchemaSet, sanitizer: &Sanitizer) {
        if !self.is_multi_package() {
            return;
        }

        let mut found = Vec::new();
        for schema in set {
            let mapper = TypeMapper::new(self, sanitizer, SchemaScope::of(schema));
            for reference in schema.type_references() {
                if let Some(import) = mapper.map_type(reference, false, None).import {
                    found.push((schema.target_namespace.clone(), import));
                }
            }
        }

        for (namespace, module) in found {
            self.record_import(&namespace, &module);
        }
    }
}
