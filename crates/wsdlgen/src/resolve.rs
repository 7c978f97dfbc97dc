//! Following `xs:import` and `xs:include` references across documents.

use crate::config::NamespaceMapping;
use crate::error::{CodegenError, Result};
use crate::fetch::Fetcher;
use crate::location::Location;
use crate::xsd::{SchemaDocument, decode_schema};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Default bound on how many documents may trigger further resolution
pub const DEFAULT_MAX_RECURSION: u32 = 20;

/// Recursively fetches and decodes the external documents a schema references
///
/// Documents are deduplicated by the canonical key of their resolved
/// location. The recursion counter is shared by the whole pass: every
/// document that leads to another round of resolution increments it, and once
/// it reaches the ceiling further nesting is dropped with a warning.
pub struct Resolver<'a, F> {
    fetcher: &'a F,
    namespaces: &'a NamespaceMapping,
    visited: BTreeSet<String>,
    depth: u32,
    max_recursion: u32,
}

impl<'a, F: Fetcher> Resolver<'a, F> {
    pub fn new(fetcher: &'a F, namespaces: &'a NamespaceMapping) -> Self {
        Self {
            fetcher,
            namespaces,
            visited: BTreeSet::new(),
            depth: 0,
            max_recursion: DEFAULT_MAX_RECURSION,
        }
    }

    pub fn with_max_recursion(mut self, max_recursion: u32) -> Self {
        self.max_recursion = max_recursion;
        self
    }

    /// Record a location as already loaded, typically the root document
    pub fn mark_visited(&mut self, location: &Location) {
        self.visited.insert(location.canonical_key());
    }

    /// Canonical keys of every location loaded so far
    pub fn visited(&self) -> impl Iterator<Item = &str> {
        self.visited.iter().map(String::as_str)
    }

    /// Every document transitively referenced by `schema`, which lives at `location`
    ///
    /// Imports are followed before includes; a document's own references come
    /// before the document itself in the result.
    pub async fn resolve(&mut self, schema: &SchemaDocument, location: &Location) -> Result<Vec<SchemaDocument>> {
        let mut resolved = Vec::new();

        for import in &schema.imports {
            match &import.schema_location {
                Some(reference) => resolved.extend(self.download(location, reference).await?),
                None => {
                    warn!(
                        namespace = import.namespace.as_deref().unwrap_or_default(),
                        "import has no schemaLocation, skipping"
                    );
                }
            }
        }

        for include in &schema.includes {
            match &include.schema_location {
                Some(reference) => resolved.extend(self.download(location, reference).await?),
                None => warn!(%location, "include has no schemaLocation, skipping"),
            }
        }

        Ok(resolved)
    }

    async fn download(&mut self, base: &Location, reference: &str) -> Result<Vec<SchemaDocument>> {
        let location = base.resolve(reference)?;
        if !self.visited.insert(location.canonical_key()) {
            debug!(%location, "already resolved");
            return Ok(Vec::new());
        }

        info!(%location, "downloading external schema");
        let bytes = self
            .fetcher
            .fetch(&location)
            .await
            .map_err(|source| CodegenError::fetch(&location, source))?;
        let schema = decode_schema(&bytes).map_err(|e| CodegenError::decode(e, &location, &bytes))?;

        if !self.namespaces.is_empty() && self.namespaces.get(&schema.target_namespace).is_none() {
            return Err(CodegenError::UnresolvedNamespace {
                namespace: schema.target_namespace,
            });
        }

        let mut resolved = Vec::new();
        if schema.has_externals() {
            if self.depth < self.max_recursion {
                self.depth += 1;
                resolved = Box::pin(self.resolve(&schema, &location)).await?;
            } else {
                warn!(
                    %location,
                    ceiling = self.max_recursion,
                    "recursion ceiling reached, not following references"
                );
            }
        }

        resolved.push(schema);
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    fn schema_with(namespace: &str, body: &str) -> String {
        format!(r#"<xs:schema {XS} targetNamespace="{namespace}">{body}</xs:schema>"#)
    }

    fn loc(path: &str) -> Location {
        Location::parse(path).unwrap()
    }

    #[tokio::test]
    async fn test_include_cycle_is_fetched_once() {
        let a = schema_with("urn:a", r#"<xs:include schemaLocation="b.xsd"/>"#);
        let b = schema_with("urn:a", r#"<xs:include schemaLocation="./a.xsd"/>"#);
        let mut fetcher = MemoryFetcher::new();
        fetcher.insert(&loc("dir/a.xsd"), a.clone());
        fetcher.insert(&loc("dir/b.xsd"), b);

        let root = decode_schema(a.as_bytes()).unwrap();
        let mapping = NamespaceMapping::default();
        let mut resolver = Resolver::new(&fetcher, &mapping);
        resolver.mark_visited(&loc("dir/a.xsd"));

        let resolved = resolver.resolve(&root, &loc("dir/a.xsd")).await.expect("resolves");
        assert_eq!(resolved.len(), 1);
        assert_eq!(fetcher.fetch_count(&loc("dir/b.xsd")), 1);
        assert_eq!(fetcher.fetch_count(&loc("dir/a.xsd")), 0);
        assert_eq!(resolver.visited().count(), 2);
    }

    #[tokio::test]
    async fn test_missing_location_is_skipped() {
        let root = decode_schema(schema_with("urn:a", r#"<xs:import namespace="urn:b"/>"#).as_bytes()).unwrap();
        let fetcher = MemoryFetcher::new();
        let mapping = NamespaceMapping::default();
        let mut resolver = Resolver::new(&fetcher, &mapping);

        let resolved = resolver.resolve(&root, &loc("a.xsd")).await.expect("resolves");
        assert!(resolved.is_empty());
        assert_eq!(fetcher.total_fetches(), 0);
    }

    #[tokio::test]
    async fn test_same_namespace_at_two_locations() {
        let root = decode_schema(
            schema_with(
                "urn:root",
                r#"<xs:import namespace="urn:shared" schemaLocation="one.xsd"/>
                   <xs:import namespace="urn:shared" schemaLocation="two.xsd"/>"#,
            )
            .as_bytes(),
        )
        .unwrap();
        let mut fetcher = MemoryFetcher::new();
        fetcher.insert(&loc("one.xsd"), schema_with("urn:shared", r#"<xs:complexType name="One"/>"#));
        fetcher.insert(&loc("two.xsd"), schema_with("urn:shared", r#"<xs:complexType name="Two"/>"#));

        let mapping = NamespaceMapping::default();
        let mut resolver = Resolver::new(&fetcher, &mapping);
        let resolved = resolver.resolve(&root, &loc("root.xsd")).await.expect("resolves");

        assert_eq!(resolved.len(), 2);
        assert!(resolved.iter().all(|s| s.target_namespace == "urn:shared"));
    }

    #[tokio::test]
    async fn test_recursion_ceiling() {
        let mut fetcher = MemoryFetcher::new();
        for i in 0..5 {
            let body = format!(r#"<xs:include schemaLocation="s{}.xsd"/>"#, i + 1);
            fetcher.insert(&loc(&format!("s{i}.xsd")), schema_with("urn:chain", &body));
        }
        fetcher.insert(&loc("s5.xsd"), schema_with("urn:chain", ""));

        let root = decode_schema(schema_with("urn:chain", r#"<xs:include schemaLocation="s0.xsd"/>"#).as_bytes())
            .unwrap();
        let mapping = NamespaceMapping::default();
        let mut resolver = Resolver::new(&fetcher, &mapping).with_max_recursion(2);
        let resolved = resolver.resolve(&root, &loc("root.xsd")).await.expect("resolves");

        // s0 and s1 recurse, s2 hits the ceiling
        assert_eq!(resolved.len(), 3);
        assert_eq!(fetcher.fetch_count(&loc("s3.xsd")), 0);
    }

    #[tokio::test]
    async fn test_unmapped_namespace_in_multi_module_mode() {
        let root = decode_schema(
            schema_with("urn:root", r#"<xs:import namespace="urn:ext" schemaLocation="ext.xsd"/>"#).as_bytes(),
        )
        .unwrap();
        let mut fetcher = MemoryFetcher::new();
        fetcher.insert(&loc("ext.xsd"), schema_with("urn:ext", ""));

        let mut mapping = NamespaceMapping::default();
        mapping.insert("urn:root", "root");
        let mut resolver = Resolver::new(&fetcher, &mapping);
        let err = resolver.resolve(&root, &loc("root.xsd")).await.expect_err("unmapped");
        assert!(matches!(err, CodegenError::UnresolvedNamespace { namespace } if namespace == "urn:ext"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal() {
        let root = decode_schema(
            schema_with("urn:root", r#"<xs:import namespace="urn:ext" schemaLocation="ext.xsd"/>"#).as_bytes(),
        )
        .unwrap();
        let fetcher = MemoryFetcher::new();
        let mapping = NamespaceMapping::default();
        let mut resolver = Resolver::new(&fetcher, &mapping);
        let err = resolver.resolve(&root, &loc("root.xsd")).await.expect_err("missing");
        assert!(matches!(err, CodegenError::Fetch { .. }));
    }
}
