//! Drives a generation run: load and resolve the service description, then
//! render every output module in parallel.

use crate::config::Config;
use crate::corpus::SchemaSet;
use crate::error::{CodegenError, Result};
use crate::fetch::Fetcher;
use crate::location::Location;
use crate::resolve::Resolver;
use crate::wsdl::{ServiceDescription, decode_description};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

mod names;
mod operations;
mod output;
mod render;
mod router;
mod simple;
mod structs;
mod types;
mod utils;

pub use names::{IdentContext, Sanitizer};
pub use render::{HeaderContext, Renderer, RustRenderer, ServiceContext, TypesContext};
pub use router::Router;
pub use types::{MappedType, SchemaScope, TypeMapper, builtin_type};

/// A service description with its complete, resolved schema set
#[derive(Debug, Clone, Serialize)]
pub struct LoadedService {
    pub location: Location,
    /// The envelope; its embedded schemas have moved into `schemas`
    pub description: ServiceDescription,
    pub schemas: SchemaSet,
}

/// Source text of every generated module
///
/// Types and headers are keyed by module name; the root module is `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
    pub headers: BTreeMap<String, Vec<u8>>,
    pub types: BTreeMap<String, Vec<u8>>,
    pub operations: Vec<u8>,
    pub server: Vec<u8>,
    pub server_header: Vec<u8>,
    /// The raw input, embedded as a constant in the server module
    pub server_description: Vec<u8>,
}

/// Independent piece of rendering work
#[derive(Debug, Clone, PartialEq, Eq)]
enum GenerationUnit {
    Types {
        module: String,
        /// `None` renders every schema into the root module
        namespaces: Option<Vec<String>>,
    },
    Operations,
    Server,
}

/// Runs the pipeline for one configuration
pub struct Generator<F, R = RustRenderer> {
    config: Config,
    fetcher: F,
    renderer: R,
}

impl<F: Fetcher> Generator<F> {
    pub fn new(config: Config, fetcher: F) -> Self {
        Self {
            config,
            fetcher,
            renderer: RustRenderer,
        }
    }
}

impl<F: Fetcher, R: Renderer> Generator<F, R> {
    pub fn with_renderer<R2: Renderer>(self, renderer: R2) -> Generator<F, R2> {
        Generator {
            config: self.config,
            fetcher: self.fetcher,
            renderer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch and decode the input, then resolve every external schema reference
    pub async fn load(&self) -> Result<LoadedService> {
        let input = self
            .config
            .input
            .as_deref()
            .ok_or_else(|| CodegenError::config("no input document given"))?;
        let location = Location::parse(input)?;

        info!(%location, "fetching service description");
        let raw = self
            .fetcher
            .fetch(&location)
            .await
            .map_err(|e| CodegenError::fetch(&location, e))?;
        let mut description =
            decode_description(raw.clone()).map_err(|e| CodegenError::decode(e, &location, &raw))?;

        let embedded = std::mem::take(&mut description.schemas);
        let mut resolver =
            Resolver::new(&self.fetcher, &self.config.namespaces).with_max_recursion(self.config.max_recursion);
        resolver.mark_visited(&location);

        let mut schemas = Vec::new();
        for schema in embedded {
            if self.config.is_multi_package() && self.config.namespaces.get(&schema.target_namespace).is_none() {
                return Err(CodegenError::UnresolvedNamespace {
                    namespace: schema.target_namespace,
                });
            }
            if schema.has_externals() {
                schemas.extend(resolver.resolve(&schema, &location).await?);
            }
            schemas.push(schema);
        }

        info!(
            schemas = schemas.len(),
            documents = resolver.visited().count(),
            "resolved schema set"
        );
        Ok(LoadedService {
            location,
            description,
            schemas: SchemaSet::new(schemas),
        })
    }

    /// Render a loaded service
    ///
    /// Import discovery runs first; after that the router is read-only and the
    /// generation units run in parallel. Headers are rendered once every unit
    /// has finished.
    pub fn render(&self, loaded: &LoadedService) -> Result<GenerationResult> {
        let sanitizer = Sanitizer::new(self.config.export);
        let mut router = Router::new(self.config.namespaces.clone());
        router.discover_imports(&loaded.schemas, &sanitizer);

        let mut modules: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if router.is_multi_package() {
            for namespace in loaded.schemas.namespaces() {
                modules
                    .entry(router.route(namespace).to_string())
                    .or_default()
                    .push(namespace.to_string());
            }
        }

        let mut units = Vec::with_capacity(modules.len() + 2);
        if modules.is_empty() {
            units.push(GenerationUnit::Types {
                module: String::new(),
                namespaces: None,
            });
        }
        units.extend(modules.iter().map(|(module, namespaces)| GenerationUnit::Types {
            module: module.clone(),
            namespaces: Some(namespaces.clone()),
        }));
        units.push(GenerationUnit::Operations);
        units.push(GenerationUnit::Server);

        let renderer = &self.renderer;
        let router = &router;
        let sanitizer = &sanitizer;
        let service = ServiceContext {
            description: &loaded.description,
            schemas: &loaded.schemas,
            router,
            sanitizer,
        };

        let rendered = units
            .into_par_iter()
            .map(|unit| -> Result<(GenerationUnit, Vec<u8>)> {
                debug!(?unit, "rendering");
                let bytes = match &unit {
                    GenerationUnit::Types { module, namespaces } => renderer.render_types(&TypesContext {
                        schemas: &loaded.schemas,
                        namespaces: namespaces.as_deref(),
                        module,
                        router,
                        sanitizer,
                    })?,
                    GenerationUnit::Operations => renderer.render_operations(&service)?,
                    GenerationUnit::Server => renderer.render_server(&service)?,
                };
                Ok((unit, bytes))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = GenerationResult::default();
        for (unit, bytes) in rendered {
            match unit {
                GenerationUnit::Types { module, .. } => {
                    result.types.insert(module, bytes);
                }
                GenerationUnit::Operations => result.operations = bytes,
                GenerationUnit::Server => result.server = bytes,
            }
        }

        // sub-modules are declared in the root module, so it needs no imports
        result.headers.insert(
            String::new(),
            renderer.render_header(&HeaderContext {
                module: &self.config.package,
                base_path: self.config.base_path.as_deref(),
                imports: Vec::new(),
            })?,
        );
        for (module, namespaces) in modules.iter().filter(|(module, _)| !module.is_empty()) {
            let imports: BTreeSet<&str> = namespaces
                .iter()
                .flat_map(|namespace| router.imports(namespace))
                .filter(|import| *import != module.as_str())
                .collect();
            let header = renderer.render_header(&HeaderContext {
                module,
                base_path: self.config.base_path.as_deref(),
                imports: imports.into_iter().collect(),
            })?;
            result.headers.insert(module.clone(), header);
        }

        result.server_header = renderer.render_server_header(&HeaderContext {
            module: &self.config.package,
            base_path: self.config.base_path.as_deref(),
            imports: Vec::new(),
        })?;
        result.server_description = renderer.render_embedded_description(&loaded.description.raw)?;

        info!(modules = result.headers.len(), "generation finished");
        Ok(result)
    }

    /// Load and render
    pub async fn run(&self) -> Result<GenerationResult> {
        let loaded = self.load().await?;
        self.render(&loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamespaceMapping;
    use crate::fetch::MemoryFetcher;

    const ROOT: &str = r#"<definitions name="Orders"
    targetNamespace="urn:orders"
    xmlns:tns="urn:orders"
    xmlns:o="urn:orders:types"
    xmlns="http://schemas.xmlsoap.org/wsdl/">
  <types>
    <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:i="urn:items" targetNamespace="urn:orders:types">
      <xs:import namespace="urn:items" schemaLocation="items.xsd"/>
      <xs:element name="Order">
        <xs:complexType>
          <xs:sequence><xs:element name="item" type="i:Item" maxOccurs="unbounded"/></xs:sequence>
        </xs:complexType>
      </xs:element>
    </xs:schema>
  </types>
  <message name="PlaceOrder"><part name="body" element="o:Order"/></message>
  <portType name="OrderPort">
    <operation name="Place"><input message="tns:PlaceOrder"/></operation>
  </portType>
</definitions>"#;

    const ITEMS: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:items">
  <xs:complexType name="Item"><xs:sequence><xs:element name="sku" type="xs:string"/></xs:sequence></xs:complexType>
</xs:schema>"#;

    fn fetcher() -> MemoryFetcher {
        let mut fetcher = MemoryFetcher::new();
        fetcher
            .insert(&Location::parse("/svc/orders.wsdl").unwrap(), ROOT)
            .insert(&Location::parse("/svc/items.xsd").unwrap(), ITEMS);
        fetcher
    }

    fn config() -> Config {
        Config {
            input: Some("/svc/orders.wsdl".into()),
            ..Config::default()
        }
    }

    fn text(bytes: &[u8]) -> &str {
        std::str::from_utf8(bytes).expect("utf-8")
    }

    #[tokio::test]
    async fn test_single_module_run() {
        let generator = Generator::new(config(), fetcher());
        let loaded = generator.load().await.expect("loads");
        assert_eq!(loaded.schemas.len(), 2);
        assert!(loaded.description.schemas.is_empty());

        let result = generator.render(&loaded).expect("renders");
        assert_eq!(result.types.keys().collect::<Vec<_>>(), vec![""]);
        assert_eq!(result.headers.keys().collect::<Vec<_>>(), vec![""]);

        let types = text(&result.types[""]);
        assert!(types.contains("pub struct Item {"), "{types}");
        assert!(types.contains("pub item: Vec<Item>,"));
        assert!(text(&result.operations).contains("pub trait OrderPort {"));
        assert!(text(&result.server).contains("pub struct OrderPortServer<S> {"));
        assert!(text(&result.server_header).contains("// Module: myservice::server"));
        assert!(text(&result.server_description).contains("pub const WSDL: &str"));
    }

    #[tokio::test]
    async fn test_multi_module_run() {
        let mut namespaces = NamespaceMapping::new();
        namespaces.insert("urn:orders:types", "orders");
        namespaces.insert("urn:items", "items");
        let config = Config {
            namespaces,
            base_path: Some("crate::generated::myservice".into()),
            ..config()
        };

        let result = Generator::new(config, fetcher()).run().await.expect("runs");
        assert_eq!(result.types.keys().collect::<Vec<_>>(), vec!["items", "orders"]);
        assert_eq!(result.headers.keys().collect::<Vec<_>>(), vec!["", "items", "orders"]);

        assert!(text(&result.types["orders"]).contains("pub item: Vec<items::Item>,"));
        let header = text(&result.headers["orders"]);
        assert!(header.contains("use crate::generated::myservice::items;"), "{header}");
        assert!(!text(&result.headers["items"]).contains("use crate::generated"));
        assert!(text(&result.operations).contains("request: orders::Order"));
    }

    #[tokio::test]
    async fn test_unmapped_embedded_namespace() {
        let mut namespaces = NamespaceMapping::new();
        namespaces.insert("urn:items", "items");
        let config = Config {
            namespaces,
            base_path: Some("crate".into()),
            ..config()
        };

        let err = Generator::new(config, fetcher()).load().await.expect_err("unmapped");
        assert!(matches!(err, CodegenError::UnresolvedNamespace { namespace } if namespace == "urn:orders:types"));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let config = Config {
            input: Some("/svc/missing.wsdl".into()),
            ..Config::default()
        };
        let err = Generator::new(config, fetcher()).run().await.expect_err("missing");
        assert!(matches!(err, CodegenError::Fetch { .. }));
    }
}
