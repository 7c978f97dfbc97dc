//! Generation settings: defaults, overlaid by an optional KDL file, overlaid
//! by command-line flags.
//!
//! ```kdl
//! input "service.wsdl"
//! package "stockquote"
//! output "src/generated"
//! base-path "crate::generated::stockquote"
//! insecure #false
//! export #true
//! max-recursion 20
//! namespace "http://example.com/stockquote.xsd" package="quotes"
//! ```

use crate::error::{CodegenError, Result};
use crate::resolve::DEFAULT_MAX_RECURSION;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Module name used when none is configured
pub const DEFAULT_PACKAGE: &str = "myservice";

/// Namespace URI → output module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceMapping(BTreeMap<String, String>);

impl NamespaceMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, namespace: impl Into<String>, module: impl Into<String>) {
        self.0.insert(namespace.into(), module.into());
    }

    /// Parse a `module=namespace` entry, as accepted by `--pkg`
    pub fn parse_entry(value: &str) -> Result<(String, String)> {
        match value.split_once('=') {
            Some((module, namespace)) if !module.trim().is_empty() && !namespace.trim().is_empty() => {
                Ok((module.trim().to_string(), namespace.trim().to_string()))
            }
            _ => Err(CodegenError::config(format!(
                "namespace mapping {value:?} must have the form module=namespace"
            ))),
        }
    }

    /// Module for `namespace`, if mapped
    pub fn get(&self, namespace: &str) -> Option<&str> {
        self.0.get(namespace).map(String::as_str)
    }

    /// `(namespace, module)` pairs, sorted by namespace
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(ns, module)| (ns.as_str(), module.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for NamespaceMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// WSDL or XSD document, path or URL
    pub input: Option<String>,
    /// Name of the generated root module
    pub package: String,
    /// Directory the root module directory is written into
    pub output_dir: PathBuf,
    pub namespaces: NamespaceMapping,
    /// Rust path prefix under which sibling modules are reachable (multi-module mode)
    pub base_path: Option<String>,
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// Upper-case generated type names
    pub export: bool,
    pub max_recursion: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            package: DEFAULT_PACKAGE.to_string(),
            output_dir: PathBuf::from("."),
            namespaces: NamespaceMapping::default(),
            base_path: None,
            insecure: false,
            export: true,
            max_recursion: DEFAULT_MAX_RECURSION,
        }
    }
}

impl Config {
    /// Defaults overlaid with a KDL document
    pub fn from_kdl(text: &str) -> Result<Self> {
        let mut config = Config::default();
        config.merge_kdl(text)?;
        Ok(config)
    }

    /// Overlay the settings of a KDL document onto this config
    pub fn merge_kdl(&mut self, text: &str) -> Result<()> {
        let doc = text
            .parse::<kdl::KdlDocument>()
            .map_err(|e| CodegenError::config(format!("failed to parse KDL: {e}")))?;

        for node in doc.nodes() {
            match node.name().value() {
                "input" => self.input = Some(string_arg(node)?),
                "package" => self.package = string_arg(node)?,
                "output" => self.output_dir = PathBuf::from(string_arg(node)?),
                "base-path" => self.base_path = Some(string_arg(node)?),
                "insecure" => self.insecure = bool_arg(node)?,
                "export" => self.export = bool_arg(node)?,
                "max-recursion" => {
                    let value = node
                        .entries()
                        .get(0)
                        .and_then(|e| e.value().as_integer())
                        .ok_or_else(|| CodegenError::config("max-recursion expects an integer value"))?;
                    self.max_recursion = u32::try_from(value)
                        .map_err(|_| CodegenError::config(format!("max-recursion {value} out of range")))?;
                }
                "namespace" => {
                    let namespace = string_arg(node)?;
                    let module = node
                        .get("package")
                        .and_then(|v| v.as_string())
                        .ok_or_else(|| {
                            CodegenError::config(format!("namespace {namespace} missing package attribute"))
                        })?;
                    self.namespaces.insert(namespace, module);
                }
                other => return Err(CodegenError::config(format!("unknown config node: {other}"))),
            }
        }

        Ok(())
    }

    /// Whether namespaces are split across several modules
    pub fn is_multi_package(&self) -> bool {
        !self.namespaces.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.as_deref().is_none_or(|input| input.trim().is_empty()) {
            return Err(CodegenError::config("no input document given"));
        }
        if self.package.trim().is_empty() {
            return Err(CodegenError::config("package name must not be empty"));
        }
        check_module_name(&self.package)?;
        if self.is_multi_package() {
            if self.base_path.as_deref().is_none_or(|b| b.trim().is_empty()) {
                return Err(CodegenError::config(
                    "a base path is required when namespaces are mapped to modules",
                ));
            }
            for (_, module) in self.namespaces.iter() {
                check_module_name(module)?;
                if module == "server" {
                    return Err(CodegenError::config("module name \"server\" is reserved for the server scaffold"));
                }
            }
        }
        Ok(())
    }
}

fn check_module_name(name: &str) -> Result<()> {
    syn::parse_str::<syn::Ident>(name)
        .map(|_| ())
        .map_err(|_| CodegenError::config(format!("{name:?} is not a valid module name")))
}

fn string_arg(node: &kdl::KdlNode) -> Result<String> {
    node.entries()
        .get(0)
        .and_then(|e| e.value().as_string())
        .map(str::to_string)
        .ok_or_else(|| CodegenError::config(format!("{} expects a string value", node.name().value())))
}

fn bool_arg(node: &kdl::KdlNode) -> Result<bool> {
    node.entries()
        .get(0)
        .and_then(|e| e.value().as_bool())
        .ok_or_else(|| CodegenError::config(format!("{} expects a boolean value", node.name().value())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kdl() {
        let config = Config::from_kdl(
            r#"
            input "https://example.com/service.wsdl"
            package "stockquote"
            output "generated"
            base-path "crate::generated::stockquote"
            insecure #true
            export #false
            max-recursion 5
            namespace "urn:quotes" package="quotes"
            namespace "urn:common" package="common"
            "#,
        )
        .expect("valid config");

        assert_eq!(config.input.as_deref(), Some("https://example.com/service.wsdl"));
        assert_eq!(config.package, "stockquote");
        assert_eq!(config.output_dir, PathBuf::from("generated"));
        assert!(config.insecure);
        assert!(!config.export);
        assert_eq!(config.max_recursion, 5);
        assert_eq!(config.namespaces.get("urn:quotes"), Some("quotes"));
        assert_eq!(config.namespaces.len(), 2);
        config.validate().expect("valid");
    }

    #[test]
    fn test_unknown_node_is_rejected() {
        let err = Config::from_kdl("colour \"blue\"").expect_err("unknown node");
        assert!(err.to_string().contains("unknown config node"));
    }

    #[test]
    fn test_parse_entry() {
        assert_eq!(
            NamespaceMapping::parse_entry("quotes=http://example.com/q").expect("valid"),
            ("quotes".to_string(), "http://example.com/q".to_string())
        );
        assert!(NamespaceMapping::parse_entry("quotes").is_err());
        assert!(NamespaceMapping::parse_entry("=urn:x").is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.input = Some("service.wsdl".into());
        config.validate().expect("single module needs no base path");

        config.namespaces.insert("urn:a", "a");
        assert!(config.validate().is_err());

        config.base_path = Some("crate::myservice".into());
        config.validate().expect("base path given");

        config.namespaces.insert("urn:b", "not a module");
        assert!(config.validate().is_err());
    }
}
