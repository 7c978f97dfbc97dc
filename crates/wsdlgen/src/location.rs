//! Document locations: either a local path or an HTTP(S) URL.
//!
//! Relative references found inside a document (`schemaLocation`) resolve
//! against the location of the referring document, the same way a browser
//! resolves links.

use crate::error::{CodegenError, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Where a document lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Location {
    Path(PathBuf),
    Url(Url),
}

impl Location {
    /// Parse user input. Absolute `http`, `https` and `file` URLs are recognised,
    /// anything else is treated as a filesystem path.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        match Url::parse(input) {
            Ok(url) if is_http(&url) => Ok(Location::Url(url)),
            Ok(url) if url.scheme() == "file" => file_url_to_path(&url, input, input),
            _ => Ok(Location::Path(normalize_path(Path::new(input)))),
        }
    }

    /// Resolve a reference found in this document
    pub fn resolve(&self, reference: &str) -> Result<Location> {
        let reference = reference.trim();
        if let Ok(url) = Url::parse(reference) {
            if is_http(&url) {
                return Ok(Location::Url(url));
            }
            if url.scheme() == "file" {
                return file_url_to_path(&url, reference, &self.to_string());
            }
        }

        match self {
            Location::Url(base) => {
                base.join(reference)
                    .map(Location::Url)
                    .map_err(|source| CodegenError::InvalidLocation {
                        reference: reference.to_string(),
                        base: base.to_string(),
                        source,
                    })
            }
            Location::Path(base) => {
                let reference = Path::new(reference);
                if reference.is_absolute() {
                    return Ok(Location::Path(normalize_path(reference)));
                }
                let dir = base.parent().unwrap_or_else(|| Path::new(""));
                Ok(Location::Path(normalize_path(&dir.join(reference))))
            }
        }
    }

    /// Key under which the resolver deduplicates documents
    pub fn canonical_key(&self) -> String {
        match self {
            Location::Url(url) => url.as_str().to_string(),
            Location::Path(path) => path
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
                .replace("//", "/"),
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Location::Url(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Path(path) => write!(f, "{}", path.display()),
            Location::Url(url) => write!(f, "{url}"),
        }
    }
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

fn file_url_to_path(url: &Url, reference: &str, base: &str) -> Result<Location> {
    url.to_file_path()
        .map(|path| Location::Path(normalize_path(&path)))
        .map_err(|()| CodegenError::InvalidLocation {
            reference: reference.to_string(),
            base: base.to_string(),
            source: url::ParseError::InvalidDomainCharacter,
        })
}

/// Lexically remove `.` and `..` segments without touching the filesystem
fn normalize_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert!(Location::parse("https://example.com/a.wsdl").unwrap().is_url());
        assert!(!Location::parse("schemas/a.wsdl").unwrap().is_url());
        assert_eq!(
            Location::parse("file:///tmp/a.xsd").unwrap(),
            Location::Path(PathBuf::from("/tmp/a.xsd"))
        );
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = Location::parse("schemas/service/root.wsdl").unwrap();
        let resolved = base.resolve("../common/types.xsd").unwrap();
        assert_eq!(resolved, Location::Path(PathBuf::from("schemas/common/types.xsd")));

        let sibling = base.resolve("./b.xsd").unwrap();
        assert_eq!(sibling.canonical_key(), "schemas/service/b.xsd");
    }

    #[test]
    fn test_resolve_against_url() {
        let base = Location::parse("http://example.com/svc/root.wsdl").unwrap();
        let resolved = base.resolve("../xsd/types.xsd").unwrap();
        assert_eq!(resolved.to_string(), "http://example.com/xsd/types.xsd");
    }

    #[test]
    fn test_absolute_url_reference_wins() {
        let base = Location::parse("local/root.wsdl").unwrap();
        let resolved = base.resolve("https://example.org/types.xsd").unwrap();
        assert_eq!(resolved.to_string(), "https://example.org/types.xsd");
    }

    #[test]
    fn test_canonical_key_ignores_dot_segments() {
        let a = Location::parse("dir/./x/../a.xsd").unwrap();
        let b = Location::parse("dir/a.xsd").unwrap();
        assert_eq!(a.canonical_key(), b.canonical_key());
    }

    #[test]
    fn test_serialize() {
        let url = Location::parse("https://example.com/svc.wsdl").unwrap();
        assert_eq!(
            serde_json::to_value(&url).unwrap(),
            serde_json::json!({ "kind": "url", "value": "https://example.com/svc.wsdl" })
        );
        let path = Location::parse("schemas/a.xsd").unwrap();
        assert_eq!(
            serde_json::to_value(&path).unwrap(),
            serde_json::json!({ "kind": "path", "value": "schemas/a.xsd" })
        );
    }
}
