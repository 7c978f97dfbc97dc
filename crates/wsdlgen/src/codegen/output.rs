use crate::error::{CodegenError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use super::GenerationResult;

impl GenerationResult {
    /// Contents of every output file, keyed by path relative to the package directory
    ///
    /// `mod.rs` holds the root types, the operations and a `pub mod` line for
    /// every sub-module; each sub-module gets `<module>.rs`; the server scaffold
    /// and the embedded description go to `server.rs`.
    pub fn files(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();

        let mut root = Vec::new();
        push_section(&mut root, self.headers.get(""));
        push_section(&mut root, self.types.get(""));
        push_section(&mut root, Some(&self.operations));
        let mut declarations = String::new();
        for module in self.headers.keys().filter(|module| !module.is_empty()) {
            declarations.push_str(&format!("pub mod {module};\n"));
        }
        declarations.push_str("pub mod server;\n");
        push_section(&mut root, Some(&declarations.into_bytes()));
        files.insert(PathBuf::from("mod.rs"), root);

        for (module, header) in self.headers.iter().filter(|(module, _)| !module.is_empty()) {
            let mut text = Vec::new();
            push_section(&mut text, Some(header));
            push_section(&mut text, self.types.get(module));
            files.insert(PathBuf::from(format!("{module}.rs")), text);
        }

        let mut server = Vec::new();
        push_section(&mut server, Some(&self.server_header));
        push_section(&mut server, Some(&self.server_description));
        push_section(&mut server, Some(&self.server));
        files.insert(PathBuf::from("server.rs"), server);

        files
    }

    /// Write every file under `dir/package`, returning the paths written
    pub fn write_to_disk(&self, dir: &Path, package: &str) -> Result<Vec<PathBuf>> {
        let package_dir = dir.join(package);
        std::fs::create_dir_all(&package_dir).map_err(|e| CodegenError::Other {
            message: format!("Failed to create directory {:?}", package_dir),
            source: Some(Box::new(e)),
        })?;

        let mut written = Vec::new();
        for (relative, contents) in self.files() {
            let path = package_dir.join(relative);
            std::fs::write(&path, contents).map_err(|e| CodegenError::Other {
                message: format!("Failed to write file {:?}", path),
                source: Some(Box::new(e)),
            })?;
            written.push(path);
        }

        info!(files = written.len(), dir = %package_dir.display(), "wrote generated code");
        Ok(written)
    }
}

/// Append a non-empty section, separated from the previous one by a blank line
fn push_section(out: &mut Vec<u8>, section: Option<&Vec<u8>>) {
    let Some(section) = section.filter(|s| !s.is_empty()) else {
        return;
    };
    if !out.is_empty() {
        if !out.ends_with(b"\n") {
            out.push(b'\n');
        }
        out.push(b'\n');
    }
    out.extend_from_slice(section);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> GenerationResult {
        let mut result = GenerationResult {
            operations: b"pub trait Port {}\n".to_vec(),
            server: b"pub struct PortServer<S> {\n    service: S,\n}\n".to_vec(),
            server_header: b"// server header\n".to_vec(),
            server_description: b"pub const WSDL: &str = \"\";\n".to_vec(),
            ..Default::default()
        };
        result.headers.insert(String::new(), b"// root header\n".to_vec());
        result.headers.insert("items".into(), b"// items header\n".to_vec());
        result.headers.insert("orders".into(), b"// orders header\n".to_vec());
        result.types.insert("items".into(), b"pub struct Item {}\n".to_vec());
        result
    }

    #[test]
    fn test_file_layout() {
        let files = result().files();
        let names: Vec<_> = files.keys().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["items.rs", "mod.rs", "orders.rs", "server.rs"]);

        let root = String::from_utf8(files[Path::new("mod.rs")].clone()).unwrap();
        assert_eq!(
            root,
            "// root header\n\npub trait Port {}\n\npub mod items;\npub mod orders;\npub mod server;\n"
        );

        let items = String::from_utf8(files[Path::new("items.rs")].clone()).unwrap();
        assert_eq!(items, "// items header\n\npub struct Item {}\n");
        // a module without types still gets its header
        let orders = String::from_utf8(files[Path::new("orders.rs")].clone()).unwrap();
        assert_eq!(orders, "// orders header\n");

        let server = String::from_utf8(files[Path::new("server.rs")].clone()).unwrap();
        assert!(server.starts_with("// server header\n\npub const WSDL"));
        assert!(server.ends_with("pub struct PortServer<S> {\n    service: S,\n}\n"));
    }

    #[test]
    fn test_write_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let written = result().write_to_disk(dir.path(), "myservice").expect("writes");
        assert_eq!(written.len(), 4);
        let root = std::fs::read_to_string(dir.path().join("myservice/mod.rs")).expect("mod.rs");
        assert!(root.contains("pub mod server;"));
        assert!(dir.path().join("myservice/server.rs").exists());
    }
}
