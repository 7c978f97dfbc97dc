use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Generate Rust types and SOAP scaffolding from WSDL and XML Schema")]
pub struct WsdlgenArgs {
    /// WSDL or XSD document to generate from, a path or an http(s) URL
    pub input: Option<String>,

    /// Path to a KDL config file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Name of the generated root module
    #[arg(short = 'p', long)]
    pub package: Option<String>,

    /// Directory the package directory is created in
    #[arg(short = 'd', long = "dir")]
    pub output_dir: Option<PathBuf>,

    /// Map a namespace to its own module, as `module=namespace` (repeatable)
    #[arg(long = "pkg", value_name = "MODULE=NAMESPACE")]
    pub namespaces: Vec<String>,

    /// Rust path of the generated package, used to import sibling modules
    #[arg(long)]
    pub base_path: Option<String>,

    /// Skip TLS certificate verification when downloading
    #[arg(short = 'i', long)]
    pub insecure: bool,

    /// Capitalize generated type names
    #[arg(long = "make-public", value_name = "BOOL")]
    pub export: Option<bool>,

    /// Maximum depth of nested schema imports
    #[arg(long)]
    pub max_recursion: Option<u32>,

    /// Print the decoded schema model as JSON and exit
    #[arg(long)]
    pub dump_model: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
