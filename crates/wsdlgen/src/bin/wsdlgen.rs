use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;
use wsdlgen::Config;
use wsdlgen::cli::WsdlgenArgs;
use wsdlgen::codegen::Generator;
use wsdlgen::config::NamespaceMapping;
use wsdlgen::fetch::SourceFetcher;

#[tokio::main]
async fn main() -> Result<()> {
    let args = WsdlgenArgs::parse();
    init_tracing(args.verbose);

    let config = load_config(&args)?;
    let fetcher = SourceFetcher::new(config.insecure).into_diagnostic()?;
    let output_dir = config.output_dir.clone();
    let package = config.package.clone();
    let generator = Generator::new(config, fetcher);

    let loaded = generator.load().await?;
    if args.dump_model {
        let json = serde_json::to_string_pretty(&loaded).into_diagnostic()?;
        println!("{json}");
        return Ok(());
    }

    let result = generator.render(&loaded)?;
    let written = result.write_to_disk(&output_dir, &package)?;
    for path in &written {
        println!("{}", path.display());
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("WSDLGEN_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults, then the KDL file, then command-line flags
fn load_config(args: &WsdlgenArgs) -> Result<Config> {
    let mut config = Config::default();

    if let Some(path) = &args.config {
        let text = std::fs::read_to_string(path).into_diagnostic()?;
        config.merge_kdl(&text)?;
    }

    if let Some(input) = &args.input {
        config.input = Some(input.clone());
    }
    if let Some(package) = &args.package {
        config.package = package.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if !args.namespaces.is_empty() {
        let entries = args
            .namespaces
            .iter()
            .map(|entry| NamespaceMapping::parse_entry(entry))
            .collect::<wsdlgen::Result<Vec<_>>>()?;
        for (module, namespace) in entries {
            config.namespaces.insert(namespace, module);
        }
    }
    if let Some(base_path) = &args.base_path {
        config.base_path = Some(base_path.clone());
    }
    if args.insecure {
        config.insecure = true;
    }
    if let Some(export) = args.export {
        config.export = export;
    }
    if let Some(max_recursion) = args.max_recursion {
        config.max_recursion = max_recursion;
    }

    config.validate()?;
    Ok(config)
}
