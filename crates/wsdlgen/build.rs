use clap::CommandFactory;
use clap_complete::{generate_to, shells};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::io::Result;
use std::path::{Path, PathBuf};

#[path = "src/cli.rs"]
mod cli;

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));
    render_docs(&out_dir, cli::WsdlgenArgs::command(), "wsdlgen")
}

/// Man page under `man/`, shell completions under `completions/`
fn render_docs(out_dir: &Path, mut cmd: clap::Command, bin_name: &str) -> Result<()> {
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir)?;
    let mut page = Vec::new();
    Man::new(cmd.clone()).render(&mut page)?;
    fs::write(man_dir.join(format!("{bin_name}.1")), page)?;

    let completions = out_dir.join("completions");
    fs::create_dir_all(&completions)?;
    for shell in [shells::Shell::Bash, shells::Shell::Fish, shells::Shell::Zsh] {
        generate_to(shell, &mut cmd, bin_name, &completions)?;
    }

    Ok(())
}
