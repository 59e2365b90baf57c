//! Build script rendering the `ctmp_relay(1)` manual page from the CLI
//! definition.

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

fn render_man_page(out_dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let cmd = cli::Cli::command();
    let page = out_dir.join(format!("{}.1", cmd.get_name()));
    let mut buf: Vec<u8> = Vec::new();
    Man::new(cmd).render(&mut buf)?;
    fs::write(&page, buf)?;
    Ok(page)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let out_dir = PathBuf::from("target/generated-man");
    fs::create_dir_all(&out_dir)?;
    render_man_page(&out_dir)?;

    Ok(())
}
