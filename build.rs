//! Build script rendering the `tickwire(1)` manual page from the CLI
//! definition.

use std::{fs, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let out_dir = PathBuf::from("target/generated-man");
    fs::create_dir_all(&out_dir)?;

    let man = Man::new(cli::Cli::command()).title("TICKWIRE").section("1");
    let mut page = Vec::new();
    man.render(&mut page)?;
    fs::write(out_dir.join("tickwire.1"), page)?;

    Ok(())
}
