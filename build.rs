//! Build script rendering the `wirefrag` man page into `OUT_DIR`.

use std::{env, error::Error, fs, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").ok_or("OUT_DIR is not set")?).join("man");
    fs::create_dir_all(&out_dir)?;

    let mut page = Vec::new();
    Man::new(cli::Cli::command()).render(&mut page)?;
    let path = out_dir.join("wirefrag.1");
    fs::write(&path, page)?;
    println!("cargo:rustc-env=WIREFRAG_MAN_PAGE={}", path.display());

    Ok(())
}
