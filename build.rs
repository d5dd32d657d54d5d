//! Renders the `proptest-regression(1)` man page into `OUT_DIR`.
//!
//! The command definition comes from `cli-defs`, so the page documents the
//! same flags the binary accepts at runtime.

use std::{env, fs, io, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;
use cli_defs::Cli;

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=cli-defs/src");

    // `cargo check` and IDE analysis runs leave OUT_DIR unset.
    let Some(out_dir) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        return Ok(());
    };

    let command = Cli::command();
    let page = out_dir.join(format!("{}.1", command.get_name()));
    let mut buffer = Vec::new();
    Man::new(command).render(&mut buffer)?;
    fs::write(page, buffer)
}
