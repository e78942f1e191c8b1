//! # FernDB CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Open (or create) a store and drop into the shell
//! ferndb ./my.db
//!
//! # Show version
//! ferndb --version
//! ```

use std::env;
use std::path::PathBuf;

use eyre::{bail, Result};
use ferndb::cli::Repl;
use ferndb::Kv;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut store_path: Option<PathBuf> = None;

    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("ferndb {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            flag if flag.starts_with('-') => bail!("unknown option: {flag}"),
            path => {
                if store_path.is_some() {
                    bail!("expected exactly one store path");
                }
                store_path = Some(PathBuf::from(path));
            }
        }
    }

    let Some(path) = store_path else {
        print_usage();
        return Ok(());
    };

    let kv = Kv::open(&path)?;
    Repl::new(kv)?.run()
}

fn print_usage() {
    println!("Usage: ferndb [OPTIONS] <STORE_PATH>");
    println!();
    println!("Opens the store at STORE_PATH (creating it if absent) and");
    println!("starts an interactive shell.");
    println!();
    println!("Options:");
    println!("  -h, --help       Show this help");
    println!("  -V, --version    Show version");
}
