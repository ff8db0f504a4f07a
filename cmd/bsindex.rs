#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bsindex", version, about = "persist a suffix-array index over a file, for reuse across diffs of the same source")]
struct Args {
    /// source (old) file to index
    old: PathBuf,

    /// index output file; a fresh temporary file is used when omitted
    index: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> bsdelta::Result<()> {
    let path = bsdelta::index(&args.old, args.index)?;
    println!("{}", path.display());
    Ok(())
}
