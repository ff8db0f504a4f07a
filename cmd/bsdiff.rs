#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use clap::Parser;

use bsdelta::{Format, OldSource};

#[derive(Parser, Debug)]
#[command(name = "bsdiff", version, about = "bsdiff 4.x / Endsley compatible binary delta compressor")]
struct Args {
    /// source (old) file
    old: PathBuf,

    /// target (new) file
    new: PathBuf,

    /// patch output file; a fresh temporary file is used when omitted
    patch: Option<PathBuf>,

    /// persisted suffix-array index to reuse instead of rebuilding it
    #[arg(short = 'x', long = "index")]
    index: Option<PathBuf>,

    /// container format to emit ("classic" or "endsley")
    #[arg(short = 'f', long = "format", default_value = "classic")]
    format: String,
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
    let format = Format::from_str(&args.format)?;
    let old: OldSource = match args.index {
        Some(index) => (args.old, index).into(),
        None => args.old.into(),
    };

    let path = bsdelta::diff(old, &args.new, args.patch, format)?;
    println!("{}", path.display());
    Ok(())
}
