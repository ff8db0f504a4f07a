#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use clap::Parser;

use bsdelta::Format;

#[derive(Parser, Debug)]
#[command(name = "bspatch", version, about = "bsdiff 4.x / Endsley compatible binary delta patcher")]
struct Args {
    /// source (old) file
    old: PathBuf,

    /// patch file to apply
    patch: PathBuf,

    /// reconstructed (new) file; a fresh temporary file is used when omitted
    new: Option<PathBuf>,

    /// expected container format of the patch ("classic" or "endsley")
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
    let path = bsdelta::patch(&args.old, args.new, &args.patch, format)?;
    println!("{}", path.display());
    Ok(())
}
