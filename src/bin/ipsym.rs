//! # ipsym
//!
//! Resolves instruction addresses against ELF images placed at chosen load
//! addresses, printing one block of frames per address.

use clap::Parser;
use ipsym::{ResolvedLocation, Symbolizer};
use log::info;
use std::path::PathBuf;

const EXIT_SUCCESS: i32 = 0;
const EXIT_UNRESOLVED: i32 = 1;

#[derive(Debug, Clone)]
struct ElfArg {
    path: PathBuf,
    load_address: u64,
}

fn parse_address(text: &str) -> Result<u64, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid address {text:?}: {e}"))
}

fn parse_elf(text: &str) -> Result<ElfArg, String> {
    match text.rsplit_once('@') {
        Some((path, address)) => Ok(ElfArg {
            path: PathBuf::from(path),
            load_address: parse_address(address)?,
        }),
        None => Ok(ElfArg {
            path: PathBuf::from(text),
            load_address: 0,
        }),
    }
}

#[derive(Parser)]
#[command(
    name = "ipsym",
    about = "Resolve instruction addresses to functions and source lines",
    after_help = "\
EXAMPLES:
    ipsym --elf ./app 0x4011d6
    ipsym -C --elf /usr/lib/libfoo.so@0x7f3a10000000 0x7f3a10001234"
)]
struct Args {
    /// Image to load, optionally followed by @LOAD_ADDRESS (hex)
    #[arg(long = "elf", value_name = "PATH[@ADDR]", value_parser = parse_elf, required = true)]
    elves: Vec<ElfArg>,

    /// Demangle symbol names
    #[arg(short = 'C', long)]
    demangle: bool,

    /// Print only function names
    #[arg(long)]
    functions_only: bool,

    /// Runtime addresses to resolve (hex)
    #[arg(value_name = "ADDRESS", value_parser = parse_address, required = true)]
    addresses: Vec<u64>,
}

fn print(args: &Args, symbolizer: &Symbolizer, address: u64, mut location: ResolvedLocation) {
    if args.demangle {
        for frame in &mut location.frames {
            frame.name = symbolizer.demangle(&frame.name);
        }
    }
    if args.functions_only {
        println!("{address:#x}");
        for frame in &location.frames {
            println!("    {}", frame.name);
        }
    } else {
        println!("{address:#x} {location}");
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut symbolizer = Symbolizer::new();
    symbolizer.begin_report_elf();
    for elf in &args.elves {
        info!("reporting {} at {:#x}", elf.path.display(), elf.load_address);
        symbolizer.report_elf(&elf.path, elf.load_address);
    }
    symbolizer.end_report_elf();

    let mut unresolved = false;
    for &address in &args.addresses {
        let location = symbolizer.resolve(address);
        unresolved |= location.is_empty();
        print(&args, &symbolizer, address, location);
    }

    std::process::exit(if unresolved {
        EXIT_UNRESOLVED
    } else {
        EXIT_SUCCESS
    });
}
