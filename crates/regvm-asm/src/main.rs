use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use regvm::disasm::listing;
use regvm::{image, MachineConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "regvm assembler")]
struct Opts {
    /// Assembly source, or a binary image with --disassemble
    #[arg(short, long)]
    input: PathBuf,
    /// Output binary image (little-endian words, entry first)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print an address/word/instruction listing
    #[arg(long)]
    listing: bool,
    /// Read INPUT as an image and print its listing
    #[arg(long, conflicts_with = "output")]
    disassemble: bool,
    /// JSON machine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let cfg = match &opts.config {
        Some(path) => MachineConfig::from_file(path)?,
        None => MachineConfig::default(),
    };
    let table = cfg.command_table()?;

    let program = if opts.disassemble {
        let bytes = fs::read(&opts.input)
            .with_context(|| format!("reading {}", opts.input.display()))?;
        image::from_bytes(&bytes)?
    } else {
        let src = fs::read_to_string(&opts.input)
            .with_context(|| format!("reading {}", opts.input.display()))?;
        regvm::Parser::new(&table)
            .parse_source(&src)
            .with_context(|| format!("assembling {}", opts.input.display()))?
    };
    let Some((entry, words)) = program.split_first() else {
        bail!("empty image");
    };

    if opts.listing || opts.disassemble {
        println!("end {entry}");
        print!("{}", listing(words, &table));
    }
    if let Some(out) = &opts.output {
        fs::write(out, image::to_bytes(&program))
            .with_context(|| format!("writing {}", out.display()))?;
    }
    Ok(())
}
