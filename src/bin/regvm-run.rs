use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use regvm::{image, HaltReason, MachineConfig, Processor, StdConsole};

#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble and run a program on the regvm interpreter")]
struct Opts {
    /// Treat INPUT as a binary image instead of assembly source
    #[arg(long)]
    image: bool,
    /// JSON machine configuration (memory size, syscall codes, command table)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Fault after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,
    #[arg(value_name = "INPUT")]
    input: PathBuf,
}

fn main() -> Result<ExitCode> {
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

    let program = if opts.image {
        let bytes = std::fs::read(&opts.input)
            .with_context(|| format!("reading {}", opts.input.display()))?;
        image::from_bytes(&bytes)?
    } else {
        let src = std::fs::read_to_string(&opts.input)
            .with_context(|| format!("reading {}", opts.input.display()))?;
        match regvm::Parser::new(&table).parse_source(&src) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("{}: {e}", opts.input.display());
                return Ok(ExitCode::from(2));
            }
        }
    };

    let mut cpu = Processor::new(&cfg, StdConsole::stdio())?;
    if let Err(e) = cpu.load_program(&program) {
        eprintln!("{}: {e}", opts.input.display());
        return Ok(ExitCode::from(2));
    }

    let outcome = match opts.max_steps {
        Some(n) => cpu.run_with_limit(n),
        None => cpu.run(),
    };
    Ok(match outcome {
        Ok(HaltReason::Exit) => ExitCode::SUCCESS,
        Ok(HaltReason::UnknownSyscall(code)) => {
            eprintln!("No such syscall: {code}");
            ExitCode::from(1)
        }
        Err(trap) => {
            eprintln!("TRAP: {trap}");
            ExitCode::from(3)
        }
    })
}
