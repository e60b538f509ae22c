//! Command-line driver for [`memmanager`]: replays a sequence of allocate
//! and free commands against a fresh arena and dumps the blocks after each
//! step.
//!
//! ```text
//! memmanager --capacity 100 alloc:30 alloc:20 free:0x0 free:0x1e
//! memmanager --capacity 4096 --script workload.txt
//! ```

use std::{fs, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use memmanager::{Address, MemoryManager};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// First-fit arena allocator playground.
#[derive(Parser)]
#[command(name = "memmanager")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Size of the arena in bytes
    #[arg(short, long, default_value_t = 100)]
    capacity: usize,

    /// File with one command per line (`alloc <size>`, `free <addr>`,
    /// `dump`, `stats`; `#` starts a comment)
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Stop at the first command that fails
    #[arg(long)]
    fail_fast: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Commands to run after the script, e.g. `alloc:30` or `free:0x1e`
    ops: Vec<Op>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Alloc(usize),
    Free(Address),
    Dump,
    Stats,
}

impl FromStr for Op {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(2, [':', ' ', '\t']);
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim);

        let op = match (name, arg) {
            ("alloc" | "malloc", Some(size)) => Op::Alloc(parse_number(size)?),
            ("free", Some(addr)) => Op::Free(Address::new(parse_number(addr)?)),
            ("dump", None) => Op::Dump,
            ("stats", None) => Op::Stats,
            _ => bail!("unrecognized command `{s}`"),
        };

        Ok(op)
    }
}

/// Parses decimal or `0x`-prefixed hexadecimal numbers.
fn parse_number(s: &str) -> Result<usize> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };

    parsed.with_context(|| format!("invalid number `{s}`"))
}

fn parse_script(source: &str) -> Result<Vec<Op>> {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.split('#').next().unwrap_or_default().trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(number, line)| line.parse().with_context(|| format!("line {number}")))
        .collect()
}

fn setup_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

fn run(manager: &mut MemoryManager, op: Op) -> Result<()> {
    match op {
        Op::Alloc(size) => {
            let address = manager
                .allocate(size)
                .with_context(|| format!("alloc {size}"))?;
            println!("alloc {size} -> {address}");
        }
        Op::Free(address) => {
            manager
                .deallocate(address)
                .with_context(|| format!("free {address}"))?;
            println!("free {address}");
        }
        Op::Dump => {}
        Op::Stats => println!("{}", manager.stats()),
    }

    println!("  {manager}");

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let mut ops = match &cli.script {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_script(&source).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Vec::new(),
    };
    ops.extend(cli.ops.iter().copied());

    let mut manager = MemoryManager::new(cli.capacity)?;
    info!(capacity = cli.capacity, ops = ops.len(), "starting replay");
    println!("  {manager}");

    let mut failures = 0;
    for op in ops {
        if let Err(err) = run(&mut manager, op) {
            if cli.fail_fast {
                return Err(err);
            }
            eprintln!("error: {err:#}");
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} command(s) failed");
    }

    Ok(())
}
