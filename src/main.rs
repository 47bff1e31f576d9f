//! Assembles and runs a program, then prints a memory dump. Without `--input` the built-in demo
//! runs.
//!
//!     uvm [-i program.uasm] [-r start-end] [-m mem_size] [-o out.bin] [-d dump.csv] [--strict] [-t]

use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use uvm::{hex_listing, DumpRange, OperandPolicy, Session, DEFAULT_MEMORY_SIZE};

/// Assembler and interpreter for the four-instruction virtual machine.
#[derive(Debug, Parser)]
#[command(name = "uvm")]
pub struct Args {
  /// The assembly program to run.
  #[arg(short = 'i', long)]
  input: Option<PathBuf>,

  /// Memory cells to dump, as `start-end`. A malformed range falls back to 0-127.
  #[arg(short = 'r', long)]
  range: Option<String>,

  /// Number of memory cells.
  #[arg(short = 'm', long, default_value_t = DEFAULT_MEMORY_SIZE)]
  mem_size: usize,

  /// Write the assembled bytecode to this file.
  #[arg(short = 'o', long)]
  output: Option<PathBuf>,

  /// Write the memory dump as CSV to this file.
  #[arg(short = 'd', long)]
  dump: Option<PathBuf>,

  /// Reject operands that do not fit their field instead of truncating them.
  #[arg(long)]
  strict: bool,

  /// Also print the IR and a hex listing of the bytecode.
  #[arg(short = 't', long)]
  test: bool,
}

fn main() {
  match entry() {
    Ok(_) => {}
    Err(err) => {
      eprintln!("{}", err);
      process::exit(1);
    }
  }
}

fn session_for(args: &Args) -> Result<Session, Box<dyn Error>> {
  let mut session =
    match &args.input {
      Some(path) => {
        let text =
          std::fs::read_to_string(path)
            .map_err(|e| format!("Could not read {}: {}", path.display(), e))?;
        Session::new(&text)
      }
      None => Session::demo()
    };

  if let Some(range) = &args.range {
    session.dump_range = DumpRange::parse_or_default(range);
  }
  session.mem_size = args.mem_size;
  if args.strict {
    session.options.operand_policy = OperandPolicy::Reject;
  }
  Ok(session)
}

fn entry() -> Result<(), Box<dyn Error>> {
  let args = Args::parse();
  let mut session = session_for(&args)?;
  let stats = session.assemble_and_run()?;

  if args.test {
    println!("IR:");
    for entry in session.ir() {
      println!("{}", entry);
    }
    println!("\nBytecode ({} bytes):", stats.bytecode_size);
    println!("{}", hex_listing(session.bytecode().unwrap_or_default()));
  }

  if let Some(path) = &args.output {
    std::fs::write(path, session.bytecode().unwrap_or_default())?;
  }

  println!(
    "Assembled {} instructions; memory size {}",
    stats.instructions, stats.memory_size
  );
  if let Some(dump) = session.memory_dump() {
    if let Some(path) = &args.dump {
      std::fs::write(path, dump.to_csv())?;
    }
    println!("Memory {}:\n{}", session.dump_range, dump);
  }
  Ok(())
}
