//! A `Session` is the context a host keeps for one user between requests: the program text, the
//! dump range, and the results of the last run. Hosts own and pass sessions explicitly; nothing
//! in the crate holds state across calls.

use crate::address::Value;
use crate::bytecode::{Assembler, AssemblerOptions, IrEntry};
use crate::dump::{DumpRange, MemoryDump, DEFAULT_MEMORY_SIZE};
use crate::error::Result;
use crate::vm::execute;

pub const DEMO_PROGRAM: &str = "# Example: small test program
load_const 81 368
read_value 13 48
write_value 6 127 15
min 92 23 628
";

/// Sizes reported after a successful run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunStats {
  pub instructions  : usize,
  pub memory_size   : usize,
  pub bytecode_size : usize,
}

#[derive(Clone, Debug)]
pub struct Session {
  pub program_text : String,
  pub dump_range   : DumpRange,
  pub mem_size     : usize,
  pub options      : AssemblerOptions,

  // Results of the last successful run
  bytecode : Option<Vec<u8>>,
  ir       : Vec<IrEntry>,
  memory   : Option<Vec<Value>>,
}

impl Session {
  pub fn new(program_text: &str) -> Session {
    Session {
      program_text : program_text.to_string(),
      dump_range   : DumpRange::default(),
      mem_size     : DEFAULT_MEMORY_SIZE,
      options      : AssemblerOptions::default(),
      bytecode     : None,
      ir           : vec![],
      memory       : None,
    }
  }

  pub fn demo() -> Session {
    Session::new(DEMO_PROGRAM)
  }

  /// Assembles and executes `program_text`. On failure the results of any earlier run are
  /// discarded so they cannot be mistaken for this program's.
  pub fn assemble_and_run(&mut self) -> Result<RunStats> {
    self.bytecode = None;
    self.ir.clear();
    self.memory = None;

    let (bytecode, ir) = Assembler::new(self.options).assemble(&self.program_text)?;
    let memory = execute(&bytecode, self.mem_size)?;

    let stats = RunStats {
      instructions  : ir.len(),
      memory_size   : memory.len(),
      bytecode_size : bytecode.len(),
    };
    self.bytecode = Some(bytecode);
    self.ir = ir;
    self.memory = Some(memory);
    Ok(stats)
  }

  pub fn bytecode(&self) -> Option<&[u8]> {
    self.bytecode.as_deref()
  }

  pub fn ir(&self) -> &[IrEntry] {
    &self.ir
  }

  pub fn memory(&self) -> Option<&[Value]> {
    self.memory.as_deref()
  }

  /// The memory of the last run over the session's dump range.
  pub fn memory_dump(&self) -> Option<MemoryDump> {
    self.memory().map(|memory| MemoryDump::new(memory, self.dump_range))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;

  #[test]
  fn demo_run(){
    let mut session = Session::demo();
    let stats = session.assemble_and_run().unwrap();
    assert_eq!(stats, RunStats{ instructions: 4, memory_size: 4096, bytecode_size: 5 + 5 + 4 + 6 });
    assert_eq!(session.ir().len(), 4);
    assert_eq!(session.bytecode().map(|b| b.len()), Some(20));

    session.dump_range = DumpRange::new(80, 82);
    let dump = session.memory_dump().unwrap();
    assert_eq!(dump.rows(), &[(80, 0), (81, 368), (82, 0)]);
  }

  #[test]
  fn failed_run_clears_results(){
    let mut session = Session::new("load_const 1 2");
    session.mem_size = 4;
    assert!(session.assemble_and_run().is_ok());
    assert!(session.memory().is_some());

    session.program_text = "load_const 9 2".to_string();
    assert!(matches!(session.assemble_and_run(), Err(Error::OutOfBounds{ .. })));
    assert!(session.bytecode().is_none());
    assert!(session.ir().is_empty());
    assert!(session.memory_dump().is_none());
  }

  #[test]
  fn sessions_are_independent(){
    let mut first = Session::new("load_const 0 1");
    let mut second = Session::new("load_const 0 2");
    first.assemble_and_run().unwrap();
    second.assemble_and_run().unwrap();
    assert_eq!(first.memory().map(|m| m[0]), Some(1));
    assert_eq!(second.memory().map(|m| m[0]), Some(2));
  }
}
