/*!
  A tiny virtual machine: four bit-packed instructions, an assembler from mnemonic source to
  bytecode, and an interpreter that runs bytecode against a flat memory of integers.

  ```
  let (bytecode, _ir) = uvm::assemble("load_const 1 10\nload_const 2 4\nmin 0 1 2").unwrap();
  let memory = uvm::execute(&bytecode, 16).unwrap();
  assert_eq!(memory[0], 4);
  ```
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;
extern crate strum;
extern crate strum_macros;

pub mod address;
pub mod bytecode;
pub mod dump;
pub mod error;
pub mod session;
pub mod vm;

pub use address::{Address, Value};
pub use bytecode::{assemble, disassemble, Assembler, AssemblerOptions, Instruction, IrEntry,
                   Opcode, OperandPolicy};
pub use dump::{hex_listing, DumpRange, MemoryDump, DEFAULT_MEMORY_SIZE};
pub use error::{Error, OperandFault, Result};
pub use session::{RunStats, Session, DEMO_PROGRAM};
pub use vm::{execute, VirtualMachine};
