//! The interpreter. A `VirtualMachine` is a flat memory array and a program counter that walks
//! a byte stream one instruction at a time until it runs off the end.

use std::fmt::{Display, Formatter};

use crate::address::{Address, Value};
use crate::bytecode::{try_decode_instruction, Instruction};
use crate::dump::{make_memory_table, DEFAULT_MEMORY_SIZE};
use crate::error::{Error, Result};

pub struct VirtualMachine {
  memory   : Vec<Value>, // The machine's entire state
  pc       : usize,      // Byte offset of the next instruction
  executed : usize,      // Instructions applied so far
}

impl VirtualMachine {

  // region Low-level utility methods

  /// A machine with `mem_size` zeroed cells.
  pub fn new(mem_size: usize) -> VirtualMachine {
    VirtualMachine {
      memory   : vec![0; mem_size],
      pc       : 0,
      executed : 0,
    }
  }

  pub fn memory(&self) -> &[Value] {
    &self.memory
  }

  pub fn into_memory(self) -> Vec<Value> {
    self.memory
  }

  pub fn pc(&self) -> usize {
    self.pc
  }

  pub fn executed(&self) -> usize {
    self.executed
  }

  fn check(&self, address: Address) -> Result<usize> {
    match address.is_within(self.memory.len()) {
      true  => Ok(address.idx()),
      false => Err(Error::OutOfBounds {
        address,
        mem_size: self.memory.len(),
        pc: self.pc
      })
    }
  }

  fn value_at(&self, address: Address) -> Result<Value> {
    let idx = self.check(address)?;
    Ok(self.memory[idx])
  }

  fn set_value_at(&mut self, address: Address, value: Value) -> Result<()> {
    let idx = self.check(address)?;
    self.memory[idx] = value;
    Ok(())
  }

  // endregion

  // region Interpretation

  /// Applies the effect of a single instruction. Sources are read before the destination is
  /// checked.
  fn apply(&mut self, instruction: &Instruction) -> Result<()> {
    match *instruction {

      Instruction::LoadConst{dest, value} => {
        self.set_value_at(dest, value as Value)
      }

      Instruction::ReadValue{dest, src} => {
        let value = self.value_at(src)?;
        self.set_value_at(dest, value)
      }

      Instruction::WriteValue{src, addr_c, addr_d} => {
        let value = self.value_at(src)?;
        self.set_value_at(addr_c + addr_d, value)
      }

      Instruction::Min{dest, lhs, rhs} => {
        let lhs = self.value_at(lhs)?;
        let rhs = self.value_at(rhs)?;
        self.set_value_at(dest, lhs.min(rhs))
      }

    }
  }

  /**
    Decodes and applies the instruction at the program counter. Returns `Ok(false)` once the
    program counter has reached the end of `bytecode`.
  */
  pub fn step(&mut self, bytecode: &[u8]) -> Result<bool> {
    if self.pc >= bytecode.len() {
      return Ok(false);
    }

    let (instruction, width) = try_decode_instruction(bytecode, self.pc)?;
    #[cfg(feature = "trace_computation")]
    println!("{:>6}: {}", self.pc, instruction);

    self.apply(&instruction)?;
    self.pc += width;
    self.executed += 1;
    Ok(true)
  }

  /// Runs `bytecode` from its first byte against the current memory. The executed count
  /// covers this run only.
  pub fn run(&mut self, bytecode: &[u8]) -> Result<()> {
    self.pc = 0;
    self.executed = 0;
    while self.step(bytecode)? {}
    Ok(())
  }

  // endregion
}

impl Default for VirtualMachine {
  fn default() -> Self {
    VirtualMachine::new(DEFAULT_MEMORY_SIZE)
  }
}

impl Display for VirtualMachine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let cells: Vec<(usize, Value)> =
      self.memory
          .iter()
          .enumerate()
          .filter(|(_, value)| **value != 0)
          .map(|(idx, value)| (idx, *value))
          .collect();

    write!(
      f,
      "PC: {}\tExecuted: {}\tMemory: {} cells, {} non-zero\n{}",
      self.pc,
      self.executed,
      self.memory.len(),
      cells.len(),
      make_memory_table(&cells)
    )
  }
}

/// Runs `bytecode` against a fresh, zeroed memory of `mem_size` cells and returns the memory.
pub fn execute(bytecode: &[u8], mem_size: usize) -> Result<Vec<Value>> {
  let mut machine = VirtualMachine::new(mem_size);
  machine.run(bytecode)?;
  Ok(machine.into_memory())
}
