//! Every failure the assembler, the interpreter, or the dump renderer can report. None of these
//! are transient, so callers get the context they need to report precisely and nothing else.

use thiserror::Error;

use crate::address::Address;

pub type Result<T> = std::result::Result<T, Error>;

/// What was wrong with the operands of an assembly line.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum OperandFault {
  #[error("expected {expected} operands but was given {found}")]
  WrongCount {
    expected: usize,
    found: usize
  },
  #[error("`{0}` is not an integer")]
  NotAnInteger(String),
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
  /// Wrong operand count or a non-integer operand token.
  #[error("Error on line {line}: {fault}: `{text}`")]
  MalformedOperand {
    line: usize,
    text: String,
    fault: OperandFault
  },

  /// The mnemonic is not one of the four known ones.
  #[error("Error on line {line}: {name} is not an instruction.")]
  UnknownInstruction {
    line: usize,
    name: String
  },

  /// Only raised under `OperandPolicy::Reject`.
  #[error("Error on line {line}: operand {operand} does not fit in {bits} bits: `{text}`")]
  OperandOutOfRange {
    line: usize,
    text: String,
    operand: String,
    bits: u32
  },

  #[error("unknown opcode {opcode} at byte offset {pc}")]
  UnknownOpcode {
    opcode: u8,
    pc: usize
  },

  #[error("truncated instruction at byte offset {pc}: {needed} bytes required, {remaining} remaining")]
  TruncatedStream {
    pc: usize,
    needed: usize,
    remaining: usize
  },

  #[error("{address} is out of bounds for a memory of {mem_size} cells (instruction at byte offset {pc})")]
  OutOfBounds {
    address: Address,
    mem_size: usize,
    pc: usize
  },

  #[error("invalid dump range `{0}`, expected `start-end`")]
  InvalidDumpRange(String),
}
