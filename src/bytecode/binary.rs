/*!
  This module is responsible for the encoding and decoding of binary instructions.

*/
use std::convert::TryFrom;

use super::{Field, Instruction, Opcode, OPCODE_MASK, PREFIX_WIDTH};
use crate::error::{Error, Result};

// If you change these you must also change `encode_instruction` and `try_decode_instruction`.
pub type Word = u32;
pub type DoubleWord = u64;

fn mask(bits: u32) -> DoubleWord {
  (1 << bits) - 1
}

/// The canonical little-endian encoding of one instruction, `width` bytes long.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EncodedInstruction{
  bytes: [u8; 8],
  width: usize
}

impl EncodedInstruction {
  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes[..self.width]
  }

  pub fn width(&self) -> usize {
    self.width
  }
}

/**
  Packs `fields` (opcode first) least-significant-first according to `layout`. Each field is
  masked to its declared width, so out-of-range values are truncated here.
*/
fn pack(layout: &[u32], fields: &[DoubleWord]) -> DoubleWord {
  let mut packed: DoubleWord = 0;
  let mut shift: u32 = 0;
  for (bits, field) in layout.iter().zip(fields) {
    packed |= (field & mask(*bits)) << shift;
    shift += bits;
  }
  packed
}

fn unpack(layout: &[u32], packed: DoubleWord) -> Vec<DoubleWord> {
  let mut shift: u32 = 0;
  layout.iter().map(|bits| {
    let field = (packed >> shift) & mask(*bits);
    shift += bits;
    field
  }).collect()
}

/// Packs raw operand values for `opcode`, masking each one to its field width. The caller is
/// responsible for passing `opcode.arity()` operands.
pub(crate) fn encode_fields(opcode: Opcode, operands: &[DoubleWord]) -> EncodedInstruction {
  let mut fields = Vec::with_capacity(operands.len() + 1);
  fields.push(opcode.code() as DoubleWord);
  fields.extend_from_slice(operands);

  let packed = pack(opcode.layout(), &fields);
  EncodedInstruction{
    bytes: packed.to_le_bytes(),
    width: opcode.width()
  }
}

/// Encodes the instruction into bytecode.
pub fn encode_instruction(instruction: &Instruction) -> EncodedInstruction {
  let operands: Vec<DoubleWord> =
    instruction.fields()
               .into_iter()
               .map(|field| field as DoubleWord)
               .collect();
  encode_fields(instruction.opcode(), &operands)
}

fn read_le(bytes: &[u8]) -> DoubleWord {
  let mut buffer = [0u8; 8];
  buffer[..bytes.len()].copy_from_slice(bytes);
  DoubleWord::from_le_bytes(buffer)
}

/**
  Decodes the instruction starting at byte offset `pc`, returning it together with its width
  in bytes.

  The 4 byte prefix is read first to find the opcode. A `write_value` is entirely contained in
  the prefix; every other instruction is re-read over its full declared width.
*/
pub fn try_decode_instruction(bytecode: &[u8], pc: usize) -> Result<(Instruction, usize)> {
  let remaining = bytecode.len().saturating_sub(pc);
  if remaining < PREFIX_WIDTH {
    return Err(Error::TruncatedStream { pc, needed: PREFIX_WIDTH, remaining });
  }

  let prefix = read_le(&bytecode[pc..pc + PREFIX_WIDTH]) as Word;
  let code = (prefix & OPCODE_MASK) as u8;
  let opcode =
    Opcode::try_from(code)
      .map_err(|_| Error::UnknownOpcode { opcode: code, pc })?;

  let width = opcode.width();
  let packed =
    if width == PREFIX_WIDTH {
      prefix as DoubleWord
    } else {
      if remaining < width {
        return Err(Error::TruncatedStream { pc, needed: width, remaining });
      }
      read_le(&bytecode[pc..pc + width])
    };

  let fields: Vec<Field> =
    unpack(opcode.layout(), packed)
      .into_iter()
      .skip(1)
      .map(|field| field as Field)
      .collect();

  // The layout has exactly `arity` operand fields, so this cannot fail.
  match Instruction::from_fields(opcode, &fields) {
    Some(instruction) => Ok((instruction, width)),
    None => unreachable!("layout of {} does not match its arity", opcode)
  }
}

/**
  Walks a byte stream one instruction at a time, yielding each instruction with its byte
  offset. The first decode error is yielded and ends the iteration.
*/
pub struct Decoder<'a> {
  bytecode: &'a [u8],
  pc: usize,
  failed: bool
}

impl<'a> Decoder<'a> {
  pub fn new(bytecode: &'a [u8]) -> Decoder<'a> {
    Decoder{ bytecode, pc: 0, failed: false }
  }

  /// Byte offset of the next instruction.
  pub fn pc(&self) -> usize {
    self.pc
  }
}

impl<'a> Iterator for Decoder<'a> {
  type Item = Result<(usize, Instruction)>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.failed || self.pc >= self.bytecode.len() {
      return None;
    }
    match try_decode_instruction(self.bytecode, self.pc) {
      Ok((instruction, width)) => {
        let offset = self.pc;
        self.pc += width;
        Some(Ok((offset, instruction)))
      }
      Err(e) => {
        self.failed = true;
        Some(Err(e))
      }
    }
  }
}

/// Decodes a whole stream, failing if it does not end exactly on an instruction boundary.
pub fn disassemble(bytecode: &[u8]) -> Result<Vec<Instruction>> {
  Decoder::new(bytecode)
    .map(|item| item.map(|(_offset, instruction)| instruction))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::address::Address;
  use strum::IntoEnumIterator;

  #[test]
  fn encode_load_const(){
    let instruction = Instruction::LoadConst{ dest: Address(5), value: 42 };
    let encoded = encode_instruction(&instruction);
    // 35 | 5 << 6 | 42 << 13 = 0x054163
    assert_eq!(encoded.as_bytes(), &[0x63, 0x41, 0x05, 0x00, 0x00]);
  }

  #[test]
  fn encode_write_value(){
    let instruction = Instruction::WriteValue{ src: Address(1), addr_c: Address(2), addr_d: Address(3) };
    let encoded = encode_instruction(&instruction);
    // 17 | 1 << 6 | 2 << 13 | 3 << 20 = 0x304051
    assert_eq!(encoded.as_bytes(), &[0x51, 0x40, 0x30, 0x00]);
  }

  #[test]
  fn width_ignores_magnitude(){
    for opcode in Opcode::iter() {
      let zeros = vec![0; opcode.arity()];
      let maxed = vec![DoubleWord::max_value(); opcode.arity()];
      assert_eq!(encode_fields(opcode, &zeros).width(), opcode.width());
      assert_eq!(encode_fields(opcode, &maxed).width(), opcode.width());
      let bytes = encode_fields(opcode, &maxed);
      let (decoded, width) = try_decode_instruction(bytes.as_bytes(), 0).unwrap();
      assert_eq!(width, opcode.width());
      assert_eq!(decoded.opcode(), opcode);
    }
  }

  #[test]
  fn fields_are_masked(){
    // 128 does not fit in the 7 bit B field and wraps to 0.
    let encoded = encode_fields(Opcode::ReadValue, &[128, 3]);
    let (decoded, _) = try_decode_instruction(encoded.as_bytes(), 0).unwrap();
    assert_eq!(decoded, Instruction::ReadValue{ dest: Address(0), src: Address(3) });
  }

  #[test]
  fn decode_round_trip(){
    let instructions = vec![
      Instruction::LoadConst{ dest: Address(127), value: (1 << 26) - 1 },
      Instruction::ReadValue{ dest: Address(6), src: Address((1 << 21) - 1) },
      Instruction::WriteValue{ src: Address(1), addr_c: Address(127), addr_d: Address(127) },
      Instruction::Min{ dest: Address(0), lhs: Address(1), rhs: Address(628) },
    ];
    let mut bytecode = vec![];
    for instruction in &instructions {
      bytecode.extend_from_slice(encode_instruction(instruction).as_bytes());
    }
    assert_eq!(bytecode.len(), 5 + 5 + 4 + 6);
    assert_eq!(disassemble(&bytecode).unwrap(), instructions);
  }

  #[test]
  fn decoder_offsets(){
    let mut bytecode = vec![];
    bytecode.extend_from_slice(encode_fields(Opcode::Min, &[0, 1, 2]).as_bytes());
    bytecode.extend_from_slice(encode_fields(Opcode::WriteValue, &[0, 1, 2]).as_bytes());
    bytecode.extend_from_slice(encode_fields(Opcode::LoadConst, &[0, 1]).as_bytes());
    let offsets: Vec<usize> =
      Decoder::new(&bytecode).map(|item| item.unwrap().0).collect();
    assert_eq!(offsets, vec![0, 6, 10]);
  }

  #[test]
  fn short_prefix(){
    assert_eq!(
      try_decode_instruction(&[0x63, 0x41, 0x05], 0),
      Err(Error::TruncatedStream{ pc: 0, needed: 4, remaining: 3 })
    );
  }

  #[test]
  fn short_body(){
    // A load_const prefix with its fifth byte missing.
    assert_eq!(
      try_decode_instruction(&[0x63, 0x41, 0x05, 0x00], 0),
      Err(Error::TruncatedStream{ pc: 0, needed: 5, remaining: 4 })
    );
  }

  #[test]
  fn unknown_opcode(){
    assert_eq!(
      try_decode_instruction(&[0x00, 0x00, 0x00, 0x00], 0),
      Err(Error::UnknownOpcode{ opcode: 0, pc: 0 })
    );
  }

  #[test]
  fn decoder_stops_after_error(){
    let mut bytecode = encode_fields(Opcode::WriteValue, &[1, 2, 3]).as_bytes().to_vec();
    bytecode.push(0xFF);
    let items: Vec<_> = Decoder::new(&bytecode).collect();
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert_eq!(items[1], Err(Error::TruncatedStream{ pc: 4, needed: 4, remaining: 1 }));
    assert!(disassemble(&bytecode).is_err());
  }
}
