/*!

  The machine has four instructions. Each one is a run of fixed-width unsigned fields packed
  least-significant-first into a little-endian integer of 4, 5 or 6 bytes, with the opcode always
  in the low 6 bits:

    load_const   [A:6][B:7][C:26]        5 bytes   M[B] = C
    read_value   [A:6][B:7][C:21]        5 bytes   M[B] = M[C]
    write_value  [A:6][B:7][C:7][D:7]    4 bytes   M[C + D] = M[B]
    min          [A:6][B:7][C:7][D:21]   6 bytes   M[B] = min(M[C], M[D])

  Instructions are concatenated with no padding, alignment, length prefixes, or terminator. A
  decoder recovers the boundaries by reading a 4 byte prefix, masking out the opcode, and looking
  up the opcode's width. Consequently any opcode added later must keep its opcode in the low 6
  bits of a prefix at least 4 bytes wide, or the stream needs an explicit length field.

  Unlike the opcodes, instructions are stored unencoded as variants of `Instruction` carrying
  their named fields, so decoding and execution are exhaustive matches over the four kinds.

*/

mod binary;
mod assembly;

pub use binary::{encode_instruction, try_decode_instruction, disassemble, Decoder,
                 EncodedInstruction, DoubleWord, Word};
pub use assembly::{assemble, Assembler, AssemblerOptions, IrEntry, OperandPolicy};

use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, IntoStaticStr, EnumString};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use crate::address::Address;

/// The unencoded value of a single instruction field.
pub type Field = u32;

pub const OPCODE_BITS: u32 = 6;
pub const OPCODE_MASK: Word = (1 << OPCODE_BITS) - 1;
/// Every instruction is at least this wide, so this many bytes always hold the opcode.
pub const PREFIX_WIDTH: usize = 4;
pub const MAX_WIDTH: usize = 6;

/**
  Opcodes of the virtual machine. The mnemonic of each opcode is its `strum` serialization, so
  `Opcode::from_str("min")` and `Opcode::Min.to_string()` convert between the two. The numeric
  value is the 6 bit code that appears in the bytecode.
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
// Only the tests walk every opcode.
#[cfg_attr(test, derive(strum_macros::EnumIter))]
#[repr(u8)]
pub enum Opcode {
  #[strum(serialize = "load_const")]
  LoadConst = 35,  // load_const( address, constant )
  #[strum(serialize = "read_value")]
  ReadValue = 32,  // read_value( address, address )
  #[strum(serialize = "write_value")]
  WriteValue = 17, // write_value( address, address, address )
  #[strum(serialize = "min")]
  Min = 58,        // min( address, address, address )
}

impl Opcode{
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// Returns the size in BYTES of an instruction with this opcode.
  pub fn width(&self) -> usize {
    match self {
      Opcode::LoadConst  => 5,
      Opcode::ReadValue  => 5,
      Opcode::WriteValue => 4,
      Opcode::Min        => 6,
    }
  }

  /// Bit widths of the fields A, B, C (and D), starting with the opcode field A.
  pub fn layout(&self) -> &'static [u32] {
    match self {
      Opcode::LoadConst  => &[OPCODE_BITS, 7, 26],
      Opcode::ReadValue  => &[OPCODE_BITS, 7, 21],
      Opcode::WriteValue => &[OPCODE_BITS, 7, 7, 7],
      Opcode::Min        => &[OPCODE_BITS, 7, 7, 21],
    }
  }

  /// The number of operands written in assembly, i.e. every field but the opcode.
  pub fn arity(&self) -> usize {
    self.layout().len() - 1
  }

  /// Bit widths of the operand fields only.
  pub fn operand_layout(&self) -> &'static [u32] {
    &self.layout()[1..]
  }
}

/// Holds the unencoded fields of an instruction, one variant per opcode.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// [A:6][B:7][C:26]
  LoadConst {
    dest  : Address,
    value : Field
  },
  /// [A:6][B:7][C:21]
  ReadValue {
    dest : Address,
    src  : Address
  },
  /// [A:6][B:7][C:7][D:7]; the destination is the sum of the C and D fields.
  WriteValue {
    src    : Address,
    addr_c : Address,
    addr_d : Address
  },
  /// [A:6][B:7][C:7][D:21]
  Min {
    dest : Address,
    lhs  : Address,
    rhs  : Address
  },
}

impl Instruction {
  pub fn opcode(&self) -> Opcode {
    match self {
      Instruction::LoadConst{..}  => Opcode::LoadConst,
      Instruction::ReadValue{..}  => Opcode::ReadValue,
      Instruction::WriteValue{..} => Opcode::WriteValue,
      Instruction::Min{..}        => Opcode::Min,
    }
  }

  pub fn width(&self) -> usize {
    self.opcode().width()
  }

  /**
    Builds the instruction for `opcode` from its operand fields (B, C, D in order). Returns
    `None` if the number of fields does not match the opcode's arity. Field values are taken
    as given; masking to the declared widths happens on encode.
  */
  pub fn from_fields(opcode: Opcode, fields: &[Field]) -> Option<Instruction> {
    let instruction =
      match (opcode, fields) {
        (Opcode::LoadConst, &[b, c]) => Instruction::LoadConst {
          dest: b.into(),
          value: c
        },
        (Opcode::ReadValue, &[b, c]) => Instruction::ReadValue {
          dest: b.into(),
          src: c.into()
        },
        (Opcode::WriteValue, &[b, c, d]) => Instruction::WriteValue {
          src: b.into(),
          addr_c: c.into(),
          addr_d: d.into()
        },
        (Opcode::Min, &[b, c, d]) => Instruction::Min {
          dest: b.into(),
          lhs: c.into(),
          rhs: d.into()
        },
        _ => return None
      };
    Some(instruction)
  }

  /// The operand fields B, C (and D) in encoding order.
  pub fn fields(&self) -> Vec<Field> {
    match *self {
      Instruction::LoadConst{dest, value} => vec![dest.idx() as Field, value],
      Instruction::ReadValue{dest, src}   => vec![dest.idx() as Field, src.idx() as Field],
      Instruction::WriteValue{src, addr_c, addr_d} => {
        vec![src.idx() as Field, addr_c.idx() as Field, addr_d.idx() as Field]
      }
      Instruction::Min{dest, lhs, rhs} => {
        vec![dest.idx() as Field, lhs.idx() as Field, rhs.idx() as Field]
      }
    }
  }
}

// Instructions display in assembly syntax, so a disassembly assembles back to the same bytes.
impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.opcode())?;
    for field in self.fields() {
      write!(f, " {}", field)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::convert::TryFrom;
  use std::str::FromStr;
  use strum::IntoEnumIterator;

  #[test]
  fn opcode_values(){
    assert_eq!(Opcode::LoadConst.code(), 35);
    assert_eq!(Opcode::ReadValue.code(), 32);
    assert_eq!(Opcode::WriteValue.code(), 17);
    assert_eq!(Opcode::Min.code(), 58);
  }

  #[test]
  fn opcode_from_code(){
    for opcode in Opcode::iter() {
      assert_eq!(Opcode::try_from(opcode.code()).ok(), Some(opcode));
    }
    assert!(Opcode::try_from(0u8).is_err());
    assert!(Opcode::try_from(63u8).is_err());
  }

  #[test]
  fn mnemonics(){
    assert_eq!(Opcode::from_str("load_const"), Ok(Opcode::LoadConst));
    assert_eq!(Opcode::from_str("read_value"), Ok(Opcode::ReadValue));
    assert_eq!(Opcode::from_str("write_value"), Ok(Opcode::WriteValue));
    assert_eq!(Opcode::from_str("min"), Ok(Opcode::Min));
    assert!(Opcode::from_str("max").is_err());
    assert_eq!(Opcode::WriteValue.to_string(), "write_value");
  }

  #[test]
  fn layouts_fit_widths(){
    for opcode in Opcode::iter() {
      let bits: u32 = opcode.layout().iter().sum();
      assert!(bits as usize <= opcode.width()*8, "{} overflows its width", opcode);
      assert!(opcode.width() >= PREFIX_WIDTH && opcode.width() <= MAX_WIDTH);
      // Encodings are built in an 8 byte buffer.
      assert!(MAX_WIDTH <= 8);
      assert!(opcode.code() as Word <= OPCODE_MASK);
    }
  }

  #[test]
  fn arities(){
    assert_eq!(Opcode::LoadConst.arity(), 2);
    assert_eq!(Opcode::ReadValue.arity(), 2);
    assert_eq!(Opcode::WriteValue.arity(), 3);
    assert_eq!(Opcode::Min.arity(), 3);
  }

  #[test]
  fn fields_round_trip(){
    let instruction = Instruction::Min{ dest: Address(0), lhs: Address(1), rhs: Address(2) };
    assert_eq!(instruction.fields(), vec![0, 1, 2]);
    assert_eq!(Instruction::from_fields(Opcode::Min, &[0, 1, 2]), Some(instruction));
    assert_eq!(Instruction::from_fields(Opcode::Min, &[0, 1]), None);
  }

  #[test]
  fn display_as_assembly(){
    let instruction = Instruction::WriteValue{ src: Address(1), addr_c: Address(2), addr_d: Address(3) };
    assert_eq!(instruction.to_string(), "write_value 1 2 3");
  }
}
