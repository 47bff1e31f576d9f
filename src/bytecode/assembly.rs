/*!
  The human readable textual form of bytecode is called assembly. One instruction is written per
  line as a mnemonic followed by whitespace separated operands:

    # comments start with `#` or `//`
    load_const 5 42
    read_value B=6 C=5
    min 0, 1, 2

  An operand is an integer, optionally written as `name=value` (the name is ignored) and
  optionally followed by `,`. The mnemonic is matched case-insensitively against the `strum`
  serialization of `Opcode`.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use string_cache::DefaultAtom;
use nom::{
  IResult,
  bytes::complete::take_till,
  character::complete::{char as one_char, digit1, one_of},
  combinator::{all_consuming, map, opt},
  multi::many0,
  sequence::{pair, preceded, terminated},
};

use super::{Opcode, EncodedInstruction};
use super::binary::{encode_fields, DoubleWord};
use crate::error::{Error, OperandFault, Result};

/**
  What the assembler does with an operand that does not fit in its field. The bytecode format
  has always masked fields silently, so `Truncate` is the default; `Reject` turns the same
  programs into `Error::OperandOutOfRange`.
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OperandPolicy {
  /// Mask each operand to its field width. Negative operands wrap as two's complement.
  Truncate,
  /// Fail unless `0 <= operand < 2^bits`.
  Reject,
}

impl Default for OperandPolicy {
  fn default() -> Self {
    OperandPolicy::Truncate
  }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct AssemblerOptions {
  pub operand_policy: OperandPolicy,
}

/// A diagnostic record of one assembled line: the lower-cased mnemonic and the operands as
/// written, before any masking (reduced modulo 2^64 if they do not fit an `i64`). It is never
/// re-interpreted.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct IrEntry {
  pub mnemonic: DefaultAtom,
  pub operands: Vec<i64>,
}

impl Display for IrEntry{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "({}, [{}])",
      self.mnemonic,
      self.operands
          .iter()
          .map(i64::to_string)
          .collect::<Vec<String>>()
          .join(", ")
    )
  }
}

// region Operand parsers

/**
  An integer operand reduced modulo 2^64. Fields are at most 26 bits wide, so the reduction keeps
  every bit the encoding can use, and any integer the source spells out can still be masked.
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Integer {
  magnitude : DoubleWord,
  negative  : bool,
  exact     : bool, // False once the magnitude wrapped
}

impl Integer {
  fn from_digits(negative: bool, digits: &str) -> Integer {
    let mut magnitude: DoubleWord = 0;
    let mut exact = true;
    for digit in digits.bytes().map(|byte| (byte - b'0') as DoubleWord) {
      magnitude =
        match magnitude.checked_mul(10).and_then(|m| m.checked_add(digit)) {
          Some(m) => m,
          None => {
            exact = false;
            magnitude.wrapping_mul(10).wrapping_add(digit)
          }
        };
    }
    Integer{ magnitude, negative, exact }
  }

  /// Two's complement bits of the operand, modulo 2^64.
  fn bits(&self) -> DoubleWord {
    match self.negative {
      true  => self.magnitude.wrapping_neg(),
      false => self.magnitude
    }
  }

  /// The value recorded in the IR; exact for everything that fits in an `i64`.
  fn value(&self) -> i64 {
    self.bits() as i64
  }

  /// Whether `0 <= operand < 2^bits`.
  fn fits(&self, bits: u32) -> bool {
    self.exact && (!self.negative || self.magnitude == 0) && self.magnitude >> bits == 0
  }
}

fn operand_name(input: &str) -> IResult<&str, &str> {
  terminated(take_till(|c: char| c == '='), one_char('='))(input)
}

fn integer(input: &str) -> IResult<&str, Integer> {
  map(
    pair(opt(one_of("+-")), digit1),
    |(sign, digits): (Option<char>, &str)| Integer::from_digits(sign == Some('-'), digits)
  )(input)
}

/// `[name=]integer[,...]`
fn operand(input: &str) -> IResult<&str, Integer> {
  terminated(
    preceded(opt(operand_name), integer),
    many0(one_char(','))
  )(input)
}

fn parse_operand(token: &str) -> Option<Integer> {
  match all_consuming(operand)(token) {
    Ok((_rest, value)) => Some(value),
    Err(_e) => None
  }
}

/// Source lines, ending at `\n`, `\r\n` or a lone `\r`.
fn source_lines(text: &str) -> impl Iterator<Item = &str> {
  text.lines().flat_map(|line| line.split('\r'))
}

// endregion

/// Whether a source line carries no instruction.
fn is_blank_or_comment(line: &str) -> bool {
  line.is_empty() || line.starts_with('#') || line.starts_with("//")
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Assembler {
  options: AssemblerOptions,
}

impl Assembler {
  pub fn new(options: AssemblerOptions) -> Assembler {
    Assembler{ options }
  }

  pub fn options(&self) -> AssemblerOptions {
    self.options
  }

  /**
    Assembles `text` into bytecode, in source order, together with one IR entry per assembled
    line. Assembly stops at the first invalid line; nothing is returned for the lines before it.
  */
  pub fn assemble(&self, text: &str) -> Result<(Vec<u8>, Vec<IrEntry>)> {
    let mut bytecode: Vec<u8> = Vec::new();
    let mut ir: Vec<IrEntry> = Vec::new();

    for (idx, raw) in source_lines(text).enumerate() {
      let line = raw.trim();
      if is_blank_or_comment(line) {
        continue;
      }

      let (encoded, entry) = self.assemble_line(idx + 1, line)?;
      #[cfg(feature = "trace_computation")]
      println!("{:>4}: {} -> {:02X?}", idx + 1, entry, encoded.as_bytes());

      bytecode.extend_from_slice(encoded.as_bytes());
      ir.push(entry);
    }

    Ok((bytecode, ir))
  }

  fn assemble_line(&self, line: usize, text: &str) -> Result<(EncodedInstruction, IrEntry)> {
    let mut tokens = text.split_whitespace();
    // `text` is trimmed and non-empty, so there is always a first token.
    let mnemonic = tokens.next().unwrap_or_default().to_lowercase();

    let operands =
      tokens
        .map(|token| {
          match parse_operand(token) {
            Some(integer) => Ok((token, integer)),
            None => Err(Error::MalformedOperand {
              line,
              text: text.to_string(),
              fault: OperandFault::NotAnInteger(token.to_string())
            })
          }
        })
        .collect::<Result<Vec<(&str, Integer)>>>()?;

    let opcode =
      Opcode::from_str(&mnemonic)
        .map_err(|_| Error::UnknownInstruction { line, name: mnemonic.clone() })?;

    if operands.len() != opcode.arity() {
      return Err(Error::MalformedOperand {
        line,
        text: text.to_string(),
        fault: OperandFault::WrongCount { expected: opcode.arity(), found: operands.len() }
      });
    }

    if self.options.operand_policy == OperandPolicy::Reject {
      for (bits, (token, integer)) in opcode.operand_layout().iter().zip(&operands) {
        if !integer.fits(*bits) {
          return Err(Error::OperandOutOfRange {
            line,
            text: text.to_string(),
            operand: token.to_string(),
            bits: *bits
          });
        }
      }
    }

    // `encode_fields` masks the two's complement bits to the field widths.
    let fields: Vec<DoubleWord> = operands.iter().map(|(_, integer)| integer.bits()).collect();
    let encoded = encode_fields(opcode, &fields);

    let entry = IrEntry {
      mnemonic: DefaultAtom::from(mnemonic.as_str()),
      operands: operands.iter().map(|(_, integer)| integer.value()).collect()
    };
    Ok((encoded, entry))
  }
}

/// Assembles `text` with the default options.
pub fn assemble(text: &str) -> Result<(Vec<u8>, Vec<IrEntry>)> {
  Assembler::default().assemble(text)
}
