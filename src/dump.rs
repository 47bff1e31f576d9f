/*!
  Renderings of the machine's inputs and outputs for whatever is hosting it: the memory dump in
  its CSV form and as a table, and the hex listing of bytecode. None of this feeds back into
  assembly or execution.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use prettytable::{format as TableFormat, Table};

use crate::address::Value;
use crate::error::Error;

/// Memory size used when the caller does not pick one.
pub const DEFAULT_MEMORY_SIZE: usize = 4096;
pub const HEX_BYTES_PER_ROW: usize = 16;

/// An inclusive range of addresses, written `start-end`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DumpRange {
  pub start: usize,
  pub end: usize,
}

impl DumpRange {
  pub fn new(start: usize, end: usize) -> DumpRange {
    DumpRange{ start, end }
  }

  /// Parses `text`, falling back to the default range when it is malformed.
  pub fn parse_or_default(text: &str) -> DumpRange {
    text.parse().unwrap_or_default()
  }
}

impl Default for DumpRange {
  fn default() -> Self {
    DumpRange{ start: 0, end: 127 }
  }
}

impl FromStr for DumpRange {
  type Err = Error;

  fn from_str(text: &str) -> Result<DumpRange, Error> {
    let invalid = || Error::InvalidDumpRange(text.to_string());
    let mut bounds = text.trim().splitn(2, '-');
    let start = bounds.next().ok_or_else(invalid)?.trim();
    let end = bounds.next().ok_or_else(invalid)?.trim();
    Ok(DumpRange {
      start: start.parse().map_err(|_| invalid())?,
      end: end.parse().map_err(|_| invalid())?,
    })
  }
}

impl Display for DumpRange{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}-{}", self.start, self.end)
  }
}

/// `(address, value)` rows of memory for a range, clipped to the memory that exists.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryDump {
  rows: Vec<(usize, Value)>,
}

impl MemoryDump {
  pub fn new(memory: &[Value], range: DumpRange) -> MemoryDump {
    let rows =
      match memory.len() {
        0 => vec![],
        len => {
          let end = range.end.min(len - 1);
          (range.start..=end).map(|address| (address, memory[address])).collect()
        }
      };
    MemoryDump{ rows }
  }

  pub fn rows(&self) -> &[(usize, Value)] {
    &self.rows
  }

  /// `addr,value` followed by one line per address.
  pub fn to_csv(&self) -> String {
    let mut csv = String::from("addr,value\n");
    for (address, value) in &self.rows {
      csv.push_str(&format!("{},{}\n", address, value));
    }
    csv
  }
}

impl Display for MemoryDump {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", make_memory_table(&self.rows))
  }
}

/// Bytes as `0xNN`, sixteen to a row.
pub fn hex_listing(bytecode: &[u8]) -> String {
  bytecode
    .chunks(HEX_BYTES_PER_ROW)
    .map(|row| {
      row.iter()
         .map(|byte| format!("0x{:02X}", byte))
         .collect::<Vec<String>>()
         .join(", ")
    })
    .collect::<Vec<String>>()
    .join("\n")
}

pub(crate) fn make_memory_table(cells: &[(usize, Value)]) -> Table {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Address", ubl->"Contents"]);

  for (address, value) in cells {
    table.add_row(row![r->format!("M[{}] =", address), format!("{}", value)]);
  }
  table
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
    .column_separator('│')
    .borders(' ')
    .separator(
      TableFormat::LinePosition::Title,
      TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
    )
    .separator(
      TableFormat::LinePosition::Bottom,
      TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
    )
    .padding(1, 1)
    .build();
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_range(){
    assert_eq!("0-127".parse::<DumpRange>(), Ok(DumpRange::new(0, 127)));
    assert_eq!(" 5 - 9 ".parse::<DumpRange>(), Ok(DumpRange::new(5, 9)));
    assert_eq!(
      "5".parse::<DumpRange>(),
      Err(Error::InvalidDumpRange("5".to_string()))
    );
    assert!("a-b".parse::<DumpRange>().is_err());
    assert!("-1-4".parse::<DumpRange>().is_err());
  }

  #[test]
  fn range_fallback(){
    assert_eq!(DumpRange::parse_or_default("nonsense"), DumpRange::new(0, 127));
    assert_eq!(DumpRange::parse_or_default("3-4"), DumpRange::new(3, 4));
    assert_eq!(DumpRange::new(3, 4).to_string(), "3-4");
  }

  #[test]
  fn dump_is_clipped(){
    let memory = vec![7, 8, 9, 10];
    let dump = MemoryDump::new(&memory, DumpRange::new(2, 100));
    assert_eq!(dump.rows(), &[(2, 9), (3, 10)]);
    assert!(MemoryDump::new(&memory, DumpRange::new(6, 100)).rows().is_empty());
    assert!(MemoryDump::new(&memory, DumpRange::new(3, 1)).rows().is_empty());
    assert!(MemoryDump::new(&[], DumpRange::default()).rows().is_empty());
  }

  #[test]
  fn csv(){
    let memory = vec![0, 42, 0];
    let dump = MemoryDump::new(&memory, DumpRange::new(0, 1));
    assert_eq!(dump.to_csv(), "addr,value\n0,0\n1,42\n");
  }

  #[test]
  fn dump_table(){
    let dump = MemoryDump::new(&[0, 42], DumpRange::default());
    let text = dump.to_string();
    assert!(text.contains("M[1] ="));
    assert!(text.contains("42"));
  }

  #[test]
  fn hex(){
    assert_eq!(hex_listing(&[]), "");
    assert_eq!(hex_listing(&[0x63, 0x41, 0x05]), "0x63, 0x41, 0x05");
    let bytes: Vec<u8> = (0..17).collect();
    let listing = hex_listing(&bytes);
    let rows: Vec<&str> = listing.lines().collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1], "0x10");
    assert!(rows[0].starts_with("0x00, 0x01"));
  }
}
