//! A memory address is a direct index into the machine's flat memory array. There is no paging
//! and no protection; the only check is the bounds check the interpreter performs on every access.

use std::ops::Add;
use std::fmt::{Display, Formatter};

// `AddressNumberType` is `usize`, as it is naturally an index into a memory store.
pub type AddressNumberType = usize;

/// The contents of a single memory cell.
pub type Value = i64;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Default)]
pub struct Address(pub AddressNumberType);

impl Address {
  /// Converts the address to an index into memory.
  pub fn idx(&self) -> AddressNumberType {
    self.0
  }

  /// Whether the address can be used with a memory of `mem_size` cells.
  pub fn is_within(&self, mem_size: usize) -> bool {
    self.0 < mem_size
  }
}

impl From<u32> for Address {
  fn from(field: u32) -> Address {
    Address(field as AddressNumberType)
  }
}

impl Display for Address{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "M[{}]", self.0)
  }
}

// `write_value` addresses the sum of two address fields.
impl Add<Address> for Address{
  type Output = Address;
  fn add(self, rhs: Address) -> Address{
    Address(self.0 + rhs.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sum_of_addresses(){
    assert_eq!(Address(2) + Address(3), Address(5));
    assert_eq!(Address::from(127u32) + Address::from(127u32), Address(254));
  }

  #[test]
  fn bounds(){
    assert!(Address(15).is_within(16));
    assert!(!Address(16).is_within(16));
    assert!(!Address(0).is_within(0));
  }

  #[test]
  fn display(){
    assert_eq!(format!("{}", Address(42)), "M[42]");
  }
}
