//! Type-safe wrappers for expression widths and kinds.
//!
//! Only two widths are modeled: booleans (1 bit) and 32-bit integers.
//! Keeping them behind a newtype makes it impossible to mix a bit-width with
//! an arbitrary `u32` (e.g. a byte count coming from the program).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The width of an expression, in bits.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Width(u32);

impl Width {
    pub const BOOL: Width = Width(1);
    pub const INT32: Width = Width(32);

    /// Creates a width from a raw bit count.
    ///
    /// # Panics
    ///
    /// Panics if the width is not one of the supported widths.
    pub fn new(bits: u32) -> Self {
        let w = Width(bits);
        assert!(w.is_supported(), "Unsupported width: {} bits", bits);
        w
    }

    /// Returns the raw number of bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns the width in whole bytes.
    pub const fn bytes(self) -> u32 {
        self.0.div_ceil(8)
    }

    pub const fn is_bool(self) -> bool {
        self.0 == 1
    }

    pub fn is_supported(self) -> bool {
        self == Width::BOOL || self == Width::INT32
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Width::BOOL => write!(f, "i1"),
            Width(bits) => write!(f, "i{}", bits),
        }
    }
}

/// Arithmetic operators over 32-bit integers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
}

/// Comparison operators. `Eq` and `Ne` accept booleans as well as integers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Ult,
    Ule,
    Ugt,
    Uge,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl CmpOp {
    /// Returns `true` for the orderings that interpret operands as signed.
    pub fn is_signed(self) -> bool {
        matches!(self, CmpOp::Slt | CmpOp::Sle | CmpOp::Sgt | CmpOp::Sge)
    }

    /// Returns `true` if the comparison is defined on booleans.
    pub fn accepts_bool(self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::Ne)
    }
}

/// The kind tag of an expression node.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Kind {
    Constant,
    Symbolic,
    Not,
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    Eq,
    Ne,
    Ult,
    Ule,
    Ugt,
    Uge,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl Kind {
    /// Numeric code of the kind, used to seed structural hashes.
    pub fn code(self) -> u64 {
        match self {
            Kind::Constant => 0,
            Kind::Not => 1,
            Kind::Add => 2,
            Kind::Sub => 3,
            Kind::Mul => 4,
            Kind::UDiv => 5,
            Kind::SDiv => 6,
            Kind::Eq => 7,
            Kind::Ne => 8,
            Kind::Ult => 9,
            Kind::Ule => 10,
            Kind::Ugt => 11,
            Kind::Uge => 12,
            Kind::Slt => 13,
            Kind::Sle => 14,
            Kind::Sgt => 15,
            Kind::Sge => 16,
            Kind::Symbolic => 17,
        }
    }

    /// Number of children a node of this kind carries.
    pub fn num_kids(self) -> usize {
        match self {
            Kind::Constant | Kind::Symbolic => 0,
            Kind::Not => 1,
            _ => 2,
        }
    }
}

impl From<BinaryOp> for Kind {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => Kind::Add,
            BinaryOp::Sub => Kind::Sub,
            BinaryOp::Mul => Kind::Mul,
            BinaryOp::UDiv => Kind::UDiv,
            BinaryOp::SDiv => Kind::SDiv,
        }
    }
}

impl From<CmpOp> for Kind {
    fn from(op: CmpOp) -> Self {
        match op {
            CmpOp::Eq => Kind::Eq,
            CmpOp::Ne => Kind::Ne,
            CmpOp::Ult => Kind::Ult,
            CmpOp::Ule => Kind::Ule,
            CmpOp::Ugt => Kind::Ugt,
            CmpOp::Uge => Kind::Uge,
            CmpOp::Slt => Kind::Slt,
            CmpOp::Sle => Kind::Sle,
            CmpOp::Sgt => Kind::Sgt,
            CmpOp::Sge => Kind::Sge,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SDiv => "sdiv",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "eq",
            CmpOp::Ne => "ne",
            CmpOp::Ult => "ult",
            CmpOp::Ule => "ule",
            CmpOp::Ugt => "ugt",
            CmpOp::Uge => "uge",
            CmpOp::Slt => "slt",
            CmpOp::Sle => "sle",
            CmpOp::Sgt => "sgt",
            CmpOp::Sge => "sge",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_creation() {
        assert_eq!(Width::new(1), Width::BOOL);
        assert_eq!(Width::new(32), Width::INT32);
        assert_eq!(Width::INT32.bytes(), 4);
        assert_eq!(Width::BOOL.bytes(), 1);
        assert!(Width::BOOL.is_bool());
        assert!(!Width::INT32.is_bool());
    }

    #[test]
    #[should_panic(expected = "Unsupported width")]
    fn test_width_unsupported_panics() {
        Width::new(8);
    }

    #[test]
    fn test_kind_codes_are_distinct() {
        let kinds = [
            Kind::Constant,
            Kind::Symbolic,
            Kind::Not,
            Kind::Add,
            Kind::Sub,
            Kind::Mul,
            Kind::UDiv,
            Kind::SDiv,
            Kind::Eq,
            Kind::Ne,
            Kind::Ult,
            Kind::Ule,
            Kind::Ugt,
            Kind::Uge,
            Kind::Slt,
            Kind::Sle,
            Kind::Sgt,
            Kind::Sge,
        ];
        let mut codes: Vec<u64> = kinds.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_display() {
        assert_eq!(Width::BOOL.to_string(), "i1");
        assert_eq!(Width::INT32.to_string(), "i32");
        assert_eq!(Kind::from(CmpOp::Slt).to_string(), "Slt");
        assert_eq!(BinaryOp::SDiv.to_string(), "sdiv");
    }
}
