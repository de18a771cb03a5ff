use std::fmt::{Display, Formatter};
use std::ops::Neg;

use serde::{Deserialize, Serialize};

use crate::utils::{pairing2, pairing3, MyHash};

/// Handle to an interned expression node.
///
/// Two handles obtained from the same [`ExprManager`][crate::expr::ExprManager]
/// are equal if and only if the expressions are structurally equal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ExprRef(u32);

impl ExprRef {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the index of the node in the manager's storage.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for ExprRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl MyHash for ExprRef {
    fn hash(&self) -> u64 {
        self.0 as u64
    }
}

/// Signed edge to a BDD node; a negative value denotes a complemented edge.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Ref(i32);

impl Ref {
    pub const fn positive(index: u32) -> Self {
        Self(index as i32)
    }

    pub const fn is_negated(&self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// Return the index of the referenced node.
    pub const fn index(self) -> usize {
        self.0.unsigned_abs() as usize
    }

    /// Literal encoding: `2 * index + negated`.
    pub(crate) fn as_lit(self) -> u64 {
        ((self.0.unsigned_abs() as u64) << 1) + self.is_negated() as u64
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}",
            if self.is_negated() { "~" } else { "" },
            self.index()
        )
    }
}

impl MyHash for Ref {
    fn hash(&self) -> u64 {
        self.as_lit()
    }
}

impl MyHash for (Ref, Ref) {
    fn hash(&self) -> u64 {
        pairing2(self.0.as_lit(), self.1.as_lit())
    }
}

impl MyHash for (Ref, Ref, Ref) {
    fn hash(&self) -> u64 {
        pairing3(self.0.as_lit(), self.1.as_lit(), self.2.as_lit())
    }
}
