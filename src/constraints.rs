use std::ops::Index;

use crate::reference::ExprRef;

/// Path condition: an append-only, ordered list of boolean expressions.
///
/// Cloning copies the list, so a forked path never observes constraints
/// added to its sibling afterwards.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct ConstraintSet {
    constraints: Vec<ExprRef>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, e: ExprRef) {
        self.constraints.push(e);
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ExprRef> + '_ {
        self.constraints.iter().copied()
    }

    pub fn as_slice(&self) -> &[ExprRef] {
        &self.constraints
    }
}

impl Index<usize> for ConstraintSet {
    type Output = ExprRef;

    fn index(&self, index: usize) -> &Self::Output {
        &self.constraints[index]
    }
}

impl FromIterator<ExprRef> for ConstraintSet {
    fn from_iter<T: IntoIterator<Item = ExprRef>>(iter: T) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}
