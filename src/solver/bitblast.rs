//! Complete backend that bit-blasts queries onto BDDs.
//!
//! Every expression becomes a vector of BDDs, one per bit (least significant
//! first). Arithmetic is encoded with the textbook circuits: ripple-carry
//! addition, shift-and-add multiplication and restoring division. The path
//! condition and the negated target are conjoined into a single BDD; any
//! path to the one terminal is a model.
//!
//! Variables are interleaved across symbols and ordered from the most
//! significant bit down, which keeps adders and comparators linear in size
//! and makes [`Bdd::one_sat`] return the smallest unsigned values.

use std::collections::HashMap;

use log::debug;

use super::{CoreSolver, Query, SolverError};
use crate::bdd::Bdd;
use crate::expr::{low_u64, ExprNode};
use crate::reference::{ExprRef, Ref};
use crate::types::{BinaryOp, CmpOp, Width};

const BITS: u32 = 32;

type Bits = Vec<Ref>;

struct Encoder<'a> {
    bdd: Bdd,
    query: &'a Query<'a>,
    /// Position of each symbol in the variable interleaving.
    symbols: HashMap<ExprRef, u32>,
    cache: HashMap<ExprRef, Bits>,
    node_limit: usize,
}

impl<'a> Encoder<'a> {
    fn new(query: &'a Query<'a>, objects: &[ExprRef], node_limit: usize) -> Self {
        let exprs = query.exprs;
        let symbols = exprs
            .collect_symbolics(objects.iter().copied().chain(query.roots()))
            .into_iter()
            .enumerate()
            .map(|(i, e)| (e, i as u32))
            .collect();
        Self {
            bdd: Bdd::default(),
            query,
            symbols,
            cache: HashMap::new(),
            node_limit,
        }
    }

    fn variable(&self, symbol: ExprRef, bit: u32) -> u32 {
        let n = self.symbols.len() as u32;
        (BITS - 1 - bit) * n + self.symbols[&symbol] + 1
    }

    fn check_limit(&self) -> Result<(), SolverError> {
        let nodes = self.bdd.num_nodes();
        if nodes > self.node_limit {
            return Err(SolverError::ResourceLimit {
                nodes,
                limit: self.node_limit,
            });
        }
        Ok(())
    }

    fn constant(&self, value: u64, width: Width) -> Bits {
        (0..width.bits())
            .map(|i| self.bdd.constant((value >> i) & 1 == 1))
            .collect()
    }

    /// Bits of `root`, encoding every node below it that is not cached yet.
    fn encode(&mut self, root: ExprRef) -> Result<Bits, SolverError> {
        let exprs = self.query.exprs;
        for e in exprs.post_order([root]) {
            if self.cache.contains_key(&e) {
                continue;
            }
            let bits = match exprs.node(e) {
                ExprNode::Constant { value, width } => self.constant(low_u64(&value), width),
                ExprNode::Symbolic { width, .. } => (0..width.bits())
                    .map(|i| self.bdd.mk_var(self.variable(e, i)))
                    .collect(),
                ExprNode::Not { expr, .. } => self.cache[&expr].iter().map(|&b| -b).collect(),
                ExprNode::Binary { op, left, right, .. } => {
                    let (a, b) = (&self.cache[&left], &self.cache[&right]);
                    match op {
                        BinaryOp::Add => self.add(a, b, self.bdd.zero),
                        BinaryOp::Sub => self.sub(a, b),
                        BinaryOp::Mul => self.mul(a, b)?,
                        BinaryOp::UDiv => self.udiv(a, b)?,
                        BinaryOp::SDiv => self.sdiv(a, b)?,
                    }
                }
                ExprNode::Compare { op, left, right } => {
                    vec![self.compare(op, &self.cache[&left], &self.cache[&right])]
                }
            };
            self.check_limit()?;
            self.cache.insert(e, bits);
        }
        Ok(self.cache[&root].clone())
    }

    fn ite(&self, c: Ref, a: &[Ref], b: &[Ref]) -> Bits {
        a.iter().zip(b).map(|(&x, &y)| self.bdd.apply_ite(c, x, y)).collect()
    }

    fn add(&self, a: &[Ref], b: &[Ref], carry_in: Ref) -> Bits {
        let bdd = &self.bdd;
        let mut carry = carry_in;
        let mut sum = Vec::with_capacity(a.len());
        for (&x, &y) in a.iter().zip(b) {
            let x_xor_y = bdd.apply_xor(x, y);
            sum.push(bdd.apply_xor(x_xor_y, carry));
            carry = bdd.apply_or(bdd.apply_and(x, y), bdd.apply_and(carry, x_xor_y));
        }
        sum
    }

    fn sub(&self, a: &[Ref], b: &[Ref]) -> Bits {
        let not_b: Bits = b.iter().map(|&y| -y).collect();
        self.add(a, &not_b, self.bdd.one)
    }

    fn neg(&self, a: &[Ref]) -> Bits {
        let zero = vec![self.bdd.zero; a.len()];
        self.sub(&zero, a)
    }

    fn mul(&self, a: &[Ref], b: &[Ref]) -> Result<Bits, SolverError> {
        let width = a.len();
        let mut acc = vec![self.bdd.zero; width];
        for (i, &y) in b.iter().enumerate() {
            if self.bdd.is_zero(y) {
                continue;
            }
            let partial: Bits = (0..width)
                .map(|j| if j < i { self.bdd.zero } else { self.bdd.apply_and(y, a[j - i]) })
                .collect();
            acc = self.add(&acc, &partial, self.bdd.zero);
            self.check_limit()?;
        }
        Ok(acc)
    }

    /// Restoring division; `x / 0` yields all ones.
    fn udiv(&self, a: &[Ref], b: &[Ref]) -> Result<Bits, SolverError> {
        let width = a.len();
        let mut quotient = vec![self.bdd.zero; width];
        let mut rem = vec![self.bdd.zero; width];
        for i in (0..width).rev() {
            // rem = (rem << 1) | a[i], computed one bit wider to keep the
            // shifted-out bit for the comparison.
            let mut wide: Bits = Vec::with_capacity(width + 1);
            wide.push(a[i]);
            wide.extend_from_slice(&rem);
            let mut divisor = b.to_vec();
            divisor.push(self.bdd.zero);
            let ge = -self.ult(&wide, &divisor);
            let diff = self.sub(&wide, &divisor);
            rem = self.ite(ge, &diff[..width], &wide[..width]);
            quotient[i] = ge;
            self.check_limit()?;
        }
        Ok(quotient)
    }

    fn sdiv(&self, a: &[Ref], b: &[Ref]) -> Result<Bits, SolverError> {
        let sa = *a.last().unwrap_or(&self.bdd.zero);
        let sb = *b.last().unwrap_or(&self.bdd.zero);
        let abs_a = self.ite(sa, &self.neg(a), a);
        let abs_b = self.ite(sb, &self.neg(b), b);
        let q = self.udiv(&abs_a, &abs_b)?;
        let flip = self.bdd.apply_xor(sa, sb);
        Ok(self.ite(flip, &self.neg(&q), &q))
    }

    fn eq(&self, a: &[Ref], b: &[Ref]) -> Ref {
        self.bdd
            .apply_and_many(a.iter().zip(b).map(|(&x, &y)| self.bdd.apply_eq(x, y)))
    }

    /// Unsigned `a < b`, scanning from the least significant bit.
    fn ult(&self, a: &[Ref], b: &[Ref]) -> Ref {
        let bdd = &self.bdd;
        let mut lt = bdd.zero;
        for (&x, &y) in a.iter().zip(b) {
            let bit_lt = bdd.apply_and(-x, y);
            let bit_eq = bdd.apply_eq(x, y);
            lt = bdd.apply_or(bit_lt, bdd.apply_and(bit_eq, lt));
        }
        lt
    }

    fn slt(&self, a: &[Ref], b: &[Ref]) -> Ref {
        let flip = |v: &[Ref]| -> Bits {
            let mut v = v.to_vec();
            if let Some(last) = v.last_mut() {
                *last = -*last;
            }
            v
        };
        self.ult(&flip(a), &flip(b))
    }

    fn compare(&self, op: CmpOp, a: &[Ref], b: &[Ref]) -> Ref {
        match op {
            CmpOp::Eq => self.eq(a, b),
            CmpOp::Ne => -self.eq(a, b),
            CmpOp::Ult => self.ult(a, b),
            CmpOp::Ule => -self.ult(b, a),
            CmpOp::Ugt => self.ult(b, a),
            CmpOp::Uge => -self.ult(a, b),
            CmpOp::Slt => self.slt(a, b),
            CmpOp::Sle => -self.slt(b, a),
            CmpOp::Sgt => self.slt(b, a),
            CmpOp::Sge => -self.slt(a, b),
        }
    }

    /// Conjunction of the constraints and the negated target.
    fn formula(&mut self) -> Result<Ref, SolverError> {
        let query = self.query;
        let mut f = self.bdd.one;
        for c in query.constraints.iter() {
            let bits = self.encode(c)?;
            f = self.bdd.apply_and(f, bits[0]);
            if self.bdd.is_zero(f) {
                return Ok(f);
            }
        }
        let target = self.encode(query.expr)?;
        Ok(self.bdd.apply_and(f, -target[0]))
    }

    fn value_of(&self, symbol: ExprRef, model: &HashMap<u32, bool>) -> i32 {
        let width = self.query.exprs.width(symbol).bits();
        let mut value = 0u32;
        for i in 0..width {
            if model.get(&self.variable(symbol, i)).copied().unwrap_or(false) {
                value |= 1 << i;
            }
        }
        value as i32
    }
}

/// Exact backend over binary decision diagrams.
#[derive(Debug, Clone)]
pub struct BitBlastSolver {
    node_limit: usize,
}

impl BitBlastSolver {
    pub fn new(node_limit: usize) -> Self {
        Self { node_limit }
    }
}

impl Default for BitBlastSolver {
    fn default() -> Self {
        BitBlastSolver::new(1 << 20)
    }
}

impl CoreSolver for BitBlastSolver {
    fn name(&self) -> &str {
        "bitblast"
    }

    fn compute_initial_values(
        &mut self,
        query: &Query,
        objects: &[ExprRef],
    ) -> Result<Option<Vec<i32>>, SolverError> {
        let mut encoder = Encoder::new(query, objects, self.node_limit);
        let f = encoder.formula()?;
        debug!("bitblast: formula has {} nodes ({:?})", encoder.bdd.size(f), encoder.bdd);
        let Some(model) = encoder.bdd.one_sat(f) else {
            return Ok(None);
        };
        Ok(Some(
            objects.iter().map(|&e| encoder.value_of(e, &model)).collect(),
        ))
    }

    fn compute_truth(&mut self, query: &Query) -> Result<bool, SolverError> {
        let mut encoder = Encoder::new(query, &[], self.node_limit);
        let f = encoder.formula()?;
        Ok(encoder.bdd.is_zero(f))
    }
}
