//! Algebraic backend for the simplest path conditions.
//!
//! Handles conjunctions of equalities and disequalities whose sides are
//! linear in a single symbol, built from symbols, constants, `+`, `-` and
//! multiplication by a constant. Each equality is solved by isolating the
//! symbol; disequalities exclude single values. Anything else is reported as
//! [`SolverError::Unsupported`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;

use super::{CoreSolver, Query, SolverError};
use crate::expr::{low_u64, ExprManager, ExprNode};
use crate::reference::ExprRef;
use crate::types::{BinaryOp, CmpOp, Width};

/// `sum(coeff * symbol) + constant`, modulo `2^32`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
struct Linear {
    coeffs: BTreeMap<ExprRef, u32>,
    constant: u32,
}

impl Linear {
    fn constant(value: u32) -> Self {
        Linear {
            coeffs: BTreeMap::new(),
            constant: value,
        }
    }

    fn symbol(e: ExprRef) -> Self {
        Linear {
            coeffs: BTreeMap::from([(e, 1)]),
            constant: 0,
        }
    }

    fn scale(mut self, k: u32) -> Self {
        for c in self.coeffs.values_mut() {
            *c = c.wrapping_mul(k);
        }
        self.constant = self.constant.wrapping_mul(k);
        self.normalized()
    }

    fn add(mut self, other: Linear) -> Self {
        for (e, k) in other.coeffs {
            let c = self.coeffs.entry(e).or_insert(0);
            *c = c.wrapping_add(k);
        }
        self.constant = self.constant.wrapping_add(other.constant);
        self.normalized()
    }

    fn sub(self, other: Linear) -> Self {
        self.add(other.scale(u32::MAX))
    }

    fn normalized(mut self) -> Self {
        self.coeffs.retain(|_, k| *k != 0);
        self
    }
}

/// `lin == 0` if `positive`, `lin != 0` otherwise.
#[derive(Debug)]
struct Literal {
    lin: Linear,
    positive: bool,
}

enum Atom {
    True,
    False,
    Lit(Literal),
}

fn unsupported(exprs: &ExprManager, e: ExprRef) -> SolverError {
    SolverError::Unsupported(exprs.render(e))
}

fn linearize(exprs: &ExprManager, root: ExprRef) -> Result<Linear, SolverError> {
    let mut lins: HashMap<ExprRef, Linear> = HashMap::new();
    for e in exprs.post_order([root]) {
        let lin = match exprs.node(e) {
            ExprNode::Constant { value, width } if width == Width::INT32 => Linear::constant(low_u64(&value) as u32),
            ExprNode::Symbolic { width, .. } if width == Width::INT32 => Linear::symbol(e),
            ExprNode::Binary {
                op: BinaryOp::Add,
                left,
                right,
                ..
            } => lins[&left].clone().add(lins[&right].clone()),
            ExprNode::Binary {
                op: BinaryOp::Sub,
                left,
                right,
                ..
            } => lins[&left].clone().sub(lins[&right].clone()),
            ExprNode::Binary {
                op: BinaryOp::Mul,
                left,
                right,
                ..
            } => {
                let (l, r) = (&lins[&left], &lins[&right]);
                if l.coeffs.is_empty() {
                    r.clone().scale(l.constant)
                } else if r.coeffs.is_empty() {
                    l.clone().scale(r.constant)
                } else {
                    return Err(unsupported(exprs, e));
                }
            }
            _ => return Err(unsupported(exprs, e)),
        };
        lins.insert(e, lin);
    }
    lins.remove(&root).ok_or_else(|| unsupported(exprs, root))
}

fn atom(exprs: &ExprManager, mut e: ExprRef, mut positive: bool) -> Result<Atom, SolverError> {
    loop {
        match exprs.node(e) {
            ExprNode::Constant { value, .. } => {
                let truth = low_u64(&value) != 0;
                return Ok(if truth == positive { Atom::True } else { Atom::False });
            }
            ExprNode::Not { expr, .. } => {
                e = expr;
                positive = !positive;
            }
            ExprNode::Compare {
                op: op @ (CmpOp::Eq | CmpOp::Ne),
                left,
                right,
            } => {
                let positive_eq = if op == CmpOp::Eq { positive } else { !positive };
                if exprs.width(left).is_bool() {
                    // Boolean (in)equality is only understood against a constant.
                    let (c, other) = match (exprs.as_constant(left), exprs.as_constant(right)) {
                        (Some(c), _) => (c, right),
                        (_, Some(c)) => (c, left),
                        _ => return Err(unsupported(exprs, e)),
                    };
                    e = other;
                    positive = positive_eq == (low_u64(&c) != 0);
                    continue;
                }
                let lin = linearize(exprs, left)?.sub(linearize(exprs, right)?);
                if lin.coeffs.is_empty() {
                    let holds = lin.constant == 0;
                    return Ok(if holds == positive_eq { Atom::True } else { Atom::False });
                }
                return Ok(Atom::Lit(Literal {
                    lin,
                    positive: positive_eq,
                }));
            }
            _ => return Err(unsupported(exprs, e)),
        }
    }
}

/// Multiplicative inverse of an odd number modulo `2^32`.
fn inverse(k: u32) -> u32 {
    assert!(k % 2 == 1, "Only odd numbers are invertible");
    // Newton iteration doubles the number of correct bits each step.
    let mut inv = k;
    for _ in 0..5 {
        inv = inv.wrapping_mul(2u32.wrapping_sub(k.wrapping_mul(inv)));
    }
    inv
}

#[derive(Debug, Default)]
struct Domain {
    fixed: Option<u32>,
    excluded: BTreeSet<u32>,
}

impl Domain {
    /// Smallest allowed value, reading values as unsigned.
    fn pick(&self) -> u32 {
        if let Some(v) = self.fixed {
            return v;
        }
        let mut v = 0;
        while self.excluded.contains(&v) {
            v += 1;
        }
        v
    }
}

/// Backend for linear (dis)equalities in one symbol each.
#[derive(Debug, Default, Copy, Clone)]
pub struct TinySolver;

impl TinySolver {
    /// Solve the literals. `Ok(None)` if they contradict each other.
    fn solve(&self, query: &Query) -> Result<Option<BTreeMap<ExprRef, Domain>>, SolverError> {
        let exprs = query.exprs;
        let atoms = query
            .constraints
            .iter()
            .map(|c| atom(exprs, c, true))
            .chain(std::iter::once(atom(exprs, query.expr, false)));

        let mut domains: BTreeMap<ExprRef, Domain> = BTreeMap::new();
        for a in atoms {
            let lit = match a? {
                Atom::True => continue,
                Atom::False => return Ok(None),
                Atom::Lit(lit) => lit,
            };
            if lit.lin.coeffs.len() != 1 {
                return Err(SolverError::Unsupported(format!(
                    "{} symbols in one literal",
                    lit.lin.coeffs.len()
                )));
            }
            let (&symbol, &k) = lit.lin.coeffs.iter().next().ok_or_else(|| SolverError::Unsupported("empty literal".to_string()))?;
            if k % 2 == 0 {
                return Err(SolverError::Unsupported(format!("even coefficient {}", k)));
            }
            // k*x + c == 0  <=>  x == -c / k
            let value = lit.lin.constant.wrapping_neg().wrapping_mul(inverse(k));
            let domain = domains.entry(symbol).or_default();
            if lit.positive {
                match domain.fixed {
                    Some(v) if v != value => return Ok(None),
                    _ => domain.fixed = Some(value),
                }
            } else {
                domain.excluded.insert(value);
            }
            if let Some(v) = domain.fixed {
                if domain.excluded.contains(&v) {
                    return Ok(None);
                }
            }
        }
        Ok(Some(domains))
    }
}

impl CoreSolver for TinySolver {
    fn name(&self) -> &str {
        "tiny"
    }

    fn compute_initial_values(
        &mut self,
        query: &Query,
        objects: &[ExprRef],
    ) -> Result<Option<Vec<i32>>, SolverError> {
        let Some(domains) = self.solve(query)? else {
            debug!("tiny: unsatisfiable");
            return Ok(None);
        };
        let values = objects
            .iter()
            .map(|e| domains.get(e).map_or(0, |d| d.pick()) as i32)
            .collect::<Vec<_>>();
        debug!("tiny: values = {:?}", values);
        Ok(Some(values))
    }
}
