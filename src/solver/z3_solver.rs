//! Complete backend on top of the Z3 library.
//!
//! Expressions are translated node by node into Z3 terms: 32-bit values into
//! `BV`, booleans into `Bool`. Every query gets a fresh context, so no state
//! is shared between queries.

use std::collections::HashMap;

use log::debug;
use z3::ast::{Ast, Bool, BV};
use z3::{Config, Context, Model, SatResult};

use super::{CoreSolver, Query, SolverError};
use crate::config::Z3Config;
use crate::expr::{low_u64, ExprManager, ExprNode};
use crate::reference::ExprRef;
use crate::types::{BinaryOp, CmpOp};

enum Term<'ctx> {
    Bool(Bool<'ctx>),
    BV(BV<'ctx>),
}

impl<'ctx> Term<'ctx> {
    fn boolean(&self) -> Result<&Bool<'ctx>, SolverError> {
        match self {
            Term::Bool(b) => Ok(b),
            Term::BV(v) => Err(SolverError::Unsupported(format!("expected a boolean, got {}", v))),
        }
    }

    fn bitvec(&self) -> Result<&BV<'ctx>, SolverError> {
        match self {
            Term::BV(v) => Ok(v),
            Term::Bool(b) => Err(SolverError::Unsupported(format!("expected a bit-vector, got {}", b))),
        }
    }
}

/// Z3 terms for every node reachable from `roots`.
fn translate<'ctx>(
    ctx: &'ctx Context,
    exprs: &ExprManager,
    roots: impl IntoIterator<Item = ExprRef>,
) -> Result<HashMap<ExprRef, Term<'ctx>>, SolverError> {
    let mut terms: HashMap<ExprRef, Term<'ctx>> = HashMap::new();
    for e in exprs.post_order(roots) {
        let term = match exprs.node(e) {
            ExprNode::Constant { value, width } => {
                if width.is_bool() {
                    Term::Bool(Bool::from_bool(ctx, low_u64(&value) != 0))
                } else {
                    Term::BV(BV::from_u64(ctx, low_u64(&value), width.bits()))
                }
            }
            ExprNode::Symbolic { name, width } => {
                if width.is_bool() {
                    Term::Bool(Bool::new_const(ctx, name))
                } else {
                    Term::BV(BV::new_const(ctx, name, width.bits()))
                }
            }
            ExprNode::Not { expr, .. } => match &terms[&expr] {
                Term::Bool(b) => Term::Bool(b.not()),
                Term::BV(v) => Term::BV(v.bvnot()),
            },
            ExprNode::Binary { op, left, right, .. } => {
                let a = terms[&left].bitvec()?;
                let b = terms[&right].bitvec()?;
                Term::BV(match op {
                    BinaryOp::Add => a.bvadd(b),
                    BinaryOp::Sub => a.bvsub(b),
                    BinaryOp::Mul => a.bvmul(b),
                    BinaryOp::UDiv => a.bvudiv(b),
                    BinaryOp::SDiv => a.bvsdiv(b),
                })
            }
            ExprNode::Compare { op, left, right } => {
                let (l, r) = (&terms[&left], &terms[&right]);
                Term::Bool(match op {
                    CmpOp::Eq | CmpOp::Ne => {
                        let eq = match (l, r) {
                            (Term::Bool(a), Term::Bool(b)) => a._eq(b),
                            _ => l.bitvec()?._eq(r.bitvec()?),
                        };
                        if op == CmpOp::Eq {
                            eq
                        } else {
                            eq.not()
                        }
                    }
                    CmpOp::Ult => l.bitvec()?.bvult(r.bitvec()?),
                    CmpOp::Ule => l.bitvec()?.bvule(r.bitvec()?),
                    CmpOp::Ugt => l.bitvec()?.bvugt(r.bitvec()?),
                    CmpOp::Uge => l.bitvec()?.bvuge(r.bitvec()?),
                    CmpOp::Slt => l.bitvec()?.bvslt(r.bitvec()?),
                    CmpOp::Sle => l.bitvec()?.bvsle(r.bitvec()?),
                    CmpOp::Sgt => l.bitvec()?.bvsgt(r.bitvec()?),
                    CmpOp::Sge => l.bitvec()?.bvsge(r.bitvec()?),
                })
            }
        };
        terms.insert(e, term);
    }
    Ok(terms)
}

fn value_of<'ctx>(model: &Model<'ctx>, term: &Term<'ctx>) -> Result<i32, SolverError> {
    let value = match term {
        Term::Bool(b) => model.eval(b, true).and_then(|b| b.as_bool()).map(u64::from),
        Term::BV(v) => model.eval(v, true).and_then(|v| v.as_u64()),
    };
    value
        .map(|v| v as u32 as i32)
        .ok_or_else(|| SolverError::Failed("z3: model has no value".to_string()))
}

/// Backend that hands every query to Z3.
#[derive(Debug, Clone, Default)]
pub struct Z3Solver {
    config: Z3Config,
}

impl Z3Solver {
    pub fn new(config: Z3Config) -> Self {
        Self { config }
    }
}

impl CoreSolver for Z3Solver {
    fn name(&self) -> &str {
        "z3"
    }

    fn compute_initial_values(
        &mut self,
        query: &Query,
        objects: &[ExprRef],
    ) -> Result<Option<Vec<i32>>, SolverError> {
        let mut cfg = Config::new();
        cfg.set_timeout_msec(self.config.timeout.as_millis() as u64);
        let ctx = Context::new(&cfg);

        let exprs = query.exprs;
        let terms = translate(&ctx, exprs, query.roots().chain(objects.iter().copied()))?;
        let solver = z3::Solver::new(&ctx);
        for c in query.constraints.iter() {
            solver.assert(terms[&c].boolean()?);
        }
        solver.assert(&terms[&query.expr].boolean()?.not());

        match solver.check() {
            SatResult::Unsat => {
                debug!("z3: unsat");
                Ok(None)
            }
            SatResult::Unknown => {
                let reason = solver.get_reason_unknown().unwrap_or_default();
                debug!("z3: unknown ({})", reason);
                if reason.contains("timeout") || reason.contains("canceled") {
                    Err(SolverError::Timeout(self.config.timeout))
                } else {
                    Err(SolverError::Unknown(reason))
                }
            }
            SatResult::Sat => {
                let model = solver
                    .get_model()
                    .ok_or_else(|| SolverError::Failed("z3: sat without a model".to_string()))?;
                let values = objects
                    .iter()
                    .map(|e| value_of(&model, &terms[e]))
                    .collect::<Result<Vec<_>, _>>()?;
                debug!("z3: values = {:?}", values);
                Ok(Some(values))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::constraints::ConstraintSet;

    #[test]
    fn test_model() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let lt = exprs.mk_slt(exprs.mk_sub(x, exprs.mk_int32(5)), exprs.mk_int32(0));
        let constraints: ConstraintSet = [lt].into_iter().collect();
        let mut solver = Z3Solver::default();

        let q = Query::new(&exprs, &constraints, exprs.mk_false());
        let values = solver.compute_initial_values(&q, &[x]).unwrap().unwrap();
        assert!(values[0].wrapping_sub(5) < 0);

        let q = Query::new(&exprs, &constraints, exprs.mk_slt(x, exprs.mk_int32(i32::MIN)));
        assert!(!solver.compute_truth(&q).unwrap());
        let q = Query::new(&exprs, &constraints, exprs.mk_ne(x, exprs.mk_int32(5)));
        assert!(solver.compute_truth(&q).unwrap());
    }

    #[test]
    fn test_unsat() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let constraints: ConstraintSet = [
            exprs.mk_ult(x, exprs.mk_int32(3)),
            exprs.mk_ugt(x, exprs.mk_int32(7)),
        ]
        .into_iter()
        .collect();
        let q = Query::new(&exprs, &constraints, exprs.mk_false());
        assert_eq!(Z3Solver::default().compute_initial_values(&q, &[x]).unwrap(), None);
    }

    #[test]
    fn test_nonlinear() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let y = exprs.mk_symbolic("Y");
        let constraints: ConstraintSet = [
            exprs.mk_eq(exprs.mk_mul(x, y), exprs.mk_int32(35)),
            exprs.mk_ugt(x, exprs.mk_int32(1)),
            exprs.mk_ult(x, exprs.mk_int32(35)),
            exprs.mk_ult(y, exprs.mk_int32(35)),
        ]
        .into_iter()
        .collect();
        let q = Query::new(&exprs, &constraints, exprs.mk_false());
        let values = Z3Solver::default().compute_initial_values(&q, &[x, y]).unwrap().unwrap();
        assert_eq!(values[0].wrapping_mul(values[1]), 35);
        assert!(values[0] == 5 || values[0] == 7);
    }

    #[test]
    fn test_division_by_zero_agrees_with_folding() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let y = exprs.mk_symbolic("Y");
        let constraints: ConstraintSet = [
            exprs.mk_eq(x, exprs.mk_int32(-7)),
            exprs.mk_eq(y, exprs.mk_int32(0)),
        ]
        .into_iter()
        .collect();
        let mut solver = Z3Solver::default();
        for (symbolic, folded) in [
            (exprs.mk_udiv(x, y), exprs.mk_udiv(exprs.mk_int32(-7), exprs.mk_int32(0))),
            (exprs.mk_sdiv(x, y), exprs.mk_sdiv(exprs.mk_int32(-7), exprs.mk_int32(0))),
        ] {
            let q = Query::new(&exprs, &constraints, exprs.mk_eq(symbolic, folded));
            assert!(solver.compute_truth(&q).unwrap());
        }
    }

    #[test]
    fn test_boolean_terms() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let neg = exprs.mk_slt(x, exprs.mk_int32(0));
        let not_neg = exprs.create_is_zero(neg);
        let constraints: ConstraintSet = [not_neg, exprs.mk_not(exprs.mk_eq(x, exprs.mk_int32(0)))]
            .into_iter()
            .collect();
        let q = Query::new(&exprs, &constraints, exprs.mk_false());
        let values = Z3Solver::default().compute_initial_values(&q, &[x]).unwrap().unwrap();
        assert!(values[0] > 0);
    }

    #[test]
    fn test_deep_chain() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let one = exprs.mk_int32(1);
        let mut e = x;
        for _ in 0..20_000 {
            e = exprs.mk_add(e, one);
        }
        let constraints: ConstraintSet = [exprs.mk_eq(e, exprs.mk_int32(0))].into_iter().collect();
        let q = Query::new(&exprs, &constraints, exprs.mk_false());
        let values = Z3Solver::default().compute_initial_values(&q, &[x]).unwrap();
        assert_eq!(values, Some(vec![-20_000]));
    }
}
