//! Solver abstraction.
//!
//! A [`CoreSolver`] answers a single primitive question: is the query's
//! expression true in every model of its constraints? Every other decision
//! ([`Solver::must_be_true`], [`Solver::may_be_false`], ...) is derived from
//! it in [`Solver`], so all backends agree on the laws
//!
//! ```text
//! may_be_true(q)  == !must_be_false(q)
//! may_be_false(q) == !must_be_true(q)
//! ```
//!
//! Backend errors propagate as [`SolverError`] and are never turned into a
//! yes or a no.

pub mod bitblast;
pub mod caching;
pub mod dummy;
pub mod smtlib;
pub mod tiny;
pub mod validating;
pub mod z3_solver;

use std::collections::HashMap;

use log::debug;
use num_bigint::BigUint;

use crate::config::{SolverConfig, SolverKind};
use crate::constraints::ConstraintSet;
pub use crate::error::SolverError;
use crate::expr::ExprManager;
use crate::reference::ExprRef;

pub use bitblast::BitBlastSolver;
pub use caching::CachingSolver;
pub use dummy::DummySolver;
pub use tiny::TinySolver;
pub use validating::ValidatingSolver;
pub use z3_solver::Z3Solver;

/// A path condition together with a target boolean expression.
#[derive(Debug, Copy, Clone)]
pub struct Query<'a> {
    pub exprs: &'a ExprManager,
    pub constraints: &'a ConstraintSet,
    pub expr: ExprRef,
}

impl<'a> Query<'a> {
    pub fn new(exprs: &'a ExprManager, constraints: &'a ConstraintSet, expr: ExprRef) -> Self {
        assert!(
            exprs.width(expr).is_bool(),
            "Query expression should be boolean, got {}",
            exprs.width(expr)
        );
        Self {
            exprs,
            constraints,
            expr,
        }
    }

    /// Same constraints, different target.
    pub fn with_expr(&self, expr: ExprRef) -> Self {
        Self::new(self.exprs, self.constraints, expr)
    }

    /// Same constraints, target `false`.
    pub fn with_false(&self) -> Self {
        self.with_expr(self.exprs.mk_false())
    }

    /// Same constraints, target negated.
    pub fn negate_expr(&self) -> Self {
        self.with_expr(self.exprs.create_is_zero(self.expr))
    }

    /// Every expression the query mentions: the constraints, then the target.
    pub fn roots(&self) -> impl Iterator<Item = ExprRef> + '_ {
        self.constraints.iter().chain(std::iter::once(self.expr))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Validity {
    True,
    False,
    Unknown,
}

/// A decision procedure plugged into [`Solver`].
pub trait CoreSolver {
    fn name(&self) -> &str;

    /// Find values for `objects` in some model of the constraints in which
    /// the target is false. `Ok(None)` means no such model exists.
    fn compute_initial_values(
        &mut self,
        query: &Query,
        objects: &[ExprRef],
    ) -> Result<Option<Vec<i32>>, SolverError>;

    /// Is the target true in every model of the constraints?
    fn compute_truth(&mut self, query: &Query) -> Result<bool, SolverError> {
        Ok(self.compute_initial_values(query, &[])?.is_none())
    }

    /// SMT-LIB 2 rendering of the query.
    fn constraint_log(&self, query: &Query) -> String {
        smtlib::render_query(query, &[])
    }
}

/// Derived query surface over a boxed [`CoreSolver`].
pub struct Solver {
    core: Box<dyn CoreSolver>,
}

impl Solver {
    pub fn new(core: Box<dyn CoreSolver>) -> Self {
        Self { core }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new(create_core_solver(config))
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn must_be_true(&mut self, query: &Query) -> Result<bool, SolverError> {
        if query.exprs.is_constant(query.expr) {
            return Ok(query.exprs.is_true(query.expr));
        }
        let res = self.core.compute_truth(query);
        debug!(
            "{}: must_be_true({}) -> {:?}",
            self.core.name(),
            query.exprs.render(query.expr),
            res
        );
        res
    }

    pub fn must_be_false(&mut self, query: &Query) -> Result<bool, SolverError> {
        self.must_be_true(&query.negate_expr())
    }

    pub fn may_be_true(&mut self, query: &Query) -> Result<bool, SolverError> {
        Ok(!self.must_be_false(query)?)
    }

    pub fn may_be_false(&mut self, query: &Query) -> Result<bool, SolverError> {
        Ok(!self.must_be_true(query)?)
    }

    pub fn evaluate(&mut self, query: &Query) -> Result<Validity, SolverError> {
        if self.must_be_true(query)? {
            Ok(Validity::True)
        } else if self.must_be_false(query)? {
            Ok(Validity::False)
        } else {
            Ok(Validity::Unknown)
        }
    }

    /// One possible value of an arbitrary expression under the constraints.
    /// `Ok(None)` if the constraints have no model at all.
    pub fn get_value(
        &mut self,
        exprs: &ExprManager,
        constraints: &ConstraintSet,
        e: ExprRef,
    ) -> Result<Option<BigUint>, SolverError> {
        if let Some(value) = exprs.as_constant(e) {
            return Ok(Some(value));
        }
        let query = Query::new(exprs, constraints, exprs.mk_false());
        let objects = exprs.collect_symbolics([e]);
        let Some(values) = self.get_initial_values(&query, &objects)? else {
            return Ok(None);
        };
        let assignment = assignment_of(exprs, &objects, &values);
        exprs
            .evaluate(e, &assignment)
            .map(Some)
            .ok_or_else(|| SolverError::InvalidModel("incomplete assignment".to_string()))
    }

    /// Values for `objects` in some model of the constraints in which the
    /// target is false. `Ok(None)` is a proof that no such model exists.
    pub fn get_initial_values(&mut self, query: &Query, objects: &[ExprRef]) -> Result<Option<Vec<i32>>, SolverError> {
        let res = self.core.compute_initial_values(query, objects)?;
        if let Some(values) = &res {
            assert_eq!(values.len(), objects.len(), "One value per object expected");
        }
        Ok(res)
    }

    pub fn constraint_log(&self, query: &Query) -> String {
        self.core.constraint_log(query)
    }
}

/// Build the core solver stack described by `config`.
pub fn create_core_solver(config: &SolverConfig) -> Box<dyn CoreSolver> {
    let mut solver: Box<dyn CoreSolver> = match config.kind {
        SolverKind::Dummy => Box::new(DummySolver),
        SolverKind::Tiny => Box::new(TinySolver),
        SolverKind::BitBlast => Box::new(BitBlastSolver::new(config.node_limit)),
        SolverKind::Z3 => Box::new(Z3Solver::new(config.z3.clone())),
    };
    if config.validate_models {
        solver = Box::new(ValidatingSolver::new(solver));
    }
    if config.caching {
        solver = Box::new(CachingSolver::new(solver));
    }
    solver
}

/// Pair symbolic objects with their values by name.
pub fn assignment_of(exprs: &ExprManager, objects: &[ExprRef], values: &[i32]) -> HashMap<String, i32> {
    objects
        .iter()
        .zip(values)
        .filter_map(|(&e, &v)| exprs.symbol_name(e).map(|name| (name, v)))
        .collect()
}
