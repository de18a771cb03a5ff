use num_bigint::BigUint;

use super::{assignment_of, CoreSolver, Query, SolverError};
use crate::reference::ExprRef;

/// Checks every model returned by the wrapped solver by evaluating the
/// query under it: all constraints must hold and the target must not.
pub struct ValidatingSolver {
    inner: Box<dyn CoreSolver>,
}

impl ValidatingSolver {
    pub fn new(inner: Box<dyn CoreSolver>) -> Self {
        Self { inner }
    }
}

impl CoreSolver for ValidatingSolver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn compute_initial_values(
        &mut self,
        query: &Query,
        objects: &[ExprRef],
    ) -> Result<Option<Vec<i32>>, SolverError> {
        let exprs = query.exprs;
        // Ask for every symbol so the whole query can be evaluated.
        let mut all = objects.to_vec();
        for s in exprs.collect_symbolics(query.roots()) {
            if !all.contains(&s) {
                all.push(s);
            }
        }
        let Some(values) = self.inner.compute_initial_values(query, &all)? else {
            return Ok(None);
        };
        let assignment = assignment_of(exprs, &all, &values);
        let one = BigUint::from(1u8);
        for c in query.constraints.iter() {
            if exprs.evaluate(c, &assignment) != Some(one.clone()) {
                return Err(SolverError::InvalidModel(format!(
                    "constraint {} does not hold",
                    exprs.render(c)
                )));
            }
        }
        if exprs.evaluate(query.expr, &assignment) != Some(BigUint::ZERO) {
            return Err(SolverError::InvalidModel(format!(
                "target {} is not false",
                exprs.render(query.expr)
            )));
        }
        Ok(Some(values[..objects.len()].to_vec()))
    }

    fn compute_truth(&mut self, query: &Query) -> Result<bool, SolverError> {
        self.inner.compute_truth(query)
    }

    fn constraint_log(&self, query: &Query) -> String {
        self.inner.constraint_log(query)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::constraints::ConstraintSet;
    use crate::expr::ExprManager;
    use crate::solver::BitBlastSolver;

    /// Returns the same model no matter what.
    struct Liar;

    impl CoreSolver for Liar {
        fn name(&self) -> &str {
            "liar"
        }

        fn compute_initial_values(
            &mut self,
            _query: &Query,
            objects: &[ExprRef],
        ) -> Result<Option<Vec<i32>>, SolverError> {
            Ok(Some(vec![42; objects.len()]))
        }
    }

    #[test]
    fn test_accepts_valid_models() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let y = exprs.mk_symbolic("Y");
        let constraints: ConstraintSet = [exprs.mk_sgt(y, x)].into_iter().collect();
        let q = Query::new(&exprs, &constraints, exprs.mk_false());
        let mut solver = ValidatingSolver::new(Box::new(BitBlastSolver::default()));
        let values = solver.compute_initial_values(&q, &[x]).unwrap().unwrap();
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_rejects_invalid_models() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let constraints: ConstraintSet = [exprs.mk_eq(x, exprs.mk_int32(1))].into_iter().collect();
        let q = Query::new(&exprs, &constraints, exprs.mk_false());
        let mut solver = ValidatingSolver::new(Box::new(Liar));
        assert!(matches!(
            solver.compute_initial_values(&q, &[x]),
            Err(SolverError::InvalidModel(_))
        ));

        let empty = ConstraintSet::new();
        let q = Query::new(&exprs, &empty, exprs.mk_eq(x, exprs.mk_int32(42)));
        assert!(matches!(
            solver.compute_initial_values(&q, &[x]),
            Err(SolverError::InvalidModel(_))
        ));
    }
}
