use log::debug;

use super::{CoreSolver, Query, SolverError};
use crate::reference::ExprRef;

/// Backend that fails every query.
#[derive(Debug, Default, Copy, Clone)]
pub struct DummySolver;

impl CoreSolver for DummySolver {
    fn name(&self) -> &str {
        "dummy"
    }

    fn compute_initial_values(
        &mut self,
        _query: &Query,
        _objects: &[ExprRef],
    ) -> Result<Option<Vec<i32>>, SolverError> {
        debug!("dummy: refusing to solve");
        Err(SolverError::Failed(self.name().to_string()))
    }

    fn compute_truth(&mut self, _query: &Query) -> Result<bool, SolverError> {
        Err(SolverError::Failed(self.name().to_string()))
    }
}
