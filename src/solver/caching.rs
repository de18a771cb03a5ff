use log::debug;

use super::{CoreSolver, Query, SolverError};
use crate::cache::Cache;
use crate::reference::ExprRef;
use crate::utils::{hash_combine, MyHash};

#[derive(Debug, Clone, Eq, PartialEq)]
struct QueryKey {
    constraints: Vec<ExprRef>,
    expr: ExprRef,
}

impl MyHash for QueryKey {
    fn hash(&self) -> u64 {
        self.constraints
            .iter()
            .fold(self.expr.hash(), |h, c| hash_combine(h, c.hash()))
    }
}

/// Memoizes truth decisions of the wrapped solver.
///
/// Keys are expression handles, so a caching solver must only ever see
/// queries built by a single `ExprManager`. Failed decisions are not cached.
pub struct CachingSolver {
    inner: Box<dyn CoreSolver>,
    cache: Cache<QueryKey, bool>,
}

impl CachingSolver {
    pub fn new(inner: Box<dyn CoreSolver>) -> Self {
        Self {
            inner,
            cache: Cache::new(16),
        }
    }

    pub fn hits(&self) -> usize {
        self.cache.hits()
    }

    pub fn misses(&self) -> usize {
        self.cache.misses()
    }
}

impl CoreSolver for CachingSolver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn compute_initial_values(
        &mut self,
        query: &Query,
        objects: &[ExprRef],
    ) -> Result<Option<Vec<i32>>, SolverError> {
        self.inner.compute_initial_values(query, objects)
    }

    fn compute_truth(&mut self, query: &Query) -> Result<bool, SolverError> {
        let key = QueryKey {
            constraints: query.constraints.as_slice().to_vec(),
            expr: query.expr,
        };
        if let Some(&res) = self.cache.get(&key) {
            debug!("cache: truth({}) -> {}", query.expr, res);
            return Ok(res);
        }
        let res = self.inner.compute_truth(query)?;
        self.cache.insert(key, res);
        Ok(res)
    }

    fn constraint_log(&self, query: &Query) -> String {
        self.inner.constraint_log(query)
    }
}
