//! Error types of the engine and of the solvers.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::program::{BlockId, InstId, Pc};
use crate::state::StateId;
use crate::types::Width;

/// Failure of a solver query. Never a "no": an `Err` means the backend could
/// not decide.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver `{0}` failed")]
    Failed(String),
    #[error("solver timed out after {0:?}")]
    Timeout(Duration),
    #[error("solver returned unknown: {0}")]
    Unknown(String),
    #[error("unsupported expression: {0}")]
    Unsupported(String),
    #[error("resource limit exceeded: {nodes} nodes (limit {limit})")]
    ResourceLimit { nodes: usize, limit: usize },
    #[error("model does not satisfy the query: {0}")]
    InvalidModel(String),
}

/// Violation of an instruction's preconditions.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SemanticsError {
    #[error("load from {0} before any store")]
    LoadBeforeStore(InstId),
    #[error("use of undefined value {0}")]
    UndefinedValue(InstId),
    #[error("store to {0}, which is not an allocated slot")]
    NotAllocated(InstId),
    #[error("expected width {expected}, found {found}")]
    WidthMismatch { expected: Width, found: Width },
    #[error("unsupported width {0}")]
    UnsupportedWidth(Width),
    #[error("symbolic input must be 4 bytes wide, got {0}")]
    UnsupportedSymbolicSize(u32),
    #[error("invalid symbol name {0:?}")]
    InvalidSymbolName(String),
    #[error("no semantics for call to `{0}`")]
    UnsupportedCall(String),
    #[error("no such block {0}")]
    MissingBlock(BlockId),
    #[error("execution ran past the end of the block")]
    FellOffBlock,
}

/// Fatal error that aborts a run.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("state {state} at {pc} (`{inst}`): {kind}")]
    Semantics {
        state: StateId,
        pc: Pc,
        inst: String,
        #[source]
        kind: SemanticsError,
    },
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("function `{0}` has no blocks")]
    EmptyFunction(String),
    #[error("state {state} at {pc}: neither branch direction of {cond} is feasible")]
    PathContradiction { state: StateId, pc: Pc, cond: String },
    #[error("state {state}: solver failure")]
    Solver {
        state: StateId,
        #[source]
        source: SolverError,
    },
    #[error("state {state}: solver found no solution for a feasible path")]
    NoSolution { state: StateId },
    #[error("cannot write {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
