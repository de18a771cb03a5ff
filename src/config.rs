//! Configuration of the solver stack, the executor and test-case output.

use std::path::PathBuf;
use std::time::Duration;

/// Which core solver answers queries.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SolverKind {
    /// Fails every query. Useful to check the plumbing.
    Dummy,
    /// Linear equalities and disequalities over `+`, `-` and constants.
    Tiny,
    /// Exact bit-level reasoning on BDDs.
    #[default]
    BitBlast,
    /// Z3, linked as a library.
    Z3,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Z3Config {
    /// Per-query limit; hitting it is reported as a timeout.
    pub timeout: Duration,
}

impl Default for Z3Config {
    fn default() -> Self {
        Z3Config {
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SolverConfig {
    pub kind: SolverKind,
    /// Memoize truth decisions.
    pub caching: bool,
    /// Check every model against the query before returning it.
    pub validate_models: bool,
    pub z3: Z3Config,
    /// Node budget of the bit-blasting backend.
    pub node_limit: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            kind: SolverKind::default(),
            caching: true,
            validate_models: false,
            z3: Z3Config::default(),
            node_limit: 1 << 20,
        }
    }
}

/// Where and what to write for each terminated path.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OutputConfig {
    /// Directory that receives the `result_N` run directories.
    pub root: PathBuf,
    /// Also write `test_case_<id>.smt2` with the path condition.
    pub dump_smt: bool,
    /// Also write `test_case_<id>.log` with inputs, locals and constraints.
    pub write_log: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            root: PathBuf::from("."),
            dump_smt: false,
            write_log: false,
        }
    }
}

/// Order in which live states are scheduled.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SearchStrategy {
    /// Round-robin: one instruction per state, then move to the back.
    #[default]
    Interleaved,
    /// Keep running the front state until it terminates.
    RunToCompletion,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ExecutorConfig {
    pub solver: SolverConfig,
    pub output: OutputConfig,
    pub search: SearchStrategy,
}
