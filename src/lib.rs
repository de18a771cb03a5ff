//! # symex-rs: symbolic execution with pluggable solvers
//!
//! **`symex-rs`** interprets a small instruction-level program representation
//! while treating designated inputs as symbolic values. It forks execution
//! at data-dependent branches, accumulates a path condition per path and asks
//! a constraint solver to turn every explored path into a concrete test input.
//!
//! ## Key Features
//!
//! - **Manager-Centric Expressions**: All expressions are built through the
//!   [`ExprManager`][crate::expr::ExprManager], which folds constants eagerly
//!   and hash-conses nodes, so [`ExprRef`][crate::reference::ExprRef] handles
//!   compare structurally in O(1).
//! - **Isolated Paths**: An [`ExecutionState`][crate::state::ExecutionState]
//!   owns its locals and constraints; forking is a deep copy.
//! - **Derived Solver Laws**: Backends implement one primitive
//!   ([`CoreSolver`][crate::solver::CoreSolver]); every decision query is
//!   derived from it in [`Solver`][crate::solver::Solver].
//! - **Backends**: a dummy backend, an algebraic backend for linear
//!   equalities, an exact bit-blasting backend on BDDs, and Z3 through its
//!   library API.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use symex_rs::config::ExecutorConfig;
//! use symex_rs::executor::Executor;
//! use symex_rs::program::{FunctionBuilder, Program};
//! use symex_rs::types::{BinaryOp, CmpOp, Width};
//!
//! // x = symbolic X; y = x - 5; if y < 0 { ret } else { ret }
//! let mut b = FunctionBuilder::new("main");
//! let entry = b.block("entry");
//! let x = b.alloca(Width::INT32);
//! b.make_symbolic(x, 4, "X");
//! let v = b.load(x);
//! let y = b.binary(BinaryOp::Sub, v, 5);
//! let c = b.cmp(CmpOp::Slt, y, 0);
//! let neg = b.block("neg");
//! b.ret(None);
//! let pos = b.block("pos");
//! b.ret(None);
//! b.switch_to(entry);
//! b.cond_br(c, neg, pos);
//! let program = Program::new(vec![b.build()]);
//!
//! let mut executor = Executor::new(ExecutorConfig::default());
//! let summary = executor.run(&program, "main").unwrap();
//! assert_eq!(summary.test_cases.len(), 2);
//! ```
//!
//! ## Core Components
//!
//! - **[`expr`]**: expression nodes, folding constructors and evaluation.
//! - **[`state`]** and **[`constraints`]**: one path through the program.
//! - **[`executor`]**: the interpreter loop and instruction semantics.
//! - **[`solver`]**: the query surface and its backends.
//! - **[`bdd`]**: the decision-diagram manager behind the bit-blasting backend.

pub mod bdd;
pub mod cache;
pub mod config;
pub mod constraints;
pub mod error;
pub mod executor;
pub mod expr;
pub mod program;
pub mod reference;
pub mod solver;
pub mod state;
pub mod table;
pub mod testcase;
pub mod types;
pub mod utils;
