//! The interpreter loop.
//!
//! An [`Executor`] keeps a queue of live [`ExecutionState`]s and repeatedly
//! executes one instruction of one state. Conditional branches on symbolic
//! conditions ask the solver which directions are feasible and fork the
//! state when both are. Every terminated path is turned into a test case.
//!
//! Feasibility is checked for the `true` direction first. When both
//! directions are feasible the current state follows the `then` edge and
//! the fork follows the `else` edge.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::path::PathBuf;

use log::{debug, info};

use crate::config::{ExecutorConfig, SearchStrategy};
use crate::error::{ExecError, SemanticsError};
use crate::expr::ExprManager;
use crate::program::{BlockId, Function, InstKind, Instruction, Operand, Pc, Program};
use crate::reference::ExprRef;
use crate::solver::{Query, Solver};
use crate::state::{ExecutionState, Local};
use crate::testcase::{Extras, TestCase, TestCaseWriter, Termination};
use crate::types::Width;

/// Name of the external call that aborts a path with an error.
pub const TRAP: &str = "trap";

/// What one instruction did to its state.
#[derive(Debug)]
enum Step {
    Continue,
    /// The state continues; the fork is a new live state.
    Fork(ExecutionState),
    Terminate(Termination),
}

/// Result of a completed run.
#[derive(Debug, Default)]
pub struct ExecutionSummary {
    pub test_cases: Vec<TestCase>,
    pub instructions: u64,
    pub forks: u64,
    pub run_dir: Option<PathBuf>,
}

pub struct Executor {
    config: ExecutorConfig,
    exprs: ExprManager,
    solver: Solver,
    writer: TestCaseWriter,
    states: VecDeque<ExecutionState>,
    summary: ExecutionSummary,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        let solver = Solver::from_config(&config.solver);
        Self::with_solver(config, solver)
    }

    /// Executor over a custom solver stack. The solver must not have been
    /// used with another expression manager.
    pub fn with_solver(config: ExecutorConfig, solver: Solver) -> Self {
        let writer = TestCaseWriter::new(config.output.clone());
        Self {
            config,
            exprs: ExprManager::new(),
            solver,
            writer,
            states: VecDeque::new(),
            summary: ExecutionSummary::default(),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn exprs(&self) -> &ExprManager {
        &self.exprs
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Number of live states.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Explore every path of `entry` until no live state remains.
    ///
    /// The first fatal error aborts the run; test cases emitted before it
    /// stay on disk.
    pub fn run(&mut self, program: &Program, entry: &str) -> Result<ExecutionSummary, ExecError> {
        let function = program
            .function(entry)
            .ok_or_else(|| ExecError::UnknownFunction(entry.to_string()))?;
        let entry_block = function
            .entry()
            .ok_or_else(|| ExecError::EmptyFunction(entry.to_string()))?;

        info!("Running `{}` with solver `{}`", entry, self.solver.name());
        self.states.clear();
        self.summary = ExecutionSummary::default();
        self.writer = TestCaseWriter::new(self.config.output.clone());
        self.states.push_back(ExecutionState::new(Pc::new(entry_block, 0)));

        let res = self.explore(function);
        self.states.clear();
        res?;

        let mut summary = std::mem::take(&mut self.summary);
        summary.run_dir = self.writer.run_dir().map(|p| p.to_path_buf());
        info!(
            "Done: {} test cases, {} instructions, {} forks",
            summary.test_cases.len(),
            summary.instructions,
            summary.forks
        );
        Ok(summary)
    }

    fn explore(&mut self, function: &Function) -> Result<(), ExecError> {
        while let Some(mut state) = self.states.pop_front() {
            match self.step(function, &mut state)? {
                Step::Continue => self.reschedule(state),
                Step::Fork(other) => {
                    self.reschedule(state);
                    self.states.push_back(other);
                }
                Step::Terminate(termination) => self.terminate(state, termination)?,
            }
        }
        Ok(())
    }

    fn reschedule(&mut self, state: ExecutionState) {
        match self.config.search {
            SearchStrategy::Interleaved => self.states.push_back(state),
            SearchStrategy::RunToCompletion => self.states.push_front(state),
        }
    }

    /// Execute the instruction at the state's pc.
    fn step(&mut self, function: &Function, state: &mut ExecutionState) -> Result<Step, ExecError> {
        let pc = state.pc;
        let Some(inst) = function.instruction(pc) else {
            let kind = match function.block(pc.block) {
                None => SemanticsError::MissingBlock(pc.block),
                Some(_) => SemanticsError::FellOffBlock,
            };
            return Err(ExecError::Semantics {
                state: state.id(),
                pc,
                inst: "<none>".to_string(),
                kind,
            });
        };

        debug!("{} {}: {}", state.id(), pc, inst);
        state.prev_pc = pc;
        state.pc = pc.next();
        self.summary.instructions += 1;

        match self.execute(function, inst, state) {
            Ok(step) => Ok(step),
            Err(Fault::Semantics(kind)) => Err(ExecError::Semantics {
                state: state.id(),
                pc,
                inst: inst.to_string(),
                kind,
            }),
            Err(Fault::Fatal(err)) => Err(err),
        }
    }

    fn execute(&mut self, function: &Function, inst: &Instruction, state: &mut ExecutionState) -> Result<Step, Fault> {
        match &inst.kind {
            InstKind::Alloca { width } => {
                if *width != Width::INT32 {
                    return Err(SemanticsError::UnsupportedWidth(*width).into());
                }
                state.bind(inst.id, Local::Placeholder(*width));
            }

            InstKind::Load { address } => match state.local(*address) {
                Some(Local::Value(e)) => state.bind(inst.id, Local::Value(e)),
                _ => return Err(SemanticsError::LoadBeforeStore(*address).into()),
            },

            InstKind::Store {
                value,
                address,
                width,
            } => {
                let slot_width = match state.local(*address) {
                    Some(Local::Placeholder(w)) => w,
                    Some(Local::Value(e)) => self.exprs.width(e),
                    None => return Err(SemanticsError::NotAllocated(*address).into()),
                };
                expect_width(*width, slot_width)?;
                let e = self.operand(state, value, *width)?;
                state.bind(*address, Local::Value(e));
            }

            InstKind::Binary { kind, lhs, rhs } => {
                let l = self.operand(state, lhs, Width::INT32)?;
                let r = self.operand(state, rhs, Width::INT32)?;
                state.bind(inst.id, Local::Value(self.exprs.mk_binary(*kind, l, r)));
            }

            InstKind::Cmp { kind, lhs, rhs } => {
                let l = self.resolve(state, lhs)?;
                let width = self.exprs.width(l);
                if !kind.accepts_bool() {
                    expect_width(Width::INT32, width)?;
                }
                let r = self.operand(state, rhs, width)?;
                state.bind(inst.id, Local::Value(self.exprs.mk_compare(*kind, l, r)));
            }

            InstKind::Br { target } => {
                check_block(function, *target)?;
                state.pc = Pc::new(*target, 0);
            }

            InstKind::CondBr {
                cond,
                then_block,
                else_block,
            } => {
                check_block(function, *then_block)?;
                check_block(function, *else_block)?;
                let cond = self.operand(state, cond, Width::BOOL)?;
                return self.branch(state, cond, *then_block, *else_block);
            }

            InstKind::Ret { value } => {
                if let Some(value) = value {
                    self.resolve(state, value)?;
                }
                return Ok(Step::Terminate(Termination::Normal));
            }

            InstKind::MakeSymbolic {
                target,
                bytes,
                name,
            } => {
                if *bytes != Width::INT32.bytes() {
                    return Err(SemanticsError::UnsupportedSymbolicSize(*bytes).into());
                }
                if !is_valid_symbol_name(name) {
                    return Err(SemanticsError::InvalidSymbolName(name.clone()).into());
                }
                if state.local(*target).is_none() {
                    return Err(SemanticsError::NotAllocated(*target).into());
                }
                let name = state.fresh_symbol_name(&self.exprs, name);
                let e = self.exprs.mk_symbolic(&name);
                debug!("{}: {} is symbolic `{}`", state.id(), target, name);
                state.bind(*target, Local::Value(e));
                state.add_symbolic(e);
            }

            InstKind::Call { callee, .. } if callee == TRAP => {
                return Ok(Step::Terminate(Termination::Error));
            }
            InstKind::Call { callee, .. } => {
                return Err(SemanticsError::UnsupportedCall(callee.clone()).into());
            }

            InstKind::Unreachable => return Ok(Step::Terminate(Termination::Error)),
        }
        Ok(Step::Continue)
    }

    /// Expression of an operand, without width expectations.
    fn resolve(&self, state: &ExecutionState, op: &Operand) -> Result<ExprRef, SemanticsError> {
        match *op {
            Operand::Int(v) => Ok(self.exprs.mk_int32(v)),
            Operand::Bool(b) => Ok(self.exprs.mk_bool(b)),
            Operand::Value(id) => match state.local(id) {
                Some(Local::Value(e)) => Ok(e),
                _ => Err(SemanticsError::UndefinedValue(id)),
            },
        }
    }

    /// Expression of an operand of the given width. Literals are wrapped as
    /// constants of that width.
    fn operand(&self, state: &ExecutionState, op: &Operand, width: Width) -> Result<ExprRef, SemanticsError> {
        let e = match *op {
            Operand::Int(v) if width == Width::INT32 => self.exprs.mk_int32(v),
            Operand::Bool(b) if width.is_bool() => self.exprs.mk_bool(b),
            _ => self.resolve(state, op)?,
        };
        expect_width(width, self.exprs.width(e))?;
        Ok(e)
    }

    fn branch(
        &mut self,
        state: &mut ExecutionState,
        cond: ExprRef,
        then_block: BlockId,
        else_block: BlockId,
    ) -> Result<Step, Fault> {
        let id = state.id();
        let solver_error = |source| Fault::Fatal(ExecError::Solver { state: id, source });

        let query = Query::new(&self.exprs, state.constraints(), cond);
        let may_be_true = self.solver.may_be_true(&query).map_err(solver_error)?;
        let may_be_false = self.solver.may_be_false(&query).map_err(solver_error)?;
        let negated = self.exprs.create_is_zero(cond);

        match (may_be_true, may_be_false) {
            (true, true) => {
                let mut other = state.branch();
                state.add_constraint(&self.exprs, cond);
                state.pc = Pc::new(then_block, 0);
                other.add_constraint(&self.exprs, negated);
                other.pc = Pc::new(else_block, 0);
                self.summary.forks += 1;
                debug!("{}: fork {} -> {}, {} -> {}", id, then_block, id, else_block, other.id());
                Ok(Step::Fork(other))
            }
            (true, false) => {
                state.add_constraint(&self.exprs, cond);
                state.pc = Pc::new(then_block, 0);
                Ok(Step::Continue)
            }
            (false, true) => {
                state.add_constraint(&self.exprs, negated);
                state.pc = Pc::new(else_block, 0);
                Ok(Step::Continue)
            }
            (false, false) => Err(Fault::Fatal(ExecError::PathContradiction {
                state: id,
                pc: state.prev_pc,
                cond: self.exprs.render(cond),
            })),
        }
    }

    /// Solve the path condition of a finished state and emit its test case.
    fn terminate(&mut self, mut state: ExecutionState, termination: Termination) -> Result<(), ExecError> {
        state.pc = state.prev_pc;
        let id = state.id();
        info!("State {} terminated ({}) at {}", id, termination, state.pc);

        let objects = state.symbolics().to_vec();
        let query = Query::new(&self.exprs, state.constraints(), self.exprs.mk_false());
        let values = self
            .solver
            .get_initial_values(&query, &objects)
            .map_err(|source| ExecError::Solver { state: id, source })?
            .ok_or(ExecError::NoSolution { state: id })?;

        let inputs: Vec<(String, i32)> = objects
            .iter()
            .zip(values)
            .map(|(&e, v)| (self.exprs.symbol_name(e).unwrap_or_else(|| e.to_string()), v))
            .collect();

        let output = self.writer.config();
        let extras = Extras {
            smt: output.dump_smt.then(|| self.solver.constraint_log(&query)),
            log: output
                .write_log
                .then(|| describe(&self.exprs, &state, termination, &inputs)),
        };
        let test_case = self.writer.write(id, termination, inputs, extras)?;
        self.summary.test_cases.push(test_case);
        Ok(())
    }
}

/// Failure inside one instruction, before the instruction context is known.
enum Fault {
    Semantics(SemanticsError),
    Fatal(ExecError),
}

impl From<SemanticsError> for Fault {
    fn from(kind: SemanticsError) -> Self {
        Fault::Semantics(kind)
    }
}

fn expect_width(expected: Width, found: Width) -> Result<(), SemanticsError> {
    if expected == found {
        Ok(())
    } else {
        Err(SemanticsError::WidthMismatch { expected, found })
    }
}

/// Names end up quoted in SMT-LIB and as `name, value` lines in test cases.
fn is_valid_symbol_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['|', '\\'])
        && !name.contains(", ")
        && !name.chars().any(char::is_control)
}

fn check_block(function: &Function, block: BlockId) -> Result<(), SemanticsError> {
    match function.block(block) {
        Some(_) => Ok(()),
        None => Err(SemanticsError::MissingBlock(block)),
    }
}

/// Human-readable account of a finished path.
fn describe(exprs: &ExprManager, state: &ExecutionState, termination: Termination, inputs: &[(String, i32)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "state {} ({}) at {}", state.id(), termination, state.pc);
    let _ = writeln!(out, "inputs:");
    for (name, value) in inputs {
        let _ = writeln!(out, "  {} = {}", name, value);
    }
    let mut locals: Vec<_> = state.locals().collect();
    locals.sort_by_key(|&(slot, _)| slot);
    let _ = writeln!(out, "memory:");
    for (slot, local) in locals {
        match local {
            Local::Placeholder(width) => {
                let _ = writeln!(out, "  {} = <uninit {}>", slot, width);
            }
            Local::Value(e) => {
                let _ = writeln!(out, "  {} = {}", slot, exprs.render(e));
            }
        }
    }
    let _ = writeln!(out, "path condition:");
    for c in state.constraints().iter() {
        let _ = writeln!(out, "  {}", exprs.render(c));
    }
    out
}
