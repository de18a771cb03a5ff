//! Execution state: one path through the program.
//!
//! A state owns its locals and its path condition outright. Expressions are
//! only referenced through [`ExprRef`] handles, so cloning a state never
//! shares mutable structure with its parent.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;

use crate::constraints::ConstraintSet;
use crate::expr::ExprManager;
use crate::program::{InstId, Pc};
use crate::reference::ExprRef;
use crate::types::Width;

/// Process-wide source of state identities. The first state created in the
/// process gets id 1; ids only grow.
static NEXT_STATE_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StateId(u32);

impl StateId {
    fn fresh() -> Self {
        StateId(NEXT_STATE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Contents of a local slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Local {
    /// Allocated but never stored to.
    Placeholder(Width),
    Value(ExprRef),
}

#[derive(Debug)]
pub struct ExecutionState {
    id: StateId,
    pub pc: Pc,
    pub prev_pc: Pc,
    locals: HashMap<InstId, Local>,
    constraints: ConstraintSet,
    /// Symbolic inputs introduced on this path, in creation order.
    symbolics: Vec<ExprRef>,
}

impl ExecutionState {
    pub fn new(entry: Pc) -> Self {
        let state = Self {
            id: StateId::fresh(),
            pc: entry,
            prev_pc: entry,
            locals: HashMap::new(),
            constraints: ConstraintSet::new(),
            symbolics: Vec::new(),
        };
        debug!("new state {} at {}", state.id, entry);
        state
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    /// Fork: an independent deep copy with a fresh identity.
    pub fn branch(&self) -> Self {
        let state = Self {
            id: StateId::fresh(),
            pc: self.pc,
            prev_pc: self.prev_pc,
            locals: self.locals.clone(),
            constraints: self.constraints.clone(),
            symbolics: self.symbolics.clone(),
        };
        debug!("branch {} -> {}", self.id, state.id);
        state
    }

    pub fn local(&self, slot: InstId) -> Option<Local> {
        self.locals.get(&slot).copied()
    }

    pub fn bind(&mut self, slot: InstId, value: Local) {
        self.locals.insert(slot, value);
    }

    pub fn locals(&self) -> impl Iterator<Item = (InstId, Local)> + '_ {
        self.locals.iter().map(|(&k, &v)| (k, v))
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Append a path constraint.
    ///
    /// # Panics
    ///
    /// Panics if `e` is a constant other than `true`: a feasible branch
    /// never produces one.
    pub fn add_constraint(&mut self, exprs: &ExprManager, e: ExprRef) {
        assert!(
            exprs.width(e).is_bool(),
            "Constraint should be boolean, got {}",
            exprs.width(e)
        );
        if exprs.is_constant(e) {
            assert!(
                exprs.is_true(e),
                "Adding a non-true constant constraint to state {}",
                self.id
            );
            return;
        }
        debug!("state {}: constraint {}", self.id, exprs.render(e));
        self.constraints.push(e);
    }

    pub fn add_symbolic(&mut self, e: ExprRef) {
        self.symbolics.push(e);
    }

    pub fn symbolics(&self) -> &[ExprRef] {
        &self.symbolics
    }

    /// Name for a new symbolic input: `name` itself if no symbolic on this
    /// path uses it yet, otherwise the first unused `name_N` with `N >= 1`.
    pub fn fresh_symbol_name(&self, exprs: &ExprManager, name: &str) -> String {
        let used: HashSet<String> = self.symbolics.iter().filter_map(|&e| exprs.symbol_name(e)).collect();
        if !used.contains(name) {
            return name.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", name, n);
            if !used.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}
