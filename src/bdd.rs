//! Decision diagrams for the bit-blasting backend.
//!
//! A [`Bdd`] is a reduced ordered BDD manager with complement edges. Each
//! diagram is addressed by a [`Ref`]; a negative `Ref` denotes the
//! complement of the node it points to. The high edge of a stored node is
//! never complemented, which makes every boolean function over a fixed
//! variable order have exactly one `Ref`.
//!
//! Variables are numbered from 1; smaller numbers are closer to the root.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;

use log::trace;

use crate::cache::Cache;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

/// Variable of the terminal, below every real variable.
const TERMINAL: u32 = u32::MAX;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    var: u32,
    low: Ref,
    high: Ref,
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(self.var as u64, self.low.as_lit(), self.high.as_lit())
    }
}

/// Normalized `ite(f, g, h)` triple.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct IteKey(Ref, Ref, Ref);

impl MyHash for IteKey {
    fn hash(&self) -> u64 {
        (self.0, self.1, self.2).hash()
    }
}

pub struct Bdd {
    nodes: RefCell<Table<Node>>,
    ite_cache: RefCell<Cache<IteKey, Ref>>,
    pub zero: Ref,
    pub one: Ref,
}

impl Bdd {
    /// Manager with room for `2^bits` nodes before the first resize.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be at most 31");
        let mut nodes = Table::new(bits);
        // `Ref(0)` is its own negation, so slot 0 stays unused.
        let unused = Node {
            var: TERMINAL,
            low: Ref::positive(0),
            high: Ref::positive(0),
        };
        nodes.add(unused);
        let one = Ref::positive(nodes.add(unused) as u32);
        Self {
            nodes: RefCell::new(nodes),
            ite_cache: RefCell::new(Cache::new(bits.min(16))),
            zero: -one,
            one,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(16)
    }
}

impl fmt::Debug for Bdd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.ite_cache.borrow();
        f.debug_struct("Bdd")
            .field("nodes", &self.num_nodes())
            .field("cache_hits", &cache.hits())
            .field("cache_misses", &cache.misses())
            .finish()
    }
}

impl Bdd {
    /// Number of decision nodes, the terminal included.
    pub fn num_nodes(&self) -> usize {
        self.nodes.borrow().size() - 1
    }

    fn node(&self, f: Ref) -> Node {
        *self.nodes.borrow().value(f.index())
    }

    /// Top variable of `f`; `None` for the constants.
    pub fn var(&self, f: Ref) -> Option<u32> {
        let var = self.node(f).var;
        (var != TERMINAL).then_some(var)
    }

    /// Cofactors of `f` with respect to its own top variable.
    pub fn children(&self, f: Ref) -> (Ref, Ref) {
        let node = self.node(f);
        if f.is_negated() {
            (-node.low, -node.high)
        } else {
            (node.low, node.high)
        }
    }

    pub fn is_zero(&self, f: Ref) -> bool {
        f == self.zero
    }

    pub fn is_one(&self, f: Ref) -> bool {
        f == self.one
    }

    pub fn is_constant(&self, f: Ref) -> bool {
        f.index() == self.one.index()
    }

    pub fn constant(&self, value: bool) -> Ref {
        if value {
            self.one
        } else {
            self.zero
        }
    }

    fn mk_node(&self, var: u32, low: Ref, high: Ref) -> Ref {
        if low == high {
            return low;
        }
        if high.is_negated() {
            return -self.mk_node(var, -low, -high);
        }
        let index = self.nodes.borrow_mut().put(Node { var, low, high });
        Ref::positive(index as u32)
    }

    pub fn mk_var(&self, var: u32) -> Ref {
        assert!(var != 0 && var != TERMINAL, "Invalid variable {}", var);
        self.mk_node(var, self.zero, self.one)
    }

    /// Cofactors of `f` for `var`, which must not be below the top variable.
    fn cofactors(&self, f: Ref, var: u32) -> (Ref, Ref) {
        if self.node(f).var == var {
            self.children(f)
        } else {
            (f, f)
        }
    }

    /// Bring `ite(f, g, h)` into a canonical form: `f` and `g` regular.
    /// Returns the triple and whether the result has to be complemented.
    fn normalize(&self, f: Ref, g: Ref, h: Ref) -> (IteKey, bool) {
        // Inside a branch `f` is known, so it folds to a constant there.
        let g = if g == f {
            self.one
        } else if g == -f {
            self.zero
        } else {
            g
        };
        let h = if h == f {
            self.zero
        } else if h == -f {
            self.one
        } else {
            h
        };
        let (f, g, h) = if f.is_negated() { (-f, h, g) } else { (f, g, h) };
        if g.is_negated() {
            (IteKey(f, -g, -h), true)
        } else {
            (IteKey(f, g, h), false)
        }
    }

    /// `ite(f, g, h) = (f ∧ g) ∨ (¬f ∧ h)`
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        if self.is_one(f) || g == h {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        let (key, negate) = self.normalize(f, g, h);
        let IteKey(f, g, h) = key;
        if g == h {
            return if negate { -g } else { g };
        }

        let cached = self.ite_cache.borrow().get(&key).copied();
        let res = match cached {
            Some(res) => res,
            None => {
                let var = [f, g, h]
                    .into_iter()
                    .map(|x| self.node(x).var)
                    .min()
                    .unwrap_or(TERMINAL);
                let (f0, f1) = self.cofactors(f, var);
                let (g0, g1) = self.cofactors(g, var);
                let (h0, h1) = self.cofactors(h, var);
                let low = self.apply_ite(f0, g0, h0);
                let high = self.apply_ite(f1, g1, h1);
                let res = self.mk_node(var, low, high);
                trace!("ite{:?} = {}", key, res);
                self.ite_cache.borrow_mut().insert(key, res);
                res
            }
        };
        if negate {
            -res
        } else {
            res
        }
    }

    pub fn apply_and(&self, f: Ref, g: Ref) -> Ref {
        self.apply_ite(f, g, self.zero)
    }

    pub fn apply_or(&self, f: Ref, g: Ref) -> Ref {
        self.apply_ite(f, self.one, g)
    }

    pub fn apply_xor(&self, f: Ref, g: Ref) -> Ref {
        self.apply_ite(f, -g, g)
    }

    pub fn apply_eq(&self, f: Ref, g: Ref) -> Ref {
        self.apply_ite(f, g, -g)
    }

    /// Conjunction of all `fs`, stopping early at `zero`.
    pub fn apply_and_many(&self, fs: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.one;
        for f in fs {
            res = self.apply_and(res, f);
            if self.is_zero(res) {
                break;
            }
        }
        res
    }

    /// Number of distinct nodes reachable from `f`, the terminal included.
    pub fn size(&self, f: Ref) -> usize {
        let mut seen = HashSet::from([f.index()]);
        let mut stack = vec![f];
        while let Some(g) = stack.pop() {
            if self.is_constant(g) {
                continue;
            }
            let (low, high) = self.children(g);
            for x in [low, high] {
                if seen.insert(x.index()) {
                    stack.push(x);
                }
            }
        }
        seen.len()
    }

    /// A satisfying assignment of `f`, or `None` if `f` is `zero`.
    ///
    /// The low edge is taken whenever it can still reach `one`. Read with
    /// the most significant bits on top, this yields the smallest values.
    /// Variables off the chosen path are left out.
    pub fn one_sat(&self, f: Ref) -> Option<HashMap<u32, bool>> {
        if self.is_zero(f) {
            return None;
        }
        let mut model = HashMap::new();
        let mut g = f;
        while let Some(var) = self.var(g) {
            let (low, high) = self.children(g);
            let bit = self.is_zero(low);
            model.insert(var, bit);
            g = if bit { high } else { low };
        }
        Some(model)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_variables() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        assert_eq!(bdd.var(x), Some(1));
        assert_eq!(bdd.children(x), (bdd.zero, bdd.one));
        assert_eq!(bdd.children(-x), (bdd.one, bdd.zero));
        assert_eq!(bdd.var(bdd.one), None);
        assert!(bdd.is_constant(bdd.zero));
    }

    #[test]
    fn test_canonical() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_and(x, y);
        assert_eq!(f, bdd.apply_and(y, x));
        assert_eq!(bdd.apply_or(-x, -y), -f);
        assert_eq!(bdd.apply_xor(x, x), bdd.zero);
        assert_eq!(bdd.apply_eq(x, y), -bdd.apply_xor(x, y));
    }

    #[test]
    fn test_ite() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let z = bdd.mk_var(3);
        let f = bdd.apply_ite(x, y, z);
        let expected = bdd.apply_or(bdd.apply_and(x, y), bdd.apply_and(-x, z));
        assert_eq!(f, expected);
        assert_eq!(bdd.size(f), 4);
        assert_eq!(bdd.apply_ite(-x, z, y), f);
    }

    #[test]
    fn test_one_sat_prefers_low() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let model = bdd.one_sat(bdd.apply_or(x, y)).unwrap();
        assert_eq!(model.get(&1), Some(&false));
        assert_eq!(model.get(&2), Some(&true));

        assert_eq!(bdd.one_sat(bdd.zero), None);
        assert_eq!(bdd.one_sat(bdd.one), Some(HashMap::new()));
    }

    #[test]
    fn test_and_many() {
        let bdd = Bdd::default();
        let vars: Vec<Ref> = (1..=4).map(|v| bdd.mk_var(v)).collect();
        let all = bdd.apply_and_many(vars.iter().copied());
        assert_eq!(bdd.one_sat(all).unwrap().len(), 4);
        assert_eq!(bdd.size(all), 5);
        let none = bdd.apply_and_many([vars[0], -vars[0], vars[1]]);
        assert_eq!(none, bdd.zero);
    }
}
