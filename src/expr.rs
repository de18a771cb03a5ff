//! Hash-consed symbolic expressions.
//!
//! All expressions live inside an [`ExprManager`], which hands out small
//! [`ExprRef`] handles. Nodes are immutable once interned, and structurally
//! equal nodes are interned exactly once, so handle equality is structural
//! equality.
//!
//! Constructors fold eagerly: whenever every operand is a constant, the
//! result is a constant and no structural node is allocated.
//!
//! ```
//! use symex_rs::expr::ExprManager;
//!
//! let exprs = ExprManager::new();
//! let x = exprs.mk_symbolic("X");
//! let five = exprs.mk_int32(5);
//! let y = exprs.mk_sub(x, five);
//! let cond = exprs.mk_slt(y, exprs.mk_int32(0));
//! assert_eq!(exprs.render(cond), "(slt (sub X 5) 0)");
//! assert_eq!(exprs.mk_add(five, five), exprs.mk_int32(10));
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Write as _};

use log::debug;
use num_bigint::BigUint;

use crate::reference::ExprRef;
use crate::table::Table;
use crate::types::{BinaryOp, CmpOp, Kind, Width};
use crate::utils::{hash_combine, hash_str, MyHash, MAGIC_HASH_CONSTANT};

/// Payload of an interned expression node.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ExprNode {
    /// Constant, normalized to `0 <= value < 2^width`.
    Constant { value: BigUint, width: Width },
    Symbolic { name: String, width: Width },
    /// Bitwise complement; logical negation for booleans.
    Not { expr: ExprRef, width: Width },
    Binary {
        op: BinaryOp,
        left: ExprRef,
        right: ExprRef,
        width: Width,
    },
    /// Comparison; always boolean.
    Compare {
        op: CmpOp,
        left: ExprRef,
        right: ExprRef,
    },
}

impl ExprNode {
    pub fn kind(&self) -> Kind {
        match self {
            ExprNode::Constant { .. } => Kind::Constant,
            ExprNode::Symbolic { .. } => Kind::Symbolic,
            ExprNode::Not { .. } => Kind::Not,
            ExprNode::Binary { op, .. } => Kind::from(*op),
            ExprNode::Compare { op, .. } => Kind::from(*op),
        }
    }

    pub fn width(&self) -> Width {
        match self {
            ExprNode::Constant { width, .. }
            | ExprNode::Symbolic { width, .. }
            | ExprNode::Not { width, .. }
            | ExprNode::Binary { width, .. } => *width,
            ExprNode::Compare { .. } => Width::BOOL,
        }
    }

    pub fn kids(&self) -> Vec<ExprRef> {
        match self {
            ExprNode::Constant { .. } | ExprNode::Symbolic { .. } => vec![],
            ExprNode::Not { expr, .. } => vec![*expr],
            ExprNode::Binary { left, right, .. } | ExprNode::Compare { left, right, .. } => {
                vec![*left, *right]
            }
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct Entry {
    node: ExprNode,
    hash: u64,
}

impl MyHash for Entry {
    fn hash(&self) -> u64 {
        self.hash
    }
}

/// Low 64 bits of a big integer.
pub(crate) fn low_u64(value: &BigUint) -> u64 {
    value.iter_u64_digits().next().unwrap_or(0)
}

fn mask(width: Width) -> BigUint {
    (BigUint::from(1u8) << width.bits()) - 1u8
}

fn normalize(value: BigUint, width: Width) -> BigUint {
    value & mask(width)
}

fn msb(value: &BigUint, width: Width) -> bool {
    value.bit((width.bits() - 1) as u64)
}

fn negate(value: &BigUint, width: Width) -> BigUint {
    normalize((BigUint::from(1u8) << width.bits()) - value, width)
}

/// Unsigned division with the bit-vector convention `x / 0 = all ones`.
fn udiv(a: &BigUint, b: &BigUint, width: Width) -> BigUint {
    if *b == BigUint::ZERO {
        mask(width)
    } else {
        a / b
    }
}

/// Signed division, defined from unsigned division by sign decomposition.
fn sdiv(a: &BigUint, b: &BigUint, width: Width) -> BigUint {
    match (msb(a, width), msb(b, width)) {
        (false, false) => udiv(a, b, width),
        (true, false) => negate(&udiv(&negate(a, width), b, width), width),
        (false, true) => negate(&udiv(a, &negate(b, width), width), width),
        (true, true) => udiv(&negate(a, width), &negate(b, width), width),
    }
}

/// Concrete semantics of a binary operator on normalized operands.
pub(crate) fn fold_binary(op: BinaryOp, a: &BigUint, b: &BigUint, width: Width) -> BigUint {
    match op {
        BinaryOp::Add => normalize(a + b, width),
        BinaryOp::Sub => normalize(a + negate(b, width), width),
        BinaryOp::Mul => normalize(a * b, width),
        BinaryOp::UDiv => udiv(a, b, width),
        BinaryOp::SDiv => sdiv(a, b, width),
    }
}

/// Concrete semantics of a comparison on normalized operands.
pub(crate) fn fold_compare(op: CmpOp, a: &BigUint, b: &BigUint, width: Width) -> bool {
    if op.is_signed() {
        // Flipping the sign bit maps signed order onto unsigned order.
        let flip = BigUint::from(1u8) << (width.bits() - 1);
        let a = a ^ &flip;
        let b = b ^ &flip;
        return fold_compare(unsigned_counterpart(op), &a, &b, width);
    }
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        CmpOp::Ult => a < b,
        CmpOp::Ule => a <= b,
        CmpOp::Ugt => a > b,
        CmpOp::Uge => a >= b,
        _ => unreachable!(),
    }
}

fn unsigned_counterpart(op: CmpOp) -> CmpOp {
    match op {
        CmpOp::Slt => CmpOp::Ult,
        CmpOp::Sle => CmpOp::Ule,
        CmpOp::Sgt => CmpOp::Ugt,
        CmpOp::Sge => CmpOp::Uge,
        other => other,
    }
}

fn compute_hash(node: &ExprNode, table: &Table<Entry>) -> u64 {
    match node {
        ExprNode::Constant { value, width } => {
            low_u64(value) ^ (width.bits() as u64).wrapping_mul(MAGIC_HASH_CONSTANT)
        }
        ExprNode::Symbolic { name, width } => {
            hash_str(name) ^ (width.bits() as u64).wrapping_mul(MAGIC_HASH_CONSTANT)
        }
        _ => node
            .kids()
            .into_iter()
            .fold(node.kind().code() * MAGIC_HASH_CONSTANT, |h, kid| {
                hash_combine(h, table[kid.index()].hash)
            }),
    }
}

/// Owner of all expression nodes.
pub struct ExprManager {
    storage: RefCell<Table<Entry>>,
}

impl ExprManager {
    pub fn new() -> Self {
        Self::with_capacity_bits(12)
    }

    /// Create a manager whose unique table starts with `2^bits` buckets.
    pub fn with_capacity_bits(bits: usize) -> Self {
        Self {
            storage: RefCell::new(Table::new(bits)),
        }
    }
}

impl Default for ExprManager {
    fn default() -> Self {
        ExprManager::new()
    }
}

impl Debug for ExprManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("ExprManager")
            .field("size", &storage.size())
            .field("buckets", &storage.num_buckets())
            .finish()
    }
}

impl ExprManager {
    /// Number of distinct expressions created so far.
    pub fn len(&self) -> usize {
        self.storage.borrow().size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn intern(&self, node: ExprNode) -> ExprRef {
        let mut storage = self.storage.borrow_mut();
        let hash = compute_hash(&node, &storage);
        let index = storage.put(Entry { node, hash });
        ExprRef::new(index as u32)
    }

    pub fn node(&self, e: ExprRef) -> ExprNode {
        self.storage.borrow()[e.index()].node.clone()
    }

    pub fn kind(&self, e: ExprRef) -> Kind {
        self.storage.borrow()[e.index()].node.kind()
    }

    pub fn width(&self, e: ExprRef) -> Width {
        self.storage.borrow()[e.index()].node.width()
    }

    /// Structural hash of the node.
    pub fn hash(&self, e: ExprRef) -> u64 {
        self.storage.borrow()[e.index()].hash
    }

    pub fn kids(&self, e: ExprRef) -> Vec<ExprRef> {
        self.storage.borrow()[e.index()].node.kids()
    }

    // Leaves

    /// Constant of the given width; `value` is reduced modulo `2^width`.
    pub fn mk_const(&self, value: impl Into<BigUint>, width: Width) -> ExprRef {
        assert!(width.is_supported(), "Unsupported width: {}", width);
        let value = normalize(value.into(), width);
        self.intern(ExprNode::Constant { value, width })
    }

    pub fn mk_int32(&self, value: i32) -> ExprRef {
        self.mk_const(value as u32, Width::INT32)
    }

    pub fn mk_bool(&self, value: bool) -> ExprRef {
        self.mk_const(value as u8, Width::BOOL)
    }

    pub fn mk_true(&self) -> ExprRef {
        self.mk_bool(true)
    }

    pub fn mk_false(&self) -> ExprRef {
        self.mk_bool(false)
    }

    /// 32-bit symbolic value. Equal names yield the same node.
    pub fn mk_symbolic(&self, name: &str) -> ExprRef {
        self.mk_symbolic_with_width(name, Width::INT32)
    }

    pub fn mk_symbolic_with_width(&self, name: &str, width: Width) -> ExprRef {
        assert!(!name.is_empty(), "Symbol name should not be empty");
        assert!(
            !name.contains(['|', '\\']),
            "Symbol name should not contain '|' or '\\': {:?}",
            name
        );
        assert!(width.is_supported(), "Unsupported width: {}", width);
        self.intern(ExprNode::Symbolic {
            name: name.to_string(),
            width,
        })
    }

    // Inspection

    /// Return the value if `e` is a constant.
    pub fn as_constant(&self, e: ExprRef) -> Option<BigUint> {
        match &self.storage.borrow()[e.index()].node {
            ExprNode::Constant { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    pub fn is_constant(&self, e: ExprRef) -> bool {
        self.kind(e) == Kind::Constant
    }

    pub fn is_true(&self, e: ExprRef) -> bool {
        e == self.mk_true()
    }

    pub fn is_false(&self, e: ExprRef) -> bool {
        e == self.mk_false()
    }

    /// Constant value interpreted as a signed integer of its width.
    /// Booleans read as `0` or `1`.
    pub fn constant_i64(&self, e: ExprRef) -> Option<i64> {
        let width = self.width(e);
        self.as_constant(e).map(|value| {
            let raw = low_u64(&value);
            if !width.is_bool() && msb(&value, width) {
                raw as i64 - (1i64 << width.bits())
            } else {
                raw as i64
            }
        })
    }

    pub fn symbol_name(&self, e: ExprRef) -> Option<String> {
        match &self.storage.borrow()[e.index()].node {
            ExprNode::Symbolic { name, .. } => Some(name.clone()),
            _ => None,
        }
    }

    // Operations

    pub fn mk_not(&self, e: ExprRef) -> ExprRef {
        let width = self.width(e);
        match self.node(e) {
            ExprNode::Constant { value, .. } => self.mk_const(value ^ mask(width), width),
            ExprNode::Not { expr, .. } => expr,
            _ => self.intern(ExprNode::Not { expr: e, width }),
        }
    }

    pub fn mk_binary(&self, op: BinaryOp, left: ExprRef, right: ExprRef) -> ExprRef {
        let wl = self.width(left);
        let wr = self.width(right);
        assert_eq!(
            (wl, wr),
            (Width::INT32, Width::INT32),
            "Operands of {} should be i32, got {} and {}",
            op,
            wl,
            wr
        );

        if let (Some(a), Some(b)) = (self.as_constant(left), self.as_constant(right)) {
            let value = fold_binary(op, &a, &b, wl);
            debug!("fold: {} {} {} -> {}", op, a, b, value);
            return self.mk_const(value, wl);
        }

        self.intern(ExprNode::Binary {
            op,
            left,
            right,
            width: wl,
        })
    }

    pub fn mk_add(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_binary(BinaryOp::Add, left, right)
    }
    pub fn mk_sub(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_binary(BinaryOp::Sub, left, right)
    }
    pub fn mk_mul(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_binary(BinaryOp::Mul, left, right)
    }
    pub fn mk_udiv(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_binary(BinaryOp::UDiv, left, right)
    }
    pub fn mk_sdiv(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_binary(BinaryOp::SDiv, left, right)
    }

    pub fn mk_compare(&self, op: CmpOp, left: ExprRef, right: ExprRef) -> ExprRef {
        let wl = self.width(left);
        let wr = self.width(right);
        assert_eq!(wl, wr, "Operands of {} should have equal widths", op);
        assert!(
            op.accepts_bool() || wl == Width::INT32,
            "Operands of {} should be i32, got {}",
            op,
            wl
        );

        if let (Some(a), Some(b)) = (self.as_constant(left), self.as_constant(right)) {
            let value = fold_compare(op, &a, &b, wl);
            debug!("fold: {} {} {} -> {}", op, a, b, value);
            return self.mk_bool(value);
        }

        if left == right && op.accepts_bool() {
            return self.mk_bool(op == CmpOp::Eq);
        }

        if op == CmpOp::Eq && wl.is_bool() {
            if let Some(e) = self.simplify_bool_eq(left, right) {
                return e;
            }
        }

        self.intern(ExprNode::Compare { op, left, right })
    }

    /// `(= b true) -> b` and `(= (= b false) false) -> b`, for boolean `b`.
    fn simplify_bool_eq(&self, left: ExprRef, right: ExprRef) -> Option<ExprRef> {
        let (constant, other) = if self.is_constant(left) {
            (left, right)
        } else if self.is_constant(right) {
            (right, left)
        } else {
            return None;
        };
        if self.is_true(constant) {
            return Some(other);
        }
        if let ExprNode::Compare {
            op: CmpOp::Eq,
            left: inner,
            right: inner_right,
        } = self.node(other)
        {
            if self.width(inner).is_bool() && self.is_false(inner_right) {
                return Some(inner);
            }
        }
        None
    }

    pub fn mk_eq(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_compare(CmpOp::Eq, left, right)
    }
    pub fn mk_ne(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_compare(CmpOp::Ne, left, right)
    }
    pub fn mk_ult(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_compare(CmpOp::Ult, left, right)
    }
    pub fn mk_ule(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_compare(CmpOp::Ule, left, right)
    }
    pub fn mk_ugt(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_compare(CmpOp::Ugt, left, right)
    }
    pub fn mk_uge(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_compare(CmpOp::Uge, left, right)
    }
    pub fn mk_slt(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_compare(CmpOp::Slt, left, right)
    }
    pub fn mk_sle(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_compare(CmpOp::Sle, left, right)
    }
    pub fn mk_sgt(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_compare(CmpOp::Sgt, left, right)
    }
    pub fn mk_sge(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        self.mk_compare(CmpOp::Sge, left, right)
    }

    /// `e == 0` at the width of `e`; the logical negation of a boolean.
    pub fn create_is_zero(&self, e: ExprRef) -> ExprRef {
        let zero = self.mk_const(0u8, self.width(e));
        self.mk_eq(e, zero)
    }

    // Traversals

    /// Distinct symbolic nodes reachable from `roots`, in first-visit order.
    pub fn collect_symbolics(&self, roots: impl IntoIterator<Item = ExprRef>) -> Vec<ExprRef> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut stack: Vec<ExprRef> = roots.into_iter().collect();
        stack.reverse();
        while let Some(e) = stack.pop() {
            if !visited.insert(e) {
                continue;
            }
            if self.kind(e) == Kind::Symbolic {
                result.push(e);
            }
            for kid in self.kids(e).into_iter().rev() {
                stack.push(kid);
            }
        }
        result
    }

    /// Distinct nodes reachable from `roots`, children before parents.
    pub fn post_order(&self, roots: impl IntoIterator<Item = ExprRef>) -> Vec<ExprRef> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<(ExprRef, bool)> = roots.into_iter().map(|e| (e, false)).collect();
        stack.reverse();
        while let Some((e, expanded)) = stack.pop() {
            if expanded {
                order.push(e);
                continue;
            }
            if !visited.insert(e) {
                continue;
            }
            stack.push((e, true));
            for kid in self.kids(e).into_iter().rev() {
                if !visited.contains(&kid) {
                    stack.push((kid, false));
                }
            }
        }
        order
    }

    /// Evaluate `e` under an assignment of symbol names to 32-bit values.
    ///
    /// Returns `None` if some reachable symbol is unassigned. Boolean
    /// symbols take the low bit of their assigned value.
    pub fn evaluate(&self, e: ExprRef, assignment: &HashMap<String, i32>) -> Option<BigUint> {
        let mut values: HashMap<ExprRef, BigUint> = HashMap::new();
        for x in self.post_order([e]) {
            let value = match self.node(x) {
                ExprNode::Constant { value, .. } => value,
                ExprNode::Symbolic { name, width } => {
                    normalize(BigUint::from(*assignment.get(&name)? as u32), width)
                }
                ExprNode::Not { expr, width } => &values[&expr] ^ mask(width),
                ExprNode::Binary {
                    op,
                    left,
                    right,
                    width,
                } => fold_binary(op, &values[&left], &values[&right], width),
                ExprNode::Compare { op, left, right } => {
                    let holds = fold_compare(op, &values[&left], &values[&right], self.width(left));
                    BigUint::from(holds as u8)
                }
            };
            values.insert(x, value);
        }
        values.remove(&e)
    }

    /// Render `e` as an s-expression. Integer constants print as signed
    /// decimals, boolean constants as `true`/`false`.
    pub fn render(&self, e: ExprRef) -> String {
        enum Item {
            Expr(ExprRef),
            Text(&'static str),
        }

        let mut out = String::new();
        let mut stack = vec![Item::Expr(e)];
        while let Some(item) = stack.pop() {
            let e = match item {
                Item::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Item::Expr(e) => e,
            };
            match self.node(e) {
                ExprNode::Constant { value, width } => {
                    if width.is_bool() {
                        out.push_str(if value != BigUint::ZERO { "true" } else { "false" });
                    } else {
                        let _ = write!(out, "{}", self.constant_i64(e).unwrap_or_default());
                    }
                }
                ExprNode::Symbolic { name, .. } => out.push_str(&name),
                ExprNode::Not { expr, .. } => {
                    out.push_str("(not ");
                    stack.push(Item::Text(")"));
                    stack.push(Item::Expr(expr));
                }
                ExprNode::Binary {
                    op, left, right, ..
                } => {
                    let _ = write!(out, "({} ", op);
                    stack.extend([Item::Text(")"), Item::Expr(right), Item::Text(" "), Item::Expr(left)]);
                }
                ExprNode::Compare { op, left, right } => {
                    let _ = write!(out, "({} ", op);
                    stack.extend([Item::Text(")"), Item::Expr(right), Item::Text(" "), Item::Expr(left)]);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_hash_consing() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let one = exprs.mk_int32(1);
        let a = exprs.mk_add(x, one);
        let b = exprs.mk_add(exprs.mk_symbolic("X"), exprs.mk_int32(1));
        assert_eq!(a, b);
        assert_eq!(exprs.hash(a), exprs.hash(b));
        assert_eq!(exprs.len(), 3);
        assert_ne!(exprs.mk_add(one, x), a);
    }

    #[test]
    fn test_leaf_hashes() {
        let exprs = ExprManager::new();
        let c = exprs.mk_int32(7);
        assert_eq!(exprs.hash(c), 7 ^ (32 * MAGIC_HASH_CONSTANT));
        let x = exprs.mk_symbolic("X");
        assert_eq!(exprs.hash(x), hash_str("X") ^ (32 * MAGIC_HASH_CONSTANT));
    }

    #[test]
    fn test_internal_hash() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let y = exprs.mk_symbolic("Y");
        let e = exprs.mk_sub(x, y);
        let seed = Kind::Sub.code() * MAGIC_HASH_CONSTANT;
        let expected = hash_combine(hash_combine(seed, exprs.hash(x)), exprs.hash(y));
        assert_eq!(exprs.hash(e), expected);
    }

    #[test]
    fn test_constant_folding_wraps() {
        let exprs = ExprManager::new();
        let before = exprs.len();
        let max = exprs.mk_int32(i32::MAX);
        let min = exprs.mk_int32(i32::MIN);
        let one = exprs.mk_int32(1);
        assert_eq!(exprs.mk_add(max, one), min);
        assert_eq!(exprs.mk_sub(min, one), max);
        assert_eq!(exprs.mk_mul(max, exprs.mk_int32(2)), exprs.mk_int32(-2));
        assert!(exprs.is_true(exprs.mk_slt(min, max)));
        assert!(exprs.is_false(exprs.mk_ult(min, max)));
        assert!(exprs.is_true(exprs.mk_eq(one, exprs.mk_int32(1))));
        // Only leaves were allocated.
        let kinds: Vec<Kind> = (before..exprs.len())
            .map(|i| exprs.kind(ExprRef::new(i as u32)))
            .collect();
        assert!(kinds.iter().all(|&k| k == Kind::Constant));
    }

    #[test]
    fn test_folding_exhaustive_small() {
        let exprs = ExprManager::new();
        let values = [i32::MIN, -7, -1, 0, 1, 3, 5, i32::MAX];
        for &a in &values {
            for &b in &values {
                let ea = exprs.mk_int32(a);
                let eb = exprs.mk_int32(b);
                assert_eq!(exprs.mk_add(ea, eb), exprs.mk_int32(a.wrapping_add(b)));
                assert_eq!(exprs.mk_sub(ea, eb), exprs.mk_int32(a.wrapping_sub(b)));
                assert_eq!(exprs.mk_eq(ea, eb), exprs.mk_bool(a == b));
                assert_eq!(exprs.mk_slt(ea, eb), exprs.mk_bool(a < b));
                assert_eq!(exprs.mk_ult(ea, eb), exprs.mk_bool((a as u32) < (b as u32)));
            }
        }
    }

    #[test]
    fn test_division_by_zero() {
        let exprs = ExprManager::new();
        let zero = exprs.mk_int32(0);
        let seven = exprs.mk_int32(7);
        let minus_seven = exprs.mk_int32(-7);
        assert_eq!(exprs.mk_udiv(seven, zero), exprs.mk_int32(-1));
        assert_eq!(exprs.mk_sdiv(seven, zero), exprs.mk_int32(-1));
        assert_eq!(exprs.mk_sdiv(minus_seven, zero), exprs.mk_int32(1));
        assert_eq!(exprs.mk_sdiv(minus_seven, exprs.mk_int32(2)), exprs.mk_int32(-3));
        assert_eq!(
            exprs.mk_sdiv(exprs.mk_int32(i32::MIN), exprs.mk_int32(-1)),
            exprs.mk_int32(i32::MIN)
        );
    }

    #[test]
    fn test_not() {
        let exprs = ExprManager::new();
        assert_eq!(exprs.mk_not(exprs.mk_true()), exprs.mk_false());
        assert_eq!(exprs.mk_not(exprs.mk_int32(0)), exprs.mk_int32(-1));
        let x = exprs.mk_symbolic("X");
        assert_eq!(exprs.mk_not(exprs.mk_not(x)), x);
    }

    #[test]
    fn test_create_is_zero() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let cond = exprs.mk_slt(x, exprs.mk_int32(0));
        let neg = exprs.create_is_zero(cond);
        assert_eq!(exprs.kind(neg), Kind::Eq);
        assert_eq!(exprs.kids(neg), vec![cond, exprs.mk_false()]);
        assert_eq!(exprs.create_is_zero(neg), cond);
        assert_eq!(exprs.create_is_zero(exprs.mk_true()), exprs.mk_false());
        assert_eq!(exprs.mk_eq(cond, exprs.mk_true()), cond);
    }

    #[test]
    #[should_panic(expected = "should be i32")]
    fn test_mismatched_widths_panic() {
        let exprs = ExprManager::new();
        exprs.mk_add(exprs.mk_int32(1), exprs.mk_true());
    }

    #[test]
    #[should_panic(expected = "equal widths")]
    fn test_mismatched_compare_panics() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        exprs.mk_eq(x, exprs.mk_true());
    }

    #[test]
    fn test_collect_symbolics_and_evaluate() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let y = exprs.mk_symbolic("Y");
        let e = exprs.mk_add(exprs.mk_mul(y, x), x);
        assert_eq!(exprs.collect_symbolics([e]), vec![y, x]);

        let assignment = HashMap::from([("X".to_string(), 3), ("Y".to_string(), -2)]);
        let value = exprs.evaluate(e, &assignment).unwrap();
        assert_eq!(value, BigUint::from((-3i32) as u32));
        assert_eq!(exprs.evaluate(e, &HashMap::new()), None);
    }

    #[test]
    fn test_render() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let e = exprs.mk_ne(exprs.mk_sdiv(x, exprs.mk_int32(-3)), x);
        assert_eq!(exprs.render(e), "(ne (sdiv X -3) X)");
        assert_eq!(exprs.render(exprs.mk_true()), "true");
        assert_eq!(exprs.constant_i64(exprs.mk_int32(-3)), Some(-3));
    }

    #[test]
    fn test_deep_chain() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let one = exprs.mk_int32(1);
        let mut e = x;
        for _ in 0..50_000 {
            e = exprs.mk_add(e, one);
        }
        let order = exprs.post_order([e]);
        assert_eq!(order.len(), 50_002);
        assert_eq!(order.last(), Some(&e));

        let assignment = HashMap::from([("X".to_string(), -50_000)]);
        assert_eq!(exprs.evaluate(e, &assignment), Some(BigUint::ZERO));
        let rendered = exprs.render(e);
        assert!(rendered.starts_with("(add (add "));
        assert!(rendered.ends_with("X 1) 1)"));
    }
}
