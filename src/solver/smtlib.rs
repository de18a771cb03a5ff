//! SMT-LIB 2 rendering of queries, for the `.smt2` test-case artifact.
//!
//! Queries are rendered in `QF_BV`: 32-bit values become `(_ BitVec 32)`,
//! booleans become `Bool`. Each internal expression node is emitted once as a
//! `define-fun`, so shared subterms stay shared in the script.

use std::fmt::Write as _;

use super::Query;
use crate::expr::{low_u64, ExprManager, ExprNode};
use crate::reference::ExprRef;
use crate::types::{BinaryOp, CmpOp, Width};

fn sort(width: Width) -> String {
    if width.is_bool() {
        "Bool".to_string()
    } else {
        format!("(_ BitVec {})", width.bits())
    }
}

fn quote(name: &str) -> String {
    format!("|{}|", name)
}

/// Term naming `e`: leaves inline, internal nodes by their definition.
fn term(exprs: &ExprManager, e: ExprRef) -> String {
    match exprs.node(e) {
        ExprNode::Constant { value, width } => {
            if width.is_bool() {
                (low_u64(&value) != 0).to_string()
            } else {
                format!("(_ bv{} {})", value, width.bits())
            }
        }
        ExprNode::Symbolic { name, .. } => quote(&name),
        _ => format!("e{}", e.index()),
    }
}

fn definition(exprs: &ExprManager, e: ExprRef) -> Option<String> {
    let body = match exprs.node(e) {
        ExprNode::Constant { .. } | ExprNode::Symbolic { .. } => return None,
        ExprNode::Not { expr, width } => {
            let op = if width.is_bool() { "not" } else { "bvnot" };
            format!("({} {})", op, term(exprs, expr))
        }
        ExprNode::Binary { op, left, right, .. } => {
            let op = match op {
                BinaryOp::Add => "bvadd",
                BinaryOp::Sub => "bvsub",
                BinaryOp::Mul => "bvmul",
                BinaryOp::UDiv => "bvudiv",
                BinaryOp::SDiv => "bvsdiv",
            };
            format!("({} {} {})", op, term(exprs, left), term(exprs, right))
        }
        ExprNode::Compare { op, left, right } => {
            let op = match op {
                CmpOp::Eq => "=",
                CmpOp::Ne => "distinct",
                CmpOp::Ult => "bvult",
                CmpOp::Ule => "bvule",
                CmpOp::Ugt => "bvugt",
                CmpOp::Uge => "bvuge",
                CmpOp::Slt => "bvslt",
                CmpOp::Sle => "bvsle",
                CmpOp::Sgt => "bvsgt",
                CmpOp::Sge => "bvsge",
            };
            format!("({} {} {})", op, term(exprs, left), term(exprs, right))
        }
    };
    Some(format!(
        "(define-fun e{} () {} {})",
        e.index(),
        sort(exprs.width(e)),
        body
    ))
}

/// Render a satisfiability script for `constraints && !expr`, asking for the
/// values of `objects` when the answer is `sat`.
pub fn render_query(query: &Query, objects: &[ExprRef]) -> String {
    let exprs = query.exprs;
    let mut out = String::new();
    out.push_str("(set-option :produce-models true)\n");
    out.push_str("(set-logic QF_BV)\n");

    let roots: Vec<ExprRef> = query.roots().chain(objects.iter().copied()).collect();
    for s in exprs.collect_symbolics(roots.iter().copied()) {
        let name = exprs.symbol_name(s).unwrap_or_default();
        let _ = writeln!(
            out,
            "(declare-fun {} () {})",
            quote(&name),
            sort(exprs.width(s))
        );
    }
    for e in exprs.post_order(roots.iter().copied()) {
        if let Some(def) = definition(exprs, e) {
            out.push_str(&def);
            out.push('\n');
        }
    }
    for c in query.constraints.iter() {
        let _ = writeln!(out, "(assert {})", term(exprs, c));
    }
    let _ = writeln!(out, "(assert (not {}))", term(exprs, query.expr));
    out.push_str("(check-sat)\n");
    if !objects.is_empty() {
        let terms: Vec<String> = objects.iter().map(|&e| term(exprs, e)).collect();
        let _ = writeln!(out, "(get-value ({}))", terms.join(" "));
    }
    out.push_str("(exit)\n");
    out
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::constraints::ConstraintSet;

    #[test]
    fn test_render_query() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let y = exprs.mk_sub(x, exprs.mk_int32(5));
        let lt = exprs.mk_slt(y, exprs.mk_int32(0));
        let constraints: ConstraintSet = [lt].into_iter().collect();
        let q = Query::new(&exprs, &constraints, exprs.mk_false());
        let script = render_query(&q, &[x]);
        let expected = format!(
            "(set-option :produce-models true)\n\
             (set-logic QF_BV)\n\
             (declare-fun |X| () (_ BitVec 32))\n\
             (define-fun e{y} () (_ BitVec 32) (bvsub |X| (_ bv5 32)))\n\
             (define-fun e{lt} () Bool (bvslt e{y} (_ bv0 32)))\n\
             (assert e{lt})\n\
             (assert (not false))\n\
             (check-sat)\n\
             (get-value (|X|))\n\
             (exit)\n",
            y = y.index(),
            lt = lt.index()
        );
        assert_eq!(script, expected);
    }

    #[test]
    fn test_shared_subterms_defined_once() {
        let exprs = ExprManager::new();
        let x = exprs.mk_symbolic("X");
        let s = exprs.mk_add(x, x);
        let p = exprs.mk_mul(s, s);
        let c = exprs.mk_eq(p, s);
        let constraints = ConstraintSet::new();
        let q = Query::new(&exprs, &constraints, c);
        let script = render_query(&q, &[]);
        assert_eq!(script.matches(&format!("(define-fun e{} ", s.index())).count(), 1);
        assert!(!script.contains("get-value"));
    }
}
