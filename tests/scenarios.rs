use std::fs;
use std::path::Path;

use test_log::test;

use symex_rs::config::{ExecutorConfig, OutputConfig, SolverKind};
use symex_rs::error::{ExecError, SemanticsError};
use symex_rs::executor::Executor;
use symex_rs::program::{FunctionBuilder, InstId, InstKind, Program};
use symex_rs::solver::{DummySolver, Solver, SolverError};
use symex_rs::testcase::Termination;
use symex_rs::types::{BinaryOp, CmpOp, Width};

fn config(root: &Path, kind: SolverKind) -> ExecutorConfig {
    let mut config = ExecutorConfig::default();
    config.solver.kind = kind;
    config.solver.validate_models = true;
    config.output = OutputConfig {
        root: root.to_path_buf(),
        ..OutputConfig::default()
    };
    config
}

/// `X` symbolic; `Y = X - 5`; branch on `Y < 0`.
fn scenario_a() -> Program {
    let mut b = FunctionBuilder::new("main");
    let entry = b.block("entry");
    let x = b.alloca(Width::INT32);
    b.make_symbolic(x, 4, "X");
    let v = b.load(x);
    let y = b.binary(BinaryOp::Sub, v, 5);
    let c = b.cmp(CmpOp::Slt, y, 0);
    let neg = b.block("neg");
    b.ret(None);
    let pos = b.block("pos");
    b.ret(None);
    b.switch_to(entry);
    b.cond_br(c, neg, pos);
    Program::new(vec![b.build()])
}

fn read_inputs(path: &Path) -> Vec<(String, i32)> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let (name, value) = line.split_once(", ").unwrap();
            (name.to_string(), value.parse().unwrap())
        })
        .collect()
}

#[test]
fn scenario_a_two_paths() {
    let tmp = tempfile::tempdir().unwrap();
    let mut executor = Executor::new(config(tmp.path(), SolverKind::BitBlast));
    let summary = executor.run(&scenario_a(), "main").unwrap();
    assert_eq!(summary.test_cases.len(), 2);
    assert_eq!(summary.forks, 1);

    let dir = tmp.path().join("result_1");
    assert_eq!(summary.run_dir.as_deref(), Some(dir.as_path()));
    let mut xs = Vec::new();
    for (i, tc) in summary.test_cases.iter().enumerate() {
        assert_eq!(tc.id as usize, i + 1);
        assert_eq!(tc.termination, Termination::Normal);
        assert_eq!(tc.path, dir.join(format!("test_case_{}.normal", i + 1)));
        let inputs = read_inputs(&tc.path);
        assert_eq!(inputs, tc.inputs);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].0, "X");
        xs.push(inputs[0].1);
    }
    assert!(xs[0] < 5, "then-path should have X < 5, got {}", xs[0]);
    assert!(xs[1] >= 5, "else-path should have X >= 5, got {}", xs[1]);
}

#[test]
fn scenario_a_with_z3() {
    let tmp = tempfile::tempdir().unwrap();
    let mut executor = Executor::new(config(tmp.path(), SolverKind::Z3));
    let summary = executor.run(&scenario_a(), "main").unwrap();
    assert_eq!(summary.test_cases.len(), 2);
    assert!(summary.test_cases[0].inputs[0].1 < 5);
    assert!(summary.test_cases[1].inputs[0].1 >= 5);
    for tc in &summary.test_cases {
        assert_eq!(read_inputs(&tc.path), tc.inputs);
    }
}

#[test]
fn scenario_a_second_run_gets_fresh_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let program = scenario_a();
    Executor::new(config(tmp.path(), SolverKind::BitBlast))
        .run(&program, "main")
        .unwrap();
    let summary = Executor::new(config(tmp.path(), SolverKind::BitBlast))
        .run(&program, "main")
        .unwrap();
    assert_eq!(summary.run_dir, Some(tmp.path().join("result_2")));
    assert_eq!(summary.test_cases[0].id, 1);
}

#[test]
fn scenario_b_last_write_wins() {
    let tmp = tempfile::tempdir().unwrap();
    let mut b = FunctionBuilder::new("main");
    b.block("entry");
    let slot = b.alloca(Width::INT32);
    b.store(1, slot, Width::INT32);
    b.store(2, slot, Width::INT32);
    let v = b.load(slot);
    let c = b.cmp(CmpOp::Eq, v, 2);
    let ok = b.block("ok");
    b.ret(Some(v.into()));
    let bad = b.block("bad");
    b.call("trap", vec![]);
    b.unreachable();
    b.switch_to(symex_rs::program::BlockId(0));
    b.cond_br(c, ok, bad);
    let program = Program::new(vec![b.build()]);

    let mut executor = Executor::new(config(tmp.path(), SolverKind::Tiny));
    let summary = executor.run(&program, "main").unwrap();
    // The comparison folds to `true`, so there is exactly one path.
    assert_eq!(summary.forks, 0);
    assert_eq!(summary.test_cases.len(), 1);
    assert_eq!(summary.test_cases[0].termination, Termination::Normal);
    assert_eq!(fs::read_to_string(&summary.test_cases[0].path).unwrap(), "");
}

#[test]
fn scenario_c_load_before_store() {
    let tmp = tempfile::tempdir().unwrap();
    let mut b = FunctionBuilder::new("main");
    b.block("entry");
    let slot = b.alloca(Width::INT32);
    b.load(slot);
    b.ret(None);
    let program = Program::new(vec![b.build()]);

    let mut executor = Executor::new(config(tmp.path(), SolverKind::BitBlast));
    match executor.run(&program, "main") {
        Err(ExecError::Semantics { kind, inst, .. }) => {
            assert_eq!(kind, SemanticsError::LoadBeforeStore(slot));
            assert_eq!(inst, "%1 = load %0");
        }
        other => panic!("expected a load-before-store error, got {:?}", other),
    }
    assert!(fs::read_dir(tmp.path()).unwrap().next().is_none());
}

#[test]
fn scenario_d_dummy_solver_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let mut b = FunctionBuilder::new("main");
    b.block("entry");
    let x = b.alloca(Width::INT32);
    b.make_symbolic(x, 4, "X");
    b.ret(None);
    let program = Program::new(vec![b.build()]);

    let mut executor = Executor::with_solver(
        config(tmp.path(), SolverKind::Dummy),
        Solver::new(Box::new(DummySolver)),
    );
    let err = executor.run(&program, "main").unwrap_err();
    assert!(matches!(
        err,
        ExecError::Solver {
            source: SolverError::Failed(_),
            ..
        }
    ));
    assert!(fs::read_dir(tmp.path()).unwrap().next().is_none());
}

#[test]
fn program_from_json() {
    let program = scenario_a();
    let json = serde_json::to_string_pretty(&program).unwrap();
    assert!(json.contains("\"op\": \"make_symbolic\""));
    let parsed: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, program);
    assert!(matches!(
        parsed.functions[0].blocks[0].instructions[0].kind,
        InstKind::Alloca { width } if width == Width::INT32
    ));
    assert_eq!(parsed.functions[0].blocks[0].instructions[0].id, InstId(0));

    let tmp = tempfile::tempdir().unwrap();
    let summary = Executor::new(config(tmp.path(), SolverKind::BitBlast))
        .run(&parsed, "main")
        .unwrap();
    assert_eq!(summary.test_cases.len(), 2);
}
