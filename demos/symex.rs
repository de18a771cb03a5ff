use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use log::info;
use symex_rs::config::{ExecutorConfig, SearchStrategy, SolverKind};
use symex_rs::executor::{Executor, TRAP};
use symex_rs::program::{BlockId, FunctionBuilder, Operand, Program};
use symex_rs::types::{BinaryOp, CmpOp, Width};

#[derive(Parser)]
#[command(author, version, about = "Symbolic execution of small programs")]
struct Cli {
    /// Solver backend
    #[arg(short, long, value_enum, default_value_t = Backend::Bitblast)]
    backend: Backend,

    /// Directory that receives the result_N run directories
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Also write the path condition of each test case as SMT-LIB 2
    #[arg(long)]
    dump_smt: bool,

    /// Also write a human-readable log for each test case
    #[arg(long)]
    write_log: bool,

    /// Check every model against its query
    #[arg(long)]
    validate: bool,

    /// Per-query timeout of the z3 backend
    #[arg(long, value_name = "MS", default_value_t = 10_000)]
    timeout_ms: u64,

    /// Scheduling of live states
    #[arg(long, value_enum, default_value_t = Search::Interleaved)]
    search: Search,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, ValueEnum)]
enum Backend {
    Dummy,
    Tiny,
    Bitblast,
    Z3,
}

#[derive(Copy, Clone, ValueEnum)]
enum Search {
    Interleaved,
    RunToCompletion,
}

#[derive(Copy, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for simplelog::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => simplelog::LevelFilter::Error,
            LogLevel::Warn => simplelog::LevelFilter::Warn,
            LogLevel::Info => simplelog::LevelFilter::Info,
            LogLevel::Debug => simplelog::LevelFilter::Debug,
            LogLevel::Trace => simplelog::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one of the built-in programs
    Example {
        #[arg(value_enum)]
        name: Example,
    },

    /// Run a program given as JSON
    Run {
        program: PathBuf,

        /// Entry function
        #[arg(long, default_value = "main")]
        entry: String,
    },
}

#[derive(Copy, Clone, ValueEnum)]
enum Example {
    /// `X - 5 < 0`, two paths
    Branch,
    /// Two stores to one slot, then a load
    LastWrite,
    /// `X + 3 == 10`, suited to the tiny backend
    Equality,
    /// Traps when `X == 42`
    Trap,
}

fn branch_program() -> Program {
    let mut b = FunctionBuilder::new("main");
    let entry = b.block("entry");
    let x = b.alloca(Width::INT32);
    b.make_symbolic(x, 4, "X");
    let v = b.load(x);
    let y = b.binary(BinaryOp::Sub, v, 5);
    let c = b.cmp(CmpOp::Slt, y, 0);
    let neg = b.block("neg");
    b.ret(Some(Operand::Int(1)));
    let pos = b.block("pos");
    b.ret(Some(Operand::Int(0)));
    b.switch_to(entry);
    b.cond_br(c, neg, pos);
    Program::new(vec![b.build()])
}

fn last_write_program() -> Program {
    let mut b = FunctionBuilder::new("main");
    b.block("entry");
    let slot = b.alloca(Width::INT32);
    b.store(1, slot, Width::INT32);
    b.store(2, slot, Width::INT32);
    let v = b.load(slot);
    b.ret(Some(v.into()));
    Program::new(vec![b.build()])
}

fn equality_program() -> Program {
    let mut b = FunctionBuilder::new("main");
    let entry = b.block("entry");
    let x = b.alloca(Width::INT32);
    b.make_symbolic(x, 4, "X");
    let v = b.load(x);
    let y = b.binary(BinaryOp::Add, v, 3);
    let c = b.cmp(CmpOp::Eq, y, 10);
    let hit = b.block("hit");
    b.ret(Some(Operand::Int(1)));
    let miss = b.block("miss");
    b.ret(Some(Operand::Int(0)));
    b.switch_to(entry);
    b.cond_br(c, hit, miss);
    Program::new(vec![b.build()])
}

fn trap_program() -> Program {
    let mut b = FunctionBuilder::new("main");
    b.block("entry");
    let x = b.alloca(Width::INT32);
    b.make_symbolic(x, 4, "X");
    let v = b.load(x);
    let c = b.cmp(CmpOp::Eq, v, 42);
    let bad = b.block("bad");
    b.call(TRAP, vec![]);
    b.unreachable();
    let good = b.block("good");
    b.ret(None);
    b.switch_to(BlockId(0));
    b.cond_br(c, bad, good);
    Program::new(vec![b.build()])
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    simplelog::TermLogger::init(
        cli.log_level.into(),
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut config = ExecutorConfig::default();
    config.solver.kind = match cli.backend {
        Backend::Dummy => SolverKind::Dummy,
        Backend::Tiny => SolverKind::Tiny,
        Backend::Bitblast => SolverKind::BitBlast,
        Backend::Z3 => SolverKind::Z3,
    };
    config.solver.validate_models = cli.validate;
    config.solver.z3.timeout = Duration::from_millis(cli.timeout_ms);
    config.output.root = cli.output;
    config.output.dump_smt = cli.dump_smt;
    config.output.write_log = cli.write_log;
    config.search = match cli.search {
        Search::Interleaved => SearchStrategy::Interleaved,
        Search::RunToCompletion => SearchStrategy::RunToCompletion,
    };

    let (program, entry) = match cli.command {
        Commands::Example { name } => {
            let program = match name {
                Example::Branch => branch_program(),
                Example::LastWrite => last_write_program(),
                Example::Equality => equality_program(),
                Example::Trap => trap_program(),
            };
            (program, "main".to_string())
        }
        Commands::Run { program, entry } => {
            info!("Loading program from {:?}", program);
            let text = fs::read_to_string(&program)?;
            let program: Program = serde_json::from_str(&text)?;
            (program, entry)
        }
    };

    let mut executor = Executor::new(config);
    let summary = executor.run(&program, &entry)?;

    println!(
        "{} test cases, {} instructions, {} forks",
        summary.test_cases.len(),
        summary.instructions,
        summary.forks
    );
    for tc in &summary.test_cases {
        let inputs: Vec<String> = tc.inputs.iter().map(|(n, v)| format!("{} = {}", n, v)).collect();
        println!("  #{} {}: {}", tc.id, tc.termination, inputs.join(", "));
    }
    if let Some(dir) = &summary.run_dir {
        println!("Written to {}", dir.display());
    }

    Ok(())
}
