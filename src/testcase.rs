//! Test-case artifacts.
//!
//! Each run writes into a fresh `result_N` directory, created on the first
//! emitted test case. Every terminated path produces
//! `test_case_<id>.<normal|error>` with one `name, value` line per symbolic
//! input. Files are written under a temporary name and renamed into place, so
//! a failure never leaves a partial test case behind.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::OutputConfig;
use crate::error::ExecError;
use crate::state::StateId;

/// How a path ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Termination {
    /// `ret` from the entry function.
    Normal,
    /// A `trap` call or `unreachable`.
    Error,
}

impl Termination {
    pub fn suffix(self) -> &'static str {
        match self {
            Termination::Normal => "normal",
            Termination::Error => "error",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// An emitted test case.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TestCase {
    pub id: u32,
    pub state: StateId,
    pub termination: Termination,
    /// Symbolic inputs and their concrete values, in creation order.
    pub inputs: Vec<(String, i32)>,
    pub path: PathBuf,
}

/// Optional debugging companions of a test case.
#[derive(Debug, Clone, Default)]
pub struct Extras {
    pub smt: Option<String>,
    pub log: Option<String>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExecError + '_ {
    move |source| ExecError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `contents` to `path` atomically.
fn write_atomic(path: &Path, contents: &str) -> Result<(), ExecError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let res = fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(contents.as_bytes())?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&tmp, path));
    if let Err(source) = res {
        let _ = fs::remove_file(&tmp);
        return Err(io_error(path)(source));
    }
    Ok(())
}

#[derive(Debug)]
pub struct TestCaseWriter {
    config: OutputConfig,
    run_dir: Option<PathBuf>,
    num_tests: u32,
}

impl TestCaseWriter {
    pub fn new(config: OutputConfig) -> Self {
        Self {
            config,
            run_dir: None,
            num_tests: 0,
        }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// The run directory, once the first test case has been written.
    pub fn run_dir(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }

    pub fn num_tests(&self) -> u32 {
        self.num_tests
    }

    fn ensure_run_dir(&mut self) -> Result<PathBuf, ExecError> {
        if let Some(dir) = &self.run_dir {
            return Ok(dir.clone());
        }
        let root = &self.config.root;
        fs::create_dir_all(root).map_err(io_error(root))?;
        let mut n = 1;
        let dir = loop {
            let candidate = root.join(format!("result_{}", n));
            match fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(io_error(&candidate)(e)),
            }
        };
        info!("Writing test cases to {}", dir.display());
        self.run_dir = Some(dir.clone());
        Ok(dir)
    }

    /// Write one test case and its requested companions.
    pub fn write(
        &mut self,
        state: StateId,
        termination: Termination,
        inputs: Vec<(String, i32)>,
        extras: Extras,
    ) -> Result<TestCase, ExecError> {
        let dir = self.ensure_run_dir()?;
        let id = self.num_tests + 1;
        let stem = format!("test_case_{}", id);

        let mut contents = String::new();
        for (name, value) in &inputs {
            contents.push_str(&format!("{}, {}\n", name, value));
        }
        let path = dir.join(format!("{}.{}", stem, termination.suffix()));

        let mut files = Vec::new();
        if let (true, Some(smt)) = (self.config.dump_smt, extras.smt) {
            files.push((dir.join(format!("{}.smt2", stem)), smt));
        }
        if let (true, Some(log)) = (self.config.write_log, extras.log) {
            files.push((dir.join(format!("{}.log", stem)), log));
        }
        // The test case itself goes last, so it never exists without its companions.
        files.push((path.clone(), contents));

        for (i, (file, text)) in files.iter().enumerate() {
            if let Err(e) = write_atomic(file, text) {
                for (written, _) in &files[..i] {
                    let _ = fs::remove_file(written);
                }
                return Err(e);
            }
        }

        self.num_tests = id;
        info!("Test case written successfully ({})", path.display());
        Ok(TestCase {
            id,
            state,
            termination,
            inputs,
            path,
        })
    }
}
