//! AIGER candidate models.
//!
//! An AIGER model is lowered to an equivalent CNF by external tools;
//! the certifier then runs on the resulting clause set without a
//! per-variable partition. Simplification through `abc` is attempted
//! when the tool is available and silently skipped otherwise.

use crate::{
    clause::Clause,
    dimacs::ParseError,
    dqdimacs::{DqdimacsParser, FromDqdimacs, QuantTy},
    literal::{Lit, Var},
};
use miette::Diagnostic;
use std::{
    ffi::OsStr,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Diagnostic)]
pub enum AigError {
    #[error("Cannot invoke `{}`", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("`{}` exited with {status}", binary.display())]
    ToolFailed { binary: PathBuf, status: std::process::ExitStatus },

    #[error("Cannot prepare the AIG working directory")]
    WorkingDir(#[from] std::io::Error),

    #[error("Cannot parse the generated CNF")]
    Cnf(#[from] ParseError),
}

/// Lowers an AIGER candidate model to an equivalent clause set.
/// Implementations are process wrappers; the trait exists so tests
/// can substitute them.
pub trait AigToCnf {
    /// Produces the CNF of the model at `model`; `binary_format`
    /// distinguishes `.aig` from ASCII `.aag` input.
    ///
    /// # Errors
    ///
    /// Returns an error if a required tool cannot be run or its
    /// output cannot be parsed.
    fn lower(&self, model: &Path, binary_format: bool) -> Result<Vec<Clause>, AigError>;
}

/// Collects the plain-DIMACS output of `aig2cnf`; quantifier and
/// dependency lines do not occur there.
#[derive(Debug, Default)]
struct CnfSink {
    clauses: Vec<Clause>,
}

impl FromDqdimacs for CnfSink {
    fn set_num_variables(&mut self, _: u32) {}

    fn set_num_clauses(&mut self, _: u32) {}

    fn quantify(&mut self, _: QuantTy, _: &[Var]) {}

    fn depend(&mut self, _: Var, _: &[Var]) {}

    fn add_clause(&mut self, lits: &[Lit]) {
        self.clauses.push(Clause::new(lits));
    }
}

/// The aiger/abc tool chain, looked up in the build tree next to the
/// working directory with a PATH fallback.
#[derive(Debug, Clone)]
pub struct AigerPipeline {
    aigtoaig: PathBuf,
    abc: Option<PathBuf>,
    aig2cnf: PathBuf,
}

impl Default for AigerPipeline {
    fn default() -> Self {
        Self {
            aigtoaig: locate("./build/aiger-1.9.9/aigtoaig", "aigtoaig"),
            // simplification is optional and only used when the build
            // tree provides abc
            abc: Path::new("./build/abc/abc")
                .is_file()
                .then(|| PathBuf::from("./build/abc/abc")),
            aig2cnf: locate("./build/src/aig2cnf", "aig2cnf"),
        }
    }
}

fn locate(relative: &str, name: &str) -> PathBuf {
    let relative = Path::new(relative);
    if relative.is_file() {
        relative.to_path_buf()
    } else {
        PathBuf::from(name)
    }
}

fn run_tool(binary: &Path, args: &[&OsStr]) -> Result<(), AigError> {
    debug!("run {} {:?}", binary.display(), args);
    let status = Command::new(binary)
        .args(args)
        .status()
        .map_err(|err| AigError::Spawn { binary: binary.to_path_buf(), err })?;
    if !status.success() {
        return Err(AigError::ToolFailed { binary: binary.to_path_buf(), status });
    }
    Ok(())
}

impl AigToCnf for AigerPipeline {
    fn lower(&self, model: &Path, binary_format: bool) -> Result<Vec<Clause>, AigError> {
        // all intermediate files live in a directory that is removed
        // on every path out of this function
        let workdir = tempfile::tempdir()?;
        let mut current = model.to_path_buf();
        if !binary_format {
            let converted = workdir.path().join("model.aig");
            run_tool(&self.aigtoaig, &[current.as_os_str(), converted.as_os_str()])?;
            current = converted;
        }
        if let Some(abc) = &self.abc {
            let simplified = workdir.path().join("model_simplified.aig");
            let script = format!(
                "read {}; dc2; dc2; dc2; fraig; write {}",
                current.display(),
                simplified.display()
            );
            let outcome = Command::new(abc)
                .arg("-c")
                .arg(&script)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            match outcome {
                Ok(status) if status.success() => current = simplified,
                Ok(status) => warn!("abc exited with {status}, continuing unsimplified"),
                Err(err) => warn!("cannot invoke abc ({err}), continuing unsimplified"),
            }
        }
        let dimacs = workdir.path().join("model.dimacs");
        run_tool(&self.aig2cnf, &[current.as_os_str(), dimacs.as_os_str()])?;
        let reader = BufReader::new(File::open(&dimacs)?);
        let sink: CnfSink = DqdimacsParser::new(reader).parse()?;
        debug!("lowered AIG model to {} clauses", sink.clauses.len());
        Ok(sink.clauses)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn cnf_sink_collects_clauses() -> Result<(), ParseError> {
        let sink: CnfSink =
            DqdimacsParser::new(Cursor::new("p cnf 3 2\n1 -2 0\n3 0\n")).parse()?;
        assert_eq!(sink.clauses.len(), 2);
        assert_eq!(sink.clauses[1], Clause::new(&[Lit::from_dimacs(3)]));
        Ok(())
    }

    #[test]
    fn missing_tool_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.aag");
        std::fs::write(&model, "aag 0 0 0 0 0\n").unwrap();
        let pipeline = AigerPipeline {
            aigtoaig: PathBuf::from("/nonexistent/aigtoaig"),
            abc: None,
            aig2cnf: PathBuf::from("/nonexistent/aig2cnf"),
        };
        assert!(matches!(pipeline.lower(&model, false), Err(AigError::Spawn { .. })));
    }
}
