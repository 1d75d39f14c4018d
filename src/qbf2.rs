//! The ∀∃-QBF oracle.
//!
//! The oracle decides instances of the form `∀U ∃E · F` by handing a
//! QDIMACS file to an external engine. The engine is untrusted: an
//! UNSAT answer comes with a universal counterexample assignment which
//! is re-checked against the instance through the SAT facade.

use crate::{
    clause::{self, Clause},
    literal::{Lit, LitSlice, Var},
    sat::{varisat::Varisat, SatContext},
};
use miette::Diagnostic;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    process::Command,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Diagnostic)]
pub enum OracleError {
    #[error("Cannot invoke the QBF engine `{}`", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("Cannot prepare the QDIMACS working file")]
    WorkingFile(#[from] std::io::Error),

    #[error("The QBF engine produced unparseable output")]
    UnparseableOutput,

    #[error("Variable {var} of the query is neither universal nor existential")]
    FreeVariable { var: Var },

    #[error("The QBF engine returned an UNSAT certificate that does not falsify the instance")]
    SelfCheckFailed,

    #[error("The SAT backend failed during the certificate check")]
    Solver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A closed 2QBF instance `∀ universals ∃ existentials · clauses`.
#[derive(Debug, Clone)]
pub struct TwoQbf {
    pub universals: Vec<Var>,
    pub existentials: Vec<Var>,
    pub clauses: Vec<Clause>,
}

impl TwoQbf {
    fn num_variables(&self) -> u32 {
        self.universals
            .iter()
            .chain(&self.existentials)
            .map(|var| u32::try_from(var.to_dimacs()).unwrap())
            .max()
            .unwrap_or(0)
            .max(clause::max_var(&self.clauses))
    }
}

impl std::fmt::Display for TwoQbf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "p cnf {} {}", self.num_variables(), self.clauses.len())?;
        if !self.universals.is_empty() {
            write!(f, "a")?;
            for var in &self.universals {
                write!(f, " {var}")?;
            }
            writeln!(f, " 0")?;
        }
        if !self.existentials.is_empty() {
            write!(f, "e")?;
            for var in &self.existentials {
                write!(f, " {var}")?;
            }
            writeln!(f, " 0")?;
        }
        for clause in &self.clauses {
            writeln!(f, "{clause}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qbf2Result {
    Sat,
    /// The universal assignment under which no existential extension
    /// satisfies the clauses.
    Unsat { certificate: Vec<Lit> },
}

/// External ∀∃-QBF backend. Implementations are process wrappers; the
/// trait exists so tests can substitute a local decision procedure.
pub trait Qbf2Solver {
    /// Decides the given instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be invoked or its
    /// output cannot be interpreted.
    fn solve(&self, instance: &TwoQbf) -> Result<Qbf2Result, OracleError>;
}

/// The CADET engine, invoked with certificate output enabled.
#[derive(Debug, Clone)]
pub struct Cadet {
    binary: PathBuf,
}

impl Default for Cadet {
    fn default() -> Self {
        // prefer the build tree next to the working directory, fall
        // back to a PATH lookup
        let relative = Path::new("./build/cadet/cadet");
        let binary =
            if relative.is_file() { relative.to_path_buf() } else { PathBuf::from("cadet") };
        Self { binary }
    }
}

impl Qbf2Solver for Cadet {
    fn solve(&self, instance: &TwoQbf) -> Result<Qbf2Result, OracleError> {
        // the working directory lives until the end of this call, on
        // every path out of it
        let workdir = tempfile::tempdir()?;
        let qdimacs = workdir.path().join("instance.qdimacs");
        std::fs::write(&qdimacs, instance.to_string())?;
        let output = Command::new(&self.binary)
            .arg("--qbfcert")
            .arg(&qdimacs)
            .output()
            .map_err(|err| OracleError::Spawn { binary: self.binary.clone(), err })?;
        debug!("QBF engine exited with {:?}", output.status.code());
        if output.status.code() == Some(20) {
            let certificate =
                parse_certificate(&output.stdout).ok_or(OracleError::UnparseableOutput)?;
            debug!("UNSAT certificate: {}", LitSlice::from(&certificate[..]));
            Ok(Qbf2Result::Unsat { certificate })
        } else {
            Ok(Qbf2Result::Sat)
        }
    }
}

/// The certificate literals follow the leading token of the fourth
/// stdout line; a `0` token terminates the sequence.
fn parse_certificate(stdout: &[u8]) -> Option<Vec<Lit>> {
    let text = String::from_utf8_lossy(stdout);
    let line = text.lines().nth(3)?;
    line.split_whitespace()
        .skip(1)
        .take_while(|&token| token != "0")
        .map(|token| token.parse::<i32>().ok().filter(|&lit| lit != 0).map(Lit::from_dimacs))
        .collect()
}

/// Decides `∀ universals ∃ existentials · clauses` under
/// `assumptions`.
///
/// Clauses satisfied by an assumption are dropped and literals negated
/// by one are removed, so the oracle only sees the reduced instance.
/// Every remaining variable must be declared universal or existential.
/// An UNSAT answer is only accepted after its certificate has been
/// shown to falsify the reduced clause set.
///
/// # Errors
///
/// Propagates oracle failures; a certificate that does not check out
/// is [`OracleError::SelfCheckFailed`].
pub(crate) fn check_forall_exists(
    clauses: &[Clause],
    universals: &BTreeSet<Var>,
    existentials: &BTreeSet<Var>,
    assumptions: &[Lit],
    oracle: &impl Qbf2Solver,
) -> Result<bool, OracleError> {
    let reduced = reduce_under_assumptions(clauses, assumptions);
    debug!("oracle query: {} clauses after reduction", reduced.len());
    for clause in &reduced {
        for lit in clause {
            let var = lit.var();
            if !universals.contains(&var) && !existentials.contains(&var) {
                return Err(OracleError::FreeVariable { var });
            }
        }
    }
    let instance = TwoQbf {
        universals: universals.iter().copied().collect(),
        existentials: existentials.iter().copied().collect(),
        clauses: reduced,
    };
    match oracle.solve(&instance)? {
        Qbf2Result::Sat => Ok(true),
        Qbf2Result::Unsat { certificate } => {
            let mut checker: SatContext<Varisat> = SatContext::with_clauses(&instance.clauses);
            let satisfiable = checker
                .solve(&certificate)
                .map_err(|err| OracleError::Solver(Box::new(err)))?;
            if satisfiable {
                return Err(OracleError::SelfCheckFailed);
            }
            Ok(false)
        }
    }
}

/// Drops clauses satisfied by an assumption and removes literals whose
/// negation is assumed.
pub(crate) fn reduce_under_assumptions(clauses: &[Clause], assumptions: &[Lit]) -> Vec<Clause> {
    let assumed: BTreeSet<Lit> = assumptions.iter().copied().collect();
    clauses
        .iter()
        .filter(|clause| !clause.iter().any(|lit| assumed.contains(lit)))
        .map(|clause| {
            let lits = clause
                .iter()
                .copied()
                .filter(|lit| !assumed.contains(&!*lit))
                .collect::<Vec<_>>();
            Clause::new(&lits)
        })
        .collect()
}
