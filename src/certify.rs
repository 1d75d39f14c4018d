//! The verification engine.
//!
//! Composes the scope, consistency, definability, and matrix checks
//! over a shared clause database. The check order is meaningful: later
//! checks assume the earlier ones passed (the matrix check, for
//! instance, treats auxiliary variables as freely existential, which
//! the consistency check justified).

use crate::{
    clause::Clause,
    definability::{Definability, DefinabilityChecker},
    deps::{self, DependencyMap},
    dqbf::Dqbf,
    literal::{Lit, LitSlice, Var},
    model::CandidateModel,
    qbf2::{self, OracleError, Qbf2Solver},
    sat::{varisat::Varisat, SatContext},
};
use miette::Diagnostic;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info};


/// Which checks to run. Scope, consistency, and definability can be
/// disabled individually; the matrix check always runs.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub check_scope: bool,
    pub check_consistency: bool,
    pub check_defined: bool,
    /// Permit the extended dependency sets instead of the declared
    /// ones, both for scope and for definability.
    pub extended_dependencies: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            check_scope: true,
            check_consistency: true,
            check_defined: true,
            extended_dependencies: true,
        }
    }
}

/// Fatal failures of the engine itself. An invalid model is *not* an
/// error; it is reported as a [`Refutation`].
#[derive(Debug, Error, Diagnostic)]
pub enum CertifyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Oracle(#[from] OracleError),

    #[error("The SAT backend failed")]
    Solver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Why the candidate model was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refutation {
    /// The model for `var` reads observable variables outside its
    /// permitted scope.
    ScopeViolation { var: Var, offending: Vec<Var> },
    /// The model clauses are unsatisfiable, or some universal
    /// assignment admits no satisfying extension.
    Inconsistent,
    /// The model does not uniquely define `var` from its defining
    /// set; `assignment` values the defining variables in a way that
    /// leaves `var` open.
    Undefined { var: Var, assignment: Vec<Lit> },
    /// A matrix clause is falsified by a satisfying assignment of the
    /// model.
    FalsifiedClause {
        clause: Clause,
        universal: Vec<Lit>,
        existential: Vec<Lit>,
        auxiliary: Vec<Lit>,
    },
}

impl std::fmt::Display for Refutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Refutation::ScopeViolation { var, offending } => {
                write!(f, "The model for variable {var} contains the invalid variables:")?;
                for offender in offending {
                    write!(f, " {offender}")?;
                }
                Ok(())
            }
            Refutation::Inconsistent => write!(f, "Model inconsistent"),
            Refutation::Undefined { var, assignment } => {
                write!(f, "The model does not uniquely define variable {var}")?;
                if !assignment.is_empty() {
                    write!(f, " under the assignment {}", LitSlice::from(&assignment[..]))?;
                }
                Ok(())
            }
            Refutation::FalsifiedClause { clause, universal, existential, auxiliary } => {
                writeln!(f, "Falsified clause: {clause}")?;
                writeln!(f, "Universal assignment: {}", LitSlice::from(&universal[..]))?;
                writeln!(f, "Existential assignment: {}", LitSlice::from(&existential[..]))?;
                write!(f, "Auxiliary assignment: {}", LitSlice::from(&auxiliary[..]))
            }
        }
    }
}

/// Variables of the observable set that `function` reads even though
/// they are outside the permitted set, sorted by index. Variables
/// outside the observable set (pure auxiliaries) are unrestricted.
pub(crate) fn scope_violations(
    function: &[Clause],
    observable: &BTreeSet<Var>,
    permitted: &BTreeSet<Var>,
) -> Vec<Var> {
    let mut offending = BTreeSet::new();
    for clause in function {
        for lit in clause {
            let var = lit.var();
            if observable.contains(&var) && !permitted.contains(&var) {
                offending.insert(var);
            }
        }
    }
    offending.into_iter().collect()
}

/// Top-level driver tying the checks together.
pub struct Certifier<'a, Q> {
    dqbf: &'a Dqbf,
    model: &'a CandidateModel,
    oracle: Q,
    options: Options,
}

impl<'a, Q: Qbf2Solver> Certifier<'a, Q> {
    pub fn new(dqbf: &'a Dqbf, model: &'a CandidateModel, oracle: Q, options: Options) -> Self {
        Self { dqbf, model, oracle, options }
    }

    /// Runs the verification pipeline.
    ///
    /// `Ok(None)` means the model certifies the truth of the DQBF;
    /// `Ok(Some(_))` carries the first refutation found.
    ///
    /// # Errors
    ///
    /// Oracle failures and SAT backend failures are fatal.
    pub fn run(&self) -> Result<Option<Refutation>, CertifyError> {
        let universals: BTreeSet<Var> = self.dqbf.universals().iter().copied().collect();
        let existentials: BTreeSet<Var> = self.dqbf.existentials().collect();

        let dependencies: DependencyMap = if self.options.extended_dependencies {
            deps::extended_dependencies(self.dqbf.dependencies())
        } else {
            self.dqbf.dependencies().clone()
        };

        // a model without a per-variable partition (the AIG path) has
        // nothing for the scope and definability checks to look at
        if self.options.check_scope && self.model.has_partition() {
            let observable: BTreeSet<Var> = universals.union(&existentials).copied().collect();
            for (&var, defining) in &dependencies {
                let Some(function) = self.model.function(var) else {
                    continue;
                };
                let mut permitted = defining.clone();
                permitted.insert(var);
                let offending = scope_violations(function, &observable, &permitted);
                if !offending.is_empty() {
                    return Ok(Some(Refutation::ScopeViolation { var, offending }));
                }
            }
            debug!("scope check passed");
        }

        // the matrix context doubles as a global satisfiability check:
        // an unsatisfiable model cannot certify anything
        let mut matrix_context: SatContext<Varisat> =
            SatContext::with_clauses(self.model.clauses());
        if !self.solve(&mut matrix_context, &[])? {
            return Ok(Some(Refutation::Inconsistent));
        }

        let auxiliaries: BTreeSet<Var> = self
            .model
            .clauses()
            .iter()
            .flatten()
            .map(|lit| lit.var())
            .filter(|var| !universals.contains(var) && !existentials.contains(var))
            .collect();

        if self.options.check_consistency {
            // auxiliaries sit below the existentials in the quantifier
            // order, which the ∀∃ query flattens into one block
            let outer: BTreeSet<Var> = existentials.union(&auxiliaries).copied().collect();
            let consistent = qbf2::check_forall_exists(
                self.model.clauses(),
                &universals,
                &outer,
                &[],
                &self.oracle,
            )?;
            if !consistent {
                return Ok(Some(Refutation::Inconsistent));
            }
            debug!("consistency check passed");
        }

        if self.options.check_defined && self.model.has_partition() {
            let mut checker =
                DefinabilityChecker::new(self.model.clauses(), existentials.iter().copied());
            for (&var, defining) in &dependencies {
                match checker
                    .check(defining, var)
                    .map_err(|err| CertifyError::Solver(Box::new(err)))?
                {
                    Definability::Defined => {}
                    Definability::Undefined { assignment } => {
                        return Ok(Some(Refutation::Undefined { var, assignment }));
                    }
                }
            }
            debug!("definability check passed");
        }

        for clause in self.dqbf.matrix() {
            // the negated clause is a conjunction of unit assumptions
            let negated: Vec<Lit> = clause.iter().map(|&lit| !lit).collect();
            if self.solve(&mut matrix_context, &negated)? {
                let assignment =
                    matrix_context.model().expect("model exists after satisfiable solve");
                let restrict = |set: &BTreeSet<Var>| {
                    assignment.iter().copied().filter(|lit| set.contains(&lit.var())).collect()
                };
                return Ok(Some(Refutation::FalsifiedClause {
                    clause: clause.clone(),
                    universal: restrict(&universals),
                    existential: restrict(&existentials),
                    auxiliary: restrict(&auxiliaries),
                }));
            }
        }
        info!("all checks passed");
        Ok(None)
    }

    fn solve(
        &self,
        context: &mut SatContext<Varisat>,
        assumptions: &[Lit],
    ) -> Result<bool, CertifyError> {
        context.solve(assumptions).map_err(|err| CertifyError::Solver(Box::new(err)))
    }
}
