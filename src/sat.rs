//! Generic SAT solver interface that supports incremental solving

use derivative::Derivative;

use crate::{clause::Clause, datastructure::VarVec, literal::Lit};

pub(crate) mod varisat;

/// Incremental SAT solver backend.
///
/// We assume variables to be index-based, such that mapping from
/// [`crate::literal::Lit`] to [`SatSolver::Lit`] is cheap.
pub(crate) trait SatSolver: Default {
    type Lit: SatSolverLit;
    type Err: std::error::Error + Send + Sync + 'static;

    fn add_variable(&mut self) -> Self::Lit;
    fn add_clause(&mut self, lits: &[Self::Lit]);
    fn solve_with_assumptions(&mut self, assumptions: &[Self::Lit]) -> Result<bool, Self::Err>;
    fn model(&mut self) -> Option<&[Self::Lit]>;
}

pub(crate) trait SatSolverLit: Copy + Eq + std::ops::Not<Output = Self> {}

/// An incremental SAT context over instance literals.
///
/// Backend variables are allocated on first use, so the context only
/// ever knows the variables that occurred in its clauses or
/// assumptions, and [`SatContext::model`] is restricted to exactly
/// those. Learned clauses accumulate across `solve` calls.
#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct SatContext<S: SatSolver> {
    #[derivative(Debug = "ignore")]
    solver: S,
    #[derivative(Debug = "ignore")]
    var_lookup: VarVec<Option<S::Lit>>,
}

impl<S: SatSolver> Default for SatContext<S> {
    fn default() -> Self {
        Self { solver: Default::default(), var_lookup: VarVec::default() }
    }
}

impl<S: SatSolver> SatContext<S> {
    /// Constructs a context preloaded with the `bootstrap` clauses.
    pub(crate) fn with_clauses(bootstrap: &[Clause]) -> Self {
        let mut context = Self::default();
        for clause in bootstrap {
            context.add_clause(clause);
        }
        context
    }

    pub(crate) fn add_clause(&mut self, clause: &Clause) {
        let lits = clause.iter().map(|&lit| self.lookup(lit)).collect::<Vec<_>>();
        self.solver.add_clause(&lits);
    }

    /// Incremental solving call under `assumptions`.
    ///
    /// # Errors
    ///
    /// Backend failures are propagated; callers treat them as fatal.
    pub(crate) fn solve(&mut self, assumptions: &[Lit]) -> Result<bool, S::Err> {
        let assumptions = assumptions.iter().map(|&lit| self.lookup(lit)).collect::<Vec<_>>();
        self.solver.solve_with_assumptions(&assumptions)
    }

    /// The satisfying assignment of the preceding [`SatContext::solve`]
    /// call, restricted to the variables present in the context.
    pub(crate) fn model(&mut self) -> Option<Vec<Lit>> {
        let model = self.solver.model()?;
        Some(
            self.var_lookup
                .iter()
                .filter_map(|(var, &mapped)| {
                    let mapped = mapped?;
                    if model.contains(&mapped) {
                        Some(Lit::positive(var))
                    } else if model.contains(&!mapped) {
                        Some(Lit::negative(var))
                    } else {
                        None
                    }
                })
                .collect(),
        )
    }

    fn lookup(&mut self, lit: Lit) -> S::Lit {
        self.var_lookup.grow_for(lit.var());
        let sat_lit =
            *self.var_lookup[lit.var()].get_or_insert_with(|| self.solver.add_variable());
        if lit.is_negative() {
            !sat_lit
        } else {
            sat_lit
        }
    }
}

#[cfg(test)]
mod test {
    use super::{varisat::Varisat, *};
    use crate::literal::Lit;

    fn clause(lits: &[i32]) -> Clause {
        Clause::new(&lits.iter().map(|&l| Lit::from_dimacs(l)).collect::<Vec<_>>())
    }

    #[test]
    fn bootstrap_and_incremental_solve() -> Result<(), Box<dyn std::error::Error>> {
        // implication chain 1 -> 2 -> 3 -> 1
        let mut context: SatContext<Varisat> =
            SatContext::with_clauses(&[clause(&[-1, 2]), clause(&[-2, 3])]);
        assert!(context.solve(&[])?);

        context.add_clause(&clause(&[-3, 1]));
        assert!(context.solve(&[])?);

        let model = context.model().unwrap();
        let all = |lits: &[i32]| lits.iter().all(|&l| model.contains(&Lit::from_dimacs(l)));
        assert!(all(&[1, 2, 3]) || all(&[-1, -2, -3]));

        // assumption-scoped solving does not pollute the context
        assert!(!context.solve(&[Lit::from_dimacs(1), Lit::from_dimacs(-3)])?);
        assert!(context.solve(&[])?);
        Ok(())
    }

    #[test]
    fn model_is_restricted_to_context_variables() -> Result<(), Box<dyn std::error::Error>> {
        let mut context: SatContext<Varisat> = SatContext::with_clauses(&[clause(&[5])]);
        assert!(context.solve(&[])?);
        let model = context.model().unwrap();
        assert_eq!(model, [Lit::from_dimacs(5)]);
        Ok(())
    }
}
