//! Implementation of the SAT backend for (varisat)[https://crates.io/crates/varisat].

use super::{SatSolver, SatSolverLit};
use varisat::ExtendFormula;

pub(crate) struct Varisat<'a> {
    solver: varisat::Solver<'a>,
    /// DIMACS index of the most recently allocated variable
    last_var: isize,
    model: Vec<varisat::Lit>,
}

impl<'a> SatSolver for Varisat<'a> {
    type Lit = varisat::Lit;
    type Err = varisat::solver::SolverError;

    fn add_variable(&mut self) -> Self::Lit {
        self.last_var += 1;
        varisat::Lit::from_dimacs(self.last_var)
    }

    fn add_clause(&mut self, lits: &[Self::Lit]) {
        self.solver.add_clause(lits);
    }

    fn solve_with_assumptions(&mut self, assumptions: &[Self::Lit]) -> Result<bool, Self::Err> {
        self.solver.assume(assumptions);
        let result = self.solver.solve()?;
        Ok(result)
    }

    fn model(&mut self) -> Option<&[Self::Lit]> {
        self.model = self.solver.model()?;
        Some(&self.model)
    }
}

impl<'a> Default for Varisat<'a> {
    fn default() -> Self {
        Self { solver: varisat::Solver::new(), last_var: 0, model: Vec::default() }
    }
}

impl SatSolverLit for varisat::Lit {}
