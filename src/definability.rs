//! Padoa-style implicit definability.
//!
//! Variable `e` is defined by a set `S` under a formula `F` iff two
//! copies of `F` that agree on `S` cannot disagree on `e`. The checker
//! encodes both copies once, wires every shared variable to its copy
//! through a selector-guarded equality, and answers each query with a
//! single incremental SAT call that enables exactly the equalities of
//! the defining set.

use crate::{
    clause::{self, Clause},
    literal::{Lit, Var},
    sat::{varisat::Varisat, SatContext},
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use varisat::solver::SolverError;

/// Answer of a single definability query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Definability {
    Defined,
    /// Values of the defining variables under which the two copies of
    /// the formula disagree on the defined variable.
    Undefined { assignment: Vec<Lit> },
}

/// One long-lived SAT context shared by all queries against the same
/// formula. The context is only ever extended by learned clauses; the
/// enabled equality subset is chosen per call through assumptions.
#[derive(Debug)]
pub(crate) struct DefinabilityChecker<'s> {
    solver: SatContext<Varisat<'s>>,
    renaming: BTreeMap<Var, Var>,
    selectors: BTreeMap<Var, Var>,
}

impl<'s> DefinabilityChecker<'s> {
    /// Encodes `formula` and its renamed copy.
    ///
    /// The tables cover the variables of `formula` and all of
    /// `existentials`, so queries for existentials the formula never
    /// mentions are answerable (and come out undefined).
    pub(crate) fn new(formula: &[Clause], existentials: impl IntoIterator<Item = Var>) -> Self {
        let mut variables: BTreeSet<Var> =
            formula.iter().flatten().map(|lit| lit.var()).collect();
        variables.extend(existentials);
        let max_variable = variables.iter().map(|var| var.to_dimacs()).max().unwrap_or(0);
        let max_variable = u32::try_from(max_variable).unwrap();

        // copies occupy v + max, selectors v + 4·max; everything stays
        // below 5·max
        let renaming: BTreeMap<Var, Var> =
            variables.iter().map(|&var| (var, var.shifted(max_variable))).collect();
        let selectors: BTreeMap<Var, Var> =
            variables.iter().map(|&var| (var, var.shifted(4 * max_variable))).collect();

        let mut clauses = formula.to_vec();
        clauses.extend(clause::rename(formula, &renaming));
        for &var in &variables {
            clauses.extend(clause::equality(
                var.positive(),
                renaming[&var].positive(),
                selectors[&var],
            ));
        }
        debug!(
            "definability context: {} clauses over {} variables",
            clauses.len(),
            variables.len()
        );
        Self { solver: SatContext::with_clauses(&clauses), renaming, selectors }
    }

    /// Is `defined` a function of `defining` under the formula?
    ///
    /// Defining variables without a selector (they occur neither in
    /// the formula nor among the existentials) cannot constrain the
    /// copies and are skipped.
    ///
    /// # Errors
    ///
    /// Propagates SAT backend failures.
    pub(crate) fn check(
        &mut self,
        defining: &BTreeSet<Var>,
        defined: Var,
    ) -> Result<Definability, SolverError> {
        let mut assumptions: Vec<Lit> = defining
            .iter()
            .filter_map(|var| self.selectors.get(var))
            .map(|&selector| selector.positive())
            .collect();
        // the copies agree on the defining set but disagree on the
        // defined variable
        let renamed =
            *self.renaming.get(&defined).expect("defined variable is covered by the renaming");
        assumptions.push(defined.positive());
        assumptions.push(renamed.negative());

        if self.solver.solve(&assumptions)? {
            let model = self.solver.model().expect("model exists after satisfiable solve");
            let assignment =
                model.into_iter().filter(|lit| defining.contains(&lit.var())).collect();
            Ok(Definability::Undefined { assignment })
        } else {
            Ok(Definability::Defined)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn clause(lits: &[i32]) -> Clause {
        Clause::new(&lits.iter().map(|&l| Lit::from_dimacs(l)).collect::<Vec<_>>())
    }

    fn vars(indices: &[i32]) -> BTreeSet<Var> {
        indices.iter().map(|&v| Var::from_dimacs(v)).collect()
    }

    fn existentials(indices: &[i32]) -> Vec<Var> {
        indices.iter().map(|&v| Var::from_dimacs(v)).collect()
    }

    #[test]
    fn negation_is_defined() -> Result<(), SolverError> {
        // 2 ↔ ¬1
        let formula = [clause(&[2, 1]), clause(&[-2, -1])];
        let mut checker = DefinabilityChecker::new(&formula, existentials(&[2]));
        assert_eq!(checker.check(&vars(&[1]), Var::from_dimacs(2))?, Definability::Defined);
        Ok(())
    }

    #[test]
    fn xor_needs_both_inputs() -> Result<(), SolverError> {
        // 3 ↔ 1 ⊕ 2
        let formula = [
            clause(&[-3, 1, 2]),
            clause(&[-3, -1, -2]),
            clause(&[3, -1, 2]),
            clause(&[3, 1, -2]),
        ];
        let mut checker = DefinabilityChecker::new(&formula, existentials(&[3]));
        assert_eq!(checker.check(&vars(&[1, 2]), Var::from_dimacs(3))?, Definability::Defined);
        // the same context answers further queries incrementally
        let Definability::Undefined { assignment } =
            checker.check(&vars(&[1]), Var::from_dimacs(3))?
        else {
            panic!("3 is not a function of 1 alone");
        };
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment[0].var(), Var::from_dimacs(1));
        let Definability::Undefined { .. } = checker.check(&vars(&[2]), Var::from_dimacs(3))?
        else {
            panic!("3 is not a function of 2 alone");
        };
        Ok(())
    }

    #[test]
    fn unconstrained_variable_is_undefined() -> Result<(), SolverError> {
        // the formula never mentions existential 2
        let formula = [clause(&[1])];
        let mut checker = DefinabilityChecker::new(&formula, existentials(&[2]));
        let Definability::Undefined { assignment } =
            checker.check(&vars(&[1]), Var::from_dimacs(2))?
        else {
            panic!("an unconstrained variable has no definition");
        };
        assert_eq!(assignment, [Lit::from_dimacs(1)]);
        Ok(())
    }

    #[test]
    fn empty_formula() -> Result<(), SolverError> {
        let mut checker = DefinabilityChecker::new(&[], existentials(&[2]));
        assert!(matches!(
            checker.check(&vars(&[1]), Var::from_dimacs(2))?,
            Definability::Undefined { .. }
        ));
        Ok(())
    }

    #[test]
    fn defined_by_another_existential() -> Result<(), SolverError> {
        // 2 ↔ 1 and 3 ↔ 2: variable 3 is a function of 2 alone
        let formula =
            [clause(&[-2, 1]), clause(&[2, -1]), clause(&[-3, 2]), clause(&[3, -2])];
        let mut checker = DefinabilityChecker::new(&formula, existentials(&[2, 3]));
        assert_eq!(checker.check(&vars(&[2]), Var::from_dimacs(3))?, Definability::Defined);
        assert_eq!(checker.check(&vars(&[1]), Var::from_dimacs(2))?, Definability::Defined);
        Ok(())
    }
}
