//! A straight-forward representation of a DQBF in CNF.

use crate::{
    clause::Clause,
    dqdimacs::{FromDqdimacs, QuantTy},
    literal::{Lit, Var},
};
use miette::Diagnostic;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// An immutable DQBF instance `∀U ∃E·M` where every existential
/// carries its own dependency set `D(e) ⊆ U`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dqbf {
    num_variables: u32,
    universals: Vec<Var>,
    dependencies: BTreeMap<Var, BTreeSet<Var>>,
    matrix: Vec<Clause>,
}

/// Violations of the structural invariants of a [`Dqbf`].
#[derive(Debug, Error, Diagnostic)]
pub enum InstanceError {
    #[error("Variable {var} is bound both universally and existentially")]
    DoublyBound { var: Var },

    #[error("Dependency {dep} of existential {var} is not a universal variable")]
    NonUniversalDependency { var: Var, dep: Var },

    #[error("Matrix variable {var} is not bound by the prefix")]
    UnboundMatrixVariable { var: Var },
}

impl Dqbf {
    pub fn universals(&self) -> &[Var] {
        &self.universals
    }

    /// The declared dependency map; its key set is the set of
    /// existential variables. Iteration is ordered by variable index.
    pub fn dependencies(&self) -> &BTreeMap<Var, BTreeSet<Var>> {
        &self.dependencies
    }

    pub fn dependencies_of(&self, var: Var) -> Option<&BTreeSet<Var>> {
        self.dependencies.get(&var)
    }

    pub fn existentials(&self) -> impl Iterator<Item = Var> + '_ {
        self.dependencies.keys().copied()
    }

    pub fn matrix(&self) -> &[Clause] {
        &self.matrix
    }

    /// Checks the structural invariants: universal and existential
    /// variables are disjoint, every dependency is universal, and
    /// every matrix variable is bound by the prefix.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, in prefix order.
    pub fn validate(&self) -> Result<(), InstanceError> {
        let universals: BTreeSet<Var> = self.universals.iter().copied().collect();
        for (&var, deps) in &self.dependencies {
            if universals.contains(&var) {
                return Err(InstanceError::DoublyBound { var });
            }
            for &dep in deps {
                if !universals.contains(&dep) {
                    return Err(InstanceError::NonUniversalDependency { var, dep });
                }
            }
        }
        for clause in &self.matrix {
            for lit in clause {
                let var = lit.var();
                if !universals.contains(&var) && !self.dependencies.contains_key(&var) {
                    return Err(InstanceError::UnboundMatrixVariable { var });
                }
            }
        }
        Ok(())
    }

    /// Recomputes the declared variable bound from the contents.
    /// Used by the construction macro, which has no header line.
    #[cfg(test)]
    pub(crate) fn seal(&mut self) {
        let bound = self
            .universals
            .iter()
            .copied()
            .chain(self.dependencies.keys().copied())
            .chain(self.dependencies.values().flatten().copied())
            .map(Var::to_dimacs)
            .chain(self.matrix.iter().flatten().map(|lit| lit.var().to_dimacs()))
            .max()
            .unwrap_or_default();
        self.num_variables = bound.try_into().unwrap();
    }
}

impl FromDqdimacs for Dqbf {
    fn set_num_variables(&mut self, variables: u32) {
        self.num_variables = variables;
    }

    fn set_num_clauses(&mut self, _: u32) {}

    fn quantify(&mut self, quant: QuantTy, vars: &[Var]) {
        match quant {
            QuantTy::Forall => self.universals.extend_from_slice(vars),
            QuantTy::Exists => {
                // prefix semantics: the dependency set is the union of
                // all preceding universal blocks
                let scope: BTreeSet<Var> = self.universals.iter().copied().collect();
                for &var in vars {
                    self.dependencies.insert(var, scope.clone());
                }
            }
        }
    }

    fn depend(&mut self, var: Var, on: &[Var]) {
        self.dependencies.insert(var, on.iter().copied().collect());
    }

    fn add_clause(&mut self, lits: &[Lit]) {
        self.matrix.push(Clause::new(lits));
    }
}

impl std::fmt::Display for Dqbf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "p cnf {} {}", self.num_variables, self.matrix.len())?;
        if !self.universals.is_empty() {
            write!(f, "a")?;
            for var in &self.universals {
                write!(f, " {var}")?;
            }
            writeln!(f, " 0")?;
        }
        if !self.dependencies.is_empty() {
            write!(f, "e")?;
            for var in self.dependencies.keys() {
                write!(f, " {var}")?;
            }
            writeln!(f, " 0")?;
        }
        // one explicit dependency line per existential makes the
        // output independent of quantifier interleaving
        for (var, deps) in &self.dependencies {
            write!(f, "d {var}")?;
            for dep in deps {
                write!(f, " {dep}")?;
            }
            writeln!(f, " 0")?;
        }
        for clause in &self.matrix {
            writeln!(f, "{clause}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
macro_rules! dqbf_core {
    ($dqbf:expr,) => {};
    ($dqbf:expr, a $( $x:literal )* ; $($tail:tt)* ) => {
        crate::dqdimacs::FromDqdimacs::quantify(
            &mut $dqbf,
            crate::dqdimacs::QuantTy::Forall,
            &[ $( crate::literal::Var::from_dimacs($x) ),* ],
        );
        dqbf_core![$dqbf, $($tail)*]
    };
    ($dqbf:expr, e $( $x:literal )* ; $($tail:tt)* ) => {
        crate::dqdimacs::FromDqdimacs::quantify(
            &mut $dqbf,
            crate::dqdimacs::QuantTy::Exists,
            &[ $( crate::literal::Var::from_dimacs($x) ),* ],
        );
        dqbf_core![$dqbf, $($tail)*]
    };
    ($dqbf:expr, d $v:literal $( $x:literal )* ; $($tail:tt)* ) => {
        crate::dqdimacs::FromDqdimacs::depend(
            &mut $dqbf,
            crate::literal::Var::from_dimacs($v),
            &[ $( crate::literal::Var::from_dimacs($x) ),* ],
        );
        dqbf_core![$dqbf, $($tail)*]
    };
    ($dqbf:expr, $( $x:literal )* ; $($tail:tt)* ) => {
        crate::dqdimacs::FromDqdimacs::add_clause(
            &mut $dqbf,
            &[ $( crate::literal::Lit::from_dimacs($x) ),* ],
        );
        dqbf_core![$dqbf, $($tail)*]
    };
}

/// Macro that creates a [`Dqbf`] instance from a DQDIMACS-like
/// representation. The main differences are:
/// * No support for comments
/// * No header line
/// * Lines are seperated by `;`, whereas DQDIMACS uses `0`.
///
/// # Example
/// ```ignore
/// let dqbf = dqbf_formula![
///     a 1 2;
///     e 3;
///     d 3 1;
///     1 3;
/// ];
/// ```
#[cfg(test)]
macro_rules! dqbf_formula {
    ($($tail:tt)*) => {{
        let mut dqbf = crate::dqbf::Dqbf::default();
        dqbf_core![dqbf, $($tail)*];
        dqbf.seal();
        dqbf
    }};
}

/// Provides a strategy for randomly generating DQBF instances.
#[cfg(test)]
pub(crate) mod strategy {
    use super::{BTreeSet, Clause, Dqbf, Var};
    use crate::literal::strategy::lit;
    use proptest::{bool, collection, prelude::*};
    use std::ops::Range;

    /// A strategy to generate a DQBF with the provided parameters.
    /// Universals take the low variable indices, existentials follow.
    pub(crate) fn dqbf(
        universals: Range<usize>,
        existentials: Range<usize>,
        clauses: Range<usize>,
        clause_len: Range<usize>,
    ) -> impl Strategy<Value = Dqbf> {
        (universals, existentials)
            .prop_flat_map(move |(num_universals, num_existentials)| {
                let num_vars = num_universals + num_existentials;
                let dep_sets =
                    collection::vec(collection::vec(bool::ANY, num_universals), num_existentials);
                let matrix = collection::vec(
                    collection::vec(
                        lit(0..u32::try_from(num_vars).unwrap()),
                        clause_len.clone(),
                    ),
                    clauses.clone(),
                );
                (dep_sets, matrix).prop_map(move |(dep_sets, matrix)| {
                    let universal_vars: Vec<Var> = (1..=num_universals)
                        .map(|v| Var::from_dimacs(v.try_into().unwrap()))
                        .collect();
                    let dependencies = dep_sets
                        .into_iter()
                        .enumerate()
                        .map(|(idx, mask)| {
                            let var = Var::from_dimacs(
                                (num_universals + idx + 1).try_into().unwrap(),
                            );
                            let deps: BTreeSet<Var> = universal_vars
                                .iter()
                                .zip(mask)
                                .filter_map(|(&u, selected)| selected.then_some(u))
                                .collect();
                            (var, deps)
                        })
                        .collect();
                    Dqbf {
                        num_variables: num_vars.try_into().unwrap(),
                        universals: universal_vars,
                        dependencies,
                        matrix: matrix.iter().map(|lits| Clause::new(lits)).collect(),
                    }
                })
            })
            .no_shrink()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dqbf_macro() {
        let dqbf = dqbf_formula![
            a 1 2;
            e 3 4;
            d 4 2;
            1 3;
            -2 4;
        ];
        assert_eq!(dqbf.matrix().len(), 2);
        assert_eq!(dqbf.universals().len(), 2);
        assert_eq!(
            dqbf.dependencies_of(Var::from_dimacs(3)).unwrap().len(),
            2,
            "prefix semantics"
        );
        assert_eq!(
            dqbf.dependencies_of(Var::from_dimacs(4)).unwrap().iter().collect::<Vec<_>>(),
            [&Var::from_dimacs(2)],
            "explicit override"
        );
        assert!(dqbf.validate().is_ok());
    }

    #[test]
    fn doubly_bound() {
        let dqbf = dqbf_formula![
            a 1;
            e 1;
            1;
        ];
        assert!(matches!(dqbf.validate(), Err(InstanceError::DoublyBound { .. })));
    }

    #[test]
    fn non_universal_dependency() {
        let dqbf = dqbf_formula![
            a 1;
            e 2 3;
            d 3 2;
            3;
        ];
        assert!(matches!(dqbf.validate(), Err(InstanceError::NonUniversalDependency { .. })));
    }

    #[test]
    fn unbound_matrix_variable() {
        let dqbf = dqbf_formula![
            a 1;
            e 2;
            1 2 3;
        ];
        assert!(matches!(dqbf.validate(), Err(InstanceError::UnboundMatrixVariable { .. })));
    }
}
