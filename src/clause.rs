//! Clauses and the pure operations on clause lists that the
//! verification encodings are built from.

use crate::literal::{Lit, Var};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    lits: Vec<Lit>,
}

impl Clause {
    pub fn new(literals: &[Lit]) -> Self {
        Self { lits: literals.to_vec() }
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Lit> {
        self.lits.iter()
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &lit in &self.lits {
            write!(f, "{lit} ")?;
        }
        write!(f, "0")
    }
}

impl<'a> IntoIterator for &'a Clause {
    type Item = &'a Lit;
    type IntoIter = std::slice::Iter<'a, Lit>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The largest DIMACS variable index occurring in `clauses`, or 0 if
/// no literal occurs.
#[must_use]
pub fn max_var(clauses: &[Clause]) -> u32 {
    clauses
        .iter()
        .flatten()
        .map(|lit| u32::try_from(lit.var().to_dimacs()).unwrap())
        .max()
        .unwrap_or(0)
}

/// Applies the injective variable `renaming` to every literal,
/// preserving polarity. Literals whose variable is not in the map are
/// left unchanged.
#[must_use]
pub fn rename(clauses: &[Clause], renaming: &BTreeMap<Var, Var>) -> Vec<Clause> {
    clauses
        .iter()
        .map(|clause| {
            let lits = clause
                .iter()
                .map(|&lit| match renaming.get(&lit.var()) {
                    Some(&target) => lit.on_var(target),
                    None => lit,
                })
                .collect::<Vec<_>>();
            Clause::new(&lits)
        })
        .collect()
}

/// A CNF equisatisfiable with the negation of the conjunction
/// `clauses`, introducing one switch variable per clause starting at
/// `fresh`.
///
/// Switch `aᵢ` implies that clause `Cᵢ` is falsified, and at least one
/// switch is set. Only this backward direction is encoded.
#[must_use]
pub fn negated(clauses: &[Clause], fresh: Var) -> Vec<Clause> {
    let switch =
        |idx: usize| -> Var { fresh.shifted(u32::try_from(idx).expect("clause count fits u32")) };
    let mut result = Vec::with_capacity(clauses.len() + 1);
    for (idx, clause) in clauses.iter().enumerate() {
        for &lit in clause {
            result.push(Clause::new(&[switch(idx).negative(), !lit]));
        }
    }
    let big_clause = (0..clauses.len()).map(|idx| switch(idx).positive()).collect::<Vec<_>>();
    result.push(Clause::new(&big_clause));
    result
}

/// The selector-guarded equality gadget: `switch → (x ↔ y)`.
///
/// Assuming `switch` enables the equality; leaving it open imposes no
/// constraint on `x` and `y`.
#[must_use]
pub fn equality(x: Lit, y: Lit, switch: Var) -> [Clause; 2] {
    [Clause::new(&[switch.negative(), x, !y]), Clause::new(&[switch.negative(), !x, y])]
}
