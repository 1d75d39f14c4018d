//! Extended dependency sets.
//!
//! An existential may additionally observe every other existential
//! whose declared scope is strictly contained in its own, with ties on
//! equal scopes broken towards the smaller variable index. Membership
//! therefore induces a strict order on the existentials.

use crate::literal::Var;
use std::collections::{BTreeMap, BTreeSet};

pub(crate) type DependencyMap = BTreeMap<Var, BTreeSet<Var>>;

/// Computes `D*(e) = D(e) ∪ { v ∈ E | D(v) ⊊ D(e) ∨ (D(v) = D(e) ∧ v < e) }`
/// for every existential `e` in `declared`.
pub(crate) fn extended_dependencies(declared: &DependencyMap) -> DependencyMap {
    let mut extended = declared.clone();
    let existentials: Vec<Var> = declared.keys().copied().collect();
    for (idx, &smaller) in existentials.iter().enumerate() {
        for &larger in &existentials[idx + 1..] {
            let smaller_deps = &declared[&smaller];
            let larger_deps = &declared[&larger];
            if smaller_deps.is_subset(larger_deps) {
                // equal scopes land here as well: the tie goes to the
                // smaller variable index
                extended.get_mut(&larger).unwrap().insert(smaller);
            } else if larger_deps.is_subset(smaller_deps) {
                extended.get_mut(&smaller).unwrap().insert(larger);
            }
        }
    }
    extended
}
