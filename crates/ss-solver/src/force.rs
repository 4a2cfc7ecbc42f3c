//! Forcing specifications that pin steady-state values of selected states.
//!
//! Pinning a state is how a unit root is handled: the unconstrained system has
//! a singular direction, and an extra equation `S[i] - v = 0` anchors it.

use crate::error::{SolverError, SolverResult};
use ss_core::{Real, SymbolGroup, Symbols};
use std::collections::BTreeMap;

/// How the caller pins state values.
#[derive(Clone, Debug, PartialEq)]
pub enum ForceSpec {
    /// One entry per state, in state order. Finite entries are targets,
    /// non-finite entries (NaN) leave the state free.
    Positional(Vec<Real>),
    /// Targets keyed by state symbol name.
    Named(BTreeMap<String, Real>),
}

impl ForceSpec {
    pub fn positional(values: impl Into<Vec<Real>>) -> Self {
        ForceSpec::Positional(values.into())
    }

    pub fn named<S: Into<String>>(targets: impl IntoIterator<Item = (S, Real)>) -> Self {
        ForceSpec::Named(
            targets
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// Resolve the specification against the model's state symbols.
    pub fn normalize(&self, symbols: &Symbols) -> SolverResult<Constraints> {
        let n_states = symbols.len(SymbolGroup::States);
        let mut entries = match self {
            ForceSpec::Positional(values) => {
                if values.len() != n_states {
                    return Err(SolverError::InvalidConstraint {
                        what: format!(
                            "positional force vector has {} entries but the model has {} states",
                            values.len(),
                            n_states
                        ),
                    });
                }
                values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(index, &target)| Constraint { index, target })
                    .collect::<Vec<_>>()
            }
            ForceSpec::Named(targets) => {
                let mut entries = Vec::with_capacity(targets.len());
                for (name, &target) in targets {
                    let index = symbols
                        .index_of(SymbolGroup::States, name)
                        .map_err(|e| SolverError::InvalidConstraint {
                            what: e.to_string(),
                        })?;
                    if !target.is_finite() {
                        return Err(SolverError::InvalidConstraint {
                            what: format!("target for state '{name}' is not finite ({target})"),
                        });
                    }
                    entries.push(Constraint { index, target });
                }
                entries
            }
        };
        entries.sort_by_key(|c| c.index);
        Ok(Constraints { entries })
    }
}

/// A single pinned state: `S[index]` must equal `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constraint {
    pub index: usize,
    pub target: Real,
}

/// Normalized constraints, ordered by state index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Constraints {
    entries: Vec<Constraint>,
}

impl Constraints {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.iter()
    }
}
