//! The model contract consumed by the steady-state solver.
//!
//! A model is described by ordered symbol groups, a calibration that assigns a
//! value to every state, control and parameter, and two pure functions:
//!
//! - `transition(s, x, e, p) -> s'`
//! - `arbitrage(s, x, s', x', p) -> r`, one residual per control
//!
//! Parsing model files and computing calibrations happen elsewhere; this module
//! only fixes the typed shape of the data handed to the solver.

use crate::{Real, SsError, SsResult, ensure_all_finite};
use core::fmt;
use core::str::FromStr;

/// Named group of model symbols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum SymbolGroup {
    States,
    Controls,
    Shocks,
    Parameters,
}

impl SymbolGroup {
    pub const ALL: [SymbolGroup; 4] = [
        SymbolGroup::States,
        SymbolGroup::Controls,
        SymbolGroup::Shocks,
        SymbolGroup::Parameters,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolGroup::States => "states",
            SymbolGroup::Controls => "controls",
            SymbolGroup::Shocks => "shocks",
            SymbolGroup::Parameters => "parameters",
        }
    }
}

impl fmt::Display for SymbolGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolGroup {
    type Err = SsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SymbolGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == s)
            .ok_or_else(|| SsError::InvalidArg {
                what: format!("unknown symbol group '{s}'"),
            })
    }
}

/// Ordered symbol names per group. Positions define vector indices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Symbols {
    pub states: Vec<String>,
    pub controls: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub shocks: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parameters: Vec<String>,
}

impl Symbols {
    pub fn new<S: Into<String>>(
        states: impl IntoIterator<Item = S>,
        controls: impl IntoIterator<Item = S>,
        shocks: impl IntoIterator<Item = S>,
        parameters: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            states: states.into_iter().map(Into::into).collect(),
            controls: controls.into_iter().map(Into::into).collect(),
            shocks: shocks.into_iter().map(Into::into).collect(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    pub fn names(&self, group: SymbolGroup) -> &[String] {
        match group {
            SymbolGroup::States => &self.states,
            SymbolGroup::Controls => &self.controls,
            SymbolGroup::Shocks => &self.shocks,
            SymbolGroup::Parameters => &self.parameters,
        }
    }

    pub fn len(&self, group: SymbolGroup) -> usize {
        self.names(group).len()
    }

    /// Position of `name` inside `group`.
    pub fn index_of(&self, group: SymbolGroup, name: &str) -> SsResult<usize> {
        self.names(group)
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SsError::UnknownSymbol {
                group,
                name: name.to_string(),
            })
    }
}

/// Calibrated values for states, controls and parameters.
///
/// The calibrated states and controls double as the initial guess of the
/// steady-state search.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Calibration {
    pub states: Vec<Real>,
    pub controls: Vec<Real>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parameters: Vec<Real>,
}

impl Calibration {
    pub fn new(states: Vec<Real>, controls: Vec<Real>, parameters: Vec<Real>) -> Self {
        Self {
            states,
            controls,
            parameters,
        }
    }

    /// Calibrated vector for `group`. Shocks carry no calibration.
    pub fn get(&self, group: SymbolGroup) -> Option<&[Real]> {
        match group {
            SymbolGroup::States => Some(&self.states),
            SymbolGroup::Controls => Some(&self.controls),
            SymbolGroup::Parameters => Some(&self.parameters),
            SymbolGroup::Shocks => None,
        }
    }

    /// Checks that every calibrated group matches its symbol count and holds
    /// finite values only.
    pub fn validate(&self, symbols: &Symbols) -> SsResult<()> {
        for group in [
            SymbolGroup::States,
            SymbolGroup::Controls,
            SymbolGroup::Parameters,
        ] {
            let values = self.get(group).unwrap_or_default();
            let expected = symbols.len(group);
            if values.len() != expected {
                return Err(SsError::InvalidArg {
                    what: format!(
                        "calibration has {} {} values but the model declares {} symbols",
                        values.len(),
                        group,
                        expected
                    ),
                });
            }
            ensure_all_finite(values, "calibration")?;
        }
        Ok(())
    }
}

/// A discrete-time model with transition and arbitrage equations.
///
/// Implementations must be pure: identical inputs give identical outputs.
pub trait Model {
    fn symbols(&self) -> &Symbols;

    fn calibration(&self) -> &Calibration;

    /// Next-period states `S(s, x, e, p)`; one entry per state.
    fn transition(&self, s: &[Real], x: &[Real], e: &[Real], p: &[Real]) -> SsResult<Vec<Real>>;

    /// Equilibrium residuals `r(s, x, S, X, p)`; one entry per control.
    fn arbitrage(
        &self,
        s: &[Real],
        x: &[Real],
        s_next: &[Real],
        x_next: &[Real],
        p: &[Real],
    ) -> SsResult<Vec<Real>>;
}

impl<M: Model + ?Sized> Model for &M {
    fn symbols(&self) -> &Symbols {
        (**self).symbols()
    }

    fn calibration(&self) -> &Calibration {
        (**self).calibration()
    }

    fn transition(&self, s: &[Real], x: &[Real], e: &[Real], p: &[Real]) -> SsResult<Vec<Real>> {
        (**self).transition(s, x, e, p)
    }

    fn arbitrage(
        &self,
        s: &[Real],
        x: &[Real],
        s_next: &[Real],
        x_next: &[Real],
        p: &[Real],
    ) -> SsResult<Vec<Real>> {
        (**self).arbitrage(s, x, s_next, x_next, p)
    }
}

/// A [`Model`] assembled from two closures.
pub struct FnModel<T, A> {
    symbols: Symbols,
    calibration: Calibration,
    transition: T,
    arbitrage: A,
}

impl<T, A> FnModel<T, A>
where
    T: Fn(&[Real], &[Real], &[Real], &[Real]) -> SsResult<Vec<Real>>,
    A: Fn(&[Real], &[Real], &[Real], &[Real], &[Real]) -> SsResult<Vec<Real>>,
{
    /// Create a model, rejecting calibrations that do not fit the symbols.
    pub fn new(
        symbols: Symbols,
        calibration: Calibration,
        transition: T,
        arbitrage: A,
    ) -> SsResult<Self> {
        calibration.validate(&symbols)?;
        Ok(Self {
            symbols,
            calibration,
            transition,
            arbitrage,
        })
    }

    /// Replace the calibration, e.g. to start from a different guess.
    pub fn with_calibration(mut self, calibration: Calibration) -> SsResult<Self> {
        calibration.validate(&self.symbols)?;
        self.calibration = calibration;
        Ok(self)
    }
}

impl<T, A> Model for FnModel<T, A>
where
    T: Fn(&[Real], &[Real], &[Real], &[Real]) -> SsResult<Vec<Real>>,
    A: Fn(&[Real], &[Real], &[Real], &[Real], &[Real]) -> SsResult<Vec<Real>>,
{
    fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    fn transition(&self, s: &[Real], x: &[Real], e: &[Real], p: &[Real]) -> SsResult<Vec<Real>> {
        (self.transition)(s, x, e, p)
    }

    fn arbitrage(
        &self,
        s: &[Real],
        x: &[Real],
        s_next: &[Real],
        x_next: &[Real],
        p: &[Real],
    ) -> SsResult<Vec<Real>> {
        (self.arbitrage)(s, x, s_next, x_next, p)
    }
}

impl<T, A> fmt::Debug for FnModel<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel")
            .field("symbols", &self.symbols)
            .field("calibration", &self.calibration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> Symbols {
        Symbols::new(["z", "k"], ["i"], ["e_z"], ["rho", "delta"])
    }

    #[test]
    fn symbol_group_parses_names() {
        for group in SymbolGroup::ALL {
            assert_eq!(group.as_str().parse::<SymbolGroup>().unwrap(), group);
        }
        assert!("exogenous".parse::<SymbolGroup>().is_err());
    }

    #[test]
    fn index_of_follows_declaration_order() {
        let symbols = symbols();
        assert_eq!(symbols.index_of(SymbolGroup::States, "k").unwrap(), 1);
        assert_eq!(symbols.len(SymbolGroup::Parameters), 2);

        let err = symbols.index_of(SymbolGroup::States, "w").unwrap_err();
        assert_eq!(
            err,
            SsError::UnknownSymbol {
                group: SymbolGroup::States,
                name: "w".to_string()
            }
        );
        assert!(format!("{err}").contains("states"));
    }

    #[test]
    fn calibration_validation_checks_lengths() {
        let symbols = symbols();
        let good = Calibration::new(vec![0.0, 4.0], vec![0.4], vec![0.9, 0.1]);
        assert!(good.validate(&symbols).is_ok());
        assert!(good.get(SymbolGroup::Shocks).is_none());

        let short = Calibration::new(vec![0.0], vec![0.4], vec![0.9, 0.1]);
        let err = short.validate(&symbols).unwrap_err();
        assert!(matches!(err, SsError::InvalidArg { .. }));
    }

    #[test]
    fn calibration_validation_rejects_nan() {
        let symbols = symbols();
        let bad = Calibration::new(vec![0.0, Real::NAN], vec![0.4], vec![0.9, 0.1]);
        assert!(matches!(
            bad.validate(&symbols),
            Err(SsError::NonFinite { .. })
        ));
    }

    #[test]
    fn fn_model_dispatches_to_closures() {
        let model = FnModel::new(
            symbols(),
            Calibration::new(vec![0.0, 4.0], vec![0.4], vec![0.9, 0.1]),
            |s: &[Real], x: &[Real], e: &[Real], p: &[Real]| {
                Ok(vec![p[0] * s[0] + e[0], (1.0 - p[1]) * s[1] + x[0]])
            },
            |_s: &[Real], x: &[Real], _sn: &[Real], xn: &[Real], _p: &[Real]| {
                Ok(vec![x[0] - xn[0]])
            },
        )
        .unwrap();

        let next = model
            .transition(&[1.0, 4.0], &[0.4], &[0.0], &[0.9, 0.1])
            .unwrap();
        assert_eq!(next, vec![0.9, 4.0 * 0.9 + 0.4]);

        let by_ref: &dyn Model = &model;
        let r = by_ref
            .arbitrage(&[1.0, 4.0], &[0.4], &[1.0, 4.0], &[0.4], &[0.9, 0.1])
            .unwrap();
        assert_eq!(r, vec![0.0]);

        let restarted = model
            .with_calibration(Calibration::new(vec![0.0, 5.0], vec![0.5], vec![0.9, 0.1]))
            .unwrap();
        assert_eq!(restarted.calibration().states, vec![0.0, 5.0]);
        assert!(
            restarted
                .with_calibration(Calibration::new(vec![0.0], vec![0.5], vec![0.9, 0.1]))
                .is_err()
        );
    }
}
