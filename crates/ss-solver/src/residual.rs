//! Steady-state residual assembly.
//!
//! The unknown vector is `z = [s, x]` (states first, controls second). The
//! residual mirrors that layout:
//!
//! ```text
//! [ S(s, x, e, p) - s ]   ns rows: states are a fixed point of the transition
//! [ r(s, x, s, x, p)  ]   nx rows: arbitrage holds with s' = s, x' = x
//! [ S[i] - v_i        ]   one row per pinned state
//! ```
//!
//! With pinned states the system has more equations than unknowns and is
//! solved in the least-squares sense.

use crate::error::{SolverError, SolverResult};
use crate::force::{Constraints, ForceSpec};
use nalgebra::DVector;
use ss_core::{Model, Real, SymbolGroup, ensure_all_finite};

/// The steady-state equations of a model for fixed shocks and parameters.
///
/// Everything the residual depends on besides `z` is captured here once and
/// never mutated, so evaluation is a pure function of `z`.
pub struct SteadyStateEquations<'m, M: Model + ?Sized> {
    model: &'m M,
    n_states: usize,
    n_controls: usize,
    shocks: Vec<Real>,
    parameters: Vec<Real>,
    constraints: Constraints,
}

impl<'m, M: Model + ?Sized> SteadyStateEquations<'m, M> {
    /// Validate inputs and capture the per-call configuration.
    ///
    /// `shocks = None` means the zero vector. All input errors are reported
    /// here, before the model is evaluated.
    pub fn new(
        model: &'m M,
        shocks: Option<&[Real]>,
        force: Option<&ForceSpec>,
    ) -> SolverResult<Self> {
        let symbols = model.symbols();
        let calibration = model.calibration();
        calibration.validate(symbols)?;

        let n_shocks = symbols.len(SymbolGroup::Shocks);
        let shocks = match shocks {
            None => vec![0.0; n_shocks],
            Some(e) => {
                if e.len() != n_shocks {
                    return Err(SolverError::shape("shock vector", n_shocks, e.len()));
                }
                ensure_all_finite(e, "shock")?;
                e.to_vec()
            }
        };

        let constraints = match force {
            Some(spec) => spec.normalize(symbols)?,
            None => Constraints::none(),
        };

        Ok(Self {
            model,
            n_states: symbols.len(SymbolGroup::States),
            n_controls: symbols.len(SymbolGroup::Controls),
            shocks,
            parameters: calibration.parameters.clone(),
            constraints,
        })
    }

    /// Length of `z`.
    pub fn unknowns(&self) -> usize {
        self.n_states + self.n_controls
    }

    /// Length of the residual vector.
    pub fn equations(&self) -> usize {
        self.unknowns() + self.constraints.len()
    }

    pub fn shocks(&self) -> &[Real] {
        &self.shocks
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Calibrated states followed by calibrated controls.
    pub fn initial_guess(&self) -> DVector<Real> {
        let calibration = self.model.calibration();
        DVector::from_iterator(
            self.unknowns(),
            calibration
                .states
                .iter()
                .chain(calibration.controls.iter())
                .copied(),
        )
    }

    /// Split `z` at `ns` into `(states, controls)`.
    pub fn split(&self, z: &DVector<Real>) -> (Vec<Real>, Vec<Real>) {
        let (s, x) = z.as_slice().split_at(self.n_states);
        (s.to_vec(), x.to_vec())
    }

    /// Evaluate the residual at `z`.
    pub fn residual(&self, z: &DVector<Real>) -> SolverResult<DVector<Real>> {
        if z.len() != self.unknowns() {
            return Err(SolverError::shape("unknown vector", self.unknowns(), z.len()));
        }
        let (s, x) = z.as_slice().split_at(self.n_states);
        let p = &self.parameters;

        let next = self.model.transition(s, x, &self.shocks, p)?;
        if next.len() != self.n_states {
            return Err(SolverError::shape(
                "transition output",
                self.n_states,
                next.len(),
            ));
        }

        let arbitrage = self.model.arbitrage(s, x, s, x, p)?;
        if arbitrage.len() != self.n_controls {
            return Err(SolverError::shape(
                "arbitrage output",
                self.n_controls,
                arbitrage.len(),
            ));
        }

        let transition_gap = next.iter().zip(s).map(|(s_next, s_now)| s_next - s_now);
        let pinned = self
            .constraints
            .iter()
            .map(|c| next[c.index] - c.target);

        Ok(DVector::from_iterator(
            self.equations(),
            transition_gap.chain(arbitrage.iter().copied()).chain(pinned),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ss_core::{Calibration, FnModel, SsError, SsResult, Symbols};

    fn savings_model() -> impl Model {
        // b' = (1 + r) b + y - c ; arbitrage is c - c' (beta (1 + r) = 1)
        FnModel::new(
            Symbols::new(["b"], ["c"], ["y_shock"], ["r", "y"]),
            Calibration::new(vec![0.5], vec![1.0], vec![0.04, 1.0]),
            |s: &[Real], x: &[Real], e: &[Real], p: &[Real]| -> SsResult<Vec<Real>> {
                Ok(vec![(1.0 + p[0]) * s[0] + p[1] + e[0] - x[0]])
            },
            |_s: &[Real], x: &[Real], _sn: &[Real], xn: &[Real], _p: &[Real]| -> SsResult<Vec<Real>> {
                Ok(vec![x[0] - xn[0]])
            },
        )
        .unwrap()
    }

    #[test]
    fn residual_layout_is_transition_then_arbitrage() {
        let model = savings_model();
        let eq = SteadyStateEquations::new(&model, None, None).unwrap();
        assert_eq!(eq.unknowns(), 2);
        assert_eq!(eq.equations(), 2);
        assert_eq!(eq.shocks(), &[0.0]);

        let z = eq.initial_guess();
        assert_eq!(z.as_slice(), &[0.5, 1.0]);

        let r = eq.residual(&z).unwrap();
        // 1.04 * 0.5 + 1.0 - 1.0 - 0.5
        assert!((r[0] - 0.02).abs() < 1e-12);
        assert_eq!(r[1], 0.0);
    }

    #[test]
    fn pinned_states_append_rows() {
        let model = savings_model();
        let force = ForceSpec::positional(vec![0.3]);
        let eq = SteadyStateEquations::new(&model, Some(&[0.1]), Some(&force)).unwrap();
        assert_eq!(eq.equations(), 3);

        let r = eq.residual(&eq.initial_guess()).unwrap();
        let next = 1.04 * 0.5 + 1.0 + 0.1 - 1.0;
        assert!((r[0] - (next - 0.5)).abs() < 1e-12);
        assert!((r[2] - (next - 0.3)).abs() < 1e-12);
    }

    #[test]
    fn wrong_shock_length_is_rejected() {
        let model = savings_model();
        let err = SteadyStateEquations::new(&model, Some(&[0.0, 0.0]), None)
            .err()
            .unwrap();
        assert_eq!(
            err,
            SolverError::ShapeMismatch {
                what: "shock vector".to_string(),
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn split_returns_states_then_controls() {
        let model = savings_model();
        let eq = SteadyStateEquations::new(&model, None, None).unwrap();
        let (s, x) = eq.split(&DVector::from_vec(vec![0.3, 1.012]));
        assert_eq!(s, vec![0.3]);
        assert_eq!(x, vec![1.012]);
    }

    #[test]
    fn model_errors_propagate_unchanged() {
        let model = FnModel::new(
            Symbols::new(["k"], ["c"], Vec::<&str>::new(), Vec::<&str>::new()),
            Calibration::new(vec![-1.0], vec![1.0], vec![]),
            |s: &[Real], _x: &[Real], _e: &[Real], _p: &[Real]| -> SsResult<Vec<Real>> {
                if s[0] < 0.0 {
                    return Err(SsError::Evaluation {
                        what: "log of negative capital".to_string(),
                    });
                }
                Ok(vec![s[0].ln()])
            },
            |_s: &[Real], x: &[Real], _sn: &[Real], _xn: &[Real], _p: &[Real]| -> SsResult<Vec<Real>> {
                Ok(vec![x[0]])
            },
        )
        .unwrap();
        let eq = SteadyStateEquations::new(&model, None, None).unwrap();
        let err = eq.residual(&eq.initial_guess()).unwrap_err();
        assert_eq!(
            err,
            SolverError::Model(SsError::Evaluation {
                what: "log of negative capital".to_string()
            })
        );
    }

    #[test]
    fn transition_length_is_checked() {
        let model = FnModel::new(
            Symbols::new(["a", "b"], ["c"], Vec::<&str>::new(), Vec::<&str>::new()),
            Calibration::new(vec![1.0, 2.0], vec![1.0], vec![]),
            |s: &[Real], _x: &[Real], _e: &[Real], _p: &[Real]| -> SsResult<Vec<Real>> {
                Ok(vec![s[0]])
            },
            |_s: &[Real], x: &[Real], _sn: &[Real], _xn: &[Real], _p: &[Real]| -> SsResult<Vec<Real>> {
                Ok(vec![x[0]])
            },
        )
        .unwrap();
        let eq = SteadyStateEquations::new(&model, None, None).unwrap();
        assert!(matches!(
            eq.residual(&eq.initial_guess()),
            Err(SolverError::ShapeMismatch { expected: 2, actual: 1, .. })
        ));
    }
}
