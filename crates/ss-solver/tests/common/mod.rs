//! Models shared by the integration tests.
#![allow(dead_code)]

use ss_core::{Calibration, FnModel, Model, Real, SsResult, Symbols};
use std::cell::Cell;

pub const BETA: Real = 0.96;
pub const DELTA: Real = 0.1;
pub const ALPHA: Real = 0.36;
pub const RHO: Real = 0.9;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Stochastic growth model with log utility.
///
/// States `[z, k]`, control `[i]`, shock `[e_z]`.
/// Steady state: `z = e / (1 - rho)`, `k = ((1/beta - 1 + delta) / (alpha e^z))^(1/(alpha-1))`,
/// `i = delta k`.
pub fn growth_model() -> impl Model {
    FnModel::new(
        Symbols::new(["z", "k"], ["i"], ["e_z"], ["beta", "delta", "alpha", "rho"]),
        Calibration::new(vec![0.0, 4.0], vec![0.4], vec![BETA, DELTA, ALPHA, RHO]),
        |s: &[Real], x: &[Real], e: &[Real], p: &[Real]| -> SsResult<Vec<Real>> {
            let (delta, rho) = (p[1], p[3]);
            Ok(vec![rho * s[0] + e[0], (1.0 - delta) * s[1] + x[0]])
        },
        |s: &[Real], x: &[Real], sn: &[Real], xn: &[Real], p: &[Real]| -> SsResult<Vec<Real>> {
            let (beta, delta, alpha) = (p[0], p[1], p[2]);
            let c = s[0].exp() * s[1].powf(alpha) - x[0];
            let c_next = sn[0].exp() * sn[1].powf(alpha) - xn[0];
            let return_on_capital = alpha * sn[0].exp() * sn[1].powf(alpha - 1.0) + 1.0 - delta;
            Ok(vec![beta * (c / c_next) * return_on_capital - 1.0])
        },
    )
    .unwrap()
}

pub fn growth_steady_state(e: Real) -> (Real, Real, Real) {
    let z = e / (1.0 - RHO);
    let k = ((1.0 / BETA - 1.0 + DELTA) / (ALPHA * z.exp())).powf(1.0 / (ALPHA - 1.0));
    (z, k, DELTA * k)
}

pub const RATE: Real = 0.04;
pub const INCOME: Real = 1.0;

/// Savings model with `beta (1 + r) = 1`: any bond level is a steady state.
///
/// State `[b]`, control `[c]`; `b' = (1 + r) b + y - c`,
/// arbitrage `beta (1 + r) c / c' - 1`. Model calls are counted in `calls`.
pub fn savings_model(calls: &Cell<usize>) -> impl Model + '_ {
    FnModel::new(
        Symbols::new(["b"], ["c"], Vec::<&str>::new(), ["r", "y", "beta"]),
        Calibration::new(vec![0.5], vec![1.0], vec![RATE, INCOME, 1.0 / (1.0 + RATE)]),
        move |s: &[Real], x: &[Real], _e: &[Real], p: &[Real]| -> SsResult<Vec<Real>> {
            calls.set(calls.get() + 1);
            Ok(vec![(1.0 + p[0]) * s[0] + p[1] - x[0]])
        },
        move |_s: &[Real], x: &[Real], _sn: &[Real], xn: &[Real], p: &[Real]| -> SsResult<Vec<Real>> {
            calls.set(calls.get() + 1);
            Ok(vec![p[2] * (1.0 + p[0]) * (x[0] / xn[0]) - 1.0])
        },
    )
    .unwrap()
}

/// `w' = w + e` with no stabilizing equation, plus a trivially pinned control.
pub fn random_walk_model() -> impl Model {
    FnModel::new(
        Symbols::new(["w"], ["x"], ["e_w"], Vec::<&str>::new()),
        Calibration::new(vec![2.0], vec![0.0], vec![]),
        |s: &[Real], _x: &[Real], e: &[Real], _p: &[Real]| -> SsResult<Vec<Real>> {
            Ok(vec![s[0] + e[0]])
        },
        |_s: &[Real], x: &[Real], _sn: &[Real], _xn: &[Real], _p: &[Real]| -> SsResult<Vec<Real>> {
            Ok(vec![x[0] - 1.0])
        },
    )
    .unwrap()
}
