//! Nonlinear least squares on top of the `levenberg-marquardt` crate.
//!
//! Problems are written against this crate's `nalgebra`; the solver is built
//! on its own `nalgebra` release, so vectors and Jacobians are copied across
//! at the boundary (both are column-major).

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use lm_nalgebra::{storage::Owned, Dyn};
use nalgebra::{DMatrix, DVector};

/// Nonlinear least squares problem: minimize `0.5 * |r(x)|²`.
pub trait NllsProblem {
    fn residuals(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Jacobian of the residuals; central differences unless overridden.
    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        numeric_jacobian(|p| self.residuals(p), x)
    }
}

pub fn numeric_jacobian<F>(residuals: F, x: &DVector<f64>) -> DMatrix<f64>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let m = residuals(x).len();
    let mut jac = DMatrix::<f64>::zeros(m, x.len());
    let mut xp = x.clone();
    for j in 0..x.len() {
        let step = 1e-6 * x[j].abs().max(1.0);
        let orig = xp[j];
        xp[j] = orig + step;
        let rp = residuals(&xp);
        xp[j] = orig - step;
        let rm = residuals(&xp);
        xp[j] = orig;
        jac.set_column(j, &((rp - rm) / (2.0 * step)));
    }
    jac
}

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Evaluation budget, in units of `n + 1` residual evaluations.
    pub max_iters: usize,
    /// Relative cost reduction below which the solve has converged.
    pub ftol: f64,
    /// Orthogonality between residuals and Jacobian columns.
    pub gtol: f64,
    /// Relative step size below which the solve has converged.
    pub xtol: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            ftol: 1e-10,
            gtol: 1e-12,
            xtol: 1e-10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveReport {
    /// Residual evaluations spent by the solver.
    pub iterations: usize,
    pub initial_cost: f64,
    pub final_cost: f64,
    pub converged: bool,
}

fn to_lm_vector(v: &DVector<f64>) -> lm_nalgebra::DVector<f64> {
    lm_nalgebra::DVector::from_column_slice(v.as_slice())
}

fn from_lm_vector(v: &lm_nalgebra::DVector<f64>) -> DVector<f64> {
    DVector::from_column_slice(v.as_slice())
}

struct LmAdapter<'a, P: NllsProblem + ?Sized> {
    problem: &'a P,
    params: DVector<f64>,
}

impl<P: NllsProblem + ?Sized> LeastSquaresProblem<f64, Dyn, Dyn> for LmAdapter<'_, P> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &lm_nalgebra::DVector<f64>) {
        self.params = from_lm_vector(x);
    }

    fn params(&self) -> lm_nalgebra::DVector<f64> {
        to_lm_vector(&self.params)
    }

    fn residuals(&self) -> Option<lm_nalgebra::DVector<f64>> {
        Some(to_lm_vector(&self.problem.residuals(&self.params)))
    }

    fn jacobian(&self) -> Option<lm_nalgebra::DMatrix<f64>> {
        let jac = self.problem.jacobian(&self.params);
        Some(lm_nalgebra::DMatrix::from_column_slice(
            jac.nrows(),
            jac.ncols(),
            jac.as_slice(),
        ))
    }
}

fn cost(r: &DVector<f64>) -> f64 {
    0.5 * r.norm_squared()
}

/// Minimize `problem` from `x0`.
pub fn solve<P: NllsProblem + ?Sized>(
    problem: &P,
    x0: DVector<f64>,
    opts: &SolveOptions,
) -> (DVector<f64>, SolveReport) {
    let initial_cost = cost(&problem.residuals(&x0));

    let lm = LevenbergMarquardt::new()
        .with_ftol(opts.ftol)
        .with_xtol(opts.xtol)
        .with_gtol(opts.gtol)
        .with_patience(opts.max_iters.max(1));
    let (adapter, report) = lm.minimize(LmAdapter { problem, params: x0 });

    (
        adapter.params,
        SolveReport {
            iterations: report.number_of_evaluations,
            initial_cost,
            final_cost: report.objective_function,
            converged: report.termination.was_successful(),
        },
    )
}
