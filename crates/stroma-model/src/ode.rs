//! The ODE integrator seam and the cell-cycle system.
//!
//! The integrator is a standard black box: given a derivative function,
//! an initial state, and a time interval, it returns the state at the
//! interval end. Drivers hold it as `Box<dyn Integrator>` so an
//! external integrator can be swapped in without touching site logic;
//! [`RungeKutta4`] is the default collaborator.

use smallvec::SmallVec;

/// A first-order ODE system `dy/dt = f(t, y)`.
pub trait OdeSystem {
    /// Number of state components.
    fn dim(&self) -> usize;

    /// Evaluate the derivative at `(t, y)` into `dydt`.
    fn deriv(&self, t: f64, y: &[f64], dydt: &mut [f64]);
}

/// Advances an [`OdeSystem`] over a time interval.
pub trait Integrator: Send + Sync + 'static {
    /// Replace `y` with the solution at `t1`, starting from `y` at `t0`.
    fn solve(&self, system: &dyn OdeSystem, t0: f64, t1: f64, y: &mut [f64]);
}

/// Classical fixed-step fourth-order Runge–Kutta.
///
/// The interval is divided into `substeps` equal steps. The cell-cycle
/// system is linear with rate constants well below 1/dt in practice, so
/// a modest fixed step is ample.
#[derive(Clone, Copy, Debug)]
pub struct RungeKutta4 {
    substeps: u32,
}

impl RungeKutta4 {
    /// Create an integrator taking `substeps` RK4 steps per interval.
    /// Zero is coerced to one.
    pub fn new(substeps: u32) -> Self {
        Self {
            substeps: substeps.max(1),
        }
    }
}

impl Default for RungeKutta4 {
    fn default() -> Self {
        Self::new(8)
    }
}

type State = SmallVec<[f64; 8]>;

impl Integrator for RungeKutta4 {
    fn solve(&self, system: &dyn OdeSystem, t0: f64, t1: f64, y: &mut [f64]) {
        let dim = system.dim();
        debug_assert_eq!(y.len(), dim);
        let h = (t1 - t0) / f64::from(self.substeps);

        let mut k1: State = SmallVec::from_elem(0.0, dim);
        let mut k2: State = SmallVec::from_elem(0.0, dim);
        let mut k3: State = SmallVec::from_elem(0.0, dim);
        let mut k4: State = SmallVec::from_elem(0.0, dim);
        let mut stage: State = SmallVec::from_elem(0.0, dim);

        let mut t = t0;
        for _ in 0..self.substeps {
            system.deriv(t, y, &mut k1);

            for i in 0..dim {
                stage[i] = y[i] + 0.5 * h * k1[i];
            }
            system.deriv(t + 0.5 * h, &stage, &mut k2);

            for i in 0..dim {
                stage[i] = y[i] + 0.5 * h * k2[i];
            }
            system.deriv(t + 0.5 * h, &stage, &mut k3);

            for i in 0..dim {
                stage[i] = y[i] + h * k3[i];
            }
            system.deriv(t + h, &stage, &mut k4);

            for i in 0..dim {
                y[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
            }
            t += h;
        }
    }
}

/// The linear cell-cycle system with the oxygen switch already resolved.
///
/// Rates are captured at construction, once per update call: `km0` is
/// active and `k01` zero below the oxygen threshold, and vice versa
/// above it — an instantaneous, hysteresis-free switch.
///
/// State ordering is `[G1, S, G2, M, G0]`. The factor 2 on the M→G1
/// term is mitosis: one dividing cell leaves M and two daughters enter
/// G1, so total population grows at rate `km1·M`.
#[derive(Clone, Copy, Debug)]
pub struct CellCycleOde {
    /// G1 → S rate.
    pub k1s: f64,
    /// S → G2 rate.
    pub ks2: f64,
    /// G2 → M rate.
    pub k2m: f64,
    /// M → G1 (mitosis) rate.
    pub km1: f64,
    /// M → G0 rate (zero above the oxygen threshold).
    pub km0: f64,
    /// G0 → G1 rate (zero below the oxygen threshold).
    pub k01: f64,
}

impl OdeSystem for CellCycleOde {
    fn dim(&self) -> usize {
        5
    }

    fn deriv(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let (g1, s, g2, m, g0) = (y[0], y[1], y[2], y[3], y[4]);
        dydt[0] = 2.0 * self.km1 * m + self.k01 * g0 - self.k1s * g1;
        dydt[1] = self.k1s * g1 - self.ks2 * s;
        dydt[2] = self.ks2 * s - self.k2m * g2;
        dydt[3] = self.k2m * g2 - self.km1 * m - self.km0 * m;
        dydt[4] = self.km0 * m - self.k01 * g0;
    }
}
