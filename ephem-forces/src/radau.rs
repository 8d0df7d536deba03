//! Adaptive Gauss-Radau integrator with eight interior nodes (IAS15
//! family; Rein & Spiegel 2015).
//!
//! Within a step of size dt the acceleration is modelled as a polynomial
//! in the normalized time tau = (t - t_begin)/dt,
//!
//! ```text
//! a(tau) = a0 + b0 tau + b1 tau^2 + ... + b6 tau^7
//! ```
//!
//! whose b-coefficients are fixed by collocation at the seven interior
//! Radau nodes. Each corrector sweep re-evaluates the force model at all
//! nodes and re-solves the collocation system through a precomputed
//! inverse of the 7x7 node matrix; sweeps repeat until the change in b6
//! reaches the roundoff floor. The size of b6 against max|a0| provides
//! the step-error estimate driving the `(eps/err)^(1/7)` controller.

use crate::error::{Error, Result};
use crate::particle::ParticleSet;
use crate::recorder::Recorder;
use crate::IntegratorStatus;
use nalgebra::DMatrix;

/// Normalized Gauss-Radau spacings of the eight nodes.
pub const NODES: [f64; 8] = [
    0.0,
    0.0562625605369221,
    0.1802406917368924,
    0.3526247171131696,
    0.5471536263305554,
    0.7342101772154105,
    0.8853209468390958,
    0.9775206135612875,
];

const MAX_SWEEPS: usize = 12;
const MAX_REJECTIONS: usize = 20;
/// Corrector stopping level: change in b6 relative to max|a0|. The step
/// tolerance epsilon governs step size, not the corrector, which runs to
/// the roundoff floor.
const CONVERGENCE: f64 = 1e-16;

/// The right-hand side the integrator drives: fill in every particle's
/// acceleration at the given epoch.
pub trait AccelerationModel {
    fn accelerations(&mut self, jd_tdb: f64, set: &mut ParticleSet) -> Result<()>;
}

/// Polynomial-integration weights for the position prediction at node h:
/// `x(h) = x0 + s[0] v0 + s[1] a0 + s[2] b0 + ... + s[8] b6`.
pub(crate) fn position_weights(dt: f64, h: f64) -> [f64; 9] {
    let mut s = [0.0; 9];
    s[0] = dt * h;
    s[1] = s[0] * s[0] / 2.0;
    s[2] = s[1] * h / 3.0;
    s[3] = s[2] * h / 2.0;
    s[4] = 3.0 * s[3] * h / 5.0;
    s[5] = 2.0 * s[4] * h / 3.0;
    s[6] = 5.0 * s[5] * h / 7.0;
    s[7] = 3.0 * s[6] * h / 4.0;
    s[8] = 7.0 * s[7] * h / 9.0;
    s
}

/// Weights for the velocity prediction:
/// `v(h) = v0 + s[0] a0 + s[1] b0 + ... + s[7] b6`.
pub(crate) fn velocity_weights(dt: f64, h: f64) -> [f64; 8] {
    let mut s = [0.0; 8];
    s[0] = dt * h;
    s[1] = s[0] * h / 2.0;
    s[2] = 2.0 * s[1] * h / 3.0;
    s[3] = 3.0 * s[2] * h / 4.0;
    s[4] = 4.0 * s[3] * h / 5.0;
    s[5] = 5.0 * s[4] * h / 6.0;
    s[6] = 6.0 * s[5] * h / 7.0;
    s[7] = 7.0 * s[6] * h / 8.0;
    s
}

struct StepAttempt {
    converged: bool,
    error: f64,
}

pub struct RadauIntegrator {
    t: f64,
    dt: f64,
    dt_last: f64,
    epsilon: f64,
    min_dt: f64,
    exact_finish_time: bool,
    /// Inverse of M[i][n] = h_{i+1}^{n+1}, mapping node accelerations to b.
    node_inverse: [[f64; 7]; 7],
    b: Vec<Vec<f64>>,
    /// Node accelerations relative to a0, one row per interior node.
    g: Vec<Vec<f64>>,
    x0: Vec<f64>,
    v0: Vec<f64>,
    a0: Vec<f64>,
    primed: bool,
    steps_done: usize,
    warnings: Vec<String>,
}

impl RadauIntegrator {
    pub fn new(t_start: f64, epsilon: f64, dt_init: f64, min_dt: f64, exact_finish_time: bool) -> Self {
        let m = DMatrix::from_fn(7, 7, |row, col| NODES[row + 1].powi(col as i32 + 1));
        let inv = m
            .try_inverse()
            .expect("Gauss-Radau node matrix is invertible");
        let mut node_inverse = [[0.0; 7]; 7];
        for row in 0..7 {
            for col in 0..7 {
                node_inverse[row][col] = inv[(row, col)];
            }
        }
        Self {
            t: t_start,
            dt: dt_init,
            dt_last: 0.0,
            epsilon,
            min_dt,
            exact_finish_time,
            node_inverse,
            b: vec![Vec::new(); 7],
            g: vec![Vec::new(); 7],
            x0: Vec::new(),
            v0: Vec::new(),
            a0: Vec::new(),
            primed: false,
            steps_done: 0,
            warnings: Vec::new(),
        }
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn dt_last(&self) -> f64 {
        self.dt_last
    }

    pub fn steps_done(&self) -> usize {
        self.steps_done
    }

    pub fn set_tolerance(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    pub fn set_min_dt(&mut self, min_dt: f64) {
        self.min_dt = min_dt;
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    fn resize(&mut self, n3: usize) {
        for row in self.b.iter_mut().chain(self.g.iter_mut()) {
            row.resize(n3, 0.0);
        }
        self.x0.resize(n3, 0.0);
        self.v0.resize(n3, 0.0);
        self.a0.resize(n3, 0.0);
    }

    /// Freezes the current particle states as the start-of-step reference.
    /// Must run after the acceleration evaluation at t_begin and before the
    /// next group of substeps.
    fn cache_state(&mut self, set: &ParticleSet) {
        for (j, p) in set.particles().iter().enumerate() {
            let m = 3 * j;
            for axis in 0..3 {
                self.x0[m + axis] = p.pos[axis];
                self.v0[m + axis] = p.vel[axis];
                self.a0[m + axis] = p.acc[axis];
            }
        }
    }

    /// Writes the polynomial prediction at node h into the particle set.
    fn load_node_state(&self, set: &mut ParticleSet, dt: f64, h: f64) {
        let s = position_weights(dt, h);
        let sv = velocity_weights(dt, h);
        for j in 0..set.n_total() {
            let m = 3 * j;
            let p = set.particle_mut(j);
            for axis in 0..3 {
                let k = m + axis;
                let mut x = self.x0[k] + s[0] * self.v0[k] + s[1] * self.a0[k];
                let mut v = self.v0[k] + sv[0] * self.a0[k];
                for n in 0..7 {
                    x += s[n + 2] * self.b[n][k];
                    v += sv[n + 1] * self.b[n][k];
                }
                p.pos[axis] = x;
                p.vel[axis] = v;
            }
        }
    }

    fn max_abs(values: &[f64]) -> f64 {
        values.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
    }

    fn ensure_primed<M: AccelerationModel>(
        &mut self,
        model: &mut M,
        set: &mut ParticleSet,
    ) -> Result<()> {
        if !self.primed {
            self.resize(3 * set.n_total());
            model.accelerations(self.t, set)?;
            self.cache_state(set);
            self.primed = true;
        }
        Ok(())
    }

    /// One corrector pass over a trial step; leaves b ready for the
    /// error decision.
    fn attempt<M: AccelerationModel>(
        &mut self,
        dt: f64,
        model: &mut M,
        set: &mut ParticleSet,
    ) -> Result<StepAttempt> {
        let n3 = self.x0.len();
        let max_a = Self::max_abs(&self.a0);
        let mut converged = false;
        let mut prev_db6 = f64::INFINITY;

        for sweep in 0..MAX_SWEEPS {
            for node in 1..8 {
                self.load_node_state(set, dt, NODES[node]);
                model.accelerations(self.t + dt * NODES[node], set)?;
                let row = &mut self.g[node - 1];
                for (j, p) in set.particles().iter().enumerate() {
                    let m = 3 * j;
                    for axis in 0..3 {
                        row[m + axis] = p.acc[axis] - self.a0[m + axis];
                    }
                }
            }

            let mut db6_max = 0.0_f64;
            for m in 0..n3 {
                for k in 0..7 {
                    let mut bk = 0.0;
                    for n in 0..7 {
                        bk += self.node_inverse[k][n] * self.g[n][m];
                    }
                    if k == 6 {
                        db6_max = db6_max.max((bk - self.b[6][m]).abs());
                    }
                    self.b[k][m] = bk;
                }
            }

            if db6_max <= CONVERGENCE * max_a {
                converged = true;
                break;
            }
            // successive sweeps no longer shrink the update: roundoff floor
            if sweep > 1 && db6_max >= prev_db6 {
                converged = true;
                break;
            }
            prev_db6 = db6_max;
        }

        let error = if max_a > 0.0 {
            Self::max_abs(&self.b[6]) / max_a
        } else {
            0.0
        };
        Ok(StepAttempt { converged, error })
    }

    /// Moves the particle set to the step endpoint and advances time.
    fn advance(&mut self, dt: f64, set: &mut ParticleSet) {
        self.load_node_state(set, dt, 1.0);
        self.t += dt;
        self.dt_last = dt;
        self.steps_done += 1;
    }

    fn floor_magnitude(&self, dt: f64) -> f64 {
        if dt.abs() < self.min_dt {
            self.min_dt.copysign(dt)
        } else {
            dt
        }
    }

    /// One adaptive step: shrinks on rejection, grows the next suggestion
    /// on acceptance. Returns the step size actually taken.
    fn step_once<M: AccelerationModel>(
        &mut self,
        dt_suggested: f64,
        model: &mut M,
        set: &mut ParticleSet,
    ) -> Result<f64> {
        let mut dt = dt_suggested;
        let mut rejections = 0;

        loop {
            let attempt = self.attempt(dt, model, set)?;

            if !attempt.converged && dt.abs() > self.min_dt {
                log::warn!(
                    "corrector did not converge at t={} with dt={}; halving",
                    self.t,
                    dt
                );
                self.warnings
                    .push(format!("non-converging step at t={}, dt={}", self.t, dt));
                rejections += 1;
                if rejections > MAX_REJECTIONS {
                    return Err(Error::NonConvergingStep {
                        t: self.t,
                        iterations: MAX_SWEEPS,
                    });
                }
                dt = self.floor_magnitude(dt * 0.5);
                continue;
            }
            if !attempt.converged {
                // already at the minimum step; proceed under protest
                self.warnings.push(format!(
                    "accepting non-converged step at t={} with minimum dt={}",
                    self.t, dt
                ));
            }

            if attempt.error > self.epsilon && dt.abs() > self.min_dt {
                rejections += 1;
                if rejections > MAX_REJECTIONS {
                    return Err(Error::NonConvergingStep {
                        t: self.t,
                        iterations: MAX_SWEEPS,
                    });
                }
                let shrink = (self.epsilon / attempt.error).powf(1.0 / 7.0).clamp(0.25, 0.9);
                dt = self.floor_magnitude(dt * shrink);
                continue;
            }

            self.advance(dt, set);
            let grow = if attempt.error > 0.0 {
                (self.epsilon / attempt.error).powf(1.0 / 7.0).clamp(0.25, 4.0)
            } else {
                4.0
            };
            self.dt = self.floor_magnitude(dt * grow);
            return Ok(dt);
        }
    }

    /// Takes a single adaptive step with the current step suggestion.
    pub fn step<M: AccelerationModel>(
        &mut self,
        model: &mut M,
        set: &mut ParticleSet,
    ) -> Result<()> {
        self.ensure_primed(model, set)?;
        let dt = self.dt;
        self.step_once(dt, model, set)?;
        model.accelerations(self.t, set)?;
        self.cache_state(set);
        Ok(())
    }

    /// Drives the state to `t_target`, emitting dense output through the
    /// recorder after every accepted step. Stops cleanly with
    /// `BufferFull` when the recorder runs out of step capacity.
    pub fn integrate_until<M: AccelerationModel>(
        &mut self,
        t_target: f64,
        model: &mut M,
        set: &mut ParticleSet,
        recorder: &mut Recorder<'_>,
    ) -> Result<IntegratorStatus> {
        let forward = t_target >= self.t;
        if (self.dt > 0.0) != forward {
            self.dt = -self.dt;
        }

        self.ensure_primed(model, set)?;
        recorder.record_initial(self.t, set);

        while if forward {
            self.t < t_target
        } else {
            self.t > t_target
        } {
            if !recorder.has_capacity() {
                return Ok(IntegratorStatus::BufferFull);
            }

            let mut dt = self.dt;
            let remaining = t_target - self.t;
            let clamped = self.exact_finish_time && dt.abs() >= remaining.abs();
            if clamped {
                dt = remaining;
            }

            let taken = self.step_once(dt, model, set)?;
            if clamped && taken == remaining {
                self.t = t_target;
            }

            recorder.record_step(
                self.t - self.dt_last,
                self.dt_last,
                &self.x0,
                &self.v0,
                &self.a0,
                &self.b,
            );

            model.accelerations(self.t, set)?;
            self.cache_state(set);
        }

        Ok(IntegratorStatus::Ok)
    }
}
