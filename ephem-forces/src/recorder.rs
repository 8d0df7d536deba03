//! Dense-output recorder.
//!
//! After every accepted step the integrator hands over the step's
//! b-coefficients together with the frozen start-of-step state, and the
//! recorder reconstructs the trajectory at a set of sub-nodes of the step
//! without re-running the force model. Samples land in caller-owned time
//! and state slices; row r of the state buffer holds 6 consecutive
//! doubles per particle. Row 0 is the initial condition; each step
//! appends `n_sub` rows.

use crate::error::{Error, Result};
use crate::particle::ParticleSet;
use crate::radau::{position_weights, velocity_weights};

pub struct Recorder<'buf> {
    times: &'buf mut [f64],
    states: &'buf mut [f64],
    n_particles: usize,
    sub_nodes: Vec<f64>,
    samples: usize,
    steps: usize,
    capacity_steps: usize,
}

impl<'buf> Recorder<'buf> {
    /// Wraps the caller's buffers with uniform sub-nodes `k/n_sub`,
    /// `k = 1..=n_sub`. Step capacity is derived from the slice lengths:
    /// `(times.len() - 1) / n_sub`.
    pub fn new(
        times: &'buf mut [f64],
        states: &'buf mut [f64],
        n_particles: usize,
        n_sub: usize,
    ) -> Result<Self> {
        let sub_nodes = (1..=n_sub).map(|k| k as f64 / n_sub as f64).collect();
        Self::with_sub_nodes(times, states, n_particles, sub_nodes)
    }

    /// Same, with a custom monotone sub-node set in (0, 1].
    pub fn with_sub_nodes(
        times: &'buf mut [f64],
        states: &'buf mut [f64],
        n_particles: usize,
        sub_nodes: Vec<f64>,
    ) -> Result<Self> {
        if n_particles == 0 {
            return Err(Error::InvalidConfiguration(
                "recorder needs at least one particle".into(),
            ));
        }
        if sub_nodes.is_empty() {
            return Err(Error::InvalidConfiguration(
                "recorder needs at least one sub-node".into(),
            ));
        }
        let mut prev = 0.0;
        for &h in &sub_nodes {
            if !(h > prev && h <= 1.0) {
                return Err(Error::InvalidConfiguration(format!(
                    "sub-nodes must increase strictly within (0, 1], got {:?}",
                    sub_nodes
                )));
            }
            prev = h;
        }
        if times.is_empty() {
            return Err(Error::InvalidConfiguration("empty time buffer".into()));
        }
        if states.len() != times.len() * 6 * n_particles {
            return Err(Error::InvalidConfiguration(format!(
                "state buffer holds {} doubles, expected {} ({} rows x 6 x {} particles)",
                states.len(),
                times.len() * 6 * n_particles,
                times.len(),
                n_particles
            )));
        }
        let capacity_steps = (times.len() - 1) / sub_nodes.len();
        Ok(Self {
            times,
            states,
            n_particles,
            sub_nodes,
            samples: 0,
            steps: 0,
            capacity_steps,
        })
    }

    /// Accepted steps recorded so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Samples written so far, including the initial row.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Whether one more full step fits.
    pub fn has_capacity(&self) -> bool {
        self.steps < self.capacity_steps
    }

    /// Writes the initial condition into row 0.
    pub fn record_initial(&mut self, t: f64, set: &ParticleSet) {
        self.times[0] = t;
        for (j, p) in set.particles().iter().enumerate() {
            let base = 6 * j;
            for axis in 0..3 {
                self.states[base + axis] = p.pos[axis];
                self.states[base + 3 + axis] = p.vel[axis];
            }
        }
        self.samples = 1;
    }

    /// Reconstructs and appends the sub-node samples of one accepted step
    /// from its b-coefficients and the frozen state at `t_begin`.
    pub fn record_step(
        &mut self,
        t_begin: f64,
        dt: f64,
        x0: &[f64],
        v0: &[f64],
        a0: &[f64],
        b: &[Vec<f64>],
    ) {
        debug_assert!(self.has_capacity());
        for node in 0..self.sub_nodes.len() {
            let h = self.sub_nodes[node];
            let s = position_weights(dt, h);
            let sv = velocity_weights(dt, h);
            let row = self.samples;
            self.times[row] = t_begin + dt * h;
            for j in 0..self.n_particles {
                let m = 3 * j;
                let out = 6 * self.n_particles * row + 6 * j;
                for axis in 0..3 {
                    let k = m + axis;
                    let mut x = x0[k] + s[0] * v0[k] + s[1] * a0[k];
                    let mut v = v0[k] + sv[0] * a0[k];
                    for n in 0..7 {
                        x += s[n + 2] * b[n][k];
                        v += sv[n + 1] * b[n][k];
                    }
                    self.states[out + axis] = x;
                    self.states[out + 3 + axis] = v;
                }
            }
            self.samples += 1;
        }
        self.steps += 1;
    }
}
