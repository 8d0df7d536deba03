//! Session layer: builds a fresh simulation per call, runs it to the
//! target epoch, and reports the terminal status plus any warnings the
//! integrator collected. The core keeps no state between invocations, so
//! a `BufferFull` run can be resumed from its last emitted sample with
//! fresh buffers.

use crate::config::SimulationConfig;
use crate::ephemeris::JplEphemeris;
use crate::error::{Error, Result};
use crate::forces::EphemerisForces;
use crate::particle::ParticleSet;
use crate::radau::RadauIntegrator;
use crate::recorder::Recorder;
use crate::IntegratorStatus;

/// Outcome of one integration run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: IntegratorStatus,
    /// Accepted steps recorded into the output buffers.
    pub steps: usize,
    /// Non-fatal diagnostics, e.g. non-converging corrector sweeps.
    pub warnings: Vec<String>,
}

/// A simulation being assembled: configuration plus the particle states
/// queued for the next run.
pub struct Simulation {
    config: SimulationConfig,
    real: Vec<f64>,
    parents: Vec<usize>,
    var: Vec<f64>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            real: Vec::new(),
            parents: Vec::new(),
            var: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn n_real(&self) -> usize {
        self.real.len() / 6
    }

    pub fn n_variational(&self) -> usize {
        self.parents.len()
    }

    /// Total particle count, real plus variational.
    pub fn n_total(&self) -> usize {
        self.n_real() + self.n_variational()
    }

    pub fn add_particle(&mut self, state: [f64; 6]) {
        self.real.extend_from_slice(&state);
    }

    /// Appends test particles from a flat `(6 * n)` slice.
    pub fn add_particles(&mut self, states: &[f64]) -> Result<()> {
        if states.len() % 6 != 0 {
            return Err(Error::InvalidConfiguration(format!(
                "particle state length {} is not a multiple of 6",
                states.len()
            )));
        }
        self.real.extend_from_slice(states);
        Ok(())
    }

    /// Appends a variational partner differentiating real particle
    /// `parent`.
    pub fn add_variational(&mut self, parent: usize, state: [f64; 6]) -> Result<()> {
        if parent >= self.n_real() {
            return Err(Error::InvalidConfiguration(format!(
                "variational parent {} but only {} real particles",
                parent,
                self.n_real()
            )));
        }
        self.parents.push(parent);
        self.var.extend_from_slice(&state);
        Ok(())
    }

    /// Integrates all queued particles from `t_start` to `t_end` (TDB
    /// Julian dates), filling the caller's dense-output buffers. The
    /// state buffer must hold `times.len() * 6 * n_total` doubles.
    ///
    /// Ephemeris problems surface as `EphemerisError` in the outcome with
    /// the buffers untouched; malformed inputs return `Err`.
    pub fn run(
        &mut self,
        t_start: f64,
        t_end: f64,
        out_times: &mut [f64],
        out_states: &mut [f64],
    ) -> Result<RunOutcome> {
        let mut set = ParticleSet::from_states(&self.real, &self.parents, &self.var)?;

        let source = match JplEphemeris::open(&self.config) {
            Ok(source) => source,
            Err(Error::EphemerisUnavailable(msg)) => {
                log::warn!("ephemeris unavailable: {}", msg);
                return Ok(RunOutcome {
                    status: IntegratorStatus::EphemerisError,
                    steps: 0,
                    warnings: vec![msg],
                });
            }
            Err(other) => return Err(other),
        };

        let mut model = EphemerisForces::new(source, &self.config);
        let mut recorder = Recorder::new(
            out_times,
            out_states,
            set.n_total(),
            self.config.n_substeps,
        )?;
        let mut integrator = RadauIntegrator::new(
            t_start,
            self.config.epsilon,
            self.config.dt_init,
            self.config.min_dt,
            self.config.exact_finish_time,
        );

        log::debug!(
            "integrating {} particles ({} variational) from {} to {}",
            set.n_real(),
            set.link_count(),
            t_start,
            t_end
        );

        let mut extra_warnings = Vec::new();
        let status =
            match integrator.integrate_until(t_end, &mut model, &mut set, &mut recorder) {
                Ok(status) => status,
                Err(Error::NumericalFailure { term, particle }) => {
                    log::warn!("numerical failure in {} on particle {}", term, particle);
                    extra_warnings.push(format!(
                        "numerical failure in {} on particle {}",
                        term, particle
                    ));
                    IntegratorStatus::NumericalFailure
                }
                Err(Error::NonConvergingStep { t, .. }) => {
                    log::warn!("step at t={} exhausted its retry budget", t);
                    extra_warnings.push(format!("step at t={} exhausted its retry budget", t));
                    IntegratorStatus::NumericalFailure
                }
                Err(Error::EphemerisUnavailable(msg)) => {
                    extra_warnings.push(msg);
                    IntegratorStatus::EphemerisError
                }
                Err(Error::BodyIndexOutOfRange(index)) => {
                    extra_warnings.push(format!("perturber index {} out of range", index));
                    IntegratorStatus::EphemerisError
                }
                Err(Error::BufferFull { .. }) => IntegratorStatus::BufferFull,
                Err(err @ Error::InvalidConfiguration(_)) => return Err(err),
            };

        let mut warnings = integrator.take_warnings();
        warnings.extend(extra_warnings);
        Ok(RunOutcome {
            status,
            steps: recorder.steps(),
            warnings,
        })
    }
}

/// One-shot entry point: builds a simulation, loads real and variational
/// particles from flat slices, and runs it.
#[allow(clippy::too_many_arguments)]
pub fn integrate(
    config: SimulationConfig,
    t_start: f64,
    t_end: f64,
    instate: &[f64],
    invar_parents: &[usize],
    invar: &[f64],
    out_times: &mut [f64],
    out_states: &mut [f64],
) -> Result<RunOutcome> {
    let mut sim = Simulation::new(config)?;
    sim.add_particles(instate)?;
    if invar.len() % 6 != 0 || invar_parents.len() != invar.len() / 6 {
        return Err(Error::InvalidConfiguration(format!(
            "{} parent indices for {} variational doubles",
            invar_parents.len(),
            invar.len()
        )));
    }
    for (i, &parent) in invar_parents.iter().enumerate() {
        let mut state = [0.0; 6];
        state.copy_from_slice(&invar[6 * i..6 * i + 6]);
        sim.add_variational(parent, state)?;
    }
    sim.run(t_start, t_end, out_times, out_states)
}
