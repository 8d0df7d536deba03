//! Run configuration: reference frame, integrator knobs, force-term
//! selection, and kernel-file overrides. Immutable for the duration of a
//! run.

use crate::error::{Error, Result};
use bitflags::bitflags;
use std::path::PathBuf;

bitflags! {
    /// Force terms included in the right-hand side.
    ///
    /// The non-gravitational term additionally requires nonzero A1/A2/A3
    /// coefficients; with all three zero it costs nothing either way.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ForceTerms: u8 {
        const DIRECT_GRAVITY    = 0b000001;
        const EARTH_HARMONICS   = 0b000010;
        const SUN_J2            = 0b000100;
        const NON_GRAVITATIONAL = 0b001000;
        const RELATIVITY        = 0b010000;
        /// Direct gravity from the sixteen massive asteroids; clearing
        /// this keeps the planetary set only.
        const ASTEROID_GRAVITY  = 0b100000;
    }
}

impl Default for ForceTerms {
    fn default() -> Self {
        ForceTerms::all()
    }
}

/// Origin of the equations of motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReferenceFrame {
    #[default]
    Barycentric,
    Geocentric,
}

/// Which relativistic correction the RELATIVITY term applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GrModel {
    /// Damour-Deruelle one-body solar term.
    #[default]
    DamourDeruelle,
    /// Full Einstein-Infeld-Hoffmann 1PN treatment, Sun subset active.
    EinsteinInfeldHoffmann,
}

/// Marsden comet-model coefficients, AU/day^2 at 1 AU.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NonGravParams {
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
}

impl NonGravParams {
    pub fn new(a1: f64, a2: f64, a3: f64) -> Self {
        Self { a1, a2, a3 }
    }

    pub fn is_zero(&self) -> bool {
        self.a1 == 0.0 && self.a2 == 0.0 && self.a3 == 0.0
    }
}

/// Immutable per-run configuration.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub frame: ReferenceFrame,
    /// Integrator tolerance driving both the corrector iteration and the
    /// step-size controller.
    pub epsilon: f64,
    /// Initial step size in days; the sign is taken from the integration
    /// direction.
    pub dt_init: f64,
    /// Smallest allowed |dt| in days. Keeps tight geocentric arcs from
    /// refining without bound.
    pub min_dt: f64,
    /// Land exactly on the target time instead of overshooting.
    pub exact_finish_time: bool,
    pub terms: ForceTerms,
    pub gr_model: GrModel,
    pub nongrav: NonGravParams,
    /// Dense-output samples per step.
    pub n_substeps: usize,
    /// Planetary kernel path; falls back to `JPL_PLANET_EPHEM`, then
    /// `de440.bsp`.
    pub planet_kernel: Option<PathBuf>,
    /// Small-body kernel path; falls back to `JPL_SB_EPHEM`, then
    /// `sb441-n16.bsp`.
    pub smallbody_kernel: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frame: ReferenceFrame::Barycentric,
            epsilon: 1e-9,
            dt_init: 1.0,
            min_dt: 1e-2,
            exact_finish_time: true,
            terms: ForceTerms::default(),
            gr_model: GrModel::default(),
            nongrav: NonGravParams::default(),
            n_substeps: 10,
            planet_kernel: None,
            smallbody_kernel: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "epsilon must be positive and finite, got {}",
                self.epsilon
            )));
        }
        if !(self.dt_init.is_finite() && self.dt_init != 0.0) {
            return Err(Error::InvalidConfiguration(
                "dt_init must be nonzero and finite".into(),
            ));
        }
        if !(self.min_dt.is_finite() && self.min_dt > 0.0) {
            return Err(Error::InvalidConfiguration(
                "min_dt must be positive and finite".into(),
            ));
        }
        if self.n_substeps == 0 {
            return Err(Error::InvalidConfiguration(
                "n_substeps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
