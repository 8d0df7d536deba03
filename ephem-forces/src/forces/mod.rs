//! Force aggregation: sums every enabled contributor into the particle
//! accelerations.
//!
//! The evaluation order is fixed for numerical reproducibility: direct
//! gravity, Earth harmonics, solar J2, non-gravitational forces,
//! relativity, and finally the geocentric indirect term. Each term is
//! checked for non-finite output before the next runs.

pub mod gravity;
pub mod harmonics;
pub mod nongrav;
pub mod relativity;

use crate::config::{ForceTerms, GrModel, ReferenceFrame, SimulationConfig};
use crate::ephemeris::{EphemerisSource, PerturberState, EARTH, N_PLANETARY, SUN};
use crate::error::{Error, Result};
use crate::particle::ParticleSet;
use crate::radau::AccelerationModel;
use ephem_core::constants::SPEED_OF_LIGHT_AU_DAY;
use ephem_core::Frame;

/// The assembled right-hand side: an ephemeris source plus the term
/// selection and frame data, evaluated by the integrator at every node.
pub struct EphemerisForces<S> {
    source: S,
    frame: ReferenceFrame,
    terms: ForceTerms,
    gr_model: GrModel,
    nongrav: crate::config::NonGravParams,
    earth_frame: Frame,
    sun_frame: Frame,
    c2: f64,
}

impl<S: EphemerisSource> EphemerisForces<S> {
    pub fn new(source: S, config: &SimulationConfig) -> Self {
        Self {
            source,
            frame: config.frame,
            terms: config.terms,
            gr_model: config.gr_model,
            nongrav: config.nongrav,
            earth_frame: Frame::earth_equatorial(),
            sun_frame: Frame::sun_equatorial(),
            c2: SPEED_OF_LIGHT_AU_DAY * SPEED_OF_LIGHT_AU_DAY,
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn check_finite(set: &ParticleSet, term: &'static str) -> Result<()> {
        for (index, p) in set.particles().iter().enumerate() {
            if !p.acc.is_finite() {
                return Err(Error::NumericalFailure {
                    term,
                    particle: index,
                });
            }
        }
        Ok(())
    }
}

impl<S: EphemerisSource> AccelerationModel for EphemerisForces<S> {
    fn accelerations(&mut self, jd_tdb: f64, set: &mut ParticleSet) -> Result<()> {
        let origin = match self.frame {
            ReferenceFrame::Geocentric => self.source.query(EARTH, jd_tdb)?,
            ReferenceFrame::Barycentric => PerturberState::barycenter(),
        };

        set.zero_accelerations();

        if self.terms.contains(ForceTerms::DIRECT_GRAVITY) {
            let n_bodies = if self.terms.contains(ForceTerms::ASTEROID_GRAVITY) {
                self.source.body_count()
            } else {
                self.source.body_count().min(N_PLANETARY)
            };
            gravity::accumulate(&mut self.source, jd_tdb, set, origin.pos, n_bodies)?;
            Self::check_finite(set, "direct gravity")?;
        }

        if self.terms.contains(ForceTerms::EARTH_HARMONICS) {
            let earth = self.source.query(EARTH, jd_tdb)?;
            harmonics::earth_harmonics(set, &earth, origin.pos, &self.earth_frame)?;
            Self::check_finite(set, "earth harmonics")?;
        }

        let nongrav_active =
            self.terms.contains(ForceTerms::NON_GRAVITATIONAL) && !self.nongrav.is_zero();
        let needs_sun = self.terms.contains(ForceTerms::SUN_J2)
            || nongrav_active
            || self.terms.contains(ForceTerms::RELATIVITY);

        if needs_sun {
            let sun = self.source.query(SUN, jd_tdb)?;

            if self.terms.contains(ForceTerms::SUN_J2) {
                harmonics::sun_j2(set, &sun, origin.pos, &self.sun_frame)?;
                Self::check_finite(set, "sun J2")?;
            }

            if nongrav_active {
                nongrav::accumulate(set, &sun, &origin, self.nongrav)?;
                Self::check_finite(set, "non-gravitational")?;
            }

            if self.terms.contains(ForceTerms::RELATIVITY) {
                match self.gr_model {
                    GrModel::DamourDeruelle => {
                        relativity::damour_deruelle(set, &sun, &origin, self.c2)?;
                    }
                    GrModel::EinsteinInfeldHoffmann => {
                        relativity::eih(&mut self.source, jd_tdb, set, &origin, self.c2, 1)?;
                    }
                }
                Self::check_finite(set, "relativity")?;
            }
        }

        // indirect term: a geocentric origin is itself accelerated
        if self.frame == ReferenceFrame::Geocentric {
            for j in 0..set.n_real() {
                set.particle_mut(j).acc -= origin.acc;
            }
        }

        Ok(())
    }
}
