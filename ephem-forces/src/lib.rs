//! Ephemeris-quality integration of solar-system test particles and
//! their first-order variational partners.
//!
//! The right-hand side combines direct Newtonian gravity from the Sun,
//! planets, Moon, Pluto, and sixteen massive main-belt asteroids (read
//! from JPL binary kernels through [`ephem_spk`]), Earth J2/J4 and solar
//! J2 zonal harmonics, optional Marsden A1/A2/A3 non-gravitational
//! forces, and a relativistic correction (Damour-Deruelle by default, the
//! full EIH treatment on request). Every term also contributes the
//! Jacobian block that drives the variational particles, so sensitivities
//! stay consistent with the accelerations they differentiate.
//!
//! An adaptive Gauss-Radau integrator ([`radau::RadauIntegrator`])
//! advances the state; after each accepted step the dense-output
//! [`recorder::Recorder`] reconstructs the trajectory on a set of
//! sub-nodes directly from the integrator's b-coefficients.
//!
//! Units are AU, days (TDB), and solar masses throughout.
//!
//! # Entry points
//!
//! [`Simulation`] assembles a run; [`integrate`] is the one-shot wrapper:
//!
//! ```no_run
//! use ephem_forces::{integrate, SimulationConfig};
//!
//! let mut times = vec![0.0; 1001];
//! let mut states = vec![0.0; 1001 * 6];
//! let outcome = integrate(
//!     SimulationConfig::default(),
//!     2451545.0,
//!     2451645.0,
//!     &[1.0, 0.0, 0.0, 0.0, 0.0172, 0.0],
//!     &[],
//!     &[],
//!     &mut times,
//!     &mut states,
//! )?;
//! println!("{} after {} steps", outcome.status, outcome.steps);
//! # Ok::<(), ephem_forces::Error>(())
//! ```

pub mod config;
pub mod ephemeris;
pub mod error;
pub mod forces;
pub mod particle;
pub mod radau;
pub mod recorder;
pub mod session;

pub use config::{ForceTerms, GrModel, NonGravParams, ReferenceFrame, SimulationConfig};
pub use ephemeris::{EphemerisSource, JplEphemeris, PerturberState, N_ASTEROID, N_PLANETARY};
pub use error::{Error, IntegratorStatus, Result};
pub use forces::EphemerisForces;
pub use particle::{Particle, ParticleSet, VariationalLink};
pub use radau::{AccelerationModel, RadauIntegrator};
pub use recorder::Recorder;
pub use session::{integrate, RunOutcome, Simulation};
