//! Perturber façade: uniform access to the state of any massive body at
//! any TDB epoch.
//!
//! Indices `0..11` name the planetary set (Sun, Mercury, Venus, Earth,
//! Moon, Mars, Jupiter, Saturn, Uranus, Neptune, Pluto) read from the
//! DE kernel in barycentric coordinates; `11..27` name the sixteen massive
//! asteroids of the sb441-n16 kernel, returned heliocentric and translated
//! to barycentric here. Asteroid velocities and accelerations are not
//! defined and come back as NaN.

use crate::config::SimulationConfig;
use crate::error::{Error, Result};
use ephem_core::constants::{ASTEROID_GM, AU_KM, PLANETARY_GM, SECONDS_PER_DAY};
use ephem_core::Vector3;
use ephem_spk::{naif, SpkFile, State};
use std::path::PathBuf;

pub const N_PLANETARY: usize = 11;
pub const N_ASTEROID: usize = 16;
pub const N_PERTURBERS: usize = N_PLANETARY + N_ASTEROID;

/// Perturber indices with fixed roles in the force model.
pub const SUN: usize = 0;
pub const EARTH: usize = 3;

/// NAIF targets for the planetary indices, resolved to the SSB by chaining
/// through the kernel's center hierarchy (e.g. 399 -> 3 -> 0).
const PLANETARY_NAIF: [i32; N_PLANETARY] = [
    naif::SUN,
    naif::MERCURY_BARYCENTER,
    naif::VENUS_BARYCENTER,
    naif::EARTH,
    naif::MOON,
    naif::MARS_BARYCENTER,
    naif::JUPITER_BARYCENTER,
    naif::SATURN_BARYCENTER,
    naif::URANUS_BARYCENTER,
    naif::NEPTUNE_BARYCENTER,
    naif::PLUTO_BARYCENTER,
];

/// Barycentric state of one perturber in AU, AU/day, AU/day^2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerturberState {
    pub gm: f64,
    pub pos: Vector3,
    pub vel: Vector3,
    pub acc: Vector3,
}

impl PerturberState {
    /// The massless state at the barycenter; the origin of barycentric runs.
    pub fn barycenter() -> Self {
        Self {
            gm: 0.0,
            pos: Vector3::zeros(),
            vel: Vector3::zeros(),
            acc: Vector3::zeros(),
        }
    }
}

/// The seam between the force model and whatever supplies perturber
/// states. The production implementation is [`JplEphemeris`]; tests
/// substitute analytic sources.
pub trait EphemerisSource {
    /// Number of perturbers this source serves; valid indices are
    /// `0..body_count()`.
    fn body_count(&self) -> usize;

    fn query(&mut self, index: usize, jd_tdb: f64) -> Result<PerturberState>;
}

/// SPK-backed perturber source.
pub struct JplEphemeris {
    planets: SpkFile,
    small_bodies: SpkFile,
    /// Sun-centered segment indices of the small-body kernel, file order.
    asteroid_segments: Vec<usize>,
    /// Sun state reused for every asteroid translation at the same epoch.
    sun_cache: Option<(f64, Vector3)>,
}

fn resolve_path(overridden: &Option<PathBuf>, env: &str, default: &str) -> PathBuf {
    if let Some(path) = overridden {
        return path.clone();
    }
    match std::env::var(env) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(default),
    }
}

fn to_au(state: &State) -> (Vector3, Vector3, Vector3) {
    let pos = Vector3::from_array(state.pos) / AU_KM;
    let vel = Vector3::from_array(state.vel) * (SECONDS_PER_DAY / AU_KM);
    let acc = Vector3::from_array(state.acc) * (SECONDS_PER_DAY * SECONDS_PER_DAY / AU_KM);
    (pos, vel, acc)
}

impl JplEphemeris {
    /// Opens both kernels read-only. Paths resolve from the configuration,
    /// then the `JPL_PLANET_EPHEM` / `JPL_SB_EPHEM` environment variables,
    /// then the working-directory defaults.
    pub fn open(config: &SimulationConfig) -> Result<Self> {
        let planet_path = resolve_path(&config.planet_kernel, "JPL_PLANET_EPHEM", "de440.bsp");
        let smallbody_path = resolve_path(&config.smallbody_kernel, "JPL_SB_EPHEM", "sb441-n16.bsp");

        let planets = SpkFile::open(&planet_path).map_err(|e| {
            Error::EphemerisUnavailable(format!("{}: {}", planet_path.display(), e))
        })?;
        let small_bodies = SpkFile::open(&smallbody_path).map_err(|e| {
            Error::EphemerisUnavailable(format!("{}: {}", smallbody_path.display(), e))
        })?;

        let mut asteroid_segments = small_bodies.segments_centered_on(naif::SUN);
        if asteroid_segments.len() < N_ASTEROID {
            return Err(Error::EphemerisUnavailable(format!(
                "{}: {} heliocentric segments, expected {}",
                smallbody_path.display(),
                asteroid_segments.len(),
                N_ASTEROID
            )));
        }
        asteroid_segments.truncate(N_ASTEROID);

        log::debug!(
            "ephemeris ready: {} + {}",
            planet_path.display(),
            smallbody_path.display()
        );
        Ok(Self {
            planets,
            small_bodies,
            asteroid_segments,
            sun_cache: None,
        })
    }

    fn sun_barycentric(&mut self, jd_tdb: f64) -> Result<Vector3> {
        if let Some((cached_t, pos)) = self.sun_cache {
            if cached_t == jd_tdb {
                return Ok(pos);
            }
        }
        let state = self.planets.state_to_ssb(naif::SUN, jd_tdb)?;
        let (pos, _, _) = to_au(&state);
        self.sun_cache = Some((jd_tdb, pos));
        Ok(pos)
    }
}

impl EphemerisSource for JplEphemeris {
    fn body_count(&self) -> usize {
        N_PERTURBERS
    }

    fn query(&mut self, index: usize, jd_tdb: f64) -> Result<PerturberState> {
        if index < N_PLANETARY {
            let state = self.planets.state_to_ssb(PLANETARY_NAIF[index], jd_tdb)?;
            let (pos, vel, acc) = to_au(&state);
            Ok(PerturberState {
                gm: PLANETARY_GM[index],
                pos,
                vel,
                acc,
            })
        } else if index < N_PERTURBERS {
            let ast = index - N_PLANETARY;
            let helio = self
                .small_bodies
                .segment_state(self.asteroid_segments[ast], jd_tdb)?;
            let sun = self.sun_barycentric(jd_tdb)?;
            let pos = Vector3::from_array(helio.pos) / AU_KM + sun;
            Ok(PerturberState {
                gm: ASTEROID_GM[ast],
                pos,
                vel: Vector3::new(f64::NAN, f64::NAN, f64::NAN),
                acc: Vector3::new(f64::NAN, f64::NAN, f64::NAN),
            })
        } else {
            Err(Error::BodyIndexOutOfRange(index))
        }
    }
}
