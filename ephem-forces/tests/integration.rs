//! End-to-end behavior of the force model, integrator, and session layer
//! against analytic ephemeris sources, plus kernel-backed scenarios that
//! skip when the JPL files are not present.

use ephem_core::constants::{PLANETARY_GM, J2000_JD};
use ephem_core::Vector3;
use ephem_forces::{
    integrate, EphemerisForces, EphemerisSource, ForceTerms, IntegratorStatus,
    ParticleSet, PerturberState, RadauIntegrator, Recorder, ReferenceFrame, Result,
    SimulationConfig,
};

/// The Sun pinned at the barycenter; a pure two-body world.
struct FixedSun;

impl EphemerisSource for FixedSun {
    fn body_count(&self) -> usize {
        1
    }

    fn query(&mut self, _index: usize, _jd: f64) -> Result<PerturberState> {
        Ok(PerturberState {
            gm: PLANETARY_GM[0],
            pos: Vector3::zeros(),
            vel: Vector3::zeros(),
            acc: Vector3::zeros(),
        })
    }
}

/// Sun at the origin with the Earth on an analytic circular orbit, so the
/// geocentric indirect term is exact.
struct CircularEarth;

impl CircularEarth {
    fn mean_motion() -> f64 {
        libm::sqrt(PLANETARY_GM[0])
    }

    fn earth_state(jd: f64) -> PerturberState {
        let n = Self::mean_motion();
        let (s, c) = libm::sincos(n * jd);
        PerturberState {
            gm: PLANETARY_GM[3],
            pos: Vector3::new(c, s, 0.0),
            vel: Vector3::new(-n * s, n * c, 0.0),
            acc: Vector3::new(-n * n * c, -n * n * s, 0.0),
        }
    }
}

impl EphemerisSource for CircularEarth {
    fn body_count(&self) -> usize {
        4
    }

    fn query(&mut self, index: usize, jd: f64) -> Result<PerturberState> {
        match index {
            0 => Ok(PerturberState {
                gm: PLANETARY_GM[0],
                pos: Vector3::zeros(),
                vel: Vector3::zeros(),
                acc: Vector3::zeros(),
            }),
            3 => Ok(Self::earth_state(jd)),
            // massless placeholders keep the planetary index layout
            _ => Ok(PerturberState {
                gm: 0.0,
                pos: Vector3::new(15.0, 15.0, 15.0),
                vel: Vector3::zeros(),
                acc: Vector3::zeros(),
            }),
        }
    }
}

fn buffers(steps: usize, n_particles: usize) -> (Vec<f64>, Vec<f64>) {
    let rows = steps * 10 + 1;
    (vec![0.0; rows], vec![0.0; rows * 6 * n_particles])
}

fn run_model<S: EphemerisSource>(
    source: S,
    config: &SimulationConfig,
    state: &[f64],
    parents: &[usize],
    var: &[f64],
    t_end: f64,
) -> (ParticleSet, IntegratorStatus) {
    let mut set = ParticleSet::from_states(state, parents, var).unwrap();
    let mut model = EphemerisForces::new(source, config);
    let mut integ = RadauIntegrator::new(
        0.0,
        config.epsilon,
        config.dt_init,
        config.min_dt,
        config.exact_finish_time,
    );
    let (mut times, mut states) = buffers(20_000, set.n_total());
    let mut recorder = Recorder::new(&mut times, &mut states, set.n_total(), 10).unwrap();
    let status = integ
        .integrate_until(t_end, &mut model, &mut set, &mut recorder)
        .unwrap();
    (set, status)
}

#[test]
fn force_free_particle_stays_on_a_straight_line() {
    let mut config = SimulationConfig::default();
    config.terms = ForceTerms::empty();
    let state = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    let (set, status) = run_model(FixedSun, &config, &state, &[], &[], 10.0);
    assert_eq!(status, IntegratorStatus::Ok);
    let p = set.particle(0);
    assert!((p.pos.x - 1.0).abs() < 1e-12);
    assert!(p.pos.y.abs() < 1e-12);
    assert!(p.vel.norm() < 1e-14);
}

#[test]
fn variational_state_matches_finite_difference_trajectories() {
    // two-body plus solar relativity, one year; delta r from the
    // variational equations against a finite-difference of the orbit
    let mut config = SimulationConfig::default();
    config.terms = ForceTerms::DIRECT_GRAVITY | ForceTerms::RELATIVITY;
    let base = [1.0, 0.0, 0.0, 0.0, 0.0172, 0.0];
    let t_end = 365.25;

    for column in [0_usize, 4] {
        let mut delta = [0.0; 6];
        delta[column] = 1.0;
        let (set, status) = run_model(FixedSun, &config, &base, &[0], &delta, t_end);
        assert_eq!(status, IntegratorStatus::Ok);
        let var = set.particle(1);

        let eps = if column < 3 { 1e-6 } else { 1e-8 };
        let mut plus = base;
        plus[column] += eps;
        let (pset, _) = run_model(FixedSun, &config, &plus, &[], &[], t_end);
        let mut minus = base;
        minus[column] -= eps;
        let (mset, _) = run_model(FixedSun, &config, &minus, &[], &[], t_end);

        let fd_pos = (pset.particle(0).pos - mset.particle(0).pos) / (2.0 * eps);
        let fd_vel = (pset.particle(0).vel - mset.particle(0).vel) / (2.0 * eps);

        let pos_err = (var.pos - fd_pos).norm() / fd_pos.norm();
        let vel_err = (var.vel - fd_vel).norm() / fd_vel.norm();
        assert!(
            pos_err < 1e-6,
            "column {}: position error {:e}",
            column,
            pos_err
        );
        assert!(
            vel_err < 1e-6,
            "column {}: velocity error {:e}",
            column,
            vel_err
        );
    }
}

#[test]
fn barycentric_and_geocentric_runs_reconcile() {
    let earth0 = CircularEarth::earth_state(0.0);
    // a wide geocentric orbit at 0.01 AU
    let r_geo = 0.01;
    let v_geo = libm::sqrt(PLANETARY_GM[3] / r_geo);

    let mut config = SimulationConfig::default();
    config.terms = ForceTerms::DIRECT_GRAVITY;
    config.frame = ReferenceFrame::Barycentric;
    let bary_state = [
        earth0.pos.x + r_geo,
        earth0.pos.y,
        0.0,
        earth0.vel.x,
        earth0.vel.y + v_geo,
        0.0,
    ];
    let t_end = 20.0;
    let (bary, status) = run_model(CircularEarth, &config, &bary_state, &[], &[], t_end);
    assert_eq!(status, IntegratorStatus::Ok);

    config.frame = ReferenceFrame::Geocentric;
    let geo_state = [r_geo, 0.0, 0.0, 0.0, v_geo, 0.0];
    let (geo, status) = run_model(CircularEarth, &config, &geo_state, &[], &[], t_end);
    assert_eq!(status, IntegratorStatus::Ok);

    let earth_t = CircularEarth::earth_state(t_end);
    let reconstructed = geo.particle(0).pos + earth_t.pos;
    let diff = (reconstructed - bary.particle(0).pos).norm();
    assert!(diff < 1e-10, "frame reconciliation differs by {:e} AU", diff);
    // sanity: the geocentric orbit actually went somewhere
    assert!((geo.particle(0).pos - Vector3::new(r_geo, 0.0, 0.0)).norm() > 1e-3);
}

#[test]
fn missing_small_body_kernel_surfaces_ephemeris_error() {
    let mut config = SimulationConfig::default();
    config.smallbody_kernel = Some("/nonexistent/sb441-n16.bsp".into());
    config.planet_kernel = Some("/nonexistent/de440.bsp".into());

    let mut times = vec![0.0; 11];
    let mut states = vec![0.0; 11 * 6];
    let outcome = integrate(
        config,
        J2000_JD,
        J2000_JD + 10.0,
        &[1.0, 0.0, 0.0, 0.0, 0.0172, 0.0],
        &[],
        &[],
        &mut times,
        &mut states,
    )
    .unwrap();
    assert_eq!(outcome.status, IntegratorStatus::EphemerisError);
    assert_eq!(outcome.steps, 0);
}

fn kernels_present() -> bool {
    std::path::Path::new("de440.bsp").exists()
        && std::path::Path::new("sb441-n16.bsp").exists()
}

#[test]
fn kernel_backed_orbit_stays_bounded() {
    if !kernels_present() {
        eprintln!("skipping: JPL kernels not found");
        return;
    }
    let config = SimulationConfig::default();
    let mut times = vec![0.0; 20_001];
    let mut states = vec![0.0; 20_001 * 6];
    let outcome = integrate(
        config,
        J2000_JD,
        J2000_JD + 365.25,
        &[1.0, 0.0, 0.0, 0.0, 0.0172, 0.0],
        &[],
        &[],
        &mut times,
        &mut states,
    )
    .unwrap();
    assert_eq!(outcome.status, IntegratorStatus::Ok);
    assert!(outcome.steps > 0);

    let last = outcome.steps * 10;
    let r = Vector3::new(states[6 * last], states[6 * last + 1], states[6 * last + 2]).norm();
    assert!(r > 0.9 && r < 1.1, "final radius {} AU", r);
}

#[test]
fn kernel_backed_asteroid_toggle_is_a_small_perturbation() {
    if !kernels_present() {
        eprintln!("skipping: JPL kernels not found");
        return;
    }
    let state = [1.0, 0.0, 0.0, 0.0, 0.0172, 0.0];
    let mut final_pos = Vec::new();
    for with_asteroids in [true, false] {
        let mut config = SimulationConfig::default();
        if !with_asteroids {
            config.terms.remove(ForceTerms::ASTEROID_GRAVITY);
        }
        let mut times = vec![0.0; 20_001];
        let mut states = vec![0.0; 20_001 * 6];
        let outcome = integrate(
            config,
            J2000_JD,
            J2000_JD + 365.25,
            &state,
            &[],
            &[],
            &mut times,
            &mut states,
        )
        .unwrap();
        assert_eq!(outcome.status, IntegratorStatus::Ok);
        let last = outcome.steps * 10;
        final_pos.push(Vector3::new(
            states[6 * last],
            states[6 * last + 1],
            states[6 * last + 2],
        ));
    }
    let diff = (final_pos[0] - final_pos[1]).norm();
    assert!(diff > 0.0, "asteroids had no effect at all");
    assert!(diff < 1e-4, "asteroid effect unexpectedly large: {} AU", diff);
}

#[test]
fn kernel_backed_buffer_full_stops_cleanly() {
    if !kernels_present() {
        eprintln!("skipping: JPL kernels not found");
        return;
    }
    let config = SimulationConfig::default();
    // room for exactly three steps
    let mut times = vec![0.0; 31];
    let mut states = vec![0.0; 31 * 6];
    let outcome = integrate(
        config,
        J2000_JD,
        J2000_JD + 10_000.0,
        &[1.0, 0.0, 0.0, 0.0, 0.0172, 0.0],
        &[],
        &[],
        &mut times,
        &mut states,
    )
    .unwrap();
    assert_eq!(outcome.status, IntegratorStatus::BufferFull);
    assert!(outcome.steps <= 3);
}
