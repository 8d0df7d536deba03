//! Zonal-harmonic accelerations: Earth J2/J4 and solar J2.
//!
//! Positions are rotated into the body-equatorial frame, the acceleration
//! and its analytic position Jacobian are evaluated there, and both are
//! rotated back to ICRF. The Jacobian factors are polynomials in
//! `u^2 = z^2/r^2`.

use crate::ephemeris::PerturberState;
use crate::error::Result;
use crate::particle::ParticleSet;
use ephem_core::constants::{
    EARTH_J2, EARTH_J4, EARTH_RADIUS_EQ_AU, SUN_J2, SUN_RADIUS_EQ_AU,
};
use ephem_core::frame::{apply_mat3, Frame, Mat3};
use ephem_core::Vector3;

/// J2 acceleration and Jacobian in the body-equatorial frame.
fn zonal_j2(gm: f64, j2: f64, r_eq: f64, d: Vector3, r2: f64) -> (Vector3, Mat3) {
    let r = libm::sqrt(r2);
    let prefac = 3.0 * j2 * r_eq * r_eq * gm / (2.0 * r2 * r2 * r);
    let u2 = d.z * d.z / r2;
    let fac = 5.0 * u2 - 1.0;
    let fac2 = 7.0 * u2 - 1.0;
    let fac3 = 35.0 * u2 * u2 - 30.0 * u2 + 3.0;

    let acc = Vector3::new(
        prefac * fac * d.x,
        prefac * fac * d.y,
        prefac * (fac - 2.0) * d.z,
    );

    let jac = [
        [
            prefac * (fac - 5.0 * fac2 * d.x * d.x / r2),
            -5.0 * prefac * fac2 * d.x * d.y / r2,
            -5.0 * prefac * (fac2 - 2.0) * d.x * d.z / r2,
        ],
        [
            -5.0 * prefac * fac2 * d.x * d.y / r2,
            prefac * (fac - 5.0 * fac2 * d.y * d.y / r2),
            -5.0 * prefac * (fac2 - 2.0) * d.y * d.z / r2,
        ],
        [
            -5.0 * prefac * (fac2 - 2.0) * d.x * d.z / r2,
            -5.0 * prefac * (fac2 - 2.0) * d.y * d.z / r2,
            -prefac * fac3,
        ],
    ];
    (acc, jac)
}

/// J4 acceleration and Jacobian in the body-equatorial frame.
fn zonal_j4(gm: f64, j4: f64, r_eq: f64, d: Vector3, r2: f64) -> (Vector3, Mat3) {
    let r = libm::sqrt(r2);
    let r_eq2 = r_eq * r_eq;
    let prefac = 5.0 * j4 * r_eq2 * r_eq2 * gm / (8.0 * r2 * r2 * r2 * r);
    let u2 = d.z * d.z / r2;
    let fac = 63.0 * u2 * u2 - 42.0 * u2 + 3.0;
    let fac2 = 33.0 * u2 * u2 - 18.0 * u2 + 1.0;
    let fac3 = 33.0 * u2 * u2 - 30.0 * u2 + 5.0;
    let fac4 = 231.0 * u2 * u2 * u2 - 315.0 * u2 * u2 + 105.0 * u2 - 5.0;

    let acc = Vector3::new(
        prefac * fac * d.x,
        prefac * fac * d.y,
        prefac * (fac + 12.0 - 28.0 * u2) * d.z,
    );

    let jac = [
        [
            prefac * (fac - 21.0 * fac2 * d.x * d.x / r2),
            -21.0 * prefac * fac2 * d.x * d.y / r2,
            -21.0 * prefac * fac3 * d.x * d.z / r2,
        ],
        [
            -21.0 * prefac * fac2 * d.x * d.y / r2,
            prefac * (fac - 21.0 * fac2 * d.y * d.y / r2),
            -21.0 * prefac * fac3 * d.y * d.z / r2,
        ],
        [
            -21.0 * prefac * fac3 * d.x * d.z / r2,
            -21.0 * prefac * fac3 * d.y * d.z / r2,
            -3.0 * prefac * fac4,
        ],
    ];
    (acc, jac)
}

/// Rotates each particle into the body frame, evaluates `eval` there, and
/// rotates the acceleration and Jacobian back before accumulating.
fn accumulate_zonal<F>(
    set: &mut ParticleSet,
    center: Vector3,
    origin_pos: Vector3,
    frame: &Frame,
    eval: F,
) -> Result<()>
where
    F: Fn(Vector3, f64) -> (Vector3, Mat3),
{
    for j in 0..set.n_real() {
        let d_icrf = set.particle(j).pos + origin_pos - center;
        let d = frame.rotate(d_icrf);
        let r2 = d.norm_squared();

        let (acc_body, jac_body) = eval(d, r2);
        set.particle_mut(j).acc += frame.inverse_rotate(acc_body);

        let jac = frame.rotate_jacobian(&jac_body);
        for k in 0..set.link_count() {
            let link = set.link(k);
            if link.parent != j {
                continue;
            }
            let dr = set.particle(link.index).pos;
            set.particle_mut(link.index).acc += apply_mat3(&jac, dr);
        }
    }
    Ok(())
}

/// Earth J2 + J4 about the geocenter.
pub fn earth_harmonics(
    set: &mut ParticleSet,
    earth: &PerturberState,
    origin_pos: Vector3,
    frame: &Frame,
) -> Result<()> {
    let gm = earth.gm;
    accumulate_zonal(set, earth.pos, origin_pos, frame, |d, r2| {
        let (acc2, jac2) = zonal_j2(gm, EARTH_J2, EARTH_RADIUS_EQ_AU, d, r2);
        let (acc4, jac4) = zonal_j4(gm, EARTH_J4, EARTH_RADIUS_EQ_AU, d, r2);
        let mut jac = jac2;
        for (row, row4) in jac.iter_mut().zip(jac4.iter()) {
            for (cell, cell4) in row.iter_mut().zip(row4.iter()) {
                *cell += cell4;
            }
        }
        (acc2 + acc4, jac)
    })
}

/// Solar J2 about the Sun's center.
pub fn sun_j2(
    set: &mut ParticleSet,
    sun: &PerturberState,
    origin_pos: Vector3,
    frame: &Frame,
) -> Result<()> {
    let gm = sun.gm;
    accumulate_zonal(set, sun.pos, origin_pos, frame, |d, r2| {
        zonal_j2(gm, SUN_J2, SUN_RADIUS_EQ_AU, d, r2)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephem_core::constants::PLANETARY_GM;

    fn earth_state() -> PerturberState {
        PerturberState {
            gm: PLANETARY_GM[3],
            pos: Vector3::zeros(),
            vel: Vector3::zeros(),
            acc: Vector3::zeros(),
        }
    }

    fn sun_state() -> PerturberState {
        PerturberState {
            gm: PLANETARY_GM[0],
            pos: Vector3::zeros(),
            vel: Vector3::zeros(),
            acc: Vector3::zeros(),
        }
    }

    fn single(pos: [f64; 3]) -> ParticleSet {
        ParticleSet::from_states(&[pos[0], pos[1], pos[2], 0.0, 0.0, 0.0], &[], &[]).unwrap()
    }

    #[test]
    fn equatorial_j2_magnitude() {
        // In the equatorial plane u^2 = 0 and the J2 acceleration reduces to
        // -(3/2) J2 GM R^2 / r^4, radial. J4 is five orders smaller.
        let r = EARTH_RADIUS_EQ_AU * 1.1;
        let mut set = single([r, 0.0, 0.0]);
        let frame = Frame::earth_equatorial();
        earth_harmonics(&mut set, &earth_state(), Vector3::zeros(), &frame).unwrap();
        let acc = set.particle(0).acc;
        let expect = -1.5 * EARTH_J2 * PLANETARY_GM[3] * EARTH_RADIUS_EQ_AU * EARTH_RADIUS_EQ_AU
            / (r * r * r * r);
        // J4 contributes at the few-per-mille level this close in
        assert!(
            (acc.x - expect).abs() < expect.abs() * 5e-3,
            "got {} expected {}",
            acc.x,
            expect
        );
        assert!(acc.y.abs() < expect.abs() * 1e-10);
    }

    #[test]
    fn polar_acceleration_along_pole() {
        let r = EARTH_RADIUS_EQ_AU * 1.1;
        let mut set = single([0.0, 0.0, r]);
        let frame = Frame::earth_equatorial();
        earth_harmonics(&mut set, &earth_state(), Vector3::zeros(), &frame).unwrap();
        let acc = set.particle(0).acc;
        // axisymmetric field: on the pole the acceleration is axial
        assert!(acc.x.abs() < acc.z.abs() * 1e-10);
        assert!(acc.y.abs() < acc.z.abs() * 1e-10);
        // J2 pushes outward along the pole (u^2 = 1: fac - 2 = 2 > 0)
        assert!(acc.z > 0.0);
    }

    fn numeric_jacobian_column<F>(accel: F, base: [f64; 3], axis: usize) -> Vector3
    where
        F: Fn([f64; 3]) -> Vector3,
    {
        let eps = 1e-8;
        let mut plus = base;
        plus[axis] += eps;
        let mut minus = base;
        minus[axis] -= eps;
        (accel(plus) - accel(minus)) / (2.0 * eps)
    }

    #[test]
    fn earth_jacobian_matches_finite_difference() {
        let base = [
            EARTH_RADIUS_EQ_AU * 1.3,
            EARTH_RADIUS_EQ_AU * 0.4,
            EARTH_RADIUS_EQ_AU * 0.9,
        ];
        let frame = Frame::earth_equatorial();
        let accel = |pos: [f64; 3]| {
            let mut set = single(pos);
            earth_harmonics(&mut set, &earth_state(), Vector3::zeros(), &frame).unwrap();
            set.particle(0).acc
        };

        for axis in 0..3 {
            let mut dr = [0.0; 3];
            dr[axis] = 1.0;
            let state = [base[0], base[1], base[2], 0.0, 0.0, 0.0];
            let var = [dr[0], dr[1], dr[2], 0.0, 0.0, 0.0];
            let mut set = ParticleSet::from_states(&state, &[0], &var).unwrap();
            earth_harmonics(&mut set, &earth_state(), Vector3::zeros(), &frame).unwrap();
            let analytic = set.particle(1).acc;
            let numeric = numeric_jacobian_column(accel, base, axis);
            let err = (analytic - numeric).norm() / numeric.norm();
            assert!(err < 1e-5, "axis {}: relative error {}", axis, err);
        }
    }

    #[test]
    fn sun_jacobian_matches_finite_difference() {
        let base = [0.9, 0.35, 0.2];
        let frame = Frame::sun_equatorial();
        let accel = |pos: [f64; 3]| {
            let mut set = single(pos);
            sun_j2(&mut set, &sun_state(), Vector3::zeros(), &frame).unwrap();
            set.particle(0).acc
        };

        for axis in 0..3 {
            let mut dr = [0.0; 3];
            dr[axis] = 1.0;
            let state = [base[0], base[1], base[2], 0.0, 0.0, 0.0];
            let var = [dr[0], dr[1], dr[2], 0.0, 0.0, 0.0];
            let mut set = ParticleSet::from_states(&state, &[0], &var).unwrap();
            sun_j2(&mut set, &sun_state(), Vector3::zeros(), &frame).unwrap();
            let analytic = set.particle(1).acc;
            let numeric = numeric_jacobian_column(accel, base, axis);
            let err = (analytic - numeric).norm() / numeric.norm();
            assert!(err < 1e-5, "axis {}: relative error {}", axis, err);
        }
    }

    #[test]
    fn sun_frame_orientation_matters() {
        // The solar pole is tilted; the same heliocentric distance along
        // different ICRF axes must give different oblateness accelerations.
        let frame = Frame::sun_equatorial();
        let mut a = single([0.5, 0.0, 0.0]);
        sun_j2(&mut a, &sun_state(), Vector3::zeros(), &frame).unwrap();
        let mut b = single([0.0, 0.0, 0.5]);
        sun_j2(&mut b, &sun_state(), Vector3::zeros(), &frame).unwrap();
        let na = a.particle(0).acc.norm();
        let nb = b.particle(0).acc.norm();
        assert!((na - nb).abs() > 1e-3 * na.max(nb));
    }
}
