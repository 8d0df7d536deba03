//! Marsden-style non-gravitational comet forces.
//!
//! With heliocentric position d and velocity w, the basis is radial d,
//! out-of-plane h = d x w, and transverse t = h x d; the acceleration is
//! `g(r) (A1 rhat + A2 that + A3 hhat)` with `g = 1/r^2`. The 3x6 Jacobian
//! couples positions and velocities through the rotating basis.

use crate::config::NonGravParams;
use crate::ephemeris::PerturberState;
use crate::error::Result;
use crate::particle::ParticleSet;
use ephem_core::Vector3;

pub fn accumulate(
    set: &mut ParticleSet,
    sun: &PerturberState,
    origin: &PerturberState,
    params: NonGravParams,
) -> Result<()> {
    if params.is_zero() {
        return Ok(());
    }
    let NonGravParams { a1, a2, a3 } = params;

    for j in 0..set.n_real() {
        let p = *set.particle(j);
        let dx = p.pos.x + origin.pos.x - sun.pos.x;
        let dy = p.pos.y + origin.pos.y - sun.pos.y;
        let dz = p.pos.z + origin.pos.z - sun.pos.z;
        let dvx = p.vel.x + origin.vel.x - sun.vel.x;
        let dvy = p.vel.y + origin.vel.y - sun.vel.y;
        let dvz = p.vel.z + origin.vel.z - sun.vel.z;

        let r2 = dx * dx + dy * dy + dz * dz;
        let r = libm::sqrt(r2);
        let g = 1.0 / r2;

        let hx = dy * dvz - dz * dvy;
        let hy = dz * dvx - dx * dvz;
        let hz = dx * dvy - dy * dvx;
        let h = libm::sqrt(hx * hx + hy * hy + hz * hz);

        let tx = hy * dz - hz * dy;
        let ty = hz * dx - hx * dz;
        let tz = hx * dy - hy * dx;
        let tn = libm::sqrt(tx * tx + ty * ty + tz * tz);

        set.particle_mut(j).acc += Vector3::new(
            a1 * g * dx / r + a2 * g * tx / tn + a3 * g * hx / h,
            a1 * g * dy / r + a2 * g * ty / tn + a3 * g * hy / h,
            a1 * g * dz / r + a2 * g * tz / tn + a3 * g * hz / h,
        );

        let r3 = r * r * r;
        let v2 = dvx * dvx + dvy * dvy + dvz * dvz;
        let rdotv = dx * dvx + dy * dvy + dz * dvz;
        let vdott = dvx * tx + dvy * ty + dvz * tz;

        let dgdr = -2.0 * g / r;
        let dgx = dgdr * dx / r;
        let dgy = dgdr * dy / r;
        let dgz = dgdr * dz / r;

        let hxh3 = hx / (h * h * h);
        let hyh3 = hy / (h * h * h);
        let hzh3 = hz / (h * h * h);

        let txt3 = tx / (tn * tn * tn);
        let tyt3 = ty / (tn * tn * tn);
        let tzt3 = tz / (tn * tn * tn);

        let jxx = a1 * (dgx * dx / r + g * (1.0 / r - dx * dx / r3))
            + a2 * (dgx * tx / tn
                + g * ((dx * dvx - rdotv) / tn - txt3 * (2.0 * dx * vdott - rdotv * tx)))
            + a3 * (dgx * hx / h + g * (-hxh3) * (v2 * dx - rdotv * dvx));

        let jyy = a1 * (dgy * dy / r + g * (1.0 / r - dy * dy / r3))
            + a2 * (dgy * ty / tn
                + g * ((dy * dvy - rdotv) / tn - tyt3 * (2.0 * dy * vdott - rdotv * ty)))
            + a3 * (dgy * hy / h + g * (-hyh3) * (v2 * dy - rdotv * dvy));

        let jzz = a1 * (dgz * dz / r + g * (1.0 / r - dz * dz / r3))
            + a2 * (dgz * tz / tn
                + g * ((dz * dvz - rdotv) / tn - tzt3 * (2.0 * dz * vdott - rdotv * tz)))
            + a3 * (dgz * hz / h + g * (-hzh3) * (v2 * dz - rdotv * dvz));

        let jxy = a1 * (dgy * dx / r + g * (-dx * dy / r3))
            + a2 * (dgy * tx / tn
                + g * ((2.0 * dy * dvx - dx * dvy) / tn - txt3 * (2.0 * dy * vdott - rdotv * ty)))
            + a3 * (dgy * hx / h + g * (dvz / h - hxh3 * (v2 * dy - rdotv * dvy)));

        let jyx = a1 * (dgx * dy / r + g * (-dy * dx / r3))
            + a2 * (dgx * ty / tn
                + g * ((2.0 * dx * dvy - dy * dvx) / tn - tyt3 * (2.0 * dx * vdott - rdotv * tx)))
            + a3 * (dgx * hy / h + g * (-dvz / h - hyh3 * (v2 * dx - rdotv * dvx)));

        let jxz = a1 * (dgz * dx / r + g * (-dx * dz / r3))
            + a2 * (dgz * tx / tn
                + g * ((2.0 * dz * dvx - dx * dvz) / tn - txt3 * (2.0 * dz * vdott - rdotv * tz)))
            + a3 * (dgz * hx / h + g * (-dvy / h - hxh3 * (v2 * dz - rdotv * dvz)));

        let jzx = a1 * (dgx * dz / r + g * (-dz * dx / r3))
            + a2 * (dgx * tz / tn
                + g * ((2.0 * dx * dvz - dz * dvx) / tn - tzt3 * (2.0 * dx * vdott - rdotv * tx)))
            + a3 * (dgx * hz / h + g * (dvy / h - hzh3 * (v2 * dx - rdotv * dvx)));

        let jyz = a1 * (dgz * dy / r + g * (-dy * dz / r3))
            + a2 * (dgz * ty / tn
                + g * ((2.0 * dz * dvy - dy * dvz) / tn - tyt3 * (2.0 * dz * vdott - rdotv * tz)))
            + a3 * (dgz * hy / h + g * (dvx / h - hyh3 * (v2 * dz - rdotv * dvz)));

        let jzy = a1 * (dgy * dz / r + g * (-dz * dy / r3))
            + a2 * (dgy * tz / tn
                + g * ((2.0 * dy * dvz - dz * dvy) / tn - tzt3 * (2.0 * dy * vdott - rdotv * ty)))
            + a3 * (dgy * hz / h + g * (-dvx / h - hzh3 * (v2 * dy - rdotv * dvy)));

        let jxvx = a2 * g * ((dy * dy + dz * dz) / tn - txt3 * r2 * tx)
            + a3 * g * (-hxh3 * (r2 * dvx - dx * rdotv));

        let jyvy = a2 * g * ((dx * dx + dz * dz) / tn - tyt3 * r2 * ty)
            + a3 * g * (-hyh3 * (r2 * dvy - dy * rdotv));

        let jzvz = a2 * g * ((dx * dx + dy * dy) / tn - tzt3 * r2 * tz)
            + a3 * g * (-hzh3 * (r2 * dvz - dz * rdotv));

        let jxvy = a2 * g * (-dy * dx / tn - tyt3 * r2 * tx)
            + a3 * g * (-dz / h - hxh3 * (r2 * dvy - dy * rdotv));

        let jyvx = a2 * g * (-dx * dy / tn - txt3 * r2 * ty)
            + a3 * g * (dz / h - hyh3 * (r2 * dvx - dx * rdotv));

        let jxvz = a2 * g * (-dz * dx / tn - tzt3 * r2 * tx)
            + a3 * g * (dy / h - hxh3 * (r2 * dvz - dz * rdotv));

        let jzvx = a2 * g * (-dx * dz / tn - txt3 * r2 * tz)
            + a3 * g * (-dy / h - hzh3 * (r2 * dvx - dx * rdotv));

        let jyvz = a2 * g * (-dz * dy / tn - tzt3 * r2 * ty)
            + a3 * g * (-dx / h - hyh3 * (r2 * dvz - dz * rdotv));

        let jzvy = a2 * g * (-dy * dz / tn - tyt3 * r2 * tz)
            + a3 * g * (dx / h - hzh3 * (r2 * dvy - dy * rdotv));

        for k in 0..set.link_count() {
            let link = set.link(k);
            if link.parent != j {
                continue;
            }
            let dp = *set.particle(link.index);
            let da = Vector3::new(
                dp.pos.x * jxx + dp.pos.y * jxy + dp.pos.z * jxz
                    + dp.vel.x * jxvx + dp.vel.y * jxvy + dp.vel.z * jxvz,
                dp.pos.x * jyx + dp.pos.y * jyy + dp.pos.z * jyz
                    + dp.vel.x * jyvx + dp.vel.y * jyvy + dp.vel.z * jyvz,
                dp.pos.x * jzx + dp.pos.y * jzy + dp.pos.z * jzz
                    + dp.vel.x * jzvx + dp.vel.y * jzvy + dp.vel.z * jzvz,
            );
            set.particle_mut(link.index).acc += da;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sun() -> PerturberState {
        PerturberState {
            gm: ephem_core::constants::PLANETARY_GM[0],
            pos: Vector3::zeros(),
            vel: Vector3::zeros(),
            acc: Vector3::zeros(),
        }
    }

    fn origin() -> PerturberState {
        PerturberState::barycenter()
    }

    fn single(state: [f64; 6]) -> ParticleSet {
        ParticleSet::from_states(&state, &[], &[]).unwrap()
    }

    const ORBITAL_STATE: [f64; 6] = [0.9, 0.3, 0.05, -0.004, 0.016, 0.001];

    #[test]
    fn zero_coefficients_do_nothing() {
        let mut set = single(ORBITAL_STATE);
        accumulate(&mut set, &sun(), &origin(), NonGravParams::default()).unwrap();
        assert_eq!(set.particle(0).acc, Vector3::zeros());
    }

    #[test]
    fn pure_radial_term_points_outward() {
        let mut set = single([1.0, 0.0, 0.0, 0.0, 0.017, 0.0]);
        let params = NonGravParams::new(1.9e-10, 0.0, 0.0);
        accumulate(&mut set, &sun(), &origin(), params).unwrap();
        let acc = set.particle(0).acc;
        assert!((acc.x - 1.9e-10).abs() < 1e-20);
        assert!(acc.y.abs() < 1e-24);
    }

    #[test]
    fn transverse_term_along_velocity_for_circular_geometry() {
        // circular geometry: velocity is already transverse
        let mut set = single([1.0, 0.0, 0.0, 0.0, 0.017, 0.0]);
        let params = NonGravParams::new(0.0, 1.0e-10, 0.0);
        accumulate(&mut set, &sun(), &origin(), params).unwrap();
        let acc = set.particle(0).acc;
        assert!(acc.x.abs() < 1e-22);
        assert!((acc.y - 1.0e-10).abs() < 1e-20);
    }

    #[test]
    fn normal_term_along_angular_momentum() {
        let mut set = single([1.0, 0.0, 0.0, 0.0, 0.017, 0.0]);
        let params = NonGravParams::new(0.0, 0.0, 2.0e-11);
        accumulate(&mut set, &sun(), &origin(), params).unwrap();
        let acc = set.particle(0).acc;
        assert!((acc.z - 2.0e-11).abs() < 1e-21);
        assert!(acc.x.abs() < 1e-23);
    }

    fn accel(state: [f64; 6], params: NonGravParams) -> Vector3 {
        let mut set = single(state);
        accumulate(&mut set, &sun(), &origin(), params).unwrap();
        set.particle(0).acc
    }

    fn check_jacobian_column(params: NonGravParams, column: usize, eps: f64) {
        let mut delta = [0.0; 6];
        delta[column] = 1.0;
        let var = delta;
        let mut set = ParticleSet::from_states(&ORBITAL_STATE, &[0], &var).unwrap();
        accumulate(&mut set, &sun(), &origin(), params).unwrap();
        let analytic = set.particle(1).acc;

        let mut plus = ORBITAL_STATE;
        plus[column] += eps;
        let mut minus = ORBITAL_STATE;
        minus[column] -= eps;
        let numeric = (accel(plus, params) - accel(minus, params)) / (2.0 * eps);

        let scale = numeric.norm().max(analytic.norm());
        if scale == 0.0 {
            return;
        }
        let err = (analytic - numeric).norm() / scale;
        assert!(err < 1e-5, "column {}: relative error {}", column, err);
    }

    #[test]
    fn radial_jacobian_matches_finite_difference() {
        let params = NonGravParams::new(1.9e-10, 0.0, 0.0);
        for col in 0..6 {
            check_jacobian_column(params, col, 1e-7);
        }
    }

    #[test]
    fn transverse_jacobian_matches_finite_difference() {
        let params = NonGravParams::new(0.0, -5.6e-14, 0.0);
        for col in 0..6 {
            check_jacobian_column(params, col, 1e-7);
        }
    }

    #[test]
    fn normal_jacobian_matches_finite_difference() {
        let params = NonGravParams::new(0.0, 0.0, 2.3e-10);
        for col in 0..6 {
            check_jacobian_column(params, col, 1e-7);
        }
    }

    #[test]
    fn combined_jacobian_matches_finite_difference() {
        let params = NonGravParams::new(2.8e-9, -2.5e-10, 2.3e-10);
        for col in 0..6 {
            check_jacobian_column(params, col, 1e-7);
        }
    }
}
