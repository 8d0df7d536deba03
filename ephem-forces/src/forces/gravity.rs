//! Direct Newtonian point-mass gravity from every perturber, with the
//! variational 3x3 block `J_ab = 3 d_a d_b / r^5 - delta_ab / r^3`.

use crate::ephemeris::EphemerisSource;
use crate::error::Result;
use crate::particle::ParticleSet;
use ephem_core::Vector3;

/// Accumulates `-GM d / |d|^3` on every real particle and `GM J dr` on
/// every variational partner, for perturbers `0..n_bodies`. The perturber
/// loop is outermost so one ephemeris query serves all particles.
pub fn accumulate<S: EphemerisSource>(
    source: &mut S,
    jd_tdb: f64,
    set: &mut ParticleSet,
    origin_pos: Vector3,
    n_bodies: usize,
) -> Result<()> {
    for i in 0..n_bodies {
        let body = source.query(i, jd_tdb)?;

        for j in 0..set.n_real() {
            let d = set.particle(j).pos + origin_pos - body.pos;
            let r2 = d.norm_squared();
            let r = libm::sqrt(r2);
            let r3inv = 1.0 / (r2 * r);
            let r5inv = 3.0 * r3inv / r2;
            let prefac = body.gm * r3inv;

            set.particle_mut(j).acc -= prefac * d;

            // Position Jacobian of the acceleration; no velocity dependence.
            let jxx = d.x * d.x * r5inv - r3inv;
            let jyy = d.y * d.y * r5inv - r3inv;
            let jzz = d.z * d.z * r5inv - r3inv;
            let jxy = d.x * d.y * r5inv;
            let jxz = d.x * d.z * r5inv;
            let jyz = d.y * d.z * r5inv;

            for k in 0..set.link_count() {
                let link = set.link(k);
                if link.parent != j {
                    continue;
                }
                let dr = set.particle(link.index).pos;
                let da = Vector3::new(
                    dr.x * jxx + dr.y * jxy + dr.z * jxz,
                    dr.x * jxy + dr.y * jyy + dr.z * jyz,
                    dr.x * jxz + dr.y * jyz + dr.z * jzz,
                );
                set.particle_mut(link.index).acc += body.gm * da;
            }
        }
    }
    Ok(())
}
