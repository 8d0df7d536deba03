//! Relativistic corrections: the Damour-Deruelle one-body solar term and
//! the full Einstein-Infeld-Hoffmann 1PN treatment.
//!
//! Both accumulate the post-Newtonian correction only; direct Newtonian
//! gravity is handled separately. The EIH loop is written over a general
//! perturber range but the active configuration sums the Sun alone; the
//! inner potential sums always run over the planetary set.

use crate::ephemeris::{EphemerisSource, PerturberState, N_PLANETARY};
use crate::error::Result;
use crate::particle::ParticleSet;
use ephem_core::Vector3;

/// PPN parameters; general relativity fixes both at one.
const BETA: f64 = 1.0;
const GAMMA: f64 = 1.0;

/// Damour-Deruelle solar term:
/// `a = mu/(r^3 c^2) [(4 mu/r - v^2) d + 4 (d.w) w]`.
pub fn damour_deruelle(
    set: &mut ParticleSet,
    sun: &PerturberState,
    origin: &PerturberState,
    c2: f64,
) -> Result<()> {
    let mu = sun.gm;

    for j in 0..set.n_real() {
        let p = *set.particle(j);
        let d = p.pos + origin.pos - sun.pos;
        let w = p.vel + origin.vel - sun.vel;
        let v2 = w.norm_squared();
        let r = d.norm();

        let big_a = 4.0 * mu / r - v2;
        let big_b = 4.0 * d.dot(&w);
        let prefac = mu / (r * r * r * c2);

        set.particle_mut(j).acc += prefac * (big_a * d + big_b * w);

        let dpdr = -3.0 * prefac / r;
        let mu4r2 = 4.0 * mu / (r * r);

        // rows: (A d_a + B w_a); columns differentiate d and w
        let row = |da: f64, wa: f64| {
            let fade = big_a * da + big_b * wa;
            (
                [
                    dpdr * d.x / r * fade + prefac * (-da * (d.x / r) * mu4r2 + 4.0 * w.x * wa),
                    dpdr * d.y / r * fade + prefac * (-da * (d.y / r) * mu4r2 + 4.0 * w.y * wa),
                    dpdr * d.z / r * fade + prefac * (-da * (d.z / r) * mu4r2 + 4.0 * w.z * wa),
                ],
                [
                    prefac * (-2.0 * w.x * da + 4.0 * d.x * wa),
                    prefac * (-2.0 * w.y * da + 4.0 * d.y * wa),
                    prefac * (-2.0 * w.z * da + 4.0 * d.z * wa),
                ],
            )
        };

        let (mut jp_x, mut jv_x) = row(d.x, w.x);
        let (mut jp_y, mut jv_y) = row(d.y, w.y);
        let (mut jp_z, mut jv_z) = row(d.z, w.z);
        // the diagonal picks up A (position) and B (velocity)
        jp_x[0] += prefac * big_a;
        jp_y[1] += prefac * big_a;
        jp_z[2] += prefac * big_a;
        jv_x[0] += prefac * big_b;
        jv_y[1] += prefac * big_b;
        jv_z[2] += prefac * big_b;

        for k in 0..set.link_count() {
            let link = set.link(k);
            if link.parent != j {
                continue;
            }
            let dp = *set.particle(link.index);
            let da = Vector3::new(
                jp_x[0] * dp.pos.x + jp_x[1] * dp.pos.y + jp_x[2] * dp.pos.z
                    + jv_x[0] * dp.vel.x + jv_x[1] * dp.vel.y + jv_x[2] * dp.vel.z,
                jp_y[0] * dp.pos.x + jp_y[1] * dp.pos.y + jp_y[2] * dp.pos.z
                    + jv_y[0] * dp.vel.x + jv_y[1] * dp.vel.y + jv_y[2] * dp.vel.z,
                jp_z[0] * dp.pos.x + jp_z[1] * dp.pos.y + jp_z[2] * dp.pos.z
                    + jv_z[0] * dp.vel.x + jv_z[1] * dp.vel.y + jv_z[2] * dp.vel.z,
            );
            set.particle_mut(link.index).acc += da;
        }
    }
    Ok(())
}

/// Full EIH 1PN correction over perturbers `0..n_active`, with the inner
/// potential sums over the planetary set. `n_active = 1` reproduces the
/// solar-only configuration.
pub fn eih<S: EphemerisSource>(
    source: &mut S,
    jd_tdb: f64,
    set: &mut ParticleSet,
    origin: &PerturberState,
    c2: f64,
    n_active: usize,
) -> Result<()> {
    let n_inner = source.body_count().min(N_PLANETARY);
    let n_active = n_active.min(n_inner);

    for i in 0..set.n_real() {
        let p = *set.particle(i);
        let vi = p.vel;

        // accumulated correction and its 3x6 Jacobian
        let mut gr = Vector3::zeros();
        let mut jac = [[0.0f64; 6]; 3];
        // velocity-coupling and perturber-acceleration sums, merged /c^2
        let mut term7_sum = Vector3::zeros();
        let mut jac7 = [[0.0f64; 6]; 3];
        let mut term8_sum = Vector3::zeros();
        let mut jac8 = [[0.0f64; 3]; 3];

        for jb in 0..n_active {
            let body = source.query(jb, jd_tdb)?;
            let dij = p.pos + origin.pos - body.pos;
            let rij2 = dij.norm_squared();
            let rij = libm::sqrt(rij2);
            let prefac = body.gm / (rij * rij2);
            let dprefac = -3.0 * body.gm / (rij2 * rij2 * rij) * dij;

            let term2 = GAMMA / c2 * vi.norm_squared();
            let dterm2dv = 2.0 * GAMMA / c2 * vi;

            let vj = body.vel - origin.vel;
            let term3 = (1.0 + GAMMA) / c2 * vj.norm_squared();

            let term4 = -2.0 * (1.0 + GAMMA) / c2 * vi.dot(&vj);
            let dterm4dv = -2.0 * (1.0 + GAMMA) / c2 * vj;

            let rijdotvj = dij.dot(&vj);
            let term5 = -1.5 / c2 * rijdotvj * rijdotvj / rij2;
            let dterm5d =
                -3.0 / c2 * rijdotvj / rij * (vj / rij - rijdotvj / (rij2 * rij) * dij);

            let f_vec = (2.0 + 2.0 * GAMMA) * vi - (1.0 + 2.0 * GAMMA) * vj;
            let f = dij.dot(&f_vec);
            let dfdv = (2.0 + 2.0 * GAMMA) * dij;

            // u = vi - vj: the velocity the f-coupling multiplies
            let u = vi - vj;
            term7_sum += prefac * f * u;
            for row in 0..3 {
                for col in 0..3 {
                    jac7[row][col] += (dprefac[col] * f + prefac * f_vec[col]) * u[row];
                    jac7[row][3 + col] += prefac * dfdv[col] * u[row];
                }
                jac7[row][3 + row] += prefac * f;
            }

            // potential sums and the perturber's own Newtonian acceleration
            let mut term0 = 0.0;
            let mut dterm0d = Vector3::zeros();
            let mut term1 = 0.0;
            let mut aj = Vector3::zeros();
            for k in 0..n_inner {
                let bk = source.query(k, jd_tdb)?;
                let dik = p.pos + origin.pos - bk.pos;
                let rik2 = dik.norm_squared();
                let rik = libm::sqrt(rik2);
                term0 += bk.gm / rik;
                dterm0d -= bk.gm / (rik2 * rik) * dik;
                if k != jb {
                    let djk = body.pos - bk.pos;
                    let rjk2 = djk.norm_squared();
                    let rjk = libm::sqrt(rjk2);
                    term1 += bk.gm / rjk;
                    aj -= bk.gm / (rjk2 * rjk) * djk;
                }
            }
            term0 *= -2.0 * (BETA + GAMMA) / c2;
            dterm0d = -2.0 * (BETA + GAMMA) / c2 * dterm0d;
            term1 *= -(2.0 * BETA - 1.0) / c2;

            let aj_rel = aj - origin.acc;
            let term6 = -0.5 / c2 * dij.dot(&aj_rel);
            let dterm6d = -0.5 / c2 * aj_rel;

            term8_sum += body.gm * (3.0 + 4.0 * GAMMA) / 2.0 / rij * aj;
            for row in 0..3 {
                for col in 0..3 {
                    jac8[row][col] +=
                        -body.gm * aj[row] / (rij * rij2) * dij[col] * (3.0 + 4.0 * GAMMA) / 2.0;
                }
            }

            let factor = term0 + term1 + term2 + term3 + term4 + term5 + term6;
            let dfactord = dterm0d + dterm5d + dterm6d;
            let dfactordv = dterm2dv + dterm4dv;

            gr -= prefac * factor * dij;
            for row in 0..3 {
                for col in 0..3 {
                    jac[row][col] +=
                        -dprefac[col] * dij[row] * factor - prefac * dij[row] * dfactord[col];
                    jac[row][3 + col] += -prefac * dij[row] * dfactordv[col];
                }
                jac[row][row] += -prefac * factor;
            }
        }

        gr += (term7_sum + term8_sum) / c2;
        for row in 0..3 {
            for col in 0..3 {
                jac[row][col] += (jac7[row][col] + jac8[row][col]) / c2;
                jac[row][3 + col] += jac7[row][3 + col] / c2;
            }
        }

        set.particle_mut(i).acc += gr;

        for k in 0..set.link_count() {
            let link = set.link(k);
            if link.parent != i {
                continue;
            }
            let dp = *set.particle(link.index);
            let state = [
                dp.pos.x, dp.pos.y, dp.pos.z, dp.vel.x, dp.vel.y, dp.vel.z,
            ];
            let mut da = Vector3::zeros();
            for row in 0..3 {
                for (col, &s) in state.iter().enumerate() {
                    da[row] += jac[row][col] * s;
                }
            }
            set.particle_mut(link.index).acc += da;
        }
    }
    Ok(())
}
