//! Body-equatorial frame rotations.
//!
//! A `Frame` carries a body's pole orientation (right ascension and
//! declination of the spin axis in ICRF) and rotates vectors into the
//! body-equatorial frame whose z-axis is the pole: a z-rotation by the pole
//! RA followed by an x-rotation by (90 deg - Dec). The trigonometry is
//! precomputed once so the zonal-harmonic terms never re-evaluate it.
//!
//! For variational work the frame also sandwiches 3x3 Jacobian blocks:
//! a block J expressed in the body frame maps to R^T J R in ICRF.

use crate::constants::{
    EARTH_POLE_DEC_DEG, EARTH_POLE_RA_DEG, SUN_POLE_DEC_DEG, SUN_POLE_RA_DEG,
};
use crate::vector::Vector3;

/// A row-major 3x3 matrix block, as used for position Jacobians.
pub type Mat3 = [[f64; 3]; 3];

/// Rotation from ICRF into a body-equatorial frame defined by a pole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    sin_ra: f64,
    cos_ra: f64,
    sin_dec: f64,
    cos_dec: f64,
}

impl Frame {
    /// Builds the frame for a pole at the given ICRF right ascension and
    /// declination, in degrees.
    pub fn from_pole_degrees(ra_deg: f64, dec_deg: f64) -> Self {
        let ra = ra_deg.to_radians();
        let dec = dec_deg.to_radians();
        Self {
            sin_ra: libm::sin(ra),
            cos_ra: libm::cos(ra),
            sin_dec: libm::sin(dec),
            cos_dec: libm::cos(dec),
        }
    }

    /// Earth-equatorial frame, pole frozen at the J2000 orientation.
    pub fn earth_equatorial() -> Self {
        Self::from_pole_degrees(EARTH_POLE_RA_DEG, EARTH_POLE_DEC_DEG)
    }

    /// Sun-equatorial frame (IAU pole).
    pub fn sun_equatorial() -> Self {
        Self::from_pole_degrees(SUN_POLE_RA_DEG, SUN_POLE_DEC_DEG)
    }

    /// The rotation matrix carrying ICRF vectors into the body frame.
    ///
    /// ```text
    /// R = | -sin a         cos a        0     |
    ///     | -cos a sin d  -sin a sin d  cos d |
    ///     |  cos a cos d   sin a cos d  sin d |
    /// ```
    pub fn matrix(&self) -> Mat3 {
        let (sa, ca, sd, cd) = (self.sin_ra, self.cos_ra, self.sin_dec, self.cos_dec);
        [
            [-sa, ca, 0.0],
            [-ca * sd, -sa * sd, cd],
            [ca * cd, sa * cd, sd],
        ]
    }

    /// Rotates an ICRF vector into the body-equatorial frame.
    pub fn rotate(&self, v: Vector3) -> Vector3 {
        let (sa, ca, sd, cd) = (self.sin_ra, self.cos_ra, self.sin_dec, self.cos_dec);
        Vector3::new(
            -v.x * sa + v.y * ca,
            -v.x * ca * sd - v.y * sa * sd + v.z * cd,
            v.x * ca * cd + v.y * sa * cd + v.z * sd,
        )
    }

    /// Rotates a body-frame vector back into ICRF (applies R^T).
    pub fn inverse_rotate(&self, v: Vector3) -> Vector3 {
        let (sa, ca, sd, cd) = (self.sin_ra, self.cos_ra, self.sin_dec, self.cos_dec);
        Vector3::new(
            -v.x * sa - v.y * ca * sd + v.z * ca * cd,
            v.x * ca - v.y * sa * sd + v.z * sa * cd,
            v.y * cd + v.z * sd,
        )
    }

    /// Sandwiches a body-frame Jacobian block into ICRF: R^T J R.
    ///
    /// Applies to the position 3x3 of a variational block; the velocity 3x3
    /// of a 6-column block uses the same rotation.
    pub fn rotate_jacobian(&self, j: &Mat3) -> Mat3 {
        let r = self.matrix();
        // tmp = J * R
        let mut tmp = [[0.0; 3]; 3];
        for (row, tmp_row) in tmp.iter_mut().enumerate() {
            for (col, cell) in tmp_row.iter_mut().enumerate() {
                for k in 0..3 {
                    *cell += j[row][k] * r[k][col];
                }
            }
        }
        // out = R^T * tmp
        let mut out = [[0.0; 3]; 3];
        for (row, out_row) in out.iter_mut().enumerate() {
            for (col, cell) in out_row.iter_mut().enumerate() {
                for k in 0..3 {
                    *cell += r[k][row] * tmp[k][col];
                }
            }
        }
        out
    }
}

/// Applies a 3x3 block to a vector: J v.
pub fn apply_mat3(j: &Mat3, v: Vector3) -> Vector3 {
    Vector3::new(
        j[0][0] * v.x + j[0][1] * v.y + j[0][2] * v.z,
        j[1][0] * v.x + j[1][1] * v.y + j[1][2] * v.z,
        j[2][0] * v.x + j[2][1] * v.y + j[2][2] * v.z,
    )
}
