use crate::SpkError;

/// Evaluates a Chebyshev series at normalized time `t` in [-1, 1]
/// using the Clenshaw recurrence.
pub fn clenshaw(coeffs: &[f64], t: f64) -> Result<f64, SpkError> {
    if coeffs.is_empty() {
        return Err(SpkError::Data("empty Chebyshev coefficient array".into()));
    }
    let two_t = 2.0 * t;
    let mut b_k = 0.0;
    let mut b_k1 = 0.0;
    for &c in coeffs[1..].iter().rev() {
        let b_prev = b_k;
        b_k = two_t * b_k - b_k1 + c;
        b_k1 = b_prev;
    }
    Ok(t * b_k - b_k1 + coeffs[0])
}

/// Coefficients of the derivative series, still on the normalized interval.
///
/// Uses the backward recurrence b[k] = b[k+2] + 2(k+1) a[k+1] with the
/// zeroth coefficient halved at the end. Applying it twice yields the
/// second derivative, which type-2 kernels need for accelerations.
pub fn derivative_coefficients(coeffs: &[f64]) -> Vec<f64> {
    let n = coeffs.len();
    if n < 2 {
        return vec![0.0];
    }
    let mut out = vec![0.0; n - 1];
    for k in (0..n - 1).rev() {
        let carry = if k + 2 < n - 1 { out[k + 2] } else { 0.0 };
        out[k] = carry + 2.0 * (k as f64 + 1.0) * coeffs[k + 1];
    }
    out[0] /= 2.0;
    out
}

/// Position, velocity, and acceleration of one type-2 record component set.
///
/// `radius_s` is the record's half-interval in seconds; it rescales the
/// normalized-time derivatives to per-second units.
pub fn evaluate_state(
    coeffs_x: &[f64],
    coeffs_y: &[f64],
    coeffs_z: &[f64],
    t: f64,
    radius_s: f64,
) -> Result<([f64; 3], [f64; 3], [f64; 3]), SpkError> {
    let mut pos = [0.0; 3];
    let mut vel = [0.0; 3];
    let mut acc = [0.0; 3];
    for (axis, coeffs) in [coeffs_x, coeffs_y, coeffs_z].into_iter().enumerate() {
        pos[axis] = clenshaw(coeffs, t)?;
        let d1 = derivative_coefficients(coeffs);
        vel[axis] = clenshaw(&d1, t)? / radius_s;
        let d2 = derivative_coefficients(&d1);
        acc[axis] = clenshaw(&d2, t)? / (radius_s * radius_s);
    }
    Ok((pos, vel, acc))
}
