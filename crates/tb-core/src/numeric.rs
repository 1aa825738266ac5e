use crate::TbError;

/// Floating point type used for model quantities.
pub type Real = f32;

/// Absolute tolerance on the optical coefficient sum
/// (absorption + reflection + transmission = 1).
pub const OPTICAL_SUM_TOLERANCE: Real = 0.01;

pub fn nearly_equal(a: Real, b: Real, tol: Real) -> bool {
    (a - b).abs() <= tol
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, TbError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TbError::NonFinite {
            what,
            value: f64::from(v),
        })
    }
}

/// Reject (never clamp) a value outside the closed interval `[min, max]`.
pub fn ensure_in_range(v: Real, min: Real, max: Real, what: &'static str) -> Result<Real, TbError> {
    let v = ensure_finite(v, what)?;
    if v < min || v > max {
        return Err(TbError::OutOfRange {
            what,
            value: f64::from(v),
            min: f64::from(min),
            max: f64::from(max),
        });
    }
    Ok(v)
}
