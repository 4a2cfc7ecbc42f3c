use crate::SsError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, SsError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SsError::NonFinite { what, value: v })
    }
}

/// Checks every entry of `values`, reporting the first non-finite one.
pub fn ensure_all_finite(values: &[Real], what: &'static str) -> Result<(), SsError> {
    for &v in values {
        ensure_finite(v, what)?;
    }
    Ok(())
}
