use crate::GdError;

/// Floating point type used for every state, residual and Jacobian entry.
pub type Real = f64;

/// Absolute tolerance a component reports for its states until configured.
pub const DEFAULT_ABS_TOLERANCE: Real = 1e-8;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, GdError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(GdError::NonFinite { what, value: v })
    }
}

/// Interpret a numeric parameter as a non-negative count.
///
/// Parameter APIs carry every value as `f64`; counts must be whole and
/// non-negative.
pub fn as_count(v: Real, what: &'static str) -> Result<usize, GdError> {
    let v = ensure_finite(v, what)?;
    if v < 0.0 || v.fract() != 0.0 {
        return Err(GdError::InvalidCount { what, value: v });
    }
    Ok(v as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "voltage").unwrap_err();
        assert!(matches!(err, GdError::NonFinite { what: "voltage", .. }));
        assert!(err.to_string().contains("must be finite"));
    }

    #[test]
    fn as_count_rejects_fractions_and_negatives() {
        assert_eq!(as_count(3.0, "n").unwrap(), 3);
        assert_eq!(
            as_count(-1.0, "nalg").unwrap_err(),
            GdError::InvalidCount {
                what: "nalg",
                value: -1.0
            }
        );
        assert!(as_count(2.5, "n").is_err());
        assert!(matches!(
            as_count(f64::INFINITY, "n"),
            Err(GdError::NonFinite { .. })
        ));
    }
}
