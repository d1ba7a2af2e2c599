//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Clamp a f64 to the f32 range and downcast, returning 0.0 for non-finite values.
#[must_use]
pub fn clamp_f64_to_f32(value: f64) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let min = cast::<f32, f64>(f32::MIN).unwrap_or(f64::MIN);
    let max = cast::<f32, f64>(f32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max);
    cast::<f64, f32>(clamped).unwrap_or(0.0)
}

/// Convert a collection length to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert a JSON number to u32, returning `None` when it is negative, fractional or too large.
#[must_use]
pub fn f64_to_u32_exact(value: f64) -> Option<u32> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    cast::<f64, u32>(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_handles_non_finite() {
        assert!((clamp_f64_to_f32(f64::NAN) - 0.0).abs() < f32::EPSILON);
        assert!((clamp_f64_to_f32(f64::from(f32::MAX) * 2.0) - f32::MAX).abs() < f32::EPSILON);
        assert!((clamp_f64_to_f32(1.5) - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn usize_conversion_is_lossless_for_small_values() {
        assert!((usize_to_f64(42) - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exact_u32_rejects_fractions_and_negatives() {
        assert_eq!(f64_to_u32_exact(3.0), Some(3));
        assert_eq!(f64_to_u32_exact(3.5), None);
        assert_eq!(f64_to_u32_exact(-1.0), None);
        assert_eq!(f64_to_u32_exact(f64::NAN), None);
    }
}
