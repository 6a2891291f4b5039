/// Magnitude below which a value is treated as numerical noise
pub const EPSILON: f64 = 1.0e-10;

/// Round values within [`EPSILON`] of zero to exactly zero
pub fn round_to_zero(value: f64) -> f64 {
    if value.abs() < EPSILON { 0.0 } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_zeroed() {
        assert_eq!(round_to_zero(1e-11), 0.0);
        assert_eq!(round_to_zero(-9.9e-11), 0.0);
        assert_eq!(round_to_zero(0.0), 0.0);
    }

    #[test]
    fn test_values_outside_tolerance_are_kept() {
        assert_eq!(round_to_zero(1e-10), 1e-10);
        assert_eq!(round_to_zero(-0.25), -0.25);
        assert_eq!(round_to_zero(42.0), 42.0);
    }
}
