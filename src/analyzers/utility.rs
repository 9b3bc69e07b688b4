/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentage of `part` over `total`. Returns 0.0 when `total` is zero.
pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Harmonic mean of two non-negative values, `2ab / (a + b)`.
///
/// Returns 0.0 when `a + b == 0`, the limit of the expression as both approach zero.
pub fn harmonic_mean(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum == 0.0 { 0.0 } else { 2.0 * a * b / sum }
}

/// Rounds to `decimals` places, halves away from zero.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_mean_values() {
        assert_eq!(mean(&[1.0, 2.0, 6.0]), 3.0);
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(pct(50, 100), 50.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn test_harmonic_mean_zero_sum() {
        assert_eq!(harmonic_mean(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_harmonic_mean_with_one_zero() {
        assert_eq!(harmonic_mean(0.0, 80.0), 0.0);
    }

    #[test]
    fn test_harmonic_mean_bounded_by_arithmetic_mean() {
        for (a, b) in [(100.0, 50.0), (12.5, 99.0), (70.0, 70.0)] {
            let h = harmonic_mean(a, b);
            assert!(h <= (a + b) / 2.0 + 1e-9);
            assert!(h >= 0.0);
        }
        assert_eq!(harmonic_mean(70.0, 70.0), 70.0);
    }

    #[test]
    fn test_harmonic_mean_known_value() {
        // 2 * 100 * 50 / 150
        assert_eq!(round_to(harmonic_mean(100.0, 50.0), 2), 66.67);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(66.666_666, 2), 66.67);
        assert_eq!(round_to(3.14159, 1), 3.1);
        assert_eq!(round_to(-2.25, 0), -2.0);
        assert_eq!(round_to(10.0, 1), 10.0);
    }
}
