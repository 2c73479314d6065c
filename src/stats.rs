use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Measurement – a value with its standard error
// ---------------------------------------------------------------------------

/// A measured value together with its standard error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub error: f64,
}

impl Measurement {
    pub fn new(value: f64, error: f64) -> Self {
        Measurement { value, error }
    }

    /// A value known exactly (zero standard error).
    pub fn exact(value: f64) -> Self {
        Measurement { value, error: 0.0 }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ± {}", self.value, self.error)
    }
}

// ---------------------------------------------------------------------------
// Error propagation helpers
// ---------------------------------------------------------------------------

/// Ratio of two measurements with first-order error propagation:
///
/// err = sqrt((errA/B)² + (A·errB/B²)²)
///
/// A zero denominator is not caught and follows IEEE semantics (Inf/NaN).
pub fn ratio(a: Measurement, b: Measurement) -> Measurement {
    let value = a.value / b.value;
    let error =
        ((a.error / b.value).powi(2) + (a.value * b.error / b.value.powi(2)).powi(2)).sqrt();
    Measurement { value, error }
}

/// Mean of a data set and the uncertainty of the mean.
///
/// The uncertainty is the population standard deviation over sqrt(n). An
/// empty slice yields NaN through 0/0 rather than an error.
pub fn mean_with_error(data: &[f64]) -> Measurement {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
    Measurement {
        value: mean,
        error: variance.sqrt() / n.sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn ratio_of_exact_values() {
        let r = ratio(Measurement::exact(6.0), Measurement::exact(3.0));
        assert_eq!(r.value, 2.0);
        assert_eq!(r.error, 0.0);
    }

    #[test]
    fn ratio_propagates_both_errors() {
        let r = ratio(Measurement::new(4.0, 0.4), Measurement::new(2.0, 0.2));
        assert!(close(r.value, 2.0));
        // sqrt((0.4/2)² + (4·0.2/4)²) = sqrt(0.04 + 0.04)
        assert!(close(r.error, 0.08_f64.sqrt()));
    }

    #[test]
    fn ratio_by_zero_is_not_caught() {
        let r = ratio(Measurement::exact(1.0), Measurement::exact(0.0));
        assert!(r.value.is_infinite());
    }

    #[test]
    fn mean_with_error_matches_population_std() {
        let m = mean_with_error(&[2.0, 4.0, 6.0]);
        assert!(close(m.value, 4.0));
        // population std of [2,4,6] is sqrt(8/3)
        assert!(close(m.error, (8.0_f64 / 3.0).sqrt() / 3.0_f64.sqrt()));
    }

    #[test]
    fn mean_of_empty_slice_is_nan() {
        let m = mean_with_error(&[]);
        assert!(m.value.is_nan());
        assert!(m.error.is_nan());
    }
}
