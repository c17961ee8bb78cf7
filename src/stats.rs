use serde::{Deserialize, Serialize};

/// Incremental mean and standard deviation over a stream of values.
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: if self.n_vals > 0 { self.mean } else { 0.0 },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                0.0
            },
        }
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean of a slice, 0 when empty.
pub fn safe_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of a slice, 0 when empty.
pub fn safe_median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Gini inequality coefficient of a value vector.
///
/// Negative values are floored at zero before ranking. Returns 0 for an
/// empty vector or an all-zero vector.
pub fn gini(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted: Vec<f64> = values.iter().map(|&val| val.max(0.0)).collect();
    let total: f64 = sorted.iter().sum();
    if total == 0.0 {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len() as f64;
    let rank_weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(idx, &val)| (idx + 1) as f64 * val)
        .sum();

    (2.0 * rank_weighted) / (n * total) - (n + 1.0) / n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gini_of_equal_values_is_zero() {
        assert!(gini(&[5.0, 5.0, 5.0, 5.0]).abs() < 1e-12);
        assert!(gini(&[42.0]).abs() < 1e-12);
    }

    #[test]
    fn gini_of_concentrated_wealth() {
        let value = gini(&[0.0, 0.0, 0.0, 1000.0]);
        assert!((value - 0.75).abs() < 1e-12);
    }

    #[test]
    fn gini_floors_negative_values() {
        let value = gini(&[-100.0, 0.0, 0.0, 1000.0]);
        assert!((value - 0.75).abs() < 1e-12);
    }

    #[test]
    fn gini_of_empty_or_zero_vector_is_zero() {
        assert_eq!(gini(&[]), 0.0);
        assert_eq!(gini(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn safe_mean_and_median_handle_empty() {
        assert_eq!(safe_mean(&[]), 0.0);
        assert_eq!(safe_median(&[]), 0.0);
        assert_eq!(safe_mean(&[2.0, 4.0]), 3.0);
        assert_eq!(safe_median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(safe_median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn accumulator_tracks_mean_and_spread() {
        let mut acc = Accumulator::new();
        for val in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.add(val);
        }
        let report = acc.report();
        assert!((report.mean - 5.0).abs() < 1e-12);
        assert!((report.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }
}
