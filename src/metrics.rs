/// Intent scores at or above this are "high intent".
pub const HIGH_INTENT_THRESHOLD: f64 = 70.0;
/// Intent scores below this are "low intent".
pub const LOW_INTENT_THRESHOLD: f64 = 40.0;

/// Compute mean, median, 25th percentile and 75th percentile from samples
pub fn compute_metrics(values: &[f64]) -> Option<(f64, f64, f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let median = sorted[n / 2];
    let p25 = sorted[n / 4];
    let p75 = sorted[3 * n / 4];
    Some((mean, median, p25, p75))
}

/// Count of leads per intent band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBands {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

pub fn score_bands(scores: &[f64]) -> ScoreBands {
    scores.iter().fold(ScoreBands::default(), |mut bands, &s| {
        if s >= HIGH_INTENT_THRESHOLD {
            bands.high += 1;
        } else if s >= LOW_INTENT_THRESHOLD {
            bands.medium += 1;
        } else {
            bands.low += 1;
        }
        bands
    })
}

/// `part / whole` as a percentage rounded to two decimals; zero when `whole` is zero.
pub fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_need_two_samples() {
        assert_eq!(compute_metrics(&[]), None);
        assert_eq!(compute_metrics(&[42.0]), None);
    }

    #[test]
    fn metrics_on_unsorted_scores() {
        let (mean, median, p25, p75) = compute_metrics(&[90.0, 10.0, 50.0, 30.0]).unwrap();
        assert_eq!(mean, 45.0);
        assert_eq!(median, 50.0);
        assert_eq!(p25, 30.0);
        assert_eq!(p75, 90.0);
    }

    #[test]
    fn bands_use_inclusive_lower_bounds() {
        let bands = score_bands(&[70.0, 69.9, 40.0, 39.9, 95.0]);
        assert_eq!(
            bands,
            ScoreBands {
                high: 2,
                medium: 2,
                low: 1
            }
        );
    }

    #[test]
    fn rate_rounds_and_handles_empty_denominator() {
        assert_eq!(rate(1, 3), 33.33);
        assert_eq!(rate(2, 3), 66.67);
        assert_eq!(rate(5, 0), 0.0);
    }
}
