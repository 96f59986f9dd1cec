use super::{ensure_same_len, mean, population_std, StatsError};

/// Default z-score cut-off.
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

// ---------------------------------------------------------------------------
// Z-score outlier classification
// ---------------------------------------------------------------------------

/// Complementary inlier / outlier masks over the paired samples.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierClassification {
    pub inliers: Vec<bool>,
    pub outliers: Vec<bool>,
}

impl OutlierClassification {
    pub fn len(&self) -> usize {
        self.inliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inliers.is_empty()
    }

    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|&&b| b).count()
    }

    pub fn outlier_count(&self) -> usize {
        self.outliers.iter().filter(|&&b| b).count()
    }

    /// Values at the positions where `mask` is true, in order.
    pub fn select(values: &[f64], mask: &[bool]) -> Vec<f64> {
        values
            .iter()
            .zip(mask)
            .filter(|&(_, &keep)| keep)
            .map(|(&v, _)| v)
            .collect()
    }
}

/// Flag samples whose z-score on either axis reaches `threshold`.
///
/// A sample is an inlier only when `|x - mean_x| / std_x < threshold` and the
/// same holds for `y`. Standard deviations use the population convention.
/// An axis with zero variance yields NaN z-scores, and NaN never compares
/// below the threshold, so every sample becomes an outlier.
pub fn classify(x: &[f64], y: &[f64], threshold: f64) -> Result<OutlierClassification, StatsError> {
    ensure_same_len(x, y)?;

    let (mean_x, std_x) = (mean(x), population_std(x));
    let (mean_y, std_y) = (mean(y), population_std(y));

    let inliers: Vec<bool> = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let zx = (xi - mean_x).abs() / std_x;
            let zy = (yi - mean_y).abs() / std_y;
            zx < threshold && zy < threshold
        })
        .collect();
    let outliers = inliers.iter().map(|b| !b).collect();

    log::debug!(
        "z-score classification (threshold {threshold}): {} of {} samples kept",
        inliers.iter().filter(|&&b| b).count(),
        inliers.len()
    );

    Ok(OutlierClassification { inliers, outliers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const X: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];

    #[test]
    fn test_single_outlier_is_last_sample() {
        let y = [80.0, 81.0, 82.0, 83.0, 120.0];
        let c = classify(&X, &y, 1.9).unwrap();
        assert_eq!(c.inlier_count(), 4);
        assert_eq!(c.outlier_count(), 1);
        assert!(c.outliers[4]);
    }

    #[test]
    fn test_high_threshold_keeps_everything() {
        let y = [80.0, 81.0, 82.0, 83.0, 84.0];
        let c = classify(&X, &y, 5.0).unwrap();
        assert_eq!(c.inlier_count(), 5);
        assert_eq!(c.outlier_count(), 0);
    }

    #[test]
    fn test_lower_threshold_flags_at_least_as_many() {
        let y = [80.0, 81.0, 82.0, 83.0, 84.0];
        let high = classify(&X, &y, 3.0).unwrap();
        let low = classify(&X, &y, 1.0).unwrap();
        assert!(low.outlier_count() >= high.outlier_count());
        // Endpoints sit at z = sqrt(2) on both axes.
        assert_eq!(low.outliers, vec![true, false, false, false, true]);
    }

    #[test]
    fn test_zero_variance_axis_makes_everything_an_outlier() {
        let y = [82.0; 5];
        for threshold in [0.0, 1.0, 3.0, 1e9] {
            let c = classify(&X, &y, threshold).unwrap();
            assert_eq!(c.outlier_count(), 5, "threshold {threshold}");
        }
    }

    #[test]
    fn test_comparison_is_strict() {
        // Endpoints have z exactly 1.0 on both axes.
        let c = classify(&[0.0, 2.0], &[10.0, 20.0], 1.0).unwrap();
        assert_eq!(c.outlier_count(), 2);
    }

    #[test]
    fn test_select_subsets() {
        let y = [80.0, 81.0, 82.0, 83.0, 120.0];
        let c = classify(&X, &y, 1.9).unwrap();
        assert_eq!(OutlierClassification::select(&y, &c.inliers), vec![80.0, 81.0, 82.0, 83.0]);
        assert_eq!(OutlierClassification::select(&X, &c.outliers), vec![5.0]);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(classify(&[1.0, 2.0], &[1.0], 3.0).is_err());
    }

    proptest! {
        #[test]
        fn prop_masks_are_complements(
            pairs in proptest::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 1..40),
            threshold in 0.0f64..5.0,
        ) {
            let (x, y): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            let c = classify(&x, &y, threshold).unwrap();
            prop_assert_eq!(c.len(), x.len());
            prop_assert_eq!(c.outliers.len(), x.len());
            for (i, o) in c.inliers.iter().zip(&c.outliers) {
                prop_assert_ne!(i, o);
            }
        }
    }
}
