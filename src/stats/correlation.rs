use statrs::function::beta::beta_reg;

use super::{ensure_same_len, mean, StatsError};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Ordinary-least-squares fit of y on x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
}

impl Regression {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// `samples` evenly spaced points of the fitted line over `[min_x, max_x]`.
    pub fn line(&self, min_x: f64, max_x: f64, samples: usize) -> Vec<[f64; 2]> {
        match samples {
            0 => Vec::new(),
            1 => vec![[min_x, self.predict(min_x)]],
            n => {
                let step = (max_x - min_x) / (n - 1) as f64;
                (0..n)
                    .map(|i| {
                        let x = min_x + step * i as f64;
                        [x, self.predict(x)]
                    })
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationStats {
    /// Pearson correlation coefficient.
    pub r: f64,
    /// Two-sided p-value for the null hypothesis of no correlation.
    pub p_value: f64,
    pub regression: Option<Regression>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorrelationResult {
    /// Fewer than two paired samples.
    InsufficientData,
    Computed(CorrelationStats),
}

impl CorrelationResult {
    /// Minimum number of pairs needed for a correlation.
    pub const MIN_SAMPLES: usize = 2;

    pub fn stats(&self) -> Option<&CorrelationStats> {
        match self {
            CorrelationResult::Computed(s) => Some(s),
            CorrelationResult::InsufficientData => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pearson correlation + OLS
// ---------------------------------------------------------------------------

/// Correlate `y` against `x`, optionally fitting a regression line.
///
/// A zero-variance axis gives NaN for `r`, the p-value and the slope.
pub fn analyze(x: &[f64], y: &[f64], want_regression: bool) -> Result<CorrelationResult, StatsError> {
    ensure_same_len(x, y)?;
    let n = x.len();
    if n < CorrelationResult::MIN_SAMPLES {
        return Ok(CorrelationResult::InsufficientData);
    }

    let (mx, my) = (mean(x), mean(y));
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let (dx, dy) = (xi - mx, yi - my);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    // Rounding can push |r| marginally past 1.
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let p_value = two_sided_p_value(r, n);

    let regression = want_regression.then(|| {
        let slope = sxy / sxx;
        Regression {
            slope,
            intercept: my - slope * mx,
        }
    });

    log::debug!("Pearson r = {r:.4}, p = {p_value:.3e} over {n} samples");

    Ok(CorrelationResult::Computed(CorrelationStats {
        r,
        p_value,
        regression,
    }))
}

/// p-value of `r` under Student's t with `n - 2` degrees of freedom.
///
/// Uses the identity `2 * sf(|t|) = I_{1 - r²}(df / 2, 1 / 2)`.
fn two_sided_p_value(r: f64, n: usize) -> f64 {
    if r.is_nan() {
        return f64::NAN;
    }
    if n == 2 {
        // Two points always lie on a line.
        return 1.0;
    }
    let df = (n - 2) as f64;
    let x = 1.0 - r * r;
    if x <= 0.0 {
        return 0.0;
    }
    beta_reg(df / 2.0, 0.5, x.min(1.0))
}
