use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use weight_tracker::data::days::discover;
use weight_tracker::data::export::{self, SaveFormat, WeightExport};
use weight_tracker::data::external::{ensure_aligned, load_per_day, load_single};
use weight_tracker::data::model::DayFolder;
use weight_tracker::data::weight::load_weights;
use weight_tracker::stats::{
    analyze, classify, CorrelationResult, OutlierClassification, DEFAULT_Z_THRESHOLD,
};

/// Points used to draw the regression line.
const REGRESSION_SAMPLES: usize = 100;

// ---------------------------------------------------------------------------
// Analysis options
// ---------------------------------------------------------------------------

/// Where external values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalMode {
    /// One file with a value per selected day.
    SingleFile,
    /// The same file name inside every day folder, one value each.
    PerDay,
}

/// User-tunable options. Defaults match a fresh window.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub use_external: bool,
    pub external_mode: ExternalMode,
    pub single_values_file: String,
    pub daily_filename: String,
    pub show_regression: bool,
    pub mark_outliers: bool,
    pub z_threshold: f64,
    pub save_format: SaveFormat,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            use_external: false,
            external_mode: ExternalMode::SingleFile,
            single_values_file: String::new(),
            daily_filename: String::new(),
            show_regression: false,
            mark_outliers: false,
            z_threshold: DEFAULT_Z_THRESHOLD,
            save_format: SaveFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Plot views
// ---------------------------------------------------------------------------

/// Weight vs external values, with the statistics shown beside the chart.
#[derive(Debug, Clone)]
pub struct ExternalAnalysis {
    pub external: Vec<f64>,
    pub weights: Vec<f64>,
    /// Present when outlier marking was requested.
    pub classification: Option<OutlierClassification>,
    pub correlation: CorrelationResult,
    pub regression_line: Vec<[f64; 2]>,
}

impl ExternalAnalysis {
    /// Stats box text.
    pub fn summary(&self) -> String {
        match self.correlation.stats() {
            None => "Insufficient data for correlation (need at least 2 points)".to_string(),
            Some(s) => {
                let mut text = format!("Pearson r = {:.3}\np-value = {:.3e}", s.r, s.p_value);
                if let Some(reg) = &s.regression {
                    text.push_str(&format!("\nSlope = {:.3}", reg.slope));
                }
                text
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum PlotView {
    WeightOverDays { dates: Vec<String>, weights: Vec<f64> },
    WeightVsExternal(ExternalAnalysis),
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Base folder as typed or picked.
    pub base_path: String,

    /// Day folders found under the base folder.
    pub days: Vec<DayFolder>,

    /// Checkbox state, parallel to `days`.
    pub day_selected: Vec<bool>,

    pub options: AnalysisOptions,

    /// Current chart, if any.
    pub view: Option<PlotView>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether the instructions window is open.
    pub show_instructions: bool,
}

impl AppState {
    /// Selected day folders, in chronological order.
    pub fn selected_days(&self) -> Vec<DayFolder> {
        self.days
            .iter()
            .zip(&self.day_selected)
            .filter(|&(_, &selected)| selected)
            .map(|(day, _)| day.clone())
            .collect()
    }

    pub fn set_all_days(&mut self, selected: bool) {
        self.day_selected.iter_mut().for_each(|s| *s = selected);
    }

    fn report<T>(&mut self, action: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.status_message = None;
                Some(value)
            }
            Err(e) => {
                log::error!("{action} failed: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                None
            }
        }
    }

    /// Discover day folders under `base_path`; every day starts selected.
    pub fn load_days(&mut self) {
        let result = self.try_load_days();
        if let Some(days) = self.report("Loading days", result) {
            log::info!("Found {} day folders in {}", days.len(), self.base_path);
            self.day_selected = vec![true; days.len()];
            self.days = days;
            self.view = None;
        }
    }

    fn try_load_days(&self) -> Result<Vec<DayFolder>> {
        if self.base_path.trim().is_empty() {
            bail!("Please select a base folder first.");
        }
        Ok(discover(Path::new(self.base_path.trim()))?)
    }

    fn require_selection(&self) -> Result<Vec<DayFolder>> {
        let days = self.selected_days();
        if days.is_empty() {
            bail!("No days selected. Please load days and select at least one.");
        }
        Ok(days)
    }

    /// Chart weight over the selected days.
    pub fn plot_weight_only(&mut self) {
        let result = self.try_plot_weight_only();
        if let Some(view) = self.report("Plotting weights", result) {
            self.view = Some(view);
        }
    }

    fn try_plot_weight_only(&self) -> Result<PlotView> {
        let days = self.require_selection()?;
        let records = load_weights(&days).context("extracting weights")?;
        Ok(PlotView::WeightOverDays {
            dates: records.iter().map(|r| r.day.name().to_string()).collect(),
            weights: records.iter().map(|r| r.weight).collect(),
        })
    }

    /// Load external values, then chart and correlate them against weight.
    pub fn plot_with_external(&mut self) {
        let result = self.try_plot_with_external();
        if let Some(analysis) = self.report("Plotting external values", result) {
            log::info!("{}", analysis.summary().replace('\n', ", "));
            self.view = Some(PlotView::WeightVsExternal(analysis));
        }
    }

    fn try_plot_with_external(&self) -> Result<ExternalAnalysis> {
        let days = self.require_selection()?;
        let opts = &self.options;

        let external = match opts.external_mode {
            ExternalMode::SingleFile => {
                let file = opts.single_values_file.trim();
                let path = (!file.is_empty()).then(|| Path::new(file));
                let values = load_single(path).context("loading external values")?;
                ensure_aligned(&values, &days)?;
                values
            }
            ExternalMode::PerDay => {
                let filename = opts.daily_filename.trim();
                if filename.is_empty() {
                    bail!("Please enter a daily external data filename.");
                }
                load_per_day(&days, filename).context("loading daily external values")?
            }
        };

        let weights: Vec<f64> = load_weights(&days)
            .context("extracting weights")?
            .into_iter()
            .map(|r| r.weight)
            .collect();

        analyze_pair(external, weights, opts)
    }

    /// Extract weights for the selected days and write them to `path`.
    pub fn save_weights(&mut self, path: &Path) {
        let result = self.try_save_weights(path);
        if self.report("Saving weights", result).is_some() {
            self.status_message = Some(format!("Weights saved to {}", path.display()));
        }
    }

    fn try_save_weights(&self, path: &Path) -> Result<()> {
        let days = self.require_selection()?;
        let records = load_weights(&days).context("extracting weights")?;
        let export = WeightExport::from_records(&records);
        export::save(path, &export, self.options.save_format)
            .with_context(|| format!("saving {}", path.display()))?;
        Ok(())
    }

    /// Suggested file name for the save dialog.
    pub fn default_save_name(&self) -> String {
        export::default_file_name(self.options.save_format, chrono::Local::now())
    }

    /// Directory the save dialog opens in.
    pub fn save_directory(&self) -> Option<PathBuf> {
        let base = self.base_path.trim();
        (!base.is_empty()).then(|| PathBuf::from(base))
    }
}

/// Classify (when requested) and correlate the aligned series.
///
/// With outlier marking on, statistics use the inliers only.
fn analyze_pair(external: Vec<f64>, weights: Vec<f64>, opts: &AnalysisOptions) -> Result<ExternalAnalysis> {
    let classification = if opts.mark_outliers {
        Some(classify(&external, &weights, opts.z_threshold)?)
    } else {
        None
    };

    let (x_stats, y_stats) = match &classification {
        Some(c) => (
            OutlierClassification::select(&external, &c.inliers),
            OutlierClassification::select(&weights, &c.inliers),
        ),
        None => (external.clone(), weights.clone()),
    };

    let correlation = analyze(&x_stats, &y_stats, opts.show_regression)?;

    let regression_line = match correlation.stats().and_then(|s| s.regression) {
        Some(reg) => {
            let min = x_stats.iter().copied().fold(f64::INFINITY, f64::min);
            let max = x_stats.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            reg.line(min, max, REGRESSION_SAMPLES)
        }
        None => Vec::new(),
    };

    Ok(ExternalAnalysis {
        external,
        weights,
        classification,
        correlation,
        regression_line,
    })
}
