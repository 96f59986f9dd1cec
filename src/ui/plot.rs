use eframe::egui::{self, Frame, RichText, Ui};
use egui_plot::{GridMark, Legend, Line, LineStyle, MarkerShape, Plot, PlotPoints, Points};

use crate::color::PlotTheme;
use crate::state::{AppState, ExternalAnalysis, PlotView};

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render whichever chart is current.
pub fn central_plot(ui: &mut Ui, state: &AppState) {
    let theme = PlotTheme::default();
    match &state.view {
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Load days and press Plot to see weights  (Help → Instructions)");
            });
        }
        Some(PlotView::WeightOverDays { dates, weights }) => {
            weight_over_days(ui, &theme, dates, weights);
        }
        Some(PlotView::WeightVsExternal(analysis)) => {
            weight_vs_external(ui, &theme, analysis);
        }
    }
}

// ---------------------------------------------------------------------------
// Weight over days
// ---------------------------------------------------------------------------

fn weight_over_days(ui: &mut Ui, theme: &PlotTheme, dates: &[String], weights: &[f64]) {
    let series: Vec<[f64; 2]> = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| [i as f64, w])
        .collect();

    // Day labels on integer ticks only.
    let labels = dates.to_vec();
    let formatter = move |mark: GridMark, _range: &std::ops::RangeInclusive<f64>| {
        let v = mark.value;
        if v.fract() != 0.0 || v < 0.0 {
            return String::new();
        }
        labels.get(v as usize).cloned().unwrap_or_default()
    };

    Plot::new("weight_over_days")
        .legend(Legend::default())
        .x_axis_label("Day")
        .y_axis_label("Weight (%)")
        .x_axis_formatter(formatter)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::new(series.clone()))
                    .name("Weight")
                    .color(theme.weight)
                    .width(1.5),
            );
            plot_ui.points(
                Points::new(PlotPoints::new(series))
                    .name("Weight")
                    .color(theme.weight)
                    .radius(4.0),
            );
        });
}

// ---------------------------------------------------------------------------
// Weight vs external values
// ---------------------------------------------------------------------------

fn weight_vs_external(ui: &mut Ui, theme: &PlotTheme, analysis: &ExternalAnalysis) {
    Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.label(
            RichText::new(analysis.summary())
                .monospace()
                .color(theme.annotation),
        );
    });
    ui.add_space(4.0);

    let pairs: Vec<[f64; 2]> = analysis
        .external
        .iter()
        .zip(&analysis.weights)
        .map(|(&x, &y)| [x, y])
        .collect();

    let (inliers, outliers): (Vec<[f64; 2]>, Vec<[f64; 2]>) = match &analysis.classification {
        Some(c) => {
            let mut inl = Vec::new();
            let mut out = Vec::new();
            for (p, &is_outlier) in pairs.iter().zip(&c.outliers) {
                if is_outlier {
                    out.push(*p);
                } else {
                    inl.push(*p);
                }
            }
            (inl, out)
        }
        None => (pairs, Vec::new()),
    };

    let inlier_name = if analysis.classification.is_some() {
        "Inliers"
    } else {
        "Data"
    };

    Plot::new("weight_vs_external")
        .legend(Legend::default())
        .x_axis_label("External value")
        .y_axis_label("Weight (%)")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.points(
                Points::new(PlotPoints::new(inliers))
                    .name(inlier_name)
                    .color(theme.inlier)
                    .radius(4.0),
            );

            if !outliers.is_empty() {
                plot_ui.points(
                    Points::new(PlotPoints::new(outliers))
                        .name("Outliers")
                        .shape(MarkerShape::Cross)
                        .color(theme.outlier)
                        .radius(6.0),
                );
            }

            if !analysis.regression_line.is_empty() {
                plot_ui.line(
                    Line::new(PlotPoints::new(analysis.regression_line.clone()))
                        .name("Regression")
                        .color(theme.regression)
                        .style(LineStyle::dashed_loose())
                        .width(2.0),
                );
            }
        });
}

/// Opens a plain window listing the workflow.
pub fn instructions_window(ctx: &egui::Context, open: &mut bool) {
    egui::Window::new("Instructions")
        .open(open)
        .resizable(true)
        .default_width(420.0)
        .show(ctx, |ui: &mut Ui| {
            ui.label("1. Choose the base folder holding YYYYMMDD day folders and press Load days.");
            ui.label("2. Tick the days to include. Each needs an *ExpDetails* file with a 'BW … %' line.");
            ui.label("3. Press Plot to chart weight over the selected days.");
            ui.label(
                "4. To correlate with external values, enable them and pick either one file \
                 holding a value per selected day, or a file name present in every day folder.",
            );
            ui.label("   Supported formats: .npy, .pkl, .mat");
            ui.label(
                "5. Mark outliers drops samples whose z-score reaches the threshold on either \
                 axis before computing Pearson r and the regression.",
            );
            ui.label("6. Save weights writes {weights, dates} as .mat or .npy.");
        });
}
