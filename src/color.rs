use eframe::egui::Color32;
use palette::{named, Darken, Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Plot colours
// ---------------------------------------------------------------------------

fn to_color32(c: Srgb<u8>) -> Color32 {
    Color32::from_rgb(c.red, c.green, c.blue)
}

/// Colours used by the plots.
#[derive(Debug, Clone, Copy)]
pub struct PlotTheme {
    pub weight: Color32,
    pub inlier: Color32,
    pub outlier: Color32,
    pub regression: Color32,
    /// Stats box text.
    pub annotation: Color32,
}

impl Default for PlotTheme {
    fn default() -> Self {
        Self {
            weight: to_color32(named::REBECCAPURPLE),
            inlier: to_color32(named::REBECCAPURPLE),
            outlier: to_color32(named::CRIMSON),
            regression: to_color32(named::MEDIUMORCHID),
            annotation: darkened(named::MEDIUMORCHID, 0.35),
        }
    }
}

/// `c` with its HSL lightness reduced by `amount` (0..1).
fn darkened(c: Srgb<u8>, amount: f32) -> Color32 {
    let hsl: Hsl = c.into_format::<f32>().into_color();
    let rgb: Srgb = hsl.darken(amount).into_color();
    to_color32(rgb.into_format())
}
