use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::days::locate_details_file;
use super::error::{DataError, Result};
use super::model::{DayFolder, WeightRecord};

/// `BW` (any case), then the first integer/decimal literal that is followed by `%`.
fn weight_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i:BW).*?([0-9]+(?:\.[0-9]+)?)\s*%").expect("weight pattern is valid")
    })
}

// ---------------------------------------------------------------------------
// Weight extraction
// ---------------------------------------------------------------------------

/// Extract the body weight from a details log.
///
/// Lines are scanned in file order and the first line matching the pattern
/// wins. The value is returned as written, without clamping.
pub fn extract_weight(path: &Path) -> Result<f64> {
    let bytes = std::fs::read(path).map_err(|e| DataError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);

    // Lines may end with \r, \n or both.
    for line in text.split(['\r', '\n']) {
        if let Some(caps) = weight_pattern().captures(line) {
            let literal = &caps[1];
            return literal.parse::<f64>().map_err(|e| {
                DataError::parse(format!(
                    "invalid weight '{literal}' in {}: {e}",
                    path.display()
                ))
            });
        }
    }

    Err(DataError::parse(format!("BW not found in file: {}", path.display())))
}

/// Locate and parse the details log of every day, in the given order.
///
/// Stops at the first day that fails; the error names that day.
pub fn load_weights(days: &[DayFolder]) -> Result<Vec<WeightRecord>> {
    days.iter()
        .map(|day| {
            let file = locate_details_file(day)?;
            let weight = extract_weight(&file)?;
            log::debug!("Day {}: weight {weight} from {}", day.name(), file.display());
            Ok(WeightRecord {
                day: day.clone(),
                weight,
            })
        })
        .collect()
}
