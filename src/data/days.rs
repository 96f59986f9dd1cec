use std::path::{Path, PathBuf};

use super::error::{DataError, Result};
use super::model::DayFolder;

/// Substring a details log must contain in its file name.
const DETAILS_MARKER: &str = "ExpDetails";

// ---------------------------------------------------------------------------
// Day folder discovery
// ---------------------------------------------------------------------------

/// List the day folders directly under `base`, sorted by date.
///
/// Only directories named with exactly eight digits are returned; any other
/// entry is ignored without being reported.
pub fn discover(base: &Path) -> Result<Vec<DayFolder>> {
    if !base.exists() {
        return Err(DataError::NotFound(format!(
            "Base folder does not exist: {}",
            base.display()
        )));
    }

    let entries = std::fs::read_dir(base).map_err(|e| DataError::io(base, e))?;

    let mut days = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DataError::io(base, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(day) = DayFolder::from_path(path) {
            days.push(day);
        }
    }

    if days.is_empty() {
        return Err(DataError::NotFound(format!(
            "No valid day folders found in {}",
            base.display()
        )));
    }

    days.sort();
    log::debug!("Discovered {} day folders under {}", days.len(), base.display());
    Ok(days)
}

// ---------------------------------------------------------------------------
// Details file lookup
// ---------------------------------------------------------------------------

/// Find the `*ExpDetails*.txt` log of a day.
///
/// Directory listing order is platform dependent, so when several files
/// qualify the one with the smallest file name wins.
pub fn locate_details_file(day: &DayFolder) -> Result<PathBuf> {
    let dir = day.path();
    let entries = std::fs::read_dir(dir).map_err(|e| DataError::io(dir, e))?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DataError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && is_details_file(&path) {
            candidates.push(path);
        }
    }

    candidates.sort();
    if candidates.len() > 1 {
        log::warn!(
            "Folder {} has {} ExpDetails files, using {}",
            day.name(),
            candidates.len(),
            candidates[0].display()
        );
    }

    candidates.into_iter().next().ok_or_else(|| {
        DataError::NotFound(format!("Missing ExpDetails file in folder: {}", day.name()))
    })
}

fn is_details_file(path: &Path) -> bool {
    let has_txt_ext = path.extension().and_then(|e| e.to_str()) == Some("txt");
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains(DETAILS_MARKER));
    has_txt_ext && name_matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn day_in(tmp: &TempDir, name: &str) -> DayFolder {
        let path = tmp.path().join(name);
        fs::create_dir_all(&path).unwrap();
        DayFolder::from_path(path).unwrap()
    }

    #[test]
    fn test_discover_finds_only_date_folders() {
        let tmp = TempDir::new().unwrap();
        for name in ["20251203", "20251201", "20251202", "invalid_folder", "2025120"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        // A file with a date-like name is not a day folder.
        fs::write(tmp.path().join("20251204"), "not a dir").unwrap();

        let days = discover(tmp.path()).unwrap();
        let names: Vec<&str> = days.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["20251201", "20251202", "20251203"]);
    }

    #[test]
    fn test_discover_without_day_folders_fails() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("invalid_folder")).unwrap();

        let err = discover(tmp.path()).unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
        assert!(err.to_string().contains("No valid day folders found"));
    }

    #[test]
    fn test_discover_missing_base_fails() {
        let err = discover(Path::new("/nonexistent/path/12345")).unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
        assert!(err.to_string().contains("Base folder does not exist"));
    }

    #[test]
    fn test_locate_details_file() {
        let tmp = TempDir::new().unwrap();
        let day = day_in(&tmp, "20251201");
        let expected = day.path().join("IP75_20251201_ExpDetails.txt");
        fs::write(&expected, "BW: 83% 21.2g").unwrap();
        fs::write(day.path().join("notes.txt"), "other").unwrap();
        fs::write(day.path().join("ExpDetails.csv"), "wrong ext").unwrap();

        assert_eq!(locate_details_file(&day).unwrap(), expected);
    }

    #[test]
    fn test_locate_details_file_missing() {
        let tmp = TempDir::new().unwrap();
        let day = day_in(&tmp, "20251201");
        fs::write(day.path().join("other_file.txt"), "content").unwrap();

        let err = locate_details_file(&day).unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
        assert!(err.to_string().contains("Missing ExpDetails file"));
        assert!(err.to_string().contains("20251201"));
    }

    #[test]
    fn test_locate_details_file_picks_smallest_name() {
        let tmp = TempDir::new().unwrap();
        let day = day_in(&tmp, "20251201");
        fs::write(day.path().join("b_ExpDetails.txt"), "BW: 1%").unwrap();
        fs::write(day.path().join("a_ExpDetails.txt"), "BW: 2%").unwrap();

        let found = locate_details_file(&day).unwrap();
        assert_eq!(found.file_name().unwrap(), "a_ExpDetails.txt");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_discover_filters_and_sorts(
            dates in proptest::collection::btree_set("[0-9]{8}", 1..6),
            noise in proptest::collection::btree_set("[a-z]{1,8}|[0-9]{1,7}|[0-9]{9}", 0..4),
        ) {
            let tmp = TempDir::new().unwrap();
            for name in dates.iter().chain(noise.iter()) {
                fs::create_dir_all(tmp.path().join(name)).unwrap();
            }

            let days = discover(tmp.path()).unwrap();
            let names: Vec<String> = days.iter().map(|d| d.name().to_string()).collect();
            let expected: Vec<String> = dates.into_iter().collect();
            prop_assert_eq!(names, expected);
        }
    }
}
