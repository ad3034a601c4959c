//! Persisted display preferences

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default timer text color
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";
/// Default timer text font
pub const DEFAULT_TEXT_FONT: &str = "monospace";

/// Timer display preferences, persisted across sessions
///
/// Stored as a JSON object keyed by the fixed identifiers
/// `timerTextColor` and `timerTextFont`; a missing or unreadable file
/// falls back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayPreferences {
    #[serde(rename = "timerTextColor")]
    pub text_color: String,
    #[serde(rename = "timerTextFont")]
    pub text_font: String,
}

impl DisplayPreferences {
    pub fn new() -> Self {
        Self {
            text_color: DEFAULT_TEXT_COLOR.to_string(),
            text_font: DEFAULT_TEXT_FONT.to_string(),
        }
    }

    /// Load preferences from disk, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(prefs) => {
                    debug!("Loaded display preferences from {}", path.display());
                    prefs
                }
                Err(e) => {
                    warn!("Ignoring unreadable preferences file {}: {}", path.display(), e);
                    Self::new()
                }
            },
            Err(_) => Self::new(),
        }
    }

    /// Write preferences to disk
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize preferences: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create preferences directory: {}", e))?;
            }
        }

        std::fs::write(path, contents)
            .map_err(|e| format!("Failed to write preferences file: {}", e))
    }
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_white_monospace() {
        let prefs = DisplayPreferences::new();
        assert_eq!(prefs.text_color, "#FFFFFF");
        assert_eq!(prefs.text_font, "monospace");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = DisplayPreferences::load(&dir.path().join("nope.json"));
        assert_eq!(prefs, DisplayPreferences::new());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "not json at all").unwrap();
        assert_eq!(DisplayPreferences::load(&path), DisplayPreferences::new());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = DisplayPreferences {
            text_color: "#FFAA00".to_string(),
            text_font: "'Courier New', monospace".to_string(),
        };
        prefs.save(&path).unwrap();

        assert_eq!(DisplayPreferences::load(&path), prefs);
    }

    #[test]
    fn stored_file_uses_fixed_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        DisplayPreferences::new().save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["timerTextColor"], "#FFFFFF");
        assert_eq!(raw["timerTextFont"], "monospace");
    }
}
