//! Session tunables

use crate::formatting::FormatLimits;
use crate::history::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Maximum number of snapshots kept in history
    pub history_capacity: usize,
    /// Quiet period before the latest snapshot is persisted
    pub autosave_delay_ms: u64,
    /// Quiet period before a color change is committed to history
    pub color_commit_delay_ms: u64,
    pub min_font_size: f64,
    pub max_font_size: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            autosave_delay_ms: 1000,
            color_commit_delay_ms: 300,
            min_font_size: 10.0,
            max_font_size: 72.0,
        }
    }
}

impl SessionConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn color_commit_delay(&self) -> Duration {
        Duration::from_millis(self.color_commit_delay_ms)
    }

    pub fn format_limits(&self) -> FormatLimits {
        FormatLimits::new(self.min_font_size, self.max_font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{ "historyCapacity": 10 }"#).unwrap();
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.autosave_delay_ms, 1000);
        assert_eq!(config.max_font_size, 72.0);
    }

    #[test]
    fn test_reversed_font_bounds_are_swapped() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "minFontSize": 40, "maxFontSize": 20 }"#).unwrap();
        let limits = config.format_limits();
        assert_eq!(limits.min_font_size, 20.0);
        assert_eq!(limits.max_font_size, 40.0);
        assert_eq!(limits.clamp_font_size(50.0), 40.0);
    }

    #[test]
    fn test_unusable_font_bounds_fall_back() {
        let config = SessionConfig {
            min_font_size: f64::NAN,
            max_font_size: -5.0,
            ..Default::default()
        };
        let limits = config.format_limits();
        assert_eq!(limits, FormatLimits::default());
    }
}
