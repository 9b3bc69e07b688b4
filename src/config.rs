use anyhow::{Context, Result};
use serde::Deserialize;

use crate::analyzers::aggregate::SummaryOptions;
use crate::analyzers::types::SessionFilter;

/// Analysis settings, optionally loaded from a JSON file:
///
/// ```json
/// {
///   "session_type": "R",
///   "by_season": true,
///   "min_races": 5
/// }
/// ```
///
/// Missing keys take their defaults (races only, no season grouping, no
/// minimum race count). CLI flags override whatever the file sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub session_type: SessionFilter,
    #[serde(flatten)]
    pub summary: SummaryOptions,
}

impl AnalysisConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("invalid analysis config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::SessionType;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = AnalysisConfig::from_json("{}").unwrap();
        assert_eq!(config.session_type, SessionFilter::Only(SessionType::Race));
        assert!(!config.summary.by_season);
        assert_eq!(config.summary.min_races, 0);
    }

    #[test]
    fn test_full_config() {
        let json = r#"{"session_type": "All", "by_season": true, "min_races": 5}"#;
        let config = AnalysisConfig::from_json(json).unwrap();
        assert_eq!(config.session_type, SessionFilter::All);
        assert!(config.summary.by_season);
        assert_eq!(config.summary.min_races, 5);
    }

    #[test]
    fn test_bad_session_type_rejected() {
        assert!(AnalysisConfig::from_json(r#"{"session_type": "Sprint"}"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(AnalysisConfig::load("/nonexistent/indycar_rater.json").is_err());
    }
}
