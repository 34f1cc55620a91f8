use crate::analysis::{
    MATCH_TOLERANCE,
    MAX_PREDICTIONS,
    MIN_PREDICTIONS,
};
use crate::errors::{
    Result,
    SaxsError,
};
use crate::peak_set::{
    CLICK_TOLERANCE,
    DUPLICATE_TOLERANCE,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Tunables of the analysis engine. Every field has a default, so a partial
/// JSON object is a valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Predicted/detected matching tolerance, fraction of the q-range.
    pub match_tolerance: f64,
    /// Reach of pointer-driven edits, fraction of the q-range.
    pub click_tolerance: f64,
    /// Distance under which two peaks are the same, fraction of the q-range.
    pub duplicate_tolerance: f64,
    pub default_count: usize,
    pub min_analysis_peaks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_tolerance: MATCH_TOLERANCE,
            click_tolerance: CLICK_TOLERANCE,
            duplicate_tolerance: DUPLICATE_TOLERANCE,
            default_count: MIN_PREDICTIONS,
            min_analysis_peaks: 3,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("match_tolerance", self.match_tolerance),
            ("click_tolerance", self.click_tolerance),
            ("duplicate_tolerance", self.duplicate_tolerance),
        ] {
            if !(value.is_finite() && value > 0.0 && value < 1.0) {
                return Err(SaxsError::out_of_domain(name, value, "a fraction in (0, 1)"));
            }
        }
        if !(MIN_PREDICTIONS..=MAX_PREDICTIONS).contains(&self.default_count) {
            return Err(SaxsError::out_of_domain(
                "default_count",
                self.default_count,
                "an integer between 5 and 10",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"default_count": 7}"#).unwrap();
        assert_eq!(cfg.default_count, 7);
        assert_eq!(cfg.match_tolerance, 0.005);
        assert_eq!(cfg.click_tolerance, 0.02);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let cfg = EngineConfig {
            default_count: 11,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = EngineConfig {
            match_tolerance: 0.0,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
