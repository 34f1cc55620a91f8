use saxsphase::{
    DetectionAlgorithm,
    EngineConfig,
    Enhancement,
    SpaceGroup,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use crate::error::CliError;

/// Either a fixed enhancement or "pick the best-scoring one".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EnhancementChoice {
    Auto,
    Fixed(Enhancement),
}

impl Default for EnhancementChoice {
    fn default() -> Self {
        EnhancementChoice::Fixed(Enhancement::Original)
    }
}

impl FromStr for EnhancementChoice {
    type Err = saxsphase::SaxsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(EnhancementChoice::Auto);
        }
        s.parse().map(EnhancementChoice::Fixed)
    }
}

impl TryFrom<String> for EnhancementChoice {
    type Error = saxsphase::SaxsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EnhancementChoice> for String {
    fn from(value: EnhancementChoice) -> Self {
        value.to_string()
    }
}

impl Display for EnhancementChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnhancementChoice::Auto => f.write_str("auto"),
            EnhancementChoice::Fixed(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub enhancement: EnhancementChoice,
    /// Overrides the suggested detector when set.
    pub algorithm: Option<DetectionAlgorithm>,
    /// When unset the best-ranked group is used.
    pub space_group: Option<SpaceGroup>,
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub analysis: AnalysisConfig,
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self, CliError> {
        let config: Config = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CliError> {
        self.engine.validate()?;
        if let Some(count) = self.analysis.count {
            if !(saxsphase::analysis::MIN_PREDICTIONS..=saxsphase::analysis::MAX_PREDICTIONS)
                .contains(&count)
            {
                return Err(CliError::Config(format!(
                    "analysis.count must be between 5 and 10, got {}",
                    count
                )));
            }
        }
        Ok(())
    }

    pub fn template() -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&Config::default())?)
    }
}
