use crate::patterns::PatternSpec;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tuning constants for the pattern scorer.
///
/// The threshold and confidence values are inherited tuning constants; they
/// are exposed here rather than hard-coded so deployments can adjust them
/// without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Risk contribution above which a threat is reported as danger.
    pub danger_threshold: f64,
    /// Risk contribution above which a threat is reported as warning.
    pub warning_threshold: f64,
    /// Risk contribution above which the "multiple red flags" advice fires.
    pub red_flag_threshold: f64,
    pub confidence_base: f64,
    pub confidence_step: f64,
    pub confidence_cap: f64,
    /// A pattern's contribution saturates at base_risk * saturation_factor.
    pub saturation_factor: f64,
    /// URL count above which the link-flood penalty applies.
    pub url_flood_threshold: usize,
    pub url_penalty_step: f64,
    pub url_penalty_cap: f64,
    /// Extra detection patterns appended after the built-in table.
    pub custom_patterns: Vec<PatternSpec>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            danger_threshold: 25.0,
            warning_threshold: 15.0,
            red_flag_threshold: 20.0,
            confidence_base: 0.6,
            confidence_step: 0.1,
            confidence_cap: 0.95,
            saturation_factor: 2.0,
            url_flood_threshold: 3,
            url_penalty_step: 5.0,
            url_penalty_cap: 25.0,
            custom_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntelConfig {
    /// Reputation feed endpoint queried per indicator.
    pub feed_url: String,
    pub timeout_seconds: u64,
    pub cache_ttl_seconds: u64,
    /// Serve deterministic canned verdicts instead of querying the feed.
    pub use_mock: bool,
    /// Score deduction applied per malicious indicator verdict.
    pub reputation_penalty: f64,
    /// Upper bound on feed lookups per analyzed message.
    pub max_lookups: usize,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            feed_url: "https://feed.scamscan.invalid/v1/indicator".to_string(),
            timeout_seconds: 10,
            cache_ttl_seconds: 3600,
            use_mock: false,
            reputation_penalty: 30.0,
            max_lookups: 16,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub analyzer: AnalyzerConfig,
    pub intel: IntelConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn generate<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(&Config::default())
            .context("failed to serialize default config")?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("failed to write config file: {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Reject configs that would fail later at analyzer construction.
    pub fn validate(&self) -> Result<()> {
        for spec in &self.analyzer.custom_patterns {
            spec.compile()?;
        }
        anyhow::ensure!(
            self.analyzer.saturation_factor >= 1.0,
            "saturation_factor must be at least 1.0"
        );
        anyhow::ensure!(
            self.analyzer.confidence_cap <= 1.0,
            "confidence_cap must not exceed 1.0"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::ThreatCategory;

    #[test]
    fn test_default_matches_documented_constants() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.danger_threshold, 25.0);
        assert_eq!(config.warning_threshold, 15.0);
        assert_eq!(config.red_flag_threshold, 20.0);
        assert_eq!(config.confidence_base, 0.6);
        assert_eq!(config.confidence_cap, 0.95);
        assert_eq!(config.url_flood_threshold, 3);
        assert_eq!(config.url_penalty_cap, 25.0);
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(
            parsed.analyzer.danger_threshold,
            Config::default().analyzer.danger_threshold
        );
        assert_eq!(parsed.intel.cache_ttl_seconds, 3600);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("analyzer:\n  danger_threshold: 40\n").unwrap();
        assert_eq!(config.analyzer.danger_threshold, 40.0);
        assert_eq!(config.analyzer.warning_threshold, 15.0);
        assert_eq!(config.intel.max_lookups, 16);
    }

    #[test]
    fn test_validate_rejects_bad_custom_pattern() {
        let mut config = Config::default();
        config.analyzer.custom_patterns.push(PatternSpec {
            label: "Broken".to_string(),
            category: ThreatCategory::Phishing,
            pattern: "unclosed(".to_string(),
            base_risk: 10.0,
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Broken"));
    }
}
