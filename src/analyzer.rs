use crate::config::AnalyzerConfig;
use crate::patterns::{self, CompiledPattern};
use crate::report::{
    PatternMatch, RiskLevel, SecurityAnalysis, ThreatEntry, ThreatKind, ThreatSeverity,
};
use anyhow::{Context, Result};
use regex::Regex;

pub const REC_VERIFY_SENDER: &str =
    "Verify the sender's identity through an independent channel";
pub const REC_SCAN_URLS: &str =
    "Scan all URLs with a reputable link checker before clicking";
pub const REC_HIGH_RISK: &str = "Treat this message as high-risk until proven otherwise";
pub const REC_RED_FLAGS: &str = "Multiple red flags detected; do not act on this message";

const URL_THREAT_LABEL: &str = "Multiple URLs";

/// Pattern-based scorer for social-engineering, financial-fraud, and
/// phishing indicators in free text.
///
/// Analysis is a pure function over the input and the immutable pattern
/// table: no I/O, no shared mutable state, safe to call from any number of
/// threads without coordination.
pub struct ThreatAnalyzer {
    config: AnalyzerConfig,
    patterns: Vec<CompiledPattern>,
    url_matcher: Regex,
}

impl ThreatAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        // Pre-compile the full pattern table once; custom patterns append
        // after the built-ins so report ordering stays stable.
        let mut compiled = Vec::new();
        for spec in builtin_and_custom(&config) {
            compiled.push(spec.compile()?);
        }

        let url_matcher = Regex::new(r"(?i)\bhttps?://[a-z0-9][a-z0-9.-]{0,253}")
            .context("failed to compile URL matcher")?;

        Ok(Self {
            config,
            patterns: compiled,
            url_matcher,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(AnalyzerConfig::default())
    }

    /// Analyze a piece of text and produce a full report. Empty input is
    /// valid and yields a clean result.
    pub fn analyze(&self, content: &str) -> SecurityAnalysis {
        let mut matches = Vec::new();
        let mut threats = Vec::new();

        for pattern in &self.patterns {
            let occurrences = pattern.matcher.find_iter(content).count();
            if occurrences == 0 {
                continue;
            }

            // Saturate so a single repeated phrase cannot dominate the score
            let risk_contribution = (pattern.base_risk * occurrences as f64)
                .min(pattern.base_risk * self.config.saturation_factor);

            threats.push(self.pattern_threat(pattern, occurrences, risk_contribution));
            matches.push(PatternMatch {
                label: pattern.label.clone(),
                occurrences,
                risk_contribution,
            });
        }

        let url_count = self.url_matcher.find_iter(content).count();
        let url_penalty = if url_count > self.config.url_flood_threshold {
            let penalty = (self.config.url_penalty_step * url_count as f64)
                .min(self.config.url_penalty_cap);
            threats.push(self.link_flood_threat(url_count));
            penalty
        } else {
            0.0
        };

        let deductions: f64 =
            matches.iter().map(|m| m.risk_contribution).sum::<f64>() + url_penalty;
        let overall_score = (100.0 - deductions).clamp(0.0, 100.0);

        if !threats.is_empty() {
            log::debug!(
                "content scored {overall_score:.1} with {} threat(s), {} URL(s)",
                threats.len(),
                url_count
            );
        }

        let recommendations = self.recommendations_for(&threats, &matches);

        SecurityAnalysis {
            overall_score,
            risk_level: RiskLevel::from_score(overall_score),
            threats,
            patterns: matches,
            recommendations,
        }
    }

    fn pattern_threat(
        &self,
        pattern: &CompiledPattern,
        occurrences: usize,
        risk_contribution: f64,
    ) -> ThreatEntry {
        ThreatEntry {
            kind: ThreatKind::from(pattern.category),
            severity: self.severity_for(risk_contribution),
            confidence: self.confidence_for(occurrences),
            description: format!(
                "{}: {} occurrence(s) detected",
                pattern.label, occurrences
            ),
            mitigation: patterns::mitigation_for(&pattern.label).to_string(),
        }
    }

    fn link_flood_threat(&self, url_count: usize) -> ThreatEntry {
        ThreatEntry {
            kind: ThreatKind::LinkFlood,
            severity: ThreatSeverity::Warning,
            confidence: self.confidence_for(url_count),
            description: format!("{URL_THREAT_LABEL}: {url_count} links detected"),
            mitigation: patterns::mitigation_for(URL_THREAT_LABEL).to_string(),
        }
    }

    fn severity_for(&self, risk_contribution: f64) -> ThreatSeverity {
        if risk_contribution > self.config.danger_threshold {
            ThreatSeverity::Danger
        } else if risk_contribution > self.config.warning_threshold {
            ThreatSeverity::Warning
        } else {
            ThreatSeverity::Info
        }
    }

    /// Confidence rises with repeated evidence but never claims certainty.
    fn confidence_for(&self, occurrences: usize) -> f64 {
        (self.config.confidence_base + self.config.confidence_step * occurrences as f64)
            .min(self.config.confidence_cap)
    }

    /// Ordered, additive recommendation list. Each condition fires at most
    /// once and the order is fixed, not sorted by severity.
    pub fn recommendations_for(
        &self,
        threats: &[ThreatEntry],
        matches: &[PatternMatch],
    ) -> Vec<String> {
        let mut recommendations = vec![REC_VERIFY_SENDER.to_string()];

        if threats.iter().any(|t| t.kind == ThreatKind::LinkFlood) {
            recommendations.push(REC_SCAN_URLS.to_string());
        }
        if threats.iter().any(|t| t.severity == ThreatSeverity::Danger) {
            recommendations.push(REC_HIGH_RISK.to_string());
        }
        if matches
            .iter()
            .any(|m| m.risk_contribution > self.config.red_flag_threshold)
        {
            recommendations.push(REC_RED_FLAGS.to_string());
        }

        recommendations
    }

    /// URL-shaped substrings (scheme + host) found in the text, in order
    /// of appearance. Used by the intelligence pipeline to derive lookup
    /// indicators.
    pub fn extract_urls<'a>(&self, content: &'a str) -> Vec<&'a str> {
        self.url_matcher
            .find_iter(content)
            .map(|m| m.as_str())
            .collect()
    }
}

fn builtin_and_custom(config: &AnalyzerConfig) -> Vec<crate::patterns::PatternSpec> {
    let mut specs = patterns::builtin_specs();
    specs.extend(config.custom_patterns.iter().cloned());
    specs
}
