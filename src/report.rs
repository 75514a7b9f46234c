use crate::patterns::ThreatCategory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify an aggregate score into a risk tier. Pure and stateless;
    /// the same score always maps to the same tier.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            RiskLevel::Minimal
        } else if score >= 75.0 {
            RiskLevel::Low
        } else if score >= 50.0 {
            RiskLevel::Medium
        } else if score >= 25.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatSeverity {
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreatKind {
    SocialEngineering,
    FinancialFraud,
    Phishing,
    LinkFlood,
    Reputation,
}

impl From<ThreatCategory> for ThreatKind {
    fn from(category: ThreatCategory) -> Self {
        match category {
            ThreatCategory::SocialEngineering => ThreatKind::SocialEngineering,
            ThreatCategory::FinancialFraud => ThreatKind::FinancialFraud,
            ThreatCategory::Phishing => ThreatKind::Phishing,
        }
    }
}

/// One matched pattern with its occurrence-scaled, saturated risk value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub label: String,
    pub occurrences: usize,
    pub risk_contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatEntry {
    pub kind: ThreatKind,
    pub severity: ThreatSeverity,
    pub confidence: f64,
    pub description: String,
    pub mitigation: String,
}

/// Full analysis report. Built fresh on every call and owned entirely by
/// the caller; the analyzer keeps no reference to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAnalysis {
    pub overall_score: f64,
    pub risk_level: RiskLevel,
    pub threats: Vec<ThreatEntry>,
    pub patterns: Vec<PatternMatch>,
    pub recommendations: Vec<String>,
}
