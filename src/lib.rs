pub mod analyzer;
pub mod config;
pub mod intel;
pub mod patterns;
pub mod pipeline;
pub mod report;

pub use analyzer::ThreatAnalyzer;
pub use config::{AnalyzerConfig, Config, IntelConfig};
pub use intel::{IndicatorCache, IndicatorReport, IndicatorType, ReputationService};
pub use pipeline::AnalysisPipeline;
pub use report::{
    PatternMatch, RiskLevel, SecurityAnalysis, ThreatEntry, ThreatKind, ThreatSeverity,
};
