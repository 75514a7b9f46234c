use crate::analyzer::ThreatAnalyzer;
use crate::config::Config;
use crate::intel::{IndicatorType, ReputationService};
use crate::report::{RiskLevel, SecurityAnalysis, ThreatEntry, ThreatKind, ThreatSeverity};
use anyhow::Result;
use url::Url;

const REPUTATION_MITIGATION: &str =
    "Do not visit the flagged address; block it at the mail or web gateway";

/// Layered analysis: the pure pattern scorer always runs, and reputation
/// verdicts from the intelligence feed are merged on top when available.
/// The feed is strictly additive evidence; its failures never degrade the
/// heuristic result.
pub struct AnalysisPipeline {
    analyzer: ThreatAnalyzer,
    intel: ReputationService,
    reputation_penalty: f64,
    max_lookups: usize,
}

impl AnalysisPipeline {
    pub fn new(config: Config) -> Result<Self> {
        let reputation_penalty = config.intel.reputation_penalty;
        let max_lookups = config.intel.max_lookups;
        let analyzer = ThreatAnalyzer::new(config.analyzer)?;
        let intel = ReputationService::new(config.intel)?;

        Ok(Self {
            analyzer,
            intel,
            reputation_penalty,
            max_lookups,
        })
    }

    pub fn analyzer(&self) -> &ThreatAnalyzer {
        &self.analyzer
    }

    pub async fn analyze(&self, content: &str) -> SecurityAnalysis {
        let mut analysis = self.analyzer.analyze(content);

        for host in self.lookup_hosts(content) {
            let verdict = self.intel.lookup(IndicatorType::Domain, &host).await;
            if !verdict.malicious {
                continue;
            }

            log::info!(
                "domain {host} flagged by reputation feed (confidence {:.2})",
                verdict.confidence
            );
            let severity = if verdict.confidence >= 0.8 {
                ThreatSeverity::Danger
            } else {
                ThreatSeverity::Warning
            };
            analysis.threats.push(ThreatEntry {
                kind: ThreatKind::Reputation,
                severity,
                confidence: verdict.confidence,
                description: reputation_description(&host, &verdict.sources),
                mitigation: REPUTATION_MITIGATION.to_string(),
            });
            analysis.overall_score =
                (analysis.overall_score - self.reputation_penalty).clamp(0.0, 100.0);
        }

        analysis.risk_level = RiskLevel::from_score(analysis.overall_score);
        analysis.recommendations = self
            .analyzer
            .recommendations_for(&analysis.threats, &analysis.patterns);
        analysis
    }

    /// Distinct hosts from URL-shaped substrings, in order of appearance,
    /// bounded so a link-flooded message cannot trigger unbounded lookups.
    fn lookup_hosts(&self, content: &str) -> Vec<String> {
        let mut hosts = Vec::new();
        for raw in self.analyzer.extract_urls(content) {
            let Ok(parsed) = Url::parse(raw) else {
                continue;
            };
            let Some(host) = parsed.host_str() else {
                continue;
            };
            let host = host.to_lowercase();
            if !hosts.contains(&host) {
                hosts.push(host);
            }
            if hosts.len() >= self.max_lookups {
                break;
            }
        }
        hosts
    }
}

fn reputation_description(host: &str, sources: &[String]) -> String {
    if sources.is_empty() {
        format!("Domain {host} is flagged by threat intelligence")
    } else {
        format!(
            "Domain {host} is flagged by threat intelligence ({})",
            sources.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::REC_HIGH_RISK;

    fn mock_pipeline() -> AnalysisPipeline {
        let mut config = Config::default();
        config.intel.use_mock = true;
        AnalysisPipeline::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_malicious_domain_lowers_score() {
        let pipeline = mock_pipeline();
        let content = "meeting notes at http://updates.evil.tk today";

        let baseline = pipeline.analyzer().analyze(content);
        let analysis = pipeline.analyze(content).await;

        assert_eq!(
            analysis.overall_score,
            (baseline.overall_score - 30.0).clamp(0.0, 100.0)
        );
        let reputation = analysis
            .threats
            .iter()
            .find(|t| t.kind == ThreatKind::Reputation)
            .expect("reputation threat should be appended");
        assert_eq!(reputation.severity, ThreatSeverity::Danger);
        assert!(reputation.description.contains("updates.evil.tk"));
        assert!(!reputation.mitigation.is_empty());
        assert!(analysis.recommendations.contains(&REC_HIGH_RISK.to_string()));
    }

    #[tokio::test]
    async fn test_clean_domains_leave_result_untouched() {
        let pipeline = mock_pipeline();
        let content = "docs at https://docs.example.org";

        let baseline = pipeline.analyzer().analyze(content);
        let analysis = pipeline.analyze(content).await;

        assert_eq!(analysis, baseline);
    }

    #[tokio::test]
    async fn test_duplicate_urls_are_looked_up_once() {
        let pipeline = mock_pipeline();
        let content = "http://evil.tk http://evil.tk http://evil.tk";

        let analysis = pipeline.analyze(content).await;
        let reputation_threats = analysis
            .threats
            .iter()
            .filter(|t| t.kind == ThreatKind::Reputation)
            .count();
        assert_eq!(reputation_threats, 1);
    }

    #[tokio::test]
    async fn test_empty_content_stays_clean() {
        let pipeline = mock_pipeline();
        let analysis = pipeline.analyze("").await;
        assert_eq!(analysis.overall_score, 100.0);
        assert!(analysis.threats.is_empty());
    }

    #[test]
    fn test_lookup_hosts_are_bounded_and_distinct() {
        let mut config = Config::default();
        config.intel.use_mock = true;
        config.intel.max_lookups = 2;
        let pipeline = AnalysisPipeline::new(config).unwrap();

        let hosts = pipeline.lookup_hosts(
            "http://a.example http://a.example http://b.example http://c.example",
        );
        assert_eq!(hosts, vec!["a.example".to_string(), "b.example".to_string()]);
    }
}
