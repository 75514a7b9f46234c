use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Advice returned for any threat label without a dedicated mitigation entry.
pub const FALLBACK_MITIGATION: &str = "Exercise caution and verify independently";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreatCategory {
    SocialEngineering,
    FinancialFraud,
    Phishing,
}

/// Declarative form of a detection pattern, as it appears in config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternSpec {
    pub label: String,
    pub category: ThreatCategory,
    pub pattern: String,
    pub base_risk: f64,
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub label: String,
    pub category: ThreatCategory,
    pub base_risk: f64,
    pub matcher: Regex,
}

impl PatternSpec {
    fn new(label: &str, category: ThreatCategory, pattern: &str, base_risk: f64) -> Self {
        Self {
            label: label.to_string(),
            category,
            pattern: pattern.to_string(),
            base_risk,
        }
    }

    pub fn compile(&self) -> Result<CompiledPattern> {
        let matcher = RegexBuilder::new(&self.pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .with_context(|| format!("invalid regex for pattern '{}'", self.label))?;

        Ok(CompiledPattern {
            label: self.label.clone(),
            category: self.category,
            base_risk: self.base_risk,
            matcher,
        })
    }
}

/// Built-in detection patterns.
///
/// All gaps between phrase fragments use bounded quantifiers so no matcher
/// can backtrack catastrophically on adversarial input. Most allow up to 20
/// filler characters; "Account threat scam" allows 30 because the threat
/// clause ("or it will be ...") routinely pads the gap past 20.
pub fn builtin_specs() -> Vec<PatternSpec> {
    use ThreatCategory::*;

    vec![
        PatternSpec::new(
            "Urgency tactics",
            SocialEngineering,
            r"urgent(ly)?\W.{0,20}(verify|action|transfer|respond|attention|need|require)|immediate(ly)?\W.{0,15}(action|attention|require)|act\W{0,3}now",
            15.0,
        ),
        PatternSpec::new(
            "Identity verification scam",
            SocialEngineering,
            r"verif(y|ication)\W.{0,20}(account|identity|information|details)|confirm\W.{0,15}(identity|account)",
            20.0,
        ),
        PatternSpec::new(
            "Suspicious call-to-action",
            SocialEngineering,
            r"click\W{0,3}(here|below|now|the\W{0,3}link)|follow\W{0,3}(this|the)\W{0,3}link",
            12.0,
        ),
        PatternSpec::new(
            "Account threat scam",
            SocialEngineering,
            r"account\W.{0,30}(suspend|clos|lock|terminat|restrict|disabl)|(suspend|lock|disabl)\w*\W.{0,20}account",
            18.0,
        ),
        PatternSpec::new(
            "Prize notification scam",
            SocialEngineering,
            r"you\W{0,3}(have|'ve)\W{0,3}won|claim\W.{0,15}(prize|reward|winnings)|lottery\W.{0,15}(winner|selected)",
            15.0,
        ),
        PatternSpec::new(
            "Wire transfer request",
            FinancialFraud,
            r"wire\W{0,3}transfer|transfer\W.{0,20}(funds|money|payment)|send\W.{0,15}(money|funds)",
            30.0,
        ),
        PatternSpec::new(
            "Cryptocurrency mention",
            FinancialFraud,
            r"\b(bitcoin|btc|ethereum|usdt|crypto(currency)?)\b|wallet\W{0,3}address",
            10.0,
        ),
        PatternSpec::new(
            "Advance fee fraud",
            FinancialFraud,
            r"(processing|advance|upfront|release|transfer)\W{0,3}fee|fee\W.{0,20}(required|release|unlock)",
            22.0,
        ),
        PatternSpec::new(
            "Brand impersonation",
            Phishing,
            r"(paypal|amazon|microsoft|apple|netflix|docusign|fedex|irs)\W.{0,20}(security|verif|suspend|alert|update|notice)",
            20.0,
        ),
        PatternSpec::new(
            "Credential harvesting",
            Phishing,
            r"(update|confirm|re-?enter)\W.{0,15}(password|billing|card\W{0,3}(number|details)|payment\W{0,3}(method|details))",
            18.0,
        ),
    ]
}

lazy_static! {
    static ref MITIGATIONS: HashMap<&'static str, &'static str> = HashMap::from([
        ("Urgency tactics", "Take time to verify claims independently"),
        (
            "Identity verification scam",
            "Contact the organization directly through official channels",
        ),
        ("Suspicious call-to-action", "Avoid clicking suspicious links"),
        (
            "Account threat scam",
            "Log in through the official website, not through links",
        ),
        ("Wire transfer request", "Never send money to unknown parties"),
        ("Cryptocurrency mention", "Be cautious of crypto-related requests"),
        (
            "Advance fee fraud",
            "Legitimate organizations do not ask for upfront fees",
        ),
        (
            "Brand impersonation",
            "Verify sender authenticity through official channels",
        ),
    ]);
}

/// Look up the mitigation advice for a threat label. Labels outside the
/// fixed table get the generic fallback, so the result is never empty.
pub fn mitigation_for(label: &str) -> &'static str {
    MITIGATIONS.get(label).copied().unwrap_or(FALLBACK_MITIGATION)
}
