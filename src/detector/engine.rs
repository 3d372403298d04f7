//! 规则引擎：对单个 URL 按提供方顺序逐一评估
//! 纯同步计算，只读共享的编译结果，可在任意线程并发调用

use tracing::debug;
use url::Url;

use super::report::Complaint;
use crate::compiler::{CompiledProvider, CompiledRuleSet};
use crate::error::RcuResult;

/// 规则引擎
pub struct RuleEngine;

impl RuleEngine {
    /// 评估单个 URL，按提供方名称顺序、再按规则数组顺序输出问题
    /// URL 无法解析时视为无问题
    pub fn evaluate(url: &str, rule_set: &CompiledRuleSet) -> Vec<Complaint> {
        match Self::normalize(url) {
            Ok(parsed) => Self::evaluate_url(&parsed, rule_set),
            Err(e) => {
                debug!("Skipping unparsable link {:?}: {}", url, e);
                Vec::new()
            }
        }
    }

    /// 评估已解析的 URL（匹配对象为其规范化字符串形式）
    pub fn evaluate_url(url: &Url, rule_set: &CompiledRuleSet) -> Vec<Complaint> {
        let normalized = url.as_str();
        let mut complaints = Vec::new();
        for provider in rule_set.providers() {
            Self::evaluate_provider(provider, normalized, &mut complaints);
        }
        complaints
    }

    /// 解析为规范化的绝对 URL
    pub fn normalize(url: &str) -> RcuResult<Url> {
        Ok(Url::parse(url.trim())?)
    }

    fn evaluate_provider(provider: &CompiledProvider, url: &str, complaints: &mut Vec<Complaint>) {
        if !provider.matches(url) {
            return;
        }

        // 例外优先于所有其他规则
        if provider.is_excepted(url) {
            return;
        }

        if provider.complete_provider {
            complaints.push(Complaint::complete_provider(&provider.name));
            return;
        }

        for rule in &provider.rules {
            if rule.regex.is_match(url) {
                complaints.push(Complaint::rule(&provider.name, &rule.field));
            }
        }

        for raw_rule in &provider.raw_rules {
            if raw_rule.is_match(url) {
                complaints.push(Complaint::raw_rule(&provider.name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::RuleCompiler;
    use crate::detector::report::ComplaintKind;
    use crate::error::RsClearUrlsError;
    use crate::rule::{Provider, RuleSet};

    fn compile(providers: Vec<Provider>) -> CompiledRuleSet {
        RuleCompiler::default().compile(&RuleSet::from_providers(providers))
    }

    fn utm_provider() -> Provider {
        let mut provider = Provider::new("example", "example\\.com");
        provider.rules = vec!["utm_source".to_string()];
        provider
    }

    #[test]
    fn test_rule_matches_tracking_parameter() {
        let rule_set = compile(vec![utm_provider()]);

        let complaints = RuleEngine::evaluate("https://example.com/page?utm_source=newsletter&id=5", &rule_set);
        assert_eq!(complaints.len(), 1);
        assert!(complaints[0].message.contains("utm_source"));
        assert_eq!(complaints[0].kind, ComplaintKind::Rule);
        assert_eq!(complaints[0].provider.as_deref(), Some("example"));
    }

    #[test]
    fn test_clean_url_has_no_complaints() {
        let rule_set = compile(vec![utm_provider()]);
        assert!(RuleEngine::evaluate("https://example.com/page?id=5", &rule_set).is_empty());
    }

    #[test]
    fn test_complete_provider_short_circuits() {
        let mut provider = Provider::new("doubleclick", "doubleclick\\.net");
        provider.complete_provider = true;
        provider.rules = vec!["x".to_string()];
        provider.raw_rules = vec!["/ad".to_string()];
        let rule_set = compile(vec![provider]);

        let complaints = RuleEngine::evaluate("https://doubleclick.net/ad?x=1", &rule_set);
        assert_eq!(complaints.len(), 1);
        assert!(complaints[0].message.contains("blocked entirely"));
        assert_eq!(complaints[0].kind, ComplaintKind::CompleteProvider);
    }

    #[test]
    fn test_exception_overrides_everything() {
        let mut provider = Provider::new("google", "google\\.com");
        provider.complete_provider = true;
        provider.exceptions = vec!["google\\.com/maps".to_string()];
        let mut tracked = utm_provider();
        tracked.exceptions = vec!["(".to_string(), "example\\.com/safe".to_string()];
        let rule_set = compile(vec![provider, tracked]);

        assert!(RuleEngine::evaluate("https://google.com/maps?q=1", &rule_set).is_empty());
        assert!(RuleEngine::evaluate("https://example.com/safe?utm_source=x", &rule_set).is_empty());
        assert_eq!(RuleEngine::evaluate("https://google.com/search?q=1", &rule_set).len(), 1);
    }

    #[test]
    fn test_invalid_provider_does_not_affect_others() {
        let mut broken = Provider::new("aaa_broken", "(unclosed");
        broken.complete_provider = true;
        let mut second = Provider::new("shop", "shop\\.example");
        second.raw_rules = vec!["/ref=[^/?]*".to_string()];
        let rule_set = compile(vec![broken, utm_provider(), second]);

        let complaints = RuleEngine::evaluate("https://example.com/?utm_source=a", &rule_set);
        assert_eq!(complaints.len(), 1);

        let complaints = RuleEngine::evaluate("https://shop.example/item/ref=abc", &rule_set);
        assert_eq!(complaints.len(), 1);
        assert_eq!(complaints[0].message, "Matches tracking pattern from provider \"shop\"");
    }

    #[test]
    fn test_ordering_follows_provider_name_then_rule_order() {
        let mut b = Provider::new("b_provider", "example\\.com");
        b.rules = vec!["fbclid".to_string(), "gclid".to_string()];
        let mut a = Provider::new("a_provider", "example\\.com");
        a.rules = vec!["utm_medium".to_string()];
        a.raw_rules = vec!["utm_".to_string()];
        let rule_set = compile(vec![b, a]);

        let complaints = RuleEngine::evaluate(
            "https://example.com/?gclid=1&fbclid=2&utm_medium=social",
            &rule_set,
        );
        let summary: Vec<(&str, ComplaintKind)> = complaints
            .iter()
            .map(|c| (c.provider.as_deref().unwrap(), c.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a_provider", ComplaintKind::Rule),
                ("a_provider", ComplaintKind::RawRule),
                ("b_provider", ComplaintKind::Rule),
                ("b_provider", ComplaintKind::Rule),
            ]
        );
        assert!(complaints[2].message.contains("fbclid"));
        assert!(complaints[3].message.contains("gclid"));
    }

    #[test]
    fn test_unparsable_url_and_empty_rule_set() {
        let rule_set = compile(vec![utm_provider()]);
        assert!(RuleEngine::evaluate("example.com/?utm_source=x", &rule_set).is_empty());
        assert!(RuleEngine::evaluate("http://[::1", &rule_set).is_empty());

        let empty = CompiledRuleSet::default();
        assert!(RuleEngine::evaluate("https://example.com/?utm_source=x", &empty).is_empty());
    }

    #[test]
    fn test_normalize_reports_url_error() {
        let err = RuleEngine::normalize("example.com/?utm_source=x").unwrap_err();
        assert!(matches!(err, RsClearUrlsError::UrlError(url::ParseError::RelativeUrlWithoutBase)));
        assert!(!err.is_fetch_error());

        let err = RuleEngine::normalize("http://[::1").unwrap_err();
        assert!(matches!(err, RsClearUrlsError::UrlError(_)));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let rule_set = compile(vec![utm_provider()]);
        let url = "https://example.com/page?utm_source=newsletter";
        assert_eq!(RuleEngine::evaluate(url, &rule_set), RuleEngine::evaluate(url, &rule_set));
    }

    #[test]
    fn test_normalization_is_applied_before_matching() {
        let mut provider = Provider::new("host", "^https://example\\.com/");
        provider.rules = vec!["utm_source".to_string()];
        let rule_set = compile(vec![provider]);

        assert_eq!(RuleEngine::normalize("HTTPS://EXAMPLE.com").unwrap().as_str(), "https://example.com/");
        assert_eq!(RuleEngine::evaluate("HTTPS://Example.COM?utm_source=x", &rule_set).len(), 1);
    }
}
