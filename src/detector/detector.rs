//! 检测器核心：整合规则缓存、规则引擎与启发式检查，输出检测报告
use std::sync::Arc;

use tracing::debug;

use super::heuristics::HeuristicRegistry;
use super::report::{LinkCandidate, Report, ReportAssembler};
use crate::compiler::CompiledRuleSet;
use crate::config::GlobalConfig;
use crate::error::RcuResult;
use crate::rule::{RemoteRuleSource, RuleSetCache, RuleSource};

/// 追踪参数检测器
/// 可廉价克隆，克隆体共享同一个规则缓存
#[derive(Clone)]
pub struct TrackingDetector {
    cache: Arc<RuleSetCache>,
    heuristics: Arc<HeuristicRegistry>,
}

impl TrackingDetector {
    /// 使用配置中的远程规则源创建检测器（此时不发起网络请求）
    pub fn new(config: &GlobalConfig) -> RcuResult<Self> {
        let source = RemoteRuleSource::new(config)?;
        Ok(Self::with_source(Arc::new(source), config))
    }

    /// 使用自定义规则源
    pub fn with_source(source: Arc<dyn RuleSource>, config: &GlobalConfig) -> Self {
        Self::with_cache(Arc::new(RuleSetCache::new(source, config)), HeuristicRegistry::default())
    }

    pub fn with_cache(cache: Arc<RuleSetCache>, heuristics: HeuristicRegistry) -> Self {
        Self {
            cache,
            heuristics: Arc::new(heuristics),
        }
    }

    /// 检测一组链接，首次调用时加载规则集
    pub async fn inspect(&self, links: &[LinkCandidate]) -> Report {
        if links.is_empty() {
            return Report::default();
        }

        let rule_set = self.cache.load().await;
        let report = ReportAssembler::assemble(links, &rule_set, &self.heuristics);
        debug!(
            "Inspected {} links against {} providers, {} reported",
            links.len(),
            rule_set.len(),
            report.len()
        );
        report
    }

    /// 检测单个 URL
    pub async fn inspect_url(&self, url: &str) -> Report {
        self.inspect(&[LinkCandidate::new(url)]).await
    }

    /// 当前规则集（必要时触发加载）
    pub async fn rule_set(&self) -> Arc<CompiledRuleSet> {
        self.cache.load().await
    }

    pub fn cache(&self) -> &Arc<RuleSetCache> {
        &self.cache
    }

    pub fn heuristics(&self) -> &HeuristicRegistry {
        &self.heuristics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::detector::report::ComplaintKind;
    use crate::rule::{CacheState, RuleSet, StaticRuleSource};

    fn detector_with(json: &str) -> TrackingDetector {
        let rule_set = RuleSet::from_json_str(json).unwrap();
        TrackingDetector::with_source(Arc::new(StaticRuleSource::new(rule_set)), &ConfigManager::get_default())
    }

    #[tokio::test]
    async fn test_inspect_end_to_end() {
        let detector = detector_with(
            r#"{"providers":{
                "doubleclick": {"urlPattern": "doubleclick\\.net", "completeProvider": true},
                "example": {"urlPattern": "example\\.com", "rules": ["utm_source"]}
            }}"#,
        );

        let links = vec![
            LinkCandidate::new("https://example.com/page?utm_source=newsletter&id=5"),
            LinkCandidate::new("https://example.com/page?id=5"),
            LinkCandidate::new("https://doubleclick.net/ad?x=1"),
            LinkCandidate::new("https://amzn.asia/d/abc123"),
        ];

        assert_eq!(detector.cache().state(), CacheState::Empty);
        let report = detector.inspect(&links).await;
        assert_eq!(detector.cache().state(), CacheState::Ready { stale: false });

        let urls: Vec<&str> = report.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/page?utm_source=newsletter&id=5",
                "https://doubleclick.net/ad?x=1",
                "https://amzn.asia/d/abc123",
            ]
        );
        assert_eq!(
            report.get("https://doubleclick.net/ad?x=1").unwrap()[0].kind,
            ComplaintKind::CompleteProvider
        );
        assert_eq!(
            report.get("https://amzn.asia/d/abc123").unwrap()[0].kind,
            ComplaintKind::Heuristic
        );
    }

    #[tokio::test]
    async fn test_empty_input_does_not_load_rules() {
        let detector = detector_with(r#"{"providers":{}}"#);
        assert!(detector.inspect(&[]).await.is_empty());
        assert_eq!(detector.cache().state(), CacheState::Empty);
    }

    #[tokio::test]
    async fn test_unreachable_source_fails_open() {
        let config = ConfigManager::custom()
            .rules_url("http://127.0.0.1:9/unreachable.json")
            .http_timeout(2)
            .build();
        let detector = TrackingDetector::new(&config).unwrap();

        let report = detector.inspect_url("https://amzn.asia/d/abc123").await;
        assert_eq!(report.len(), 1);
        assert!(detector.rule_set().await.is_empty());
    }
}
