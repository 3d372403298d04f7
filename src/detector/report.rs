//! 检测结果模型与报告组装
//! 报告按输入顺序保存每个有问题的链接，重复出现的链接分别评估、分别记录

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::engine::RuleEngine;
use super::heuristics::HeuristicRegistry;
use crate::compiler::CompiledRuleSet;

/// 消息解析方提供的候选链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
}

impl LinkCandidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_text: None,
        }
    }

    pub fn with_text(url: impl Into<String>, display_text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_text: Some(display_text.into()),
        }
    }
}

/// 问题来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComplaintKind {
    CompleteProvider,
    Rule,
    RawRule,
    Heuristic,
}

/// 单条问题描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub kind: ComplaintKind,
}

impl Complaint {
    pub fn complete_provider(provider: &str) -> Self {
        Self {
            message: format!("Matches tracking provider \"{}\" which should be blocked entirely", provider),
            provider: Some(provider.to_string()),
            kind: ComplaintKind::CompleteProvider,
        }
    }

    pub fn rule(provider: &str, field: &str) -> Self {
        Self {
            message: format!(
                "Contains tracking parameter \"{}\" (matched by provider \"{}\")",
                field, provider
            ),
            provider: Some(provider.to_string()),
            kind: ComplaintKind::Rule,
        }
    }

    // 原始正则不向最终用户展示
    pub fn raw_rule(provider: &str) -> Self {
        Self {
            message: format!("Matches tracking pattern from provider \"{}\"", provider),
            provider: Some(provider.to_string()),
            kind: ComplaintKind::RawRule,
        }
    }

    pub fn heuristic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            provider: None,
            kind: ComplaintKind::Heuristic,
        }
    }
}

impl fmt::Display for Complaint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// 单个链接的问题列表（非空）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub url: String,
    pub complaints: Vec<Complaint>,
}

/// 最终报告：链接 -> 问题列表，保持输入顺序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Report {
    entries: Vec<ReportEntry>,
}

impl Report {
    pub fn iter(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 首次出现的链接对应的问题列表
    pub fn get(&self, url: &str) -> Option<&[Complaint]> {
        self.entries
            .iter()
            .find(|entry| entry.url == url)
            .map(|entry| entry.complaints.as_slice())
    }

    /// 渲染层使用的纯文本视图
    pub fn to_message_map(&self) -> Vec<(String, Vec<String>)> {
        self.entries
            .iter()
            .map(|entry| {
                (
                    entry.url.clone(),
                    entry.complaints.iter().map(|c| c.message.clone()).collect(),
                )
            })
            .collect()
    }
}

impl IntoIterator for Report {
    type Item = ReportEntry;
    type IntoIter = std::vec::IntoIter<ReportEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// 报告组装器
pub struct ReportAssembler;

impl ReportAssembler {
    /// 规则引擎结果在前、启发式结果在后；无问题的链接不进入报告
    pub fn assemble(
        links: &[LinkCandidate],
        rule_set: &CompiledRuleSet,
        heuristics: &HeuristicRegistry,
    ) -> Report {
        let entries = links
            .iter()
            .filter_map(|link| {
                // 每个链接只解析一次，规则引擎与启发式检查共用
                let parsed = match RuleEngine::normalize(&link.url) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        debug!("Skipping unparsable link {:?}: {}", link.url, e);
                        return None;
                    }
                };

                let mut complaints = RuleEngine::evaluate_url(&parsed, rule_set);
                complaints.extend(heuristics.evaluate_url(&parsed));

                if complaints.is_empty() {
                    None
                } else {
                    Some(ReportEntry {
                        url: link.url.clone(),
                        complaints,
                    })
                }
            })
            .collect();

        Report { entries }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use url::Url;

    use super::*;
    use crate::compiler::RuleCompiler;
    use crate::detector::heuristics::HeuristicCheck;
    use crate::error::RcuResult;
    use crate::rule::{Provider, RuleSet};

    fn utm_rule_set() -> CompiledRuleSet {
        let mut provider = Provider::new("example", "example\\.com");
        provider.rules = vec!["utm_source".to_string()];
        RuleCompiler::default().compile(&RuleSet::from_providers([provider]))
    }

    #[test]
    fn test_clean_links_are_dropped() {
        let links = vec![
            LinkCandidate::new("https://example.com/page?id=5"),
            LinkCandidate::with_text("https://example.com/page?utm_source=x", "click here"),
            LinkCandidate::new("not a url"),
        ];

        let report = ReportAssembler::assemble(&links, &utm_rule_set(), &HeuristicRegistry::empty());
        assert_eq!(report.len(), 1);
        assert_eq!(report.entries()[0].url, "https://example.com/page?utm_source=x");
    }

    #[test]
    fn test_rule_complaints_precede_heuristics() {
        let mut provider = Provider::new("amazon", "amzn\\.asia");
        provider.rules = vec!["ref".to_string()];
        let rule_set = RuleCompiler::default().compile(&RuleSet::from_providers([provider]));

        let links = vec![LinkCandidate::new("https://amzn.asia/d/abc123?ref=share")];
        let report = ReportAssembler::assemble(&links, &rule_set, &HeuristicRegistry::default());

        let complaints = report.get("https://amzn.asia/d/abc123?ref=share").unwrap();
        assert_eq!(complaints.len(), 2);
        assert_eq!(complaints[0].kind, ComplaintKind::Rule);
        assert_eq!(complaints[1].kind, ComplaintKind::Heuristic);
    }

    #[test]
    fn test_duplicates_and_order_are_preserved() {
        let links = vec![
            LinkCandidate::new("https://example.com/b?utm_source=1"),
            LinkCandidate::new("https://example.com/a?utm_source=2"),
            LinkCandidate::new("https://example.com/b?utm_source=1"),
        ];

        let report = ReportAssembler::assemble(&links, &utm_rule_set(), &HeuristicRegistry::empty());
        let urls: Vec<&str> = report.iter().map(|entry| entry.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/b?utm_source=1",
                "https://example.com/a?utm_source=2",
                "https://example.com/b?utm_source=1",
            ]
        );
    }

    struct RecordingCheck {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl HeuristicCheck for RecordingCheck {
        fn name(&self) -> &str {
            "recording"
        }

        fn check(&self, url: &Url) -> RcuResult<Option<String>> {
            self.seen.lock().unwrap().push(url.to_string());
            Ok(None)
        }
    }

    #[test]
    fn test_heuristics_receive_the_normalized_link() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut heuristics = HeuristicRegistry::empty();
        heuristics.register(Box::new(RecordingCheck { seen: seen.clone() }));

        let links = vec![
            LinkCandidate::new("  HTTPS://Example.COM?utm_source=x "),
            LinkCandidate::new("example.com/?utm_source=x"),
        ];
        let report = ReportAssembler::assemble(&links, &utm_rule_set(), &heuristics);

        // 不可解析的链接在进入规则引擎和启发式检查之前被跳过
        assert_eq!(*seen.lock().unwrap(), vec!["https://example.com/?utm_source=x".to_string()]);
        assert_eq!(report.len(), 1);
        assert_eq!(report.entries()[0].url, "  HTTPS://Example.COM?utm_source=x ");
    }

    #[test]
    fn test_message_map_and_serialization() {
        let links = vec![LinkCandidate::new("https://example.com/?utm_source=feed")];
        let report = ReportAssembler::assemble(&links, &utm_rule_set(), &HeuristicRegistry::empty());

        let map = report.to_message_map();
        assert_eq!(map.len(), 1);
        assert_eq!(
            map[0].1,
            vec!["Contains tracking parameter \"utm_source\" (matched by provider \"example\")".to_string()]
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json[0]["url"], "https://example.com/?utm_source=feed");
        assert_eq!(json[0]["complaints"][0]["kind"], "rule");
        assert_eq!(json[0]["complaints"][0]["provider"], "example");
    }
}
