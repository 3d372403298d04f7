//! 启发式检查：独立于 ClearURLs 规则集的手写补充检测
//! 每个检查相互隔离，单个检查失败只记录日志并跳过

use tracing::debug;
use url::Url;

use super::engine::RuleEngine;
use super::report::Complaint;
use crate::error::{RcuResult, RsClearUrlsError};

/// 单个启发式检查
pub trait HeuristicCheck: Send + Sync {
    fn name(&self) -> &str;

    /// 命中时返回问题描述
    fn check(&self, url: &Url) -> RcuResult<Option<String>>;
}

/// 已知的发送者追踪短链域名
pub const TRACKING_SHORT_LINK_HOSTS: &[&str] = &["amzn.asia", "amzn.to", "a.co"];

/// 短链域名检查（域名本身或其子域名）
#[derive(Debug, Clone)]
pub struct ShortLinkHostCheck {
    hosts: Vec<String>,
}

impl ShortLinkHostCheck {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(|h| h.into().to_ascii_lowercase()).collect(),
        }
    }
}

impl Default for ShortLinkHostCheck {
    fn default() -> Self {
        Self::new(TRACKING_SHORT_LINK_HOSTS.iter().copied())
    }
}

impl HeuristicCheck for ShortLinkHostCheck {
    fn name(&self) -> &str {
        "short-link-host"
    }

    fn check(&self, url: &Url) -> RcuResult<Option<String>> {
        let Some(host) = url.host_str() else {
            return Ok(None);
        };

        Ok(self
            .hosts
            .iter()
            .find(|known| host_matches(host, known))
            .map(|known| {
                format!(
                    "Uses the \"{}\" short link, which tracks who shared it; share the full link instead",
                    known
                )
            }))
    }
}

/// 特定站点上的追踪查询参数检查
#[derive(Debug, Clone)]
pub struct QueryParamCheck {
    name: String,
    hosts: Vec<String>,
    param: String,
    description: String,
}

impl QueryParamCheck {
    pub fn new(
        name: impl Into<String>,
        hosts: &[&str],
        param: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            hosts: hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            param: param.into(),
            description: description.into(),
        }
    }

    /// YouTube 分享链接中的 si 参数（分享者标识）
    pub fn youtube_share_id() -> Self {
        Self::new(
            "youtube-share-id",
            &["youtube.com", "youtu.be"],
            "si",
            "identifies who shared the video",
        )
    }
}

impl HeuristicCheck for QueryParamCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, url: &Url) -> RcuResult<Option<String>> {
        let Some(host) = url.host_str() else {
            return Ok(None);
        };
        if !self.hosts.iter().any(|known| host_matches(host, known)) {
            return Ok(None);
        }

        let present = url.query_pairs().any(|(key, _)| key == self.param.as_str());
        Ok(present.then(|| {
            format!(
                "Contains tracking parameter \"{}\" ({})",
                self.param, self.description
            )
        }))
    }
}

fn host_matches(host: &str, known: &str) -> bool {
    host.eq_ignore_ascii_case(known)
        || host
            .len()
            .checked_sub(known.len() + 1)
            .is_some_and(|split| {
                host.as_bytes()[split] == b'.' && host[split + 1..].eq_ignore_ascii_case(known)
            })
}

/// 启发式检查注册表
pub struct HeuristicRegistry {
    checks: Vec<Box<dyn HeuristicCheck>>,
}

impl Default for HeuristicRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(ShortLinkHostCheck::default()));
        registry.register(Box::new(QueryParamCheck::youtube_share_id()));
        registry
    }
}

impl HeuristicRegistry {
    pub fn empty() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn register(&mut self, check: Box<dyn HeuristicCheck>) -> &mut Self {
        self.checks.push(check);
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// 按注册顺序执行所有检查；URL 无法解析时无问题
    pub fn evaluate(&self, url: &str) -> Vec<Complaint> {
        match RuleEngine::normalize(url) {
            Ok(parsed) => self.evaluate_url(&parsed),
            Err(e) => {
                debug!("Skipping heuristics for unparsable link {:?}: {}", url, e);
                Vec::new()
            }
        }
    }

    /// 对已解析的 URL 执行所有检查
    pub fn evaluate_url(&self, url: &Url) -> Vec<Complaint> {
        self.checks
            .iter()
            .filter_map(|check| match check.check(url) {
                Ok(hit) => hit.map(Complaint::heuristic),
                Err(e) => {
                    debug!("Heuristic {} failed on {}: {}", check.name(), url, e);
                    None
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for HeuristicRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.checks.iter().map(|c| c.name())).finish()
    }
}

/// 将检查失败统一包装为 HeuristicError
pub fn heuristic_error(check: &str, reason: impl Into<String>) -> RsClearUrlsError {
    RsClearUrlsError::HeuristicError {
        check: check.to_string(),
        reason: reason.into(),
    }
}
