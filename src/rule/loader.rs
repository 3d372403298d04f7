//! 规则加载器
//! 负责从远程或本地拉取 ClearURLs 规则文档；只报告错误，不做任何降级替换

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::model::RuleSet;
use crate::config::GlobalConfig;
use crate::error::{RcuResult, RsClearUrlsError};

/// 规则来源
/// 任意传输错误、非成功状态码或 JSON 格式错误均以 Err 返回，由缓存层决定降级策略
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// 来源描述（用于日志输出）
    fn describe(&self) -> String;

    /// 拉取并解析规则集
    async fn fetch(&self) -> RcuResult<RuleSet>;
}

/// 远程规则源（HTTP GET）
#[derive(Debug, Clone)]
pub struct RemoteRuleSource {
    client: Client,
    url: String,
    user_agent: String,
    timeout: Duration,
}

impl RemoteRuleSource {
    pub fn new(config: &GlobalConfig) -> RcuResult<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            url: config.rules_url.clone(),
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_document(&self) -> RcuResult<RuleSet> {
        let response = self
            .client
            .get(&self.url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RsClearUrlsError::HttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        debug!("Fetched rule document from {} ({} bytes)", self.url, bytes.len());

        RuleSet::from_slice(&bytes)
    }
}

#[async_trait]
impl RuleSource for RemoteRuleSource {
    fn describe(&self) -> String {
        format!("remote:{}", self.url)
    }

    async fn fetch(&self) -> RcuResult<RuleSet> {
        // 客户端自身的超时与外层计时器统一报告为 FetchTimeout
        match tokio::time::timeout(self.timeout, self.fetch_document()).await {
            Ok(Err(RsClearUrlsError::HttpError(e))) if e.is_timeout() => {
                Err(RsClearUrlsError::FetchTimeout(self.timeout))
            }
            Ok(result) => result,
            Err(_) => Err(RsClearUrlsError::FetchTimeout(self.timeout)),
        }
    }
}

/// 本地规则文件（与远程文档格式一致）
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RuleSource for LocalFileSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn fetch(&self) -> RcuResult<RuleSet> {
        let bytes = tokio::fs::read(&self.path).await?;
        debug!("Read rule document from {} ({} bytes)", self.path.display(), bytes.len());
        RuleSet::from_slice(&bytes)
    }
}

/// 静态规则源，直接返回预置规则集
#[derive(Debug, Clone, Default)]
pub struct StaticRuleSource {
    rule_set: RuleSet,
}

impl StaticRuleSource {
    pub fn new(rule_set: RuleSet) -> Self {
        Self { rule_set }
    }
}

#[async_trait]
impl RuleSource for StaticRuleSource {
    fn describe(&self) -> String {
        format!("static:{} providers", self.rule_set.len())
    }

    async fn fetch(&self) -> RcuResult<RuleSet> {
        Ok(self.rule_set.clone())
    }
}
