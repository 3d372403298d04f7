//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RcuResult, RsClearUrlsError};

/// 单个追踪规则提供方（从 ClearURLs JSON 解析）
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    // 名称取自 providers 映射的键
    #[serde(skip)]
    pub name: String,
    pub url_pattern: String,
    #[serde(default)]
    pub complete_provider: bool,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub raw_rules: Vec<String>,
    #[serde(default)]
    pub exceptions: Vec<String>,

    // 以下字段仅解析，检测流程暂不使用
    #[serde(default)]
    pub referral_marketing: Vec<String>,
    #[serde(default)]
    pub redirections: Vec<String>,
    #[serde(default)]
    pub force_redirection: bool,
}

impl Provider {
    /// 以名称和 URL 模式快速创建（其余字段为空）
    pub fn new(name: impl Into<String>, url_pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_pattern: url_pattern.into(),
            ..Default::default()
        }
    }
}

/// 完整规则集：提供方名称 -> 提供方
/// BTreeMap 保证按名称有序遍历
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleSet {
    pub providers: BTreeMap<String, Provider>,
}

/// 远程文档的宽松外壳，单个提供方解析失败不影响其他提供方
#[derive(Debug, Deserialize)]
struct RawRuleDocument {
    providers: serde_json::Map<String, Value>,
}

impl RuleSet {
    /// 空规则集（拉取失败时的降级值）
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_providers(providers: impl IntoIterator<Item = Provider>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|provider| (provider.name.clone(), provider))
                .collect(),
        }
    }

    /// 从 JSON 字节解析规则集
    /// 缺少 providers 对象视为错误；单个提供方结构不合法则跳过
    pub fn from_slice(bytes: &[u8]) -> RcuResult<Self> {
        let document: RawRuleDocument = serde_json::from_slice(bytes)?;
        Ok(Self::from_document(document))
    }

    pub fn from_json_str(json: &str) -> RcuResult<Self> {
        Self::from_slice(json.as_bytes())
    }

    fn from_document(document: RawRuleDocument) -> Self {
        let mut providers = BTreeMap::new();
        let mut skipped = 0usize;

        for (name, value) in document.providers {
            match serde_json::from_value::<Provider>(value) {
                Ok(mut provider) => {
                    provider.name = name.clone();
                    providers.insert(name, provider);
                }
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping malformed provider {}: {}", name, e);
                }
            }
        }

        debug!("Parsed rule set: {} providers, {} skipped", providers.len(), skipped);
        Self { providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Provider> {
        self.providers.get(name)
    }
}

impl TryFrom<Value> for RuleSet {
    type Error = RsClearUrlsError;

    fn try_from(value: Value) -> RcuResult<Self> {
        let document: RawRuleDocument = serde_json::from_value(value)?;
        Ok(Self::from_document(document))
    }
}
