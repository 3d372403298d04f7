//! 全局配置管理,存储所有可配置项

use std::time::Duration;

/// 官方 ClearURLs 规则地址
pub const DEFAULT_RULES_URL: &str = "https://rules2.clearurls.xyz/data.minify.json";

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 远程规则地址
    pub rules_url: String,
    // 超时配置（单位：秒）
    pub http_timeout: u64,
    // 请求 User-Agent
    pub user_agent: String,
    // 单条正则编译后的体积上限（字节）
    pub regex_size_limit: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            rules_url: DEFAULT_RULES_URL.to_string(),
            http_timeout: 30,
            user_agent: format!("rsclearurls/{}", env!("CARGO_PKG_VERSION")),
            regex_size_limit: 1 << 20,
        }
    }
}

impl GlobalConfig {
    /// 拉取超时
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn rules_url(mut self, url: impl Into<String>) -> Self {
        self.config.rules_url = url.into();
        self
    }

    pub fn http_timeout(mut self, timeout: u64) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn regex_size_limit(mut self, limit: usize) -> Self {
        self.config.regex_size_limit = limit;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}
