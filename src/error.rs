//! 全局错误类型定义
//! 仅规则源（拉取/解析）层向调用方返回错误；缓存、引擎、启发式与报告层一律降级处理

use std::io::Error as IoError;
use std::time::Duration;

use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum RsClearUrlsError {
    // 规则相关错误
    #[error("规则加载失败：{0}")]
    RuleLoadError(String),
    #[error("规则源 {url} 返回状态码 {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("规则拉取超时（{0:?}）")]
    FetchTimeout(Duration),

    // 编译相关错误
    #[error("正则编译失败：{0}")]
    RegexCompileError(#[from] RegexError),

    // 检测相关错误
    #[error("启发式检查 {check} 执行失败：{reason}")]
    HeuristicError { check: String, reason: String },

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
}

impl RsClearUrlsError {
    /// 是否属于规则拉取失败（网络 / 状态码 / 超时 / 反序列化）
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::RuleLoadError(_)
                | Self::HttpStatus { .. }
                | Self::FetchTimeout(_)
                | Self::HttpError(_)
                | Self::JsonError(_)
                | Self::IoError(_)
        )
    }
}

// 全局Result类型
pub type RcuResult<T> = Result<T, RsClearUrlsError>;
