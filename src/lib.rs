//! rsclearurls - 基于 ClearURLs 规则的链接追踪参数检测库
//!
//! 调用方（聊天机器人等）传入从消息中提取的链接列表，得到按链接分组的问题报告。
//! 只检测与报告，不改写链接。

// 导出全局错误类型
pub use self::error::{RcuResult, RsClearUrlsError};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, DEFAULT_RULES_URL, GlobalConfig};

// 导出规则模块核心接口
pub use self::rule::{
    CacheState, LocalFileSource, Provider, RemoteRuleSource, RuleSet, RuleSetCache, RuleSource,
    StaticRuleSource,
};

// 导出编译模块核心接口
pub use self::compiler::{CompileStats, CompiledProvider, CompiledRuleSet, RuleCompiler};

// 导出检测模块核心接口
pub use self::detector::{
    Complaint, ComplaintKind, HeuristicCheck, HeuristicRegistry, LinkCandidate, QueryParamCheck, Report,
    ReportAssembler, ReportEntry, RuleEngine, ShortLinkHostCheck, TrackingDetector,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
pub mod detector;
