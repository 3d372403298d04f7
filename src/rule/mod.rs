//! 规则模块：负责规则的拉取、缓存、数据模型定义
pub mod model;
pub mod loader;
pub mod cache;

// 导出核心接口
pub use self::model::{Provider, RuleSet};
pub use self::loader::{LocalFileSource, RemoteRuleSource, RuleSource, StaticRuleSource};
pub use self::cache::{CacheState, RuleSetCache};
