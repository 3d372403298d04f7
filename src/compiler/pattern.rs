//! 编译后模式模型
//! 正则编译后的结构，每次规则集加载只编译一次，供所有链接复用

use regex::Regex;

/// 由 rules 字段名生成的查询参数规则
#[derive(Debug, Clone)]
pub struct CompiledFieldRule {
    pub field: String,
    pub regex: Regex,
}

/// 提供方编译后的规则
/// urlPattern 无法编译的提供方不会出现在编译结果中
#[derive(Debug, Clone)]
pub struct CompiledProvider {
    pub name: String,
    pub url_pattern: Regex,
    pub complete_provider: bool,
    pub exceptions: Vec<Regex>,
    pub rules: Vec<CompiledFieldRule>,
    pub raw_rules: Vec<Regex>,
}

impl CompiledProvider {
    pub fn matches(&self, url: &str) -> bool {
        self.url_pattern.is_match(url)
    }

    pub fn is_excepted(&self, url: &str) -> bool {
        self.exceptions.iter().any(|exception| exception.is_match(url))
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub providers_compiled: usize,
    pub providers_skipped: usize,
    pub exceptions_compiled: usize,
    pub exceptions_skipped: usize,
    pub rules_compiled: usize,
    pub rules_skipped: usize,
    pub raw_rules_compiled: usize,
    pub raw_rules_skipped: usize,
}

impl CompileStats {
    pub fn patterns_skipped(&self) -> usize {
        self.providers_skipped + self.exceptions_skipped + self.rules_skipped + self.raw_rules_skipped
    }
}

/// 编译后的规则集，提供方按名称升序排列
#[derive(Debug, Clone, Default)]
pub struct CompiledRuleSet {
    pub(crate) providers: Vec<CompiledProvider>,
    pub(crate) stats: CompileStats,
}

impl CompiledRuleSet {
    pub fn providers(&self) -> &[CompiledProvider] {
        &self.providers
    }

    pub fn stats(&self) -> CompileStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
