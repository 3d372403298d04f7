//! 规则编译器核心
//! 仅负责将原始规则编译为可执行的正则模式
//! 所有模式均来自远程文档，编译失败只跳过对应条目，不影响其他提供方

use std::time::Instant;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::pattern::{CompileStats, CompiledFieldRule, CompiledProvider, CompiledRuleSet};
use crate::error::RcuResult;
use crate::rule::{Provider, RuleSet};

/// 默认单条正则体积上限
const DEFAULT_SIZE_LIMIT: usize = 1 << 20;

/// 规则编译器
#[derive(Debug, Clone, Copy)]
pub struct RuleCompiler {
    size_limit: usize,
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::with_size_limit(DEFAULT_SIZE_LIMIT)
    }
}

impl RuleCompiler {
    pub fn with_size_limit(size_limit: usize) -> Self {
        Self { size_limit }
    }

    /// 编译规则集（BTreeMap 保证按提供方名称有序）
    pub fn compile(&self, rule_set: &RuleSet) -> CompiledRuleSet {
        let start = Instant::now();
        let mut stats = CompileStats::default();
        let mut providers = Vec::with_capacity(rule_set.len());

        for (name, provider) in &rule_set.providers {
            match self.compile_provider(name, provider, &mut stats) {
                Some(compiled) => {
                    stats.providers_compiled += 1;
                    providers.push(compiled);
                }
                None => stats.providers_skipped += 1,
            }
        }

        debug!("Rule set compiled in {:?}: {:?}", start.elapsed(), stats);

        CompiledRuleSet { providers, stats }
    }

    /// 编译单个提供方；urlPattern 无效时返回 None
    fn compile_provider(&self, name: &str, provider: &Provider, stats: &mut CompileStats) -> Option<CompiledProvider> {
        let url_pattern = match self.build(&provider.url_pattern, false) {
            Ok(regex) => regex,
            Err(e) => {
                debug!("Skipping provider {}: invalid urlPattern: {}", name, e);
                return None;
            }
        };

        let exceptions = self.compile_list(
            name,
            "exception",
            &provider.exceptions,
            false,
            (&mut stats.exceptions_compiled, &mut stats.exceptions_skipped),
        );

        let rules = provider
            .rules
            .iter()
            .filter_map(|field| match self.build(&field_rule_pattern(field), true) {
                Ok(regex) => {
                    stats.rules_compiled += 1;
                    Some(CompiledFieldRule {
                        field: field.clone(),
                        regex,
                    })
                }
                Err(e) => {
                    stats.rules_skipped += 1;
                    debug!("Skipping rule {:?} of provider {}: {}", field, name, e);
                    None
                }
            })
            .collect();

        let raw_rules = self.compile_list(
            name,
            "rawRule",
            &provider.raw_rules,
            true,
            (&mut stats.raw_rules_compiled, &mut stats.raw_rules_skipped),
        );

        Some(CompiledProvider {
            name: name.to_string(),
            url_pattern,
            complete_provider: provider.complete_provider,
            exceptions,
            rules,
            raw_rules,
        })
    }

    /// 编译模式列表，跳过无效条目
    fn compile_list(
        &self,
        provider: &str,
        kind: &str,
        patterns: &[String],
        case_insensitive: bool,
        (compiled, skipped): (&mut usize, &mut usize),
    ) -> Vec<Regex> {
        patterns
            .iter()
            .filter_map(|pattern| match self.build(pattern, case_insensitive) {
                Ok(regex) => {
                    *compiled += 1;
                    Some(regex)
                }
                Err(e) => {
                    *skipped += 1;
                    debug!("Skipping {} {:?} of provider {}: {}", kind, pattern, provider, e);
                    None
                }
            })
            .collect()
    }

    fn build(&self, pattern: &str, case_insensitive: bool) -> RcuResult<Regex> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .size_limit(self.size_limit)
            .build()?;
        Ok(regex)
    }
}

/// 查询参数字段名改写为 ClearURLs 约定的匹配模式
pub fn field_rule_pattern(field: &str) -> String {
    format!("(?:&|[/?#&])(?:{}=[^&]*)", field)
}
