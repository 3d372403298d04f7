//! 规则缓存管理
//! 进程内保存最近一次成功加载并编译的规则集；并发加载请求合并为同一次拉取（single-flight）
//!
//! 状态流转：`Empty -> Loading -> Ready`；拉取失败时，从未成功过则回到 `Empty`
//! 并向本次所有等待者返回空规则集，成功过则保留旧值（`Ready { stale }`）。
//! 无过期时间、无后台刷新，仅 `invalidate` 会触发下一次重新拉取。

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::loader::RuleSource;
use super::model::RuleSet;
use crate::compiler::{CompiledRuleSet, RuleCompiler};
use crate::config::GlobalConfig;
use crate::error::RsClearUrlsError;

type SharedRuleSet = Arc<CompiledRuleSet>;
type InFlight = watch::Receiver<Option<SharedRuleSet>>;

/// 缓存状态（诊断用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Loading,
    Ready { stale: bool },
}

enum Claim {
    Ready(SharedRuleSet),
    Wait(InFlight),
    Lead(watch::Sender<Option<SharedRuleSet>>, u64),
}

#[derive(Default)]
struct CacheSlot {
    current: Option<SharedRuleSet>,
    stale: bool,
    in_flight: Option<InFlight>,
    generation: u64,
}

/// 规则集缓存
pub struct RuleSetCache {
    source: Arc<dyn RuleSource>,
    timeout: Duration,
    regex_size_limit: usize,
    slot: Mutex<CacheSlot>,
    empty: SharedRuleSet,
}

impl RuleSetCache {
    pub fn new(source: Arc<dyn RuleSource>, config: &GlobalConfig) -> Self {
        Self {
            source,
            timeout: config.timeout(),
            regex_size_limit: config.regex_size_limit,
            slot: Mutex::new(CacheSlot::default()),
            empty: Arc::new(CompiledRuleSet::default()),
        }
    }

    /// 以预加载的规则集初始化（直接处于 Ready 状态）
    pub fn with_rule_set(source: Arc<dyn RuleSource>, config: &GlobalConfig, rule_set: &RuleSet) -> Self {
        let cache = Self::new(source, config);
        let compiled = RuleCompiler::with_size_limit(cache.regex_size_limit).compile(rule_set);
        cache.lock().current = Some(Arc::new(compiled));
        cache
    }

    /// 获取当前规则集，首次调用时触发拉取；永不向调用方返回错误
    pub async fn load(&self) -> SharedRuleSet {
        let (tx, generation) = match self.claim() {
            Claim::Ready(rule_set) => return rule_set,
            Claim::Wait(rx) => return self.wait_for(rx).await,
            Claim::Lead(tx, generation) => (tx, generation),
        };

        // 领取者被取消时同样释放 in-flight 标记
        let guard = InFlightGuard {
            cache: self,
            generation,
            armed: true,
        };

        let outcome = self.fetch_and_compile().await;
        let rule_set = self.settle(outcome);
        guard.disarm();

        tx.send_replace(Some(rule_set.clone()));
        rule_set
    }

    fn claim(&self) -> Claim {
        let mut slot = self.lock();

        if let Some(current) = &slot.current {
            if !slot.stale {
                return Claim::Ready(current.clone());
            }
        }

        if let Some(rx) = &slot.in_flight {
            return Claim::Wait(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        slot.in_flight = Some(rx);
        slot.generation += 1;
        Claim::Lead(tx, slot.generation)
    }

    /// 标记当前规则集为过期，下一次 load 重新拉取；旧值保留为失败时的兜底
    pub fn invalidate(&self) {
        let mut slot = self.lock();
        if slot.current.is_some() {
            slot.stale = true;
            debug!("Rule set marked stale");
        }
    }

    pub fn state(&self) -> CacheState {
        let slot = self.lock();
        match (&slot.in_flight, &slot.current) {
            (Some(_), _) => CacheState::Loading,
            (None, Some(_)) => CacheState::Ready { stale: slot.stale },
            (None, None) => CacheState::Empty,
        }
    }

    /// 当前缓存值（不触发拉取）
    pub fn peek(&self) -> Option<SharedRuleSet> {
        self.lock().current.clone()
    }

    pub fn source(&self) -> &Arc<dyn RuleSource> {
        &self.source
    }

    async fn fetch_and_compile(&self) -> Result<CompiledRuleSet, RsClearUrlsError> {
        debug!("Fetching rule set from {}", self.source.describe());

        let rule_set = match tokio::time::timeout(self.timeout, self.source.fetch()).await {
            Ok(result) => result?,
            Err(_) => return Err(RsClearUrlsError::FetchTimeout(self.timeout)),
        };

        Ok(RuleCompiler::with_size_limit(self.regex_size_limit).compile(&rule_set))
    }

    /// 写回拉取结果并清除 in-flight 标记，返回本轮应交付给所有等待者的规则集
    fn settle(&self, outcome: Result<CompiledRuleSet, RsClearUrlsError>) -> SharedRuleSet {
        let mut slot = self.lock();
        slot.in_flight = None;

        match outcome {
            Ok(compiled) => {
                info!(
                    "Rule set loaded from {}: {} providers",
                    self.source.describe(),
                    compiled.len()
                );
                let compiled = Arc::new(compiled);
                slot.current = Some(compiled.clone());
                slot.stale = false;
                compiled
            }
            Err(e) => match &slot.current {
                Some(previous) => {
                    warn!("Rule set refresh failed, keeping previous rule set: {}", e);
                    previous.clone()
                }
                None => {
                    warn!("Rule set fetch failed, falling back to empty rule set: {}", e);
                    self.empty.clone()
                }
            },
        }
    }

    async fn wait_for(&self, mut rx: InFlight) -> SharedRuleSet {
        match rx.wait_for(|value| value.is_some()).await {
            Ok(value) => match value.as_ref() {
                Some(rule_set) => rule_set.clone(),
                None => self.fallback(),
            },
            // 领取者在完成前被取消
            Err(_) => self.fallback(),
        }
    }

    fn fallback(&self) -> SharedRuleSet {
        self.peek().unwrap_or_else(|| self.empty.clone())
    }

    fn lock(&self) -> MutexGuard<'_, CacheSlot> {
        // 临界区内不会 panic，锁中毒时直接沿用内部数据
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct InFlightGuard<'a> {
    cache: &'a RuleSetCache,
    generation: u64,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = self.cache.lock();
        if slot.generation == self.generation {
            slot.in_flight = None;
            debug!("Rule set fetch cancelled, releasing in-flight marker");
        }
    }
}
