//! 有界重试策略
//!
//! 退避时长通过 [`Backoff`] 注入，测试中可以替换为零等待。

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::LlmError;

/// 退避策略
pub trait Backoff: Send + Sync + fmt::Debug {
    /// 第 `attempt` 次失败（从 1 开始）之后的等待时长
    fn delay(&self, attempt: u32) -> Duration;
}

/// 固定间隔
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff(pub Duration);

impl Backoff for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

/// 不等待
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// 重试策略：总尝试次数 = max_retries + 1
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    backoff: Arc<dyn Backoff>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Arc<dyn Backoff>) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// 固定间隔重试
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self::new(max_retries, Arc::new(FixedBackoff(delay)))
    }

    /// 立即重试
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Arc::new(NoBackoff))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// 本次失败后的等待时长，服务端给出 retry-after 时取较大者
    pub fn delay_for(&self, attempt: u32, error: &LlmError) -> Duration {
        let base = self.backoff.delay(attempt);
        match error.retry_after() {
            Some(hint) => base.max(hint),
            None => base,
        }
    }
}
