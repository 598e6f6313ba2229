//! 全局请求速率预算
//!
//! 所有 LLM 调用方共用一个实例：限制同时在途的请求数，
//! 并保证相邻两次请求的起始时间至少间隔 `min_interval`。

use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::{sleep_until, Instant};

use crate::error::LlmError;

#[derive(Debug)]
pub struct RateLimiter {
    permits: Semaphore,
    min_interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            permits: Semaphore::new(max_concurrent.max(1)),
            min_interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// 不做限制（测试用）
    pub fn unlimited() -> Self {
        Self::new(Semaphore::MAX_PERMITS, Duration::ZERO)
    }

    /// 获取一次请求许可，许可在返回值析构时归还
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, LlmError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LlmError::Configuration {
                message: "请求限流器已关闭".to_string(),
            })?;

        if !self.min_interval.is_zero() {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            if *next > now {
                sleep_until(*next).await;
            }
            *next = Instant::now() + self.min_interval;
        }

        Ok(permit)
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
