//! LLM 服务 - 业务能力层
//!
//! 所有 LLM 调用的唯一入口，整个运行共用一个实例：
//! - 每次调用有硬超时
//! - 瞬时错误（超时、限流、网络、空回复）按固定间隔有界重试
//! - 鉴权 / 配置错误不重试，直接返回
//! - 全局速率预算由 [`RateLimiter`] 统一控制

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::clients::{CompletionBackend, CompletionRequest, LlmClient};
use crate::config::Config;
use crate::error::LlmError;
use crate::services::rate_limiter::RateLimiter;
use crate::services::response_parser::clean_response;
use crate::services::retry::RetryPolicy;

/// LLM 调用统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlmStats {
    /// 后端调用次数（含重试）
    pub calls: u64,
    /// 重试次数
    pub retries: u64,
    /// 最终失败的逻辑调用数
    pub failures: u64,
}

/// 调用参数缺省值
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub timeout: Duration,
    pub max_tokens: u32,
    pub retry: RetryPolicy,
}

/// LLM 服务
pub struct LlmService {
    backend: Arc<dyn CompletionBackend>,
    settings: LlmSettings,
    limiter: RateLimiter,
    calls: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
}

impl LlmService {
    pub fn new(backend: Arc<dyn CompletionBackend>, settings: LlmSettings, limiter: RateLimiter) -> Self {
        Self {
            backend,
            settings,
            limiter,
            calls: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// 按配置创建基于 OpenAI 兼容接口的服务
    pub fn from_config(config: &Config) -> Self {
        let backend = Arc::new(LlmClient::new(&config.openai));
        Self::with_backend(config, backend)
    }

    /// 按配置创建，后端可替换
    pub fn with_backend(config: &Config, backend: Arc<dyn CompletionBackend>) -> Self {
        let settings = LlmSettings {
            timeout: config.openai.timeout(),
            max_tokens: config.openai.max_tokens_test,
            retry: RetryPolicy::fixed(
                config.generation_params.max_retries,
                config.generation_params.retry_delay(),
            ),
        };
        let limiter = RateLimiter::new(
            config.openai.max_concurrent_requests,
            config.openai.min_request_interval(),
        );
        Self::new(backend, settings, limiter)
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    /// 构建使用缺省超时与 token 上限的请求
    pub fn request(&self, system: Option<&str>, prompt: impl Into<String>, temperature: f32) -> CompletionRequest {
        CompletionRequest {
            system: system.map(str::to_string),
            prompt: prompt.into(),
            temperature,
            max_tokens: self.settings.max_tokens,
            timeout: self.settings.timeout,
        }
    }

    /// 使用缺省参数发送
    pub async fn ask(&self, system: Option<&str>, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        self.complete(self.request(system, prompt, temperature)).await
    }

    /// 发送一次逻辑调用
    ///
    /// 后端最多被调用 `max_retries + 1` 次。返回的文本已去掉思考标签。
    pub async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let max_attempts = self.settings.retry.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let result = self.call_once(&request).await;

            match result {
                Ok(text) => return Ok(text),
                Err(e) if !e.is_transient() => {
                    warn!("LLM 调用遇到不可重试错误: {}", e);
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    return Err(e);
                }
                Err(e) if attempt >= max_attempts => {
                    warn!("LLM 调用失败 (尝试 {}/{}): {}，不再重试", attempt, max_attempts, e);
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    return Err(LlmError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.settings.retry.delay_for(attempt, &e);
                    warn!(
                        "LLM 调用失败 (尝试 {}/{}): {}，{:?} 后重试",
                        attempt, max_attempts, e, delay
                    );
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn call_once(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let _permit = self.limiter.acquire().await?;
        self.calls.fetch_add(1, Ordering::Relaxed);

        let raw = match timeout(request.timeout, self.backend.complete(request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(LlmError::Timeout {
                    model: self.model().to_string(),
                    timeout: request.timeout,
                })
            }
        };

        let cleaned = clean_response(&raw);
        if cleaned.is_empty() {
            return Err(LlmError::EmptyContent {
                model: self.model().to_string(),
            });
        }
        debug!("LLM 回复: {}", crate::utils::logging::truncate_text(&cleaned, 120));
        Ok(cleaned)
    }

    /// 启动前的连通性测试
    pub async fn probe(&self) -> Result<(), LlmError> {
        info!("正在测试API连接... (模型: {})", self.model());
        let request = CompletionRequest {
            system: None,
            prompt: "测试连接，请回复“好”".to_string(),
            temperature: 0.0,
            max_tokens: self.settings.max_tokens,
            timeout: self.settings.timeout,
        };
        self.complete(request).await?;
        info!("✓ API连接测试成功");
        Ok(())
    }

    pub fn stats(&self) -> LlmStats {
        LlmStats {
            calls: self.calls.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
