#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use survey_autofill::browser::{BrowserSession, CompletionSignal, SessionFactory};
use survey_autofill::clients::{CompletionBackend, CompletionRequest};
use survey_autofill::config::Config;
use survey_autofill::error::{BrowserError, LlmError};
use survey_autofill::models::{
    Answer, Constraints, FormModel, Question, QuestionKind, REQUIRED_TRAITS,
};
use survey_autofill::services::LlmService;

pub const SURVEY_URL: &str = "https://www.wjx.cn/vm/test.aspx";

/// 所有等待都压到毫秒级的配置
pub fn fast_config() -> Config {
    Config::from_toml_str(
        r#"
[openai]
base_url = "http://localhost:1234/v1"
model = "mock-model"
timeout = 5.0
max_concurrent_requests = 8
min_request_interval = 0.0

[generation_params]
max_retries = 3
retry_delay = 0.0

[submission_params]
submit_button_delay = 0.0
verification_delay = 0.05
completion_wait_timeout = 0.1
field_delay = 0.0
poll_interval = 0.01
"#,
        "fast.toml",
    )
    .expect("测试配置应能解析")
}

/// 脚本化的 LLM 后端
///
/// 人设请求返回完整 JSON，其余请求回复 "1"。
/// 前 `transient_failures` 次调用返回网络错误，`fatal` 时全部返回鉴权错误。
pub struct MockBackend {
    transient_failures: AtomicUsize,
    fatal: bool,
    pub calls: AtomicUsize,
}

impl MockBackend {
    pub fn healthy() -> Arc<Self> {
        Self::flaky(0)
    }

    pub fn flaky(transient_failures: usize) -> Arc<Self> {
        Arc::new(Self {
            transient_failures: AtomicUsize::new(transient_failures),
            fatal: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unauthorized() -> Arc<Self> {
        Arc::new(Self {
            transient_failures: AtomicUsize::new(0),
            fatal: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn persona_json() -> String {
    let traits: BTreeMap<&str, &str> = REQUIRED_TRAITS.iter().map(|k| (*k, "测试值")).collect();
    serde_json::to_string(&traits).unwrap()
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fatal {
            return Err(LlmError::Authentication {
                model: "mock-model".into(),
                message: "401 invalid api key".into(),
            });
        }
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .transient_failures
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Err(LlmError::Transport {
                model: "mock-model".into(),
                message: "connection reset".into(),
            });
        }

        let is_persona = request
            .system
            .as_deref()
            .map(|s| s.contains("人设生成器"))
            .unwrap_or(false);
        if is_persona {
            Ok(persona_json())
        } else {
            Ok("1".to_string())
        }
    }
}

pub fn llm_with(config: &Config, backend: Arc<MockBackend>) -> Arc<LlmService> {
    Arc::new(LlmService::with_backend(config, backend))
}

/// 一道三选一的单选题
pub fn single_question_form(url: &str) -> FormModel {
    FormModel::new(
        url,
        vec![Question {
            id: 1,
            kind: QuestionKind::SingleChoice,
            prompt: "您平时最常用的出行方式？".to_string(),
            options: vec!["步行".to_string(), "公交".to_string(), "自驾".to_string()],
            rows: Vec::new(),
            constraints: Constraints::default(),
            page: 0,
        }],
    )
}

/// 模拟会话的行为
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// 提交后立即出现完成页
    Completes,
    /// 永远等不到完成信号
    NeverCompletes,
}

/// 所有模拟会话共享的计数
#[derive(Debug, Default)]
pub struct SessionLog {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub opened: AtomicUsize,
    pub submitted: AtomicUsize,
    /// 剩余的打开失败次数，`usize::MAX` 表示永远失败
    pub open_failures: AtomicUsize,
}

impl SessionLog {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }
}

pub struct MockSession {
    mode: CompletionMode,
    log: Arc<SessionLog>,
    submitted: bool,
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn open_form(&mut self, url: &str) -> Result<FormModel, BrowserError> {
        self.submitted = false;
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .log
            .open_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if failing {
            return Err(BrowserError::NavigationFailed {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        Ok(single_question_form(url))
    }

    async fn fill(&mut self, _question: &Question, _answer: &Answer) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn advance_page(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn submit(&mut self) -> Result<(), BrowserError> {
        self.submitted = true;
        self.log.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn verification_pending(&mut self) -> Result<bool, BrowserError> {
        Ok(false)
    }

    async fn completion_signal(&mut self) -> Result<CompletionSignal, BrowserError> {
        match (self.mode, self.submitted) {
            (CompletionMode::Completes, true) => Ok(CompletionSignal::Completed),
            _ => Ok(CompletionSignal::Pending),
        }
    }

    async fn close_form(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn release(&mut self) -> Result<(), BrowserError> {
        self.log.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockSessionFactory {
    mode: CompletionMode,
    pub log: Arc<SessionLog>,
}

impl MockSessionFactory {
    pub fn new(mode: CompletionMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            log: Arc::new(SessionLog::default()),
        })
    }

    /// 前 `failures` 次打开问卷都以网络错误失败
    pub fn failing_opens(mode: CompletionMode, failures: usize) -> Arc<Self> {
        let factory = Self::new(mode);
        factory.log.open_failures.store(failures, Ordering::SeqCst);
        factory
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn acquire(&self, _worker_id: usize) -> Result<Box<dyn BrowserSession>, BrowserError> {
        self.log.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            mode: self.mode,
            log: self.log.clone(),
            submitted: false,
        }))
    }
}
