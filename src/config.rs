//! 程序配置
//!
//! 配置文件支持 TOML 与 JSON 两种格式，字段按分节组织：
//! `openai` / `generation_params` / `submission_params` / `browser` / `run`。
//! 时长字段均以秒为单位（可为小数）。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ConfigError;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub generation_params: GenerationParams,
    #[serde(default)]
    pub submission_params: SubmissionParams,
    #[serde(default)]
    pub browser: BrowserParams,
    #[serde(default)]
    pub run: RunParams,
}

/// LLM 接口配置
#[derive(Clone, Debug, Deserialize)]
pub struct OpenAiConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    /// 单次调用超时
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// 生成调用与连通性测试的 token 上限
    #[serde(default = "default_max_tokens")]
    pub max_tokens_test: u32,
    /// 全局同时在途的请求数
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// 全局请求起始间隔
    #[serde(default = "default_min_request_interval")]
    pub min_request_interval: f64,
}

/// 生成参数
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub max_retries: u32,
    pub retry_delay: f64,
    pub persona_temperature: f32,
    pub answer_temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: 2.0,
            persona_temperature: 0.9,
            answer_temperature: 0.7,
        }
    }
}

/// 提交参数
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SubmissionParams {
    pub submit_button_delay: f64,
    pub verification_delay: f64,
    pub completion_wait_timeout: f64,
    /// 每个字段写入之间的间隔
    pub field_delay: f64,
    /// 验证/完成状态轮询间隔
    pub poll_interval: f64,
}

impl Default for SubmissionParams {
    fn default() -> Self {
        Self {
            submit_button_delay: 1.0,
            verification_delay: 3.0,
            completion_wait_timeout: 10.0,
            field_delay: 0.5,
            poll_interval: 0.1,
        }
    }
}

/// 浏览器参数
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BrowserParams {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    /// 设置后连接已运行的浏览器，而不是为每个窗口启动新浏览器
    pub debug_port: Option<u16>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserParams {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_executable: None,
            debug_port: None,
            window_width: 550,
            window_height: 650,
        }
    }
}

/// 运行参数
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// 未成功的尝试达到该数量后强制停止，缺省为 target / 4 + 1
    pub max_failures: Option<usize>,
    pub output_log_file: String,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            max_failures: None,
            output_log_file: "survey_run.log".to_string(),
        }
    }
}

fn default_timeout() -> f64 {
    60.0
}

fn default_max_tokens() -> u32 {
    512
}

fn default_max_concurrent_requests() -> usize {
    2
}

fn default_min_request_interval() -> f64 {
    0.2
}

/// 秒数转换为 Duration，负数和 NaN 按 0 处理，过大的值饱和
pub fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        secs(self.timeout)
    }

    pub fn min_request_interval(&self) -> Duration {
        secs(self.min_request_interval)
    }
}

impl GenerationParams {
    pub fn retry_delay(&self) -> Duration {
        secs(self.retry_delay)
    }
}

impl Config {
    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParse {
            path: path.to_string(),
            source,
        })
    }

    /// 从 JSON 文本解析
    pub fn from_json_str(content: &str, path: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::JsonParse {
            path: path.to_string(),
            source,
        })
    }

    /// 按扩展名加载配置文件
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        if !path.exists() {
            return Err(ConfigError::NotFound { path: display });
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: display.clone(),
            source,
        })?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Self::from_toml_str(&content, &display),
            Some("json") => Self::from_json_str(&content, &display),
            _ => Err(ConfigError::UnsupportedFormat { path: display }),
        }
    }

    /// 用环境变量覆盖敏感字段
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.openai.api_key = key;
            }
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            if !url.is_empty() {
                self.openai.base_url = url;
            }
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            if !model.is_empty() {
                self.openai.model = model;
            }
        }
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.openai.base_url.trim().is_empty() {
            return Err(invalid("openai.base_url", "不能为空"));
        }
        if self.openai.api_key.trim().is_empty() {
            return Err(invalid("openai.api_key", "不能为空"));
        }
        if self.openai.model.trim().is_empty() {
            return Err(invalid("openai.model", "不能为空"));
        }
        for (field, value) in [
            ("openai.timeout", self.openai.timeout),
            ("openai.min_request_interval", self.openai.min_request_interval),
            ("generation_params.retry_delay", self.generation_params.retry_delay),
            ("submission_params.submit_button_delay", self.submission_params.submit_button_delay),
            ("submission_params.verification_delay", self.submission_params.verification_delay),
            (
                "submission_params.completion_wait_timeout",
                self.submission_params.completion_wait_timeout,
            ),
            ("submission_params.field_delay", self.submission_params.field_delay),
            ("submission_params.poll_interval", self.submission_params.poll_interval),
        ] {
            if !value.is_finite() {
                return Err(invalid(field, "必须是有限的秒数"));
            }
        }
        if self.openai.timeout <= 0.0 {
            return Err(invalid("openai.timeout", "必须大于 0"));
        }
        if self.openai.max_tokens_test == 0 {
            return Err(invalid("openai.max_tokens_test", "必须大于 0"));
        }
        if self.openai.max_concurrent_requests == 0 {
            return Err(invalid("openai.max_concurrent_requests", "必须大于 0"));
        }
        for (field, value) in [
            (
                "generation_params.persona_temperature",
                self.generation_params.persona_temperature,
            ),
            (
                "generation_params.answer_temperature",
                self.generation_params.answer_temperature,
            ),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(invalid(field, "必须在 [0, 2] 范围内"));
            }
        }
        if self.submission_params.completion_wait_timeout <= 0.0 {
            return Err(invalid("submission_params.completion_wait_timeout", "必须大于 0"));
        }
        if self.submission_params.poll_interval <= 0.0 {
            return Err(invalid("submission_params.poll_interval", "必须大于 0"));
        }
        Ok(())
    }
}

/// 配置目录中发现的候选配置
#[derive(Clone, Debug)]
pub struct ConfigCandidate {
    pub path: PathBuf,
    pub model: String,
    pub config: Config,
}

/// 扫描配置目录，返回所有可解析且包含模型名的配置
pub fn scan_config_dir(dir: &Path) -> Result<Vec<ConfigCandidate>, ConfigError> {
    if !dir.is_dir() {
        return Err(ConfigError::NotFound {
            path: dir.display().to_string(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::ReadFailed {
        path: dir.display().to_string(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            matches!(
                path.extension().and_then(|s| s.to_str()),
                Some("toml") | Some("json")
            )
        })
        .collect();
    paths.sort();

    let mut candidates = Vec::new();
    for path in paths {
        match Config::load(&path) {
            Ok(config) if !config.openai.model.is_empty() => {
                debug!("发现配置文件: {} (模型: {})", path.display(), config.openai.model);
                candidates.push(ConfigCandidate {
                    path,
                    model: config.openai.model.clone(),
                    config,
                });
            }
            Ok(_) => warn!("配置文件 {} 未设置 openai.model，已跳过", path.display()),
            Err(e) => warn!("读取配置文件失败 {}: {}", path.display(), e),
        }
    }

    if candidates.is_empty() {
        return Err(ConfigError::NoConfigFound {
            dir: dir.display().to_string(),
        });
    }

    Ok(candidates)
}
