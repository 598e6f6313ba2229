use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 人设生成错误
    #[error("人设生成错误: {0}")]
    Persona(#[from] PersonaError),
    /// 答案生成错误
    #[error("答题错误: {0}")]
    Synthesis(#[from] SynthesisError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

impl AppError {
    /// 是否为整个运行级别的致命错误（需要通知所有窗口停止）
    pub fn is_run_fatal(&self) -> bool {
        match self {
            AppError::Llm(e) => e.is_run_fatal(),
            AppError::Persona(e) => e.is_run_fatal(),
            AppError::Synthesis(e) => e.is_run_fatal(),
            AppError::Config(_) => true,
            AppError::Browser(_) | AppError::Other(_) => false,
        }
    }
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {message}")]
    LaunchFailed { message: String },
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {message}")]
    ConnectionFailed { port: u16, message: String },
    /// 导航失败
    #[error("导航到 {url} 失败: {message}")]
    NavigationFailed { url: String, message: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {message}")]
    ScriptFailed { message: String },
    /// 写入表单字段失败
    #[error("第 {question_id} 题写入失败: {message}")]
    FormInteraction { question_id: u32, message: String },
    /// 问卷结构无法解析
    #[error("问卷结构异常: {message}")]
    MalformedForm { message: String },
    /// CDP 协议错误
    #[error("CDP错误: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
}

impl BrowserError {
    /// 网络类错误（重新开始一次尝试可能恢复）
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            BrowserError::ConnectionFailed { .. }
                | BrowserError::NavigationFailed { .. }
                | BrowserError::Cdp(_)
        )
    }
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 单次调用超时
    #[error("LLM调用超时 (模型: {model}, 超时: {timeout:?})")]
    Timeout { model: String, timeout: Duration },
    /// 触发频率限制
    #[error("LLM请求频率限制 (模型: {model}): {message}")]
    RateLimited {
        model: String,
        retry_after: Option<Duration>,
        message: String,
    },
    /// 网络传输失败
    #[error("LLM网络请求失败 (模型: {model}): {message}")]
    Transport { model: String, message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 鉴权失败
    #[error("LLM鉴权失败 (模型: {model}): {message}")]
    Authentication { model: String, message: String },
    /// 模型或请求配置错误
    #[error("LLM配置错误: {message}")]
    Configuration { message: String },
    /// 重试次数用尽
    #[error("LLM调用 {attempts} 次后仍失败: {last}")]
    RetriesExhausted { attempts: u32, last: Box<LlmError> },
}

impl LlmError {
    /// 可重试的瞬时错误
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Timeout { .. }
                | LlmError::RateLimited { .. }
                | LlmError::Transport { .. }
                | LlmError::EmptyContent { .. }
        )
    }

    /// 鉴权/配置类错误，重试无意义，直接终止整个运行
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            LlmError::Authentication { .. } | LlmError::Configuration { .. }
        )
    }

    /// 服务端建议的等待时间
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// 人设生成错误
#[derive(Debug, Error)]
pub enum PersonaError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    /// 多次生成后仍缺少必填字段
    #[error("人设缺少必填字段 {missing:?} (已尝试 {attempts} 次)")]
    Incomplete { missing: Vec<String>, attempts: u32 },
}

impl PersonaError {
    pub fn is_run_fatal(&self) -> bool {
        match self {
            PersonaError::Llm(e) => e.is_run_fatal(),
            PersonaError::Incomplete { .. } => false,
        }
    }
}

/// 答案生成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// AI 回答无法映射到合法选项
    #[error("第 {question_id} 题回答无法映射到合法选项: {response}")]
    InvalidSelection { question_id: u32, response: String },
    /// 多次尝试后仍无法生成合法答案
    #[error("第 {question_id} 题尝试 {attempts} 次后仍无法生成合法答案: {last_reason}")]
    Exhausted {
        question_id: u32,
        attempts: u32,
        last_reason: String,
    },
    /// 题目约束本身无法满足
    #[error("第 {question_id} 题约束无法满足: {reason}")]
    Unsatisfiable { question_id: u32, reason: String },
    /// 底层 LLM 调用失败
    #[error("第 {question_id} 题调用LLM失败: {source}")]
    Llm {
        question_id: u32,
        #[source]
        source: LlmError,
    },
}

impl SynthesisError {
    pub fn is_run_fatal(&self) -> bool {
        match self {
            SynthesisError::Llm { source, .. } => source.is_run_fatal(),
            _ => false,
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    NotFound { path: String },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 不支持的配置文件格式
    #[error("不支持的配置文件格式: {path}")]
    UnsupportedFormat { path: String },
    /// 配置目录中没有可用配置
    #[error("目录 {dir} 中没有包含 openai.model 的配置文件")]
    NoConfigFound { dir: String },
    /// 字段值非法
    #[error("配置项 {field} 非法: {reason}")]
    Invalid { field: String, reason: String },
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
