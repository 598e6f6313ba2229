//! LLM API 客户端
//!
//! 只负责"发一次请求、拿回文本"，不做重试与限流（由 `LlmService` 负责）。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（本地 LM Studio、DeepSeek、Qwen 等）

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::OpenAiConfig;
use crate::error::LlmError;

/// 一次补全请求
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// 文本生成后端
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// 模型名称
    fn model(&self) -> &str;

    /// 发送一次请求，返回原始回复文本
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// OpenAI 兼容接口客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &OpenAiConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.model.clone(),
        }
    }

    fn build_messages(
        &self,
        request: &CompletionRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let mut messages = Vec::new();

        if let Some(sys_msg) = &request.system {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg.as_str())
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.prompt.as_str())
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        Ok(messages)
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    fn model(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", request.prompt.chars().count());

        let messages = self
            .build_messages(request)
            .map_err(|e| classify_openai_error(&self.model_name, e))?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(|e| classify_openai_error(&self.model_name, e))?;

        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            classify_openai_error(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })
    }
}

/// 把 async-openai 的错误归类到重试策略关心的类别
fn classify_openai_error(model: &str, err: OpenAIError) -> LlmError {
    match err {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_ref().map(|c| c.to_string()).unwrap_or_default();
            let kind = api.r#type.clone().unwrap_or_default();
            classify_api_error(model, &code, &kind, &api.message)
        }
        OpenAIError::InvalidArgument(message) => LlmError::Configuration { message },
        other => LlmError::Transport {
            model: model.to_string(),
            message: other.to_string(),
        },
    }
}

/// 按 code / type / message 归类服务端返回的错误
pub(crate) fn classify_api_error(model: &str, code: &str, kind: &str, message: &str) -> LlmError {
    let haystack = format!("{} {} {}", code, kind, message).to_lowercase();

    if haystack.contains("rate_limit") || haystack.contains("rate limit") || haystack.contains("429")
    {
        return LlmError::RateLimited {
            model: model.to_string(),
            retry_after: None,
            message: message.to_string(),
        };
    }

    if haystack.contains("invalid_api_key")
        || haystack.contains("authentication")
        || haystack.contains("unauthorized")
        || haystack.contains("permission")
        || haystack.contains("401")
    {
        return LlmError::Authentication {
            model: model.to_string(),
            message: message.to_string(),
        };
    }

    if haystack.contains("model_not_found")
        || haystack.contains("does not exist")
        || haystack.contains("insufficient_quota")
        || haystack.contains("invalid_request")
    {
        return LlmError::Configuration {
            message: format!("{} (模型: {})", message, model),
        };
    }

    LlmError::Transport {
        model: model.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit() {
        let err = classify_api_error("m", "rate_limit_exceeded", "requests", "Too many requests");
        assert!(matches!(err, LlmError::RateLimited { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_classify_auth_is_fatal() {
        let err = classify_api_error("m", "invalid_api_key", "invalid_request_error", "Incorrect API key");
        assert!(matches!(err, LlmError::Authentication { .. }));
        assert!(err.is_run_fatal());
    }

    #[test]
    fn test_classify_missing_model_is_fatal() {
        let err = classify_api_error("m", "model_not_found", "invalid_request_error", "The model does not exist");
        assert!(err.is_run_fatal());
    }

    #[test]
    fn test_classify_unknown_is_transient() {
        let err = classify_api_error("m", "", "server_error", "upstream overloaded");
        assert!(err.is_transient());
    }

    /// 测试真实 API 连通性
    #[tokio::test]
    #[ignore]
    async fn test_real_completion() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = OpenAiConfig {
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or_default(),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: std::env::var("OPENAI_MODEL").unwrap_or_default(),
            timeout: 30.0,
            max_tokens_test: 32,
            max_concurrent_requests: 1,
            min_request_interval: 0.0,
        };
        let client = LlmClient::new(&config);
        let response = client
            .complete(&CompletionRequest {
                system: Some("你是一个简洁的助手，回答要简短。".to_string()),
                prompt: "测试连接".to_string(),
                temperature: 0.0,
                max_tokens: 32,
                timeout: Duration::from_secs(30),
            })
            .await
            .expect("LLM 调用失败");
        assert!(!response.is_empty());
    }
}
