//! 人设生成服务 - 业务能力层
//!
//! 只负责"生成一个完整人设"能力，不关心问卷和流程

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::PersonaError;
use crate::models::persona::{Persona, REQUIRED_TRAITS};
use crate::services::llm_service::LlmService;
use crate::services::response_parser::parse_json_object;

const PERSONA_SYSTEM_PROMPT: &str = "你是一个人设生成器。请生成一个普通、可信的虚拟答题人，\
不要过于夸张。各字段之间必须相互一致（例如年龄与职业、教育背景相符）。\
只输出一个 JSON 对象，不要输出其他内容，不要使用<think>标签。";

/// 人设生成服务
pub struct PersonaGenerator {
    llm: Arc<LlmService>,
    max_retries: u32,
    temperature: f32,
}

impl PersonaGenerator {
    /// # 参数
    /// - `llm`: 共享的 LLM 服务
    /// - `max_retries`: 字段不完整时的最多生成次数
    /// - `temperature`: 配置中的 persona_temperature
    pub fn new(llm: Arc<LlmService>, max_retries: u32, temperature: f32) -> Self {
        Self {
            llm,
            max_retries,
            temperature,
        }
    }

    /// 使用配置的温度生成
    pub async fn generate_default(&self) -> Result<Persona, PersonaError> {
        self.generate(self.temperature).await
    }

    /// 生成一个字段齐全的人设
    ///
    /// LLM 自身的瞬时错误已在 `LlmService` 内重试；这里只对"回复缺字段"重新生成。
    pub async fn generate(&self, temperature: f32) -> Result<Persona, PersonaError> {
        let attempts = self.max_retries.max(1);
        let mut last_missing: Vec<String> = REQUIRED_TRAITS.iter().map(|s| s.to_string()).collect();

        for attempt in 1..=attempts {
            info!("正在生成人设... (尝试 {}/{})", attempt, attempts);

            let prompt = build_persona_prompt(&last_missing, attempt > 1);
            let response = self
                .llm
                .ask(Some(PERSONA_SYSTEM_PROMPT), &prompt, temperature)
                .await
                .map_err(PersonaError::from)?;

            let Some(traits) = parse_json_object(&response) else {
                warn!("人设回复不是 JSON 对象，重试...");
                continue;
            };

            match Persona::from_traits(traits) {
                Ok(persona) => {
                    info!(
                        "当前人设: {}",
                        crate::utils::logging::truncate_text(&persona.describe().replace('\n', "；"), 120)
                    );
                    return Ok(persona);
                }
                Err(missing) => {
                    warn!("人设缺少字段 {:?}，重试...", missing);
                    last_missing = missing;
                }
            }
        }

        Err(PersonaError::Incomplete {
            missing: last_missing,
            attempts,
        })
    }
}

fn build_persona_prompt(missing: &[String], is_retry: bool) -> String {
    let keys = REQUIRED_TRAITS
        .iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(", ");
    let mut prompt = format!(
        "请生成一个完整的人物人设，以 JSON 对象返回，必须包含以下键且值不能为空：{}。\n\
         其中\"观点倾向\"描述此人对社会、消费、学习等话题的大致态度，\
         \"写作风格\"描述此人回答开放题时的语气和用词习惯。",
        keys
    );
    if is_retry {
        prompt.push_str(&format!("\n上一次的回答缺少或留空了：{}，请补全。", missing.join("、")));
    }
    prompt
}
