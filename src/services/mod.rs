pub mod answer_service;
pub mod llm_service;
pub mod persona_service;
pub mod rate_limiter;
pub mod response_parser;
pub mod retry;

pub use answer_service::AnswerSynthesizer;
pub use llm_service::{LlmService, LlmSettings, LlmStats};
pub use persona_service::PersonaGenerator;
pub use rate_limiter::RateLimiter;
pub use retry::{Backoff, FixedBackoff, NoBackoff, RetryPolicy};
