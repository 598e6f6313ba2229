//! # Survey Autofill
//!
//! 使用 AI 人设自动填写问卷星问卷的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() / click() 能力
//! - `browser/` - 每个窗口一个浏览器；`BrowserSession` 负责解析问卷、写入答案、提交
//! - `clients/` - OpenAI 兼容接口的调用后端
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `LlmService` - 全局共用的 LLM 调用入口（超时、重试、限流）
//! - `PersonaGenerator` - 生成人设
//! - `AnswerSynthesizer` - 按题型生成满足约束的答案
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份问卷"的填写与提交流程
//! - `AttemptCtx` - 上下文封装（窗口编号 + 第几份）
//! - `SubmissionController` - 状态机（填写 → 等待验证 → 提交 → 结局）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/coordinator` - 启动多个窗口，汇总结果，全局停止
//! - `orchestrator/session_worker` - 单个窗口的循环
//! - `orchestrator/progress` - 全局进度
//!
//! ## 模块结构

pub mod app;
pub mod browser;
pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{Answer, AnswerValue, FormModel, Persona, Question, QuestionKind};
pub use orchestrator::{Coordinator, RunPlan, RunSummary};
pub use services::{AnswerSynthesizer, LlmService, PersonaGenerator};
