//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `coordinator` - 协调器
//! - 按窗口数启动 SessionWorker
//! - 收集每份的结果，汇总统计
//! - 达到目标 / 失败过多 / 致命错误时全局停止
//!
//! ### `session_worker` - 单个窗口
//! - 独占一个浏览器会话
//! - 循环：人设 → 问卷 → 答案 → 提交
//!
//! ### `progress` - 全局进度
//! - 完成数、占位数、失败数、停止标志
//!
//! ## 层次关系
//!
//! ```text
//! coordinator (多个窗口)
//!     ↓
//! session_worker (一个窗口的循环)
//!     ↓
//! workflow::SubmissionController (一份问卷的填写与提交)
//!     ↓
//! services (能力层：persona / answer / llm)
//!     ↓
//! infrastructure (基础设施：BrowserSession / JsExecutor)
//! ```

pub mod coordinator;
pub mod progress;
pub mod session_worker;

pub use coordinator::{Coordinator, RunPlan, RunSummary};
pub use progress::{Claim, SharedProgress, StopReason};
pub use session_worker::{SessionWorker, WorkerReport, WorkerServices};
