//! 协调器 - 编排层
//!
//! ## 职责
//!
//! 1. **启动窗口**：为每个窗口创建一个 [`SessionWorker`] 并发运行
//! 2. **收集结果**：通过通道接收每份的 [`AttemptResult`]
//! 3. **全局停止**：达到目标、失败过多或出现致命错误时通知所有窗口
//! 4. **汇总统计**：输出 [`RunSummary`]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::browser::session::SessionFactory;
use crate::config::Config;
use crate::models::attempt::{AttemptOutcome, AttemptResult};
use crate::orchestrator::progress::{SharedProgress, StopReason};
use crate::orchestrator::session_worker::{SessionWorker, WorkerServices};
use crate::services::{AnswerSynthesizer, LlmService, LlmStats, PersonaGenerator};
use crate::workflow::{SubmissionController, SubmissionTiming};

/// 一次运行的输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub survey_url: String,
    pub target: usize,
    pub windows: usize,
    /// 未设置时取 `target / 4 + 1`
    pub max_failures: Option<usize>,
}

/// 运行汇总
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub target: usize,
    pub completed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub elapsed: Duration,
    pub results: Vec<AttemptResult>,
    pub stop_reason: Option<StopReason>,
    pub llm: LlmStats,
}

impl RunSummary {
    pub fn reached_target(&self) -> bool {
        self.completed >= self.target
    }
}

/// 协调器
pub struct Coordinator {
    llm: Arc<LlmService>,
    services: WorkerServices,
    factory: Arc<dyn SessionFactory>,
}

impl Coordinator {
    /// 按配置组装所有服务，LLM 服务由所有窗口共用
    pub fn new(config: &Config, llm: Arc<LlmService>, factory: Arc<dyn SessionFactory>) -> Self {
        let params = &config.generation_params;
        let services = WorkerServices {
            persona: Arc::new(PersonaGenerator::new(
                llm.clone(),
                params.max_retries,
                params.persona_temperature,
            )),
            synthesizer: Arc::new(AnswerSynthesizer::new(
                llm.clone(),
                params.max_retries,
                params.answer_temperature,
            )),
            controller: Arc::new(SubmissionController::new(SubmissionTiming::from_params(
                &config.submission_params,
            ))),
            max_retries: params.max_retries,
        };
        Self {
            llm,
            services,
            factory,
        }
    }

    /// 运行直到达到目标或停止
    pub async fn run(&self, plan: RunPlan) -> RunSummary {
        let started = Instant::now();
        let max_failures = plan
            .max_failures
            .unwrap_or_else(|| SharedProgress::default_max_failures(plan.target));
        let progress = Arc::new(SharedProgress::new(plan.target, max_failures));
        let windows = plan.windows.max(1);

        info!(
            "🪟 启动 {} 个窗口，目标 {} 份，失败上限 {} 次",
            windows, plan.target, max_failures
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(windows);
        for worker_id in 1..=windows {
            let worker = SessionWorker::new(
                worker_id,
                plan.survey_url.clone(),
                progress.clone(),
                self.services.clone(),
                tx.clone(),
            );
            let factory = self.factory.clone();
            handles.push((worker_id, tokio::spawn(worker.run(factory))));
        }
        drop(tx);

        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }

        for (worker_id, handle) in handles {
            match handle.await {
                Ok(Ok(_report)) => {}
                Ok(Err(e)) if e.is_run_fatal() => {
                    error!("[窗口 {}] ❌ 致命错误: {}", worker_id, e);
                    progress.abort(StopReason::Fatal(e.to_string()));
                }
                Ok(Err(e)) => warn!("[窗口 {}] ⚠️ 异常退出: {}", worker_id, e),
                Err(e) => error!("[窗口 {}] 任务执行失败: {}", worker_id, e),
            }
        }

        if !progress.is_stopped() {
            progress.abort(StopReason::WorkersExited);
        }

        let failed = results
            .iter()
            .filter(|r| matches!(r.outcome, AttemptOutcome::Failed(_)))
            .count();
        let timed_out = results
            .iter()
            .filter(|r| matches!(r.outcome, AttemptOutcome::TimedOut(_)))
            .count();

        RunSummary {
            target: plan.target,
            completed: progress.completed(),
            failed,
            timed_out,
            elapsed: started.elapsed(),
            results,
            stop_reason: progress.stop_reason(),
            llm: self.llm.stats(),
        }
    }
}
