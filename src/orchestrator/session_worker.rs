//! 窗口工作者 - 编排层
//!
//! 一个窗口 = 一个浏览器会话 + 一个循环：
//! 生成人设 → 解析问卷 → 生成答案 → 提交，直到达到目标或收到停止信号。
//! 会话在任何退出路径上都会被释放。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::browser::session::{BrowserSession, SessionFactory};
use crate::error::{AppError, AppResult};
use crate::models::answer::Answer;
use crate::models::attempt::{AttemptOutcome, AttemptResult, FailureReason};
use crate::models::persona::Persona;
use crate::orchestrator::progress::{Claim, SharedProgress, StopReason};
use crate::services::{AnswerSynthesizer, PersonaGenerator};
use crate::workflow::{classify_browser_error, AttemptCtx, SubmissionController};

/// 名额被占满时的等待间隔
const CLAIM_POLL: Duration = Duration::from_millis(200);

/// 窗口共享的服务
#[derive(Clone)]
pub struct WorkerServices {
    pub persona: Arc<PersonaGenerator>,
    pub synthesizer: Arc<AnswerSynthesizer>,
    pub controller: Arc<SubmissionController>,
    /// 单份内部的最多重来次数
    pub max_retries: u32,
}

/// 窗口退出时的汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub attempts: usize,
    pub completed: usize,
}

/// 一次尝试（可能是某份的一次重来）的产物
struct TryOutput {
    outcome: AttemptOutcome,
    persona: Option<Persona>,
    answers: Vec<Answer>,
}

/// 单个窗口
pub struct SessionWorker {
    id: usize,
    url: String,
    progress: Arc<SharedProgress>,
    services: WorkerServices,
    results: UnboundedSender<AttemptResult>,
}

impl SessionWorker {
    pub fn new(
        id: usize,
        url: impl Into<String>,
        progress: Arc<SharedProgress>,
        services: WorkerServices,
        results: UnboundedSender<AttemptResult>,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            progress,
            services,
            results,
        }
    }

    /// 运行窗口直到停止
    ///
    /// 只有运行级致命错误和会话创建失败会以 `Err` 返回。
    pub async fn run(self, factory: Arc<dyn SessionFactory>) -> AppResult<WorkerReport> {
        let mut session = factory.acquire(self.id).await.map_err(|e| {
            error!("[窗口 {}] ❌ 浏览器启动失败: {}", self.id, e);
            AppError::from(e)
        })?;

        let result = self.run_loop(session.as_mut()).await;

        // 先通知其他窗口停止，再慢慢关闭浏览器
        if let Err(e) = &result {
            if e.is_run_fatal() {
                self.progress.abort(StopReason::Fatal(e.to_string()));
            }
        }
        if let Err(e) = session.release().await {
            warn!("[窗口 {}] 释放浏览器失败: {}", self.id, e);
        }
        result
    }

    async fn run_loop(&self, session: &mut dyn BrowserSession) -> AppResult<WorkerReport> {
        let mut report = WorkerReport {
            worker_id: self.id,
            ..WorkerReport::default()
        };

        loop {
            match self.progress.claim_attempt() {
                Claim::Granted => {}
                Claim::Wait => {
                    sleep(CLAIM_POLL).await;
                    continue;
                }
                Claim::Stop => break,
            }

            report.attempts += 1;
            let mut ctx = AttemptCtx::new(self.id, report.attempts);
            let started = Instant::now();
            info!("{} 🚀 开始填写", ctx);

            let output = loop {
                let Some(output) = self.try_once(session, &ctx).await? else {
                    break None;
                };
                if output.outcome.is_retryable()
                    && ctx.try_no <= self.services.max_retries
                    && !self.progress.is_stopped()
                {
                    warn!("{} 🔄 {}，重新开始本份", ctx, output.outcome);
                    ctx = ctx.retry();
                    continue;
                }
                break Some(output);
            };

            let Some(output) = output else {
                debug!("{} 已收到停止信号，放弃本份", ctx);
                self.progress.release_claim();
                break;
            };

            if output.outcome.is_success() {
                report.completed += 1;
                let completed = self.progress.record_success();
                info!("{} 🎉 已完成 {}/{}", ctx, completed, self.progress.target());
            } else {
                let failures = self.progress.record_failure();
                warn!("{} ❌ 本份{} (累计未成功 {})", ctx, output.outcome, failures);
            }

            let result = AttemptResult {
                worker_id: self.id,
                attempt: ctx.attempt,
                tries: ctx.try_no,
                outcome: output.outcome,
                persona: output.persona,
                answers: output.answers,
                duration: started.elapsed(),
            };
            if self.results.send(result).is_err() {
                debug!("{} 结果通道已关闭", ctx);
            }
        }

        info!(
            "[窗口 {}] 🏁 退出：共 {} 份，成功 {} 份",
            self.id, report.attempts, report.completed
        );
        Ok(report)
    }

    /// 执行一次完整流程
    ///
    /// 返回 `Ok(None)` 表示在开始填写前收到了停止信号。
    async fn try_once(
        &self,
        session: &mut dyn BrowserSession,
        ctx: &AttemptCtx,
    ) -> AppResult<Option<TryOutput>> {
        let failed = |reason: FailureReason, persona: Option<Persona>| -> AppResult<Option<TryOutput>> {
            Ok(Some(TryOutput {
                outcome: AttemptOutcome::Failed(reason),
                persona,
                answers: Vec::new(),
            }))
        };

        // 1. 人设
        let persona = match self.services.persona.generate_default().await {
            Ok(persona) => persona,
            Err(e) if e.is_run_fatal() => return Err(AppError::from(e)),
            Err(e) => return failed(FailureReason::Generation(e.to_string()), None),
        };

        // 2. 问卷结构
        let form = match session.open_form(&self.url).await {
            Ok(form) => form,
            Err(e) => {
                warn!("{} ⚠️ 打开问卷失败: {}", ctx, e);
                return failed(classify_browser_error(&e), Some(persona));
            }
        };

        // 3. 答案
        let answers = match self.services.synthesizer.answer_form(&persona, &form).await {
            Ok(answers) => answers,
            Err(e) if e.is_run_fatal() => {
                self.close_form(session, ctx).await;
                return Err(AppError::from(e));
            }
            Err(e) => {
                self.close_form(session, ctx).await;
                return failed(FailureReason::AnswerSynthesis(e.to_string()), Some(persona));
            }
        };

        // 开始填写前最后一次检查停止信号，进入提交后不再中断
        if self.progress.is_stopped() {
            self.close_form(session, ctx).await;
            return Ok(None);
        }

        // 4. 填写并提交
        let submission = self
            .services
            .controller
            .drive(session, &form, &answers, ctx)
            .await;
        self.close_form(session, ctx).await;

        Ok(Some(TryOutput {
            outcome: submission.outcome,
            persona: Some(persona),
            answers,
        }))
    }

    async fn close_form(&self, session: &mut dyn BrowserSession, ctx: &AttemptCtx) {
        if let Err(e) = session.close_form().await {
            debug!("{} 关闭问卷页面失败: {}", ctx, e);
        }
    }
}
