//! 提交流程 - 流程层
//!
//! 一次尝试的状态机：
//! `Filling → AwaitingVerification → Submitting → {Completed, Failed, TimedOut}`
//!
//! 只依赖 [`BrowserSession`] 能力，不持有任何资源。

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::browser::session::{BrowserSession, CompletionSignal};
use crate::config::{secs, SubmissionParams};
use crate::error::BrowserError;
use crate::models::answer::Answer;
use crate::models::attempt::{AttemptOutcome, FailureReason, TimeoutKind};
use crate::models::question::FormModel;
use crate::workflow::attempt_ctx::AttemptCtx;

/// 提交流程的各项等待时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTiming {
    pub field_delay: Duration,
    pub verification_delay: Duration,
    pub submit_button_delay: Duration,
    pub completion_wait_timeout: Duration,
    pub poll_interval: Duration,
}

impl SubmissionTiming {
    pub fn from_params(params: &SubmissionParams) -> Self {
        Self {
            field_delay: secs(params.field_delay),
            verification_delay: secs(params.verification_delay),
            submit_button_delay: secs(params.submit_button_delay),
            completion_wait_timeout: secs(params.completion_wait_timeout),
            poll_interval: secs(params.poll_interval).max(Duration::from_millis(10)),
        }
    }
}

/// 状态机的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Filling,
    AwaitingVerification,
    Submitting,
    Completed,
    Failed(FailureReason),
    TimedOut(TimeoutKind),
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Completed | SubmissionState::Failed(_) | SubmissionState::TimedOut(_)
        )
    }

    /// 终态对应的尝试结局
    pub fn outcome(&self) -> Option<AttemptOutcome> {
        match self {
            SubmissionState::Completed => Some(AttemptOutcome::Success),
            SubmissionState::Failed(reason) => Some(AttemptOutcome::Failed(reason.clone())),
            SubmissionState::TimedOut(kind) => Some(AttemptOutcome::TimedOut(*kind)),
            _ => None,
        }
    }
}

/// 状态机运行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub outcome: AttemptOutcome,
    /// 依次经过的状态，最后一个为终态
    pub trace: Vec<SubmissionState>,
}

impl SubmissionOutcome {
    /// 是否已经点击过提交
    pub fn reached_submit(&self) -> bool {
        self.trace.contains(&SubmissionState::Submitting)
    }
}

/// 提交流程控制器
pub struct SubmissionController {
    timing: SubmissionTiming,
}

impl SubmissionController {
    pub fn new(timing: SubmissionTiming) -> Self {
        Self { timing }
    }

    pub fn timing(&self) -> &SubmissionTiming {
        &self.timing
    }

    /// 把答案写入页面并提交，运行到终态为止
    pub async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        form: &FormModel,
        answers: &[Answer],
        ctx: &AttemptCtx,
    ) -> SubmissionOutcome {
        let mut trace = vec![SubmissionState::Filling];

        let next = match self.fill(session, form, answers, ctx).await {
            Ok(()) => SubmissionState::AwaitingVerification,
            Err(reason) => SubmissionState::Failed(reason),
        };
        trace.push(next.clone());

        let next = if next == SubmissionState::AwaitingVerification {
            match self.await_verification(session, ctx).await {
                Ok(()) => SubmissionState::Submitting,
                Err(terminal) => terminal,
            }
        } else {
            next
        };
        if !trace.last().is_some_and(|last| *last == next) {
            trace.push(next.clone());
        }

        if next == SubmissionState::Submitting {
            let terminal = self.submit(session, ctx).await;
            trace.push(terminal);
        }

        let outcome = trace
            .last()
            .and_then(SubmissionState::outcome)
            .unwrap_or(AttemptOutcome::Failed(FailureReason::FormInteraction(
                "提交流程未到达终态".to_string(),
            )));
        SubmissionOutcome { outcome, trace }
    }

    async fn fill(
        &self,
        session: &mut dyn BrowserSession,
        form: &FormModel,
        answers: &[Answer],
        ctx: &AttemptCtx,
    ) -> Result<(), FailureReason> {
        info!("{} ✏️ 开始填写 {} 道题...", ctx, form.questions.len());
        let mut current_page = form.questions.first().map(|q| q.page).unwrap_or(0);

        for (i, question) in form.questions.iter().enumerate() {
            let answer = answers
                .iter()
                .find(|a| a.question_id == question.id)
                .ok_or_else(|| FailureReason::FormInteraction(format!("第 {} 题没有答案", question.id)))?;

            while current_page < question.page {
                debug!("{} 翻到第 {} 页", ctx, current_page + 2);
                session.advance_page().await.map_err(|e| classify_browser_error(&e))?;
                current_page += 1;
            }

            if i > 0 && !self.timing.field_delay.is_zero() {
                sleep(self.timing.field_delay).await;
            }

            session.fill(question, answer).await.map_err(|e| {
                warn!("{} ⚠️ 第 {} 题写入失败: {}", ctx, question.id, e);
                classify_browser_error(&e)
            })?;
        }

        // 末尾可能还有没有可答题目的分页
        let last_page = form.page_count.saturating_sub(1);
        while current_page < last_page {
            session.advance_page().await.map_err(|e| classify_browser_error(&e))?;
            current_page += 1;
        }
        Ok(())
    }

    async fn await_verification(
        &self,
        session: &mut dyn BrowserSession,
        ctx: &AttemptCtx,
    ) -> Result<(), SubmissionState> {
        let deadline = Instant::now() + self.timing.verification_delay;
        let mut announced = false;

        loop {
            let pending = session
                .verification_pending()
                .await
                .map_err(|e| SubmissionState::Failed(classify_browser_error(&e)))?;
            if !pending {
                return Ok(());
            }
            if !announced {
                info!("{} 🛡️ 检测到人机验证，等待完成...", ctx);
                announced = true;
            }
            if Instant::now() >= deadline {
                warn!("{} ⏰ 人机验证在 {:?} 内未完成", ctx, self.timing.verification_delay);
                return Err(SubmissionState::TimedOut(TimeoutKind::Verification));
            }
            sleep(self.timing.poll_interval).await;
        }
    }

    async fn submit(&self, session: &mut dyn BrowserSession, ctx: &AttemptCtx) -> SubmissionState {
        if !self.timing.submit_button_delay.is_zero() {
            sleep(self.timing.submit_button_delay).await;
        }

        info!("{} 📤 提交问卷...", ctx);
        if let Err(e) = session.submit().await {
            warn!("{} ⚠️ 点击提交失败: {}", ctx, e);
            return SubmissionState::Failed(classify_browser_error(&e));
        }

        let deadline = Instant::now() + self.timing.completion_wait_timeout;
        let mut challenge_since: Option<Instant> = None;

        loop {
            match session.completion_signal().await {
                Ok(CompletionSignal::Completed) => {
                    info!("{} ✅ 提交成功", ctx);
                    return SubmissionState::Completed;
                }
                Ok(CompletionSignal::Rejected(message)) => {
                    warn!("{} ❌ 提交被拒绝: {}", ctx, message);
                    return SubmissionState::Failed(FailureReason::SubmissionRejected(message));
                }
                Ok(CompletionSignal::Pending) => {}
                // 页面跳转过程中脚本可能失败，继续轮询
                Err(e) => debug!("{} 完成信号探测失败: {}", ctx, e),
            }

            // 提交后才出现的人机验证同样受 verification_delay 约束
            if session.verification_pending().await.unwrap_or(false) {
                let since = *challenge_since.get_or_insert_with(Instant::now);
                if since.elapsed() >= self.timing.verification_delay {
                    warn!("{} ⏰ 提交后的人机验证未完成", ctx);
                    return SubmissionState::TimedOut(TimeoutKind::Verification);
                }
            } else {
                challenge_since = None;
            }

            if Instant::now() >= deadline {
                warn!(
                    "{} ⏰ {:?} 内未检测到提交完成",
                    ctx, self.timing.completion_wait_timeout
                );
                return SubmissionState::TimedOut(TimeoutKind::Completion);
            }
            sleep(self.timing.poll_interval).await;
        }
    }
}

/// 浏览器错误 → 尝试失败原因
pub fn classify_browser_error(err: &BrowserError) -> FailureReason {
    match err {
        e if e.is_network() => FailureReason::Network(e.to_string()),
        BrowserError::MalformedForm { message } => FailureReason::MalformedForm(message.clone()),
        e => FailureReason::FormInteraction(e.to_string()),
    }
}
