//! 单次尝试的结果

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::models::answer::Answer;
use crate::models::persona::Persona;

/// 超时类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeoutKind {
    /// 填写完成后人机验证未通过
    Verification,
    /// 提交后未等到完成信号
    Completion,
}

/// 失败原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    /// 网络 / 页面加载失败
    Network(String),
    /// 问卷结构异常
    MalformedForm(String),
    /// 人设生成失败
    Generation(String),
    /// 答案生成失败
    AnswerSynthesis(String),
    /// 写入表单字段失败
    FormInteraction(String),
    /// 提交被拒绝
    SubmissionRejected(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Network(msg) => write!(f, "网络错误: {}", msg),
            FailureReason::MalformedForm(msg) => write!(f, "问卷结构异常: {}", msg),
            FailureReason::Generation(msg) => write!(f, "人设生成失败: {}", msg),
            FailureReason::AnswerSynthesis(msg) => write!(f, "答案生成失败: {}", msg),
            FailureReason::FormInteraction(msg) => write!(f, "表单写入失败: {}", msg),
            FailureReason::SubmissionRejected(msg) => write!(f, "提交被拒绝: {}", msg),
        }
    }
}

/// 尝试结局
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AttemptOutcome {
    Success,
    Failed(FailureReason),
    TimedOut(TimeoutKind),
}

impl AttemptOutcome {
    /// 可以立即重新开始一次的失败：网络错误、人机验证超时
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AttemptOutcome::Failed(FailureReason::Network(_))
                | AttemptOutcome::TimedOut(TimeoutKind::Verification)
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Success => write!(f, "成功"),
            AttemptOutcome::Failed(reason) => write!(f, "失败 ({})", reason),
            AttemptOutcome::TimedOut(TimeoutKind::Verification) => write!(f, "超时 (人机验证)"),
            AttemptOutcome::TimedOut(TimeoutKind::Completion) => write!(f, "超时 (等待提交完成)"),
        }
    }
}

/// 一次完整尝试的记录，创建后不再修改
#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    pub worker_id: usize,
    pub attempt: usize,
    /// 本次尝试内部重来的次数（从 1 开始）
    pub tries: u32,
    pub outcome: AttemptOutcome,
    pub persona: Option<Persona>,
    pub answers: Vec<Answer>,
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AttemptOutcome::Failed(FailureReason::Network("x".into())).is_retryable());
        assert!(AttemptOutcome::TimedOut(TimeoutKind::Verification).is_retryable());
        assert!(!AttemptOutcome::TimedOut(TimeoutKind::Completion).is_retryable());
        assert!(!AttemptOutcome::Failed(FailureReason::MalformedForm("x".into())).is_retryable());
        assert!(!AttemptOutcome::Failed(FailureReason::SubmissionRejected("x".into())).is_retryable());
        assert!(!AttemptOutcome::Success.is_retryable());
    }
}
