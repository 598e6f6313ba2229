//! 全局进度
//!
//! 所有窗口共享一个 [`SharedProgress`]：
//! - `claimed` = 已完成 + 进行中的份数，开始新的一份前先占位，保证不会多填
//! - 停止标志一旦设置不再清除，第一个停止原因生效

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::OnceLock;

use tracing::{info, warn};

/// 停止原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// 达到目标份数
    TargetReached,
    /// 未成功的尝试达到上限
    FailureThreshold { failures: usize },
    /// 运行级致命错误（鉴权 / 配置）
    Fatal(String),
    /// 所有窗口都已退出
    WorkersExited,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TargetReached => write!(f, "已达到目标份数"),
            StopReason::FailureThreshold { failures } => write!(f, "失败次数过多 ({} 次)", failures),
            StopReason::Fatal(msg) => write!(f, "致命错误: {}", msg),
            StopReason::WorkersExited => write!(f, "所有窗口均已退出"),
        }
    }
}

/// 占位结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// 可以开始新的一份
    Granted,
    /// 名额暂时被进行中的尝试占满，稍后再试
    Wait,
    /// 运行已停止
    Stop,
}

/// 全局进度
#[derive(Debug)]
pub struct SharedProgress {
    target: usize,
    max_failures: usize,
    completed: AtomicUsize,
    claimed: AtomicUsize,
    failures: AtomicUsize,
    stopped: AtomicBool,
    stop_reason: OnceLock<StopReason>,
}

impl SharedProgress {
    /// # 参数
    /// - `target`: 目标份数
    /// - `max_failures`: 未成功尝试的上限，达到后停止
    pub fn new(target: usize, max_failures: usize) -> Self {
        Self {
            target,
            max_failures: max_failures.max(1),
            completed: AtomicUsize::new(0),
            claimed: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
            stop_reason: OnceLock::new(),
        }
    }

    /// 缺省失败上限：目标的四分之一再加一
    pub fn default_max_failures(target: usize) -> usize {
        target / 4 + 1
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// 尝试为新的一份占位
    pub fn claim_attempt(&self) -> Claim {
        if self.is_stopped() {
            return Claim::Stop;
        }
        let claimed = self
            .claimed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |claimed| {
                (claimed < self.target).then_some(claimed + 1)
            });
        match claimed {
            // 占位后再看一次，避免与 abort 交错
            Ok(_) if self.is_stopped() => {
                self.claimed.fetch_sub(1, Ordering::SeqCst);
                Claim::Stop
            }
            Ok(_) => Claim::Granted,
            Err(_) if self.completed() >= self.target => Claim::Stop,
            Err(_) => Claim::Wait,
        }
    }

    /// 记录一份成功，返回当前完成数；达到目标时停止
    pub fn record_success(&self) -> usize {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if completed >= self.target {
            self.abort(StopReason::TargetReached);
        }
        completed
    }

    /// 记录一份未成功并归还占位，返回累计失败数；达到上限时停止
    pub fn record_failure(&self) -> usize {
        self.claimed.fetch_sub(1, Ordering::SeqCst);
        let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.max_failures {
            self.abort(StopReason::FailureThreshold { failures });
        }
        failures
    }

    /// 归还占位但不计失败（尝试在填写前被中止）
    pub fn release_claim(&self) {
        self.claimed.fetch_sub(1, Ordering::SeqCst);
    }

    /// 通知所有窗口停止，只有第一次调用的原因会被记录
    pub fn abort(&self, reason: StopReason) {
        if self.stop_reason.set(reason.clone()).is_ok() {
            match &reason {
                StopReason::TargetReached => info!("🎉 {}，通知所有窗口停止", reason),
                _ => warn!("🛑 {}，通知所有窗口停止", reason),
            }
        }
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason.get().cloned()
    }
}
