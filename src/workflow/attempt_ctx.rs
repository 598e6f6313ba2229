//! 尝试上下文
//!
//! 封装"哪个窗口在填第几份"这一信息

use std::fmt::Display;

/// 单次尝试的上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptCtx {
    /// 窗口编号（从 1 开始）
    pub worker_id: usize,

    /// 该窗口的第几份（从 1 开始）
    pub attempt: usize,

    /// 本份的第几次尝试（从 1 开始）
    pub try_no: u32,
}

impl AttemptCtx {
    pub fn new(worker_id: usize, attempt: usize) -> Self {
        Self {
            worker_id,
            attempt,
            try_no: 1,
        }
    }

    /// 同一份重新来过
    pub fn retry(self) -> Self {
        Self {
            try_no: self.try_no + 1,
            ..self
        }
    }
}

impl Display for AttemptCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.try_no > 1 {
            write!(
                f,
                "[窗口 {} 第 {} 份 重试 {}]",
                self.worker_id, self.attempt, self.try_no
            )
        } else {
            write!(f, "[窗口 {} 第 {} 份]", self.worker_id, self.attempt)
        }
    }
}
