//! 超时守卫
//!
//! 让 Action 主体与截止时间赛跑，先完成的一方决定结果。主体超时后
//! 其 Future 被丢弃，迟到的结果不会再被观察到。

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// 赛跑结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceOutcome<T> {
    /// 在截止时间前完成
    Completed(T),
    /// 执行过程中 panic，携带 panic 消息
    Panicked(String),
    /// 截止时间先到
    TimedOut,
}

impl<T> RaceOutcome<T> {
    /// 是否超时
    pub fn is_timed_out(&self) -> bool {
        matches!(self, RaceOutcome::TimedOut)
    }
}

/// 让 Future 与截止时间赛跑
pub async fn race_deadline<F>(deadline: Duration, future: F) -> RaceOutcome<F::Output>
where
    F: Future,
{
    match timeout(deadline, future).await {
        Ok(output) => RaceOutcome::Completed(output),
        Err(_elapsed) => RaceOutcome::TimedOut,
    }
}

/// 超时守卫
#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuard {
    deadline: Duration,
}

impl TimeoutGuard {
    /// 创建守卫
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// 截止时间
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// 执行 Future，同时捕获 panic
    pub async fn run<F>(&self, future: F) -> RaceOutcome<F::Output>
    where
        F: Future,
    {
        let guarded = AssertUnwindSafe(future).catch_unwind();
        match race_deadline(self.deadline, guarded).await {
            RaceOutcome::Completed(Ok(output)) => RaceOutcome::Completed(output),
            RaceOutcome::Completed(Err(payload)) => RaceOutcome::Panicked(panic_message(&*payload)),
            RaceOutcome::Panicked(message) => RaceOutcome::Panicked(message),
            RaceOutcome::TimedOut => {
                warn!(
                    timeout_ms = self.deadline.as_millis() as u64,
                    "Action timed out"
                );
                RaceOutcome::TimedOut
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
