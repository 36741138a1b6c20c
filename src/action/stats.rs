//! Action 执行统计

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use super::status::ActionStatus;

/// Action 执行统计
#[derive(Debug, Default)]
pub struct ActionStats {
    /// 总完成数
    total_actions: AtomicU64,
    /// 成功数
    successful_actions: AtomicU64,
    /// 失败数
    failed_actions: AtomicU64,
    /// 超时数
    timeout_actions: AtomicU64,
    /// 准入阶段被拒绝的数量
    rejected_actions: AtomicU64,
    /// 总延迟（微秒）
    total_latency_us: AtomicU64,
    /// 最小延迟（微秒）
    min_latency_us: AtomicU64,
    /// 最大延迟（微秒）
    max_latency_us: AtomicU64,
}

impl ActionStats {
    /// 创建新的统计实例
    pub fn new() -> Self {
        Self {
            min_latency_us: AtomicU64::new(u64::MAX),
            ..Default::default()
        }
    }

    /// 记录一次完成
    pub fn record(&self, status: &ActionStatus, latency_us: u64) {
        self.total_actions.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);

        if status.is_success() {
            self.successful_actions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_actions.fetch_add(1, Ordering::Relaxed);
        }

        match status {
            ActionStatus::ResponseTimeout => {
                self.timeout_actions.fetch_add(1, Ordering::Relaxed);
            }
            ActionStatus::ServerShuttingDown
            | ActionStatus::TooManyRequests
            | ActionStatus::UnknownAction
            | ActionStatus::UnsupportedServerType => {
                self.rejected_actions.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        self.min_latency_us.fetch_min(latency_us, Ordering::Relaxed);
        self.max_latency_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    /// 获取统计快照
    pub fn snapshot(&self) -> ActionStatsSnapshot {
        let total = self.total_actions.load(Ordering::Relaxed);
        let successful = self.successful_actions.load(Ordering::Relaxed);
        let total_latency = self.total_latency_us.load(Ordering::Relaxed);
        let min_latency = self.min_latency_us.load(Ordering::Relaxed);

        ActionStatsSnapshot {
            total_actions: total,
            successful_actions: successful,
            failed_actions: self.failed_actions.load(Ordering::Relaxed),
            timeout_actions: self.timeout_actions.load(Ordering::Relaxed),
            rejected_actions: self.rejected_actions.load(Ordering::Relaxed),
            success_rate: if total > 0 { successful as f64 / total as f64 } else { 0.0 },
            avg_latency_us: if total > 0 { total_latency / total } else { 0 },
            min_latency_us: if min_latency == u64::MAX { 0 } else { min_latency },
            max_latency_us: self.max_latency_us.load(Ordering::Relaxed),
        }
    }

    /// 重置统计
    pub fn reset(&self) {
        self.total_actions.store(0, Ordering::Relaxed);
        self.successful_actions.store(0, Ordering::Relaxed);
        self.failed_actions.store(0, Ordering::Relaxed);
        self.timeout_actions.store(0, Ordering::Relaxed);
        self.rejected_actions.store(0, Ordering::Relaxed);
        self.total_latency_us.store(0, Ordering::Relaxed);
        self.min_latency_us.store(u64::MAX, Ordering::Relaxed);
        self.max_latency_us.store(0, Ordering::Relaxed);
    }
}

/// 统计快照
#[derive(Debug, Clone, Serialize)]
pub struct ActionStatsSnapshot {
    /// 总完成数
    pub total_actions: u64,
    /// 成功数
    pub successful_actions: u64,
    /// 失败数
    pub failed_actions: u64,
    /// 超时数
    pub timeout_actions: u64,
    /// 准入阶段被拒绝的数量
    pub rejected_actions: u64,
    /// 成功率
    pub success_rate: f64,
    /// 平均延迟（微秒）
    pub avg_latency_us: u64,
    /// 最小延迟（微秒）
    pub min_latency_us: u64,
    /// 最大延迟（微秒）
    pub max_latency_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::status::ActionError;

    #[test]
    fn test_record_and_snapshot() {
        let stats = ActionStats::new();
        stats.record(&ActionStatus::Success, 100);
        stats.record(&ActionStatus::ResponseTimeout, 300);
        stats.record(&ActionStatus::TooManyRequests, 5);
        stats.record(&ActionStatus::Failed(ActionError::message("x")), 20);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_actions, 4);
        assert_eq!(snapshot.successful_actions, 1);
        assert_eq!(snapshot.failed_actions, 3);
        assert_eq!(snapshot.timeout_actions, 1);
        assert_eq!(snapshot.rejected_actions, 1);
        assert_eq!(snapshot.min_latency_us, 5);
        assert_eq!(snapshot.max_latency_us, 300);
        assert_eq!(snapshot.avg_latency_us, 106);
        assert!((snapshot.success_rate - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_snapshot_and_reset() {
        let stats = ActionStats::new();
        assert_eq!(stats.snapshot().min_latency_us, 0);

        stats.record(&ActionStatus::Success, 10);
        stats.reset();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_actions, 0);
        assert_eq!(snapshot.min_latency_us, 0);
    }
}
