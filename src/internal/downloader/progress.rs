//! 进度聚合：各分段已下载字节数 → 总进度，并按时间窗口估算速度。
//!
//! 计数更新、速度采样与钩子通知都在同一个临界区内完成，
//! 所以任何观察者看到的 `downloaded_bytes` 都单调不减。写文件不在这个临界区内。

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::internal::states::unlock_reactive::UnlockReactiveProperty;

use super::hooks::DownloadHooksContainer;

/// 两次速度采样之间的最小间隔
pub const SPEED_SAMPLE_INTERVAL: Duration = Duration::from_millis(1000);

/// 进度快照：每写入一块数据重新计算一次，不持久化。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// 所有分段已写入字节数之和
    pub downloaded_bytes: u64,
    /// 文件总大小，未知时为 `None`
    pub total_bytes: Option<u64>,
    /// 最近一次采样得到的速度（字节/秒）
    pub bytes_per_second: u64,
}

impl ProgressSnapshot {
    /// 进度百分比（0～100）；总大小为 0 或未知时返回 `f64::NAN`。
    pub fn pct(&self) -> f64 {
        self.total_bytes
            .filter(|&t| t > 0)
            .map(|t| (self.downloaded_bytes as f64 / t as f64) * 100.0)
            .unwrap_or(f64::NAN)
    }
}

/// 限频的速度采样器：距上次采样不足 1 秒时沿用上次结果。
#[derive(Debug, Clone)]
pub(crate) struct SpeedSampler {
    last_sample_at: Instant,
    last_sample_total: u64,
    bytes_per_second: u64,
}

impl SpeedSampler {
    pub(crate) fn new(started_at: Instant) -> Self {
        Self {
            last_sample_at: started_at,
            last_sample_total: 0,
            bytes_per_second: 0,
        }
    }

    pub(crate) fn sample(&mut self, current_total: u64, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.last_sample_at);
        if elapsed >= SPEED_SAMPLE_INTERVAL {
            let elapsed_ms = elapsed.as_millis() as u64;
            let delta = current_total.saturating_sub(self.last_sample_total);
            self.bytes_per_second = delta.saturating_mul(1000) / elapsed_ms;
            self.last_sample_at = now;
            self.last_sample_total = current_total;
        }
        self.bytes_per_second
    }
}

struct AggregatorState {
    per_segment: Vec<u64>,
    sampler: SpeedSampler,
    hooks: DownloadHooksContainer,
}

/// 单次下载的进度聚合器，由所有分段任务共享（`Arc`）。
pub struct ProgressAggregator {
    total_bytes: Option<u64>,
    state: Mutex<AggregatorState>,
    progress: UnlockReactiveProperty<ProgressSnapshot>,
}

impl ProgressAggregator {
    pub fn new(
        segment_count: usize,
        total_bytes: Option<u64>,
        hooks: DownloadHooksContainer,
        progress: UnlockReactiveProperty<ProgressSnapshot>,
    ) -> Self {
        Self::started_at(segment_count, total_bytes, hooks, progress, Instant::now())
    }

    pub(crate) fn started_at(
        segment_count: usize,
        total_bytes: Option<u64>,
        hooks: DownloadHooksContainer,
        progress: UnlockReactiveProperty<ProgressSnapshot>,
        started_at: Instant,
    ) -> Self {
        progress.update(ProgressSnapshot {
            downloaded_bytes: 0,
            total_bytes,
            bytes_per_second: 0,
        });

        Self {
            total_bytes,
            state: Mutex::new(AggregatorState {
                per_segment: vec![0; segment_count.max(1)],
                sampler: SpeedSampler::new(started_at),
                hooks,
            }),
            progress,
        }
    }

    /// 记录分段 `index` 新写入的 `len` 字节，通知钩子并返回最新快照。
    pub fn record(&self, index: usize, len: u64) -> ProgressSnapshot {
        self.record_at(index, len, Instant::now())
    }

    pub(crate) fn record_at(
        &self,
        index: usize,
        len: u64,
        now: Instant,
    ) -> ProgressSnapshot {
        let mut state = self.state.lock();

        if let Some(counter) = state.per_segment.get_mut(index) {
            *counter += len;
        }
        let downloaded_bytes: u64 = state.per_segment.iter().sum();
        let bytes_per_second = state.sampler.sample(downloaded_bytes, now);

        let snapshot = ProgressSnapshot {
            downloaded_bytes,
            total_bytes: self.total_bytes,
            bytes_per_second,
        };

        state.hooks.run_on_progress(&snapshot);
        self.progress.update(snapshot);

        snapshot
    }

    /// 当前快照（不触发钩子）。
    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock();
        ProgressSnapshot {
            downloaded_bytes: state.per_segment.iter().sum(),
            total_bytes: self.total_bytes,
            bytes_per_second: state.sampler.bytes_per_second,
        }
    }

    /// 指定分段已写入的字节数。
    pub fn segment_bytes(&self, index: usize) -> u64 {
        self.state
            .lock()
            .per_segment
            .get(index)
            .copied()
            .unwrap_or(0)
    }

    /// 结束聚合，取回钩子容器以执行 `after_complete`。
    pub fn into_hooks(self) -> DownloadHooksContainer {
        self.state.into_inner().hooks
    }
}

impl std::fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressAggregator")
            .field("total_bytes", &self.total_bytes)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
