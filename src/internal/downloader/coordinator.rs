//! 下载协调器：探测 → 选择策略 → 并发分段或单连接回退 → 汇总结果。
//!
//! 状态机：`Probing → {Segmenting, Fallback} → Fetching → {Succeeded, Failed}`。
//! 终态不再迁移，协调器不会重试整个下载。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::internal::states::unlock_reactive::UnlockReactiveProperty;
use crate::internal::transport::Transport;

use super::config::{FetchConfig, UnknownSizePolicy};
use super::error::{DownloadError, FetchFailure, SegmentError};
use super::file_assembler::FileAssembler;
use super::hooks::DownloadHooksContainer;
use super::probe::{ResourceDescriptor, probe};
use super::progress::{ProgressAggregator, ProgressSnapshot};
use super::range_fetcher::{SegmentFetchContext, fetch_segment};
use super::segmenter::{Segment, split_segments};
use super::sequential_fetcher::{SequentialFetchParams, fetch_sequential};

/// 对外可观察的阶段（不带负载，可 watch）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadPhase {
    Probing,
    Segmenting,
    Fallback,
    Fetching,
    Succeeded,
    Failed,
}

impl DownloadPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadPhase::Succeeded | DownloadPhase::Failed)
    }
}

/// 实际采用的下载方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Segmented { segments: usize },
    Sequential,
}

/// 成功下载的结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadReport {
    pub url: String,
    pub save_path: PathBuf,
    /// 写入文件的总字节数
    pub total_bytes: u64,
    pub strategy: Strategy,
    pub elapsed: Duration,
}

/// 待执行的取数计划。
#[derive(Debug)]
pub enum FetchPlan {
    Segmented {
        resource: ResourceDescriptor,
        segments: Vec<Segment>,
        assembler: FileAssembler,
    },
    Sequential {
        resource: ResourceDescriptor,
    },
}

/// 协调器状态，终态携带结果或错误。
#[derive(Debug)]
pub enum DownloadState {
    Probing,
    Segmenting(ResourceDescriptor),
    Fallback(ResourceDescriptor),
    Fetching(FetchPlan),
    Succeeded(DownloadReport),
    Failed(DownloadError),
}

impl DownloadState {
    pub fn phase(&self) -> DownloadPhase {
        match self {
            DownloadState::Probing => DownloadPhase::Probing,
            DownloadState::Segmenting(_) => DownloadPhase::Segmenting,
            DownloadState::Fallback(_) => DownloadPhase::Fallback,
            DownloadState::Fetching(_) => DownloadPhase::Fetching,
            DownloadState::Succeeded(_) => DownloadPhase::Succeeded,
            DownloadState::Failed(_) => DownloadPhase::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }
}

/// 根据探测结果选择策略。
///
/// - 大小未知：按 `policy` 失败或走单连接；
/// - 支持 Range 且大小 > 0：分段；
/// - 其余：单连接。
pub fn select_strategy(
    resource: ResourceDescriptor,
    policy: UnknownSizePolicy,
) -> DownloadState {
    match resource.total_bytes {
        None => match policy {
            UnknownSizePolicy::Fail => DownloadState::Failed(DownloadError::UnknownSize),
            UnknownSizePolicy::Stream => DownloadState::Fallback(resource),
        },
        Some(total) if total > 0 && resource.supports_ranges => {
            DownloadState::Segmenting(resource)
        }
        Some(_) => DownloadState::Fallback(resource),
    }
}

/// 驱动单次下载的协调器，`run` 消耗自身。
pub(crate) struct DownloadCoordinator {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) url: String,
    pub(crate) save_path: PathBuf,
    pub(crate) config: FetchConfig,
    pub(crate) hooks: DownloadHooksContainer,
    pub(crate) cancel: CancellationToken,
    pub(crate) progress: UnlockReactiveProperty<ProgressSnapshot>,
    pub(crate) phase: UnlockReactiveProperty<DownloadPhase>,
}

impl DownloadCoordinator {
    pub(crate) async fn run(mut self) -> Result<DownloadReport, DownloadError> {
        let started_at = Instant::now();
        let mut state = DownloadState::Probing;

        loop {
            self.phase.update(state.phase());
            state = match state {
                DownloadState::Succeeded(report) => {
                    info!(
                        url = %report.url,
                        total_bytes = report.total_bytes,
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        "下载完成"
                    );
                    return Ok(report);
                }
                DownloadState::Failed(err) => {
                    warn!(url = %self.url, error = %err, "下载失败");
                    return Err(err);
                }
                DownloadState::Probing => self.probe().await,
                DownloadState::Segmenting(resource) => self.plan_segments(resource).await,
                DownloadState::Fallback(resource) => {
                    DownloadState::Fetching(FetchPlan::Sequential { resource })
                }
                DownloadState::Fetching(plan) => self.fetch(plan, started_at).await,
            };
        }
    }

    async fn probe(&mut self) -> DownloadState {
        if self.cancel.is_cancelled() {
            return DownloadState::Failed(DownloadError::Cancelled);
        }
        if let Err(abort) = self.hooks.run_before_start().await {
            return DownloadState::Failed(abort.into());
        }

        let probed = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return DownloadState::Failed(DownloadError::Cancelled),
            r = probe(self.transport.as_ref(), &self.url) => r,
        };

        match probed {
            Ok(resource) => {
                let next = select_strategy(resource, self.config.unknown_size_policy);
                info!(url = %self.url, next = ?next.phase(), "已选择下载策略");
                next
            }
            Err(e) => DownloadState::Failed(e.into()),
        }
    }

    async fn plan_segments(&mut self, resource: ResourceDescriptor) -> DownloadState {
        let Some(total) = resource.total_bytes else {
            return DownloadState::Failed(DownloadError::UnknownSize);
        };
        // 预分配会截断已有文件，取消后不得再碰目标路径
        if self.cancel.is_cancelled() {
            return DownloadState::Failed(DownloadError::Cancelled);
        }

        let segments = split_segments(total, self.config.segment_count);
        match FileAssembler::preallocate(&self.save_path, total).await {
            Ok(assembler) => DownloadState::Fetching(FetchPlan::Segmented {
                resource,
                segments,
                assembler,
            }),
            Err(e) => DownloadState::Failed(e),
        }
    }

    async fn fetch(&mut self, plan: FetchPlan, started_at: Instant) -> DownloadState {
        if self.cancel.is_cancelled() {
            return DownloadState::Failed(DownloadError::Cancelled);
        }

        let hooks = std::mem::take(&mut self.hooks);
        let result = match plan {
            FetchPlan::Segmented {
                resource,
                segments,
                assembler,
            } => self.fetch_segmented(resource, segments, assembler, hooks).await,
            FetchPlan::Sequential { resource } => self.fetch_sequential(resource, hooks).await,
        };

        match result {
            Ok((total_bytes, strategy, mut hooks)) => {
                hooks.run_after_complete().await;
                DownloadState::Succeeded(DownloadReport {
                    url: self.url.clone(),
                    save_path: self.save_path.clone(),
                    total_bytes,
                    strategy,
                    elapsed: started_at.elapsed(),
                })
            }
            Err(e) => DownloadState::Failed(e),
        }
    }

    /// 每个分段一个任务，全部结束后才汇总；某段失败不会取消其他分段。
    /// 分段任务只监听子令牌，外部令牌不受本函数影响。
    async fn fetch_segmented(
        &self,
        resource: ResourceDescriptor,
        segments: Vec<Segment>,
        assembler: FileAssembler,
        hooks: DownloadHooksContainer,
    ) -> Result<(u64, Strategy, DownloadHooksContainer), DownloadError> {
        let total = assembler.total_len();
        let aggregator = Arc::new(ProgressAggregator::new(
            segments.len(),
            Some(total),
            hooks,
            self.progress.clone(),
        ));
        let ctx = SegmentFetchContext {
            transport: Arc::clone(&self.transport),
            url: Arc::from(resource.url.as_str()),
            assembler: Arc::new(assembler),
            aggregator: Arc::clone(&aggregator),
            read_chunk_size: self.config.read_chunk_size,
        };

        info!(url = %resource.url, total, segments = segments.len(), "开始分段下载");

        // 调用方丢弃 send() 的 future 时，守卫随之析构并取消全部分段任务
        let segment_cancel = self.cancel.child_token();
        let _abandon = segment_cancel.clone().drop_guard();

        let tasks = segments.iter().map(|&segment| {
            let ctx = ctx.clone();
            let cancel = segment_cancel.clone();
            let handle = tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(SegmentError {
                        index: segment.index,
                        range: segment.range(),
                        source: FetchFailure::Cancelled,
                    }),
                    r = fetch_segment(&ctx, segment) => r,
                }
            });
            async move { (segment, handle.await) }
        });
        let results = join_all(tasks).await;
        drop(ctx);

        let mut failures = Vec::new();
        for (segment, joined) in results {
            match joined {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!(index = e.index, error = %e.source, "分段下载失败");
                    failures.push(e);
                }
                Err(join_err) => {
                    warn!(index = segment.index, error = %join_err, "分段任务异常退出");
                    failures.push(SegmentError {
                        index: segment.index,
                        range: segment.range(),
                        source: FetchFailure::Panicked(join_err.to_string()),
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(DownloadError::Segments(failures));
        }

        let hooks = Arc::into_inner(aggregator)
            .map(ProgressAggregator::into_hooks)
            .unwrap_or_default();
        Ok((total, Strategy::Segmented { segments: segments.len() }, hooks))
    }

    async fn fetch_sequential(
        &self,
        resource: ResourceDescriptor,
        hooks: DownloadHooksContainer,
    ) -> Result<(u64, Strategy, DownloadHooksContainer), DownloadError> {
        info!(url = %resource.url, total = ?resource.total_bytes, "开始单连接下载");

        let aggregator =
            ProgressAggregator::new(1, resource.total_bytes, hooks, self.progress.clone());

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FetchFailure::Cancelled),
            r = fetch_sequential(SequentialFetchParams {
                transport: self.transport.as_ref(),
                url: &resource.url,
                save_path: &self.save_path,
                expected_total: resource.total_bytes,
                aggregator: &aggregator,
                read_chunk_size: self.config.read_chunk_size,
            }) => r,
        };

        match fetched {
            Ok(written) => Ok((written, Strategy::Sequential, aggregator.into_hooks())),
            Err(e) => Err(DownloadError::Fallback(e)),
        }
    }
}
