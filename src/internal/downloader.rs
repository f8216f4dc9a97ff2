//! 分段并发下载引擎
//!
//! 把一个远程资源按字节范围切成若干分段并发获取，按偏移写回同一个输出文件，
//! 同时汇总进度与速度；服务器不支持 Range 时回退为单连接流式下载。
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! # use segment_fetch::downloader::SegmentedDownloader;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let report = SegmentedDownloader::new("https://example.com/large.zip")
//!     .save_to("large.zip")
//!     .segment_count(6)
//!     .with_on_progress_hook(|p| println!("{} / {:?}", p.downloaded_bytes, p.total_bytes))
//!     .send()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## 下载方式选择
//!
//! - 探测（HEAD）得到大小 > 0 且 `Accept-Ranges: bytes`：分段下载，文件先预分配到完整大小；
//! - 大小已知但不支持 Range：单连接下载；
//! - 大小未知：默认直接失败，可通过 [`UnknownSizePolicy::Stream`] 改为单连接下载。
//!
//! 任一分段失败则整体失败，但其他分段仍会跑完；不做重试。

pub mod config;
pub mod coordinator;
pub mod error;
pub mod file_assembler;
pub mod hooks;
pub mod probe;
pub mod progress;
pub(crate) mod range_fetcher;
pub mod segmented_downloader;
pub mod segmenter;
pub(crate) mod sequential_fetcher;

pub use config::{FetchConfig, UnknownSizePolicy};
pub use coordinator::{
    DownloadPhase, DownloadReport, DownloadState, FetchPlan, Strategy, select_strategy,
};
pub use error::{DownloadError, FetchFailure, ProbeError, SegmentError};
pub use file_assembler::{FileAssembler, SegmentWriter};
pub use hooks::{DownloadHook, DownloadHooksContainer, HookAbort};
pub use probe::{ResourceDescriptor, probe};
pub use progress::{ProgressAggregator, ProgressSnapshot};
pub use segmented_downloader::{SegmentedDownloader, start_download};
pub use segmenter::{Segment, split_segments};
