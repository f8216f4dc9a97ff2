//! 下载相关错误类型。

use reqwest::StatusCode;
use thiserror::Error;

use crate::internal::transport::{ByteRange, TransportError};

use super::hooks::HookAbort;

/// 探测请求失败。对整个下载是终态，不重试。
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("探测请求返回非成功状态: {0}")]
    Status(StatusCode),

    #[error("探测请求失败: {0}")]
    Transport(#[from] TransportError),
}

/// 一次取数（分段或单连接回退）失败的原因。
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("响应状态不符合预期: {0}")]
    UnexpectedStatus(StatusCode),

    #[error("响应体为空")]
    EmptyBody,

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("数据不完整: 期望 {expected} 字节，实际收到 {received} 字节")]
    Incomplete { expected: u64, received: u64 },

    #[error("服务器返回的数据超出请求范围 {0}")]
    Overflow(ByteRange),

    #[error("Content-Range 与请求范围不一致: {0}")]
    RangeMismatch(String),

    #[error("打开文件失败: {0}")]
    OpenFile(std::io::Error),

    #[error("写入文件失败: {0}")]
    WriteFile(std::io::Error),

    #[error("下载被取消")]
    Cancelled,

    #[error("分段任务异常退出: {0}")]
    Panicked(String),
}

/// 单个分段失败：分段序号、范围与原因。
#[derive(Debug, Error)]
#[error("分段 {index} {range} 下载失败: {source}")]
pub struct SegmentError {
    pub index: usize,
    pub range: ByteRange,
    #[source]
    pub source: FetchFailure,
}

/// 下载的终态错误。
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("{} 个分段下载失败，首个: {}", .0.len(), first_segment_error(.0))]
    Segments(Vec<SegmentError>),

    #[error("单连接下载失败: {0}")]
    Fallback(#[source] FetchFailure),

    #[error("无法获知文件大小")]
    UnknownSize,

    #[error("分段数必须大于 0")]
    InvalidSegmentCount,

    #[error("未设置保存路径")]
    NoDestination,

    #[error("创建文件失败: {0}")]
    CreateFile(std::io::Error),

    #[error("预分配文件空间失败: {0}")]
    PreallocateFile(std::io::Error),

    #[error("{0}")]
    HookAbort(#[from] HookAbort),

    #[error("下载被取消")]
    Cancelled,

    #[error("创建 HTTP 客户端失败: {0}")]
    Transport(#[from] TransportError),
}

fn first_segment_error(errors: &[SegmentError]) -> String {
    errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_default()
}

impl DownloadError {
    /// 是否由取消引起（包括所有失败分段都是被取消的情况）。
    pub fn is_cancelled(&self) -> bool {
        match self {
            DownloadError::Cancelled => true,
            DownloadError::Fallback(FetchFailure::Cancelled) => true,
            DownloadError::Segments(errs) => {
                !errs.is_empty()
                    && errs
                        .iter()
                        .all(|e| matches!(e.source, FetchFailure::Cancelled))
            }
            _ => false,
        }
    }
}
