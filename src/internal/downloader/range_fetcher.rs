//! 单段 Range 下载：请求、校验、按块写入指定偏移、更新进度。

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, HeaderMap};
use tracing::{debug, instrument};

use crate::internal::transport::Transport;

use super::error::{FetchFailure, SegmentError};
use super::file_assembler::FileAssembler;
use super::progress::ProgressAggregator;
use super::segmenter::Segment;

/// 各分段任务共享的上下文。
#[derive(Clone)]
pub(crate) struct SegmentFetchContext {
    pub transport: Arc<dyn Transport>,
    pub url: Arc<str>,
    pub assembler: Arc<FileAssembler>,
    pub aggregator: Arc<ProgressAggregator>,
    pub read_chunk_size: usize,
}

/// 下载一个分段，成功时返回写入的字节数（恰好等于分段长度）。
///
/// 只尝试一次，不重试。
#[instrument(
    name = "segment",
    skip(ctx, segment),
    fields(index = segment.index, range = %segment.range())
)]
pub(crate) async fn fetch_segment(
    ctx: &SegmentFetchContext,
    segment: Segment,
) -> Result<u64, SegmentError> {
    debug!("开始下载分段");
    let written = fetch_range(ctx, &segment)
        .await
        .map_err(|source| SegmentError {
            index: segment.index,
            range: segment.range(),
            source,
        })?;
    debug!(written, "分段下载完成");
    Ok(written)
}

async fn fetch_range(
    ctx: &SegmentFetchContext,
    segment: &Segment,
) -> Result<u64, FetchFailure> {
    let resp = ctx.transport.get(&ctx.url, Some(segment.range())).await?;

    if resp.status != StatusCode::PARTIAL_CONTENT {
        return Err(FetchFailure::UnexpectedStatus(resp.status));
    }
    check_content_range(&resp.headers, segment)?;

    let mut writer = ctx.assembler.open_segment(segment).await?;
    let mut body = resp.body;

    while let Some(chunk_result) = body.next().await {
        let chunk = chunk_result?;
        for piece in bounded_pieces(chunk, ctx.read_chunk_size) {
            writer.write_next(&piece).await?;
            ctx.aggregator.record(segment.index, piece.len() as u64);
        }
    }

    let written = writer.written();
    if written == 0 {
        return Err(FetchFailure::EmptyBody);
    }
    if writer.position() != segment.end_exclusive() {
        return Err(FetchFailure::Incomplete {
            expected: segment.len(),
            received: written,
        });
    }

    writer.finish().await?;
    Ok(written)
}

/// 把传输层产出的块切成不超过 `max` 字节的小块，`Bytes::split_to` 不拷贝数据。
pub(crate) fn bounded_pieces(
    mut chunk: Bytes,
    max: usize,
) -> impl Iterator<Item = Bytes> {
    let max = max.max(1);
    std::iter::from_fn(move || {
        if chunk.is_empty() {
            None
        } else {
            let n = max.min(chunk.len());
            Some(chunk.split_to(n))
        }
    })
}

/// 校验 `Content-Range: bytes start-end/total`；缺失时不校验。
fn check_content_range(
    headers: &HeaderMap,
    segment: &Segment,
) -> Result<(), FetchFailure> {
    let Some(value) = headers.get(CONTENT_RANGE) else {
        return Ok(());
    };
    let raw = value
        .to_str()
        .map_err(|_| FetchFailure::RangeMismatch("<non-ascii>".to_string()))?;

    match parse_content_range(raw) {
        Some((start, end)) if start == segment.start && end == segment.end_inclusive => Ok(()),
        _ => Err(FetchFailure::RangeMismatch(raw.to_string())),
    }
}

/// 解析出 `(start, end_inclusive)`，总长度部分忽略（可能是 `*`）。
pub(crate) fn parse_content_range(raw: &str) -> Option<(u64, u64)> {
    let spec = raw.trim().strip_prefix("bytes")?.trim_start();
    let (range, _total) = spec.split_once('/')?;
    let (start, end) = range.split_once('-')?;
    let start = start.trim().parse::<u64>().ok()?;
    let end = end.trim().parse::<u64>().ok()?;
    (start <= end).then_some((start, end))
}
