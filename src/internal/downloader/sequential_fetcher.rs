//! 单连接回退下载：整文件 GET，从偏移 0 顺序写入并更新进度。

use std::path::Path;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use crate::internal::transport::Transport;

use super::error::FetchFailure;
use super::progress::ProgressAggregator;
use super::range_fetcher::bounded_pieces;

/// 单连接下载时的参数（形参超过 3 个，用 struct 承载）。
pub(crate) struct SequentialFetchParams<'a> {
    pub transport: &'a dyn Transport,
    pub url: &'a str,
    pub save_path: &'a Path,
    /// 已知大小时用于校验完整性
    pub expected_total: Option<u64>,
    pub aggregator: &'a ProgressAggregator,
    pub read_chunk_size: usize,
}

/// 整文件下载，返回写入的字节数。只尝试一次，不重试。
#[instrument(name = "sequential", skip(params), fields(url = params.url))]
pub(crate) async fn fetch_sequential(
    params: SequentialFetchParams<'_>,
) -> Result<u64, FetchFailure> {
    let resp = params.transport.get(params.url, None).await?;
    if !resp.status.is_success() {
        return Err(FetchFailure::UnexpectedStatus(resp.status));
    }

    let file = File::create(params.save_path)
        .await
        .map_err(FetchFailure::OpenFile)?;
    let mut writer = BufWriter::new(file);
    let mut body = resp.body;
    let mut written: u64 = 0;

    while let Some(chunk_result) = body.next().await {
        let chunk = chunk_result?;
        for piece in bounded_pieces(chunk, params.read_chunk_size) {
            writer
                .write_all(&piece)
                .await
                .map_err(FetchFailure::WriteFile)?;
            written += piece.len() as u64;
            params.aggregator.record(0, piece.len() as u64);
        }
    }

    writer.flush().await.map_err(FetchFailure::WriteFile)?;

    // 已知大小为 0 的资源允许空响应体
    if written == 0 && params.expected_total != Some(0) {
        return Err(FetchFailure::EmptyBody);
    }
    if let Some(expected) = params.expected_total {
        if written != expected {
            return Err(FetchFailure::Incomplete {
                expected,
                received: written,
            });
        }
    }

    debug!(written, "单连接下载完成");
    Ok(written)
}
