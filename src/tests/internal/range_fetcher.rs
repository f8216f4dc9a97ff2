//! 单段 Range 下载测试：正常写入、各类协议违规、Content-Range 解析与分块。

use std::sync::Arc;

use bytes::Bytes;
use reqwest::StatusCode;

use crate::internal::downloader::error::FetchFailure;
use crate::internal::downloader::file_assembler::FileAssembler;
use crate::internal::downloader::hooks::DownloadHooksContainer;
use crate::internal::downloader::progress::{ProgressAggregator, ProgressSnapshot};
use crate::internal::downloader::range_fetcher::{
    SegmentFetchContext, bounded_pieces, fetch_segment, parse_content_range,
};
use crate::internal::downloader::segmenter::{Segment, split_segments};
use crate::internal::states::unlock_reactive::UnlockReactiveProperty;
use crate::tests::{FakeServer, RangeFault, TEST_URL, patterned_payload, temp_output};

struct Fixture {
    _dir: tempfile::TempDir,
    path: std::path::PathBuf,
    ctx: SegmentFetchContext,
    segments: Vec<Segment>,
}

async fn fixture(server: FakeServer, segment_count: usize, read_chunk_size: usize) -> Fixture {
    let total = server.payload().len() as u64;
    let (dir, path) = temp_output("out.bin");
    let assembler = FileAssembler::preallocate(&path, total).await.unwrap();
    let segments = split_segments(total, segment_count);
    let aggregator = ProgressAggregator::new(
        segments.len(),
        Some(total),
        DownloadHooksContainer::default(),
        UnlockReactiveProperty::new(ProgressSnapshot::default()),
    );

    Fixture {
        _dir: dir,
        path,
        ctx: SegmentFetchContext {
            transport: Arc::new(server),
            url: Arc::from(TEST_URL),
            assembler: Arc::new(assembler),
            aggregator: Arc::new(aggregator),
            read_chunk_size,
        },
        segments,
    }
}

#[tokio::test]
async fn writes_segment_bytes_at_offset() {
    let payload = patterned_payload(300);
    let f = fixture(FakeServer::new(payload.clone()), 3, 64 * 1024).await;

    let written = fetch_segment(&f.ctx, f.segments[1]).await.unwrap();
    assert_eq!(written, 100);
    assert_eq!(f.ctx.aggregator.segment_bytes(1), 100);

    let on_disk = std::fs::read(&f.path).unwrap();
    assert_eq!(&on_disk[100..200], &payload[100..200]);
    assert!(on_disk[..100].iter().all(|&b| b == 0), "其他分段区域不应被写入");
}

#[tokio::test]
async fn status_200_fails_segment() {
    let server = FakeServer::new(patterned_payload(300)).fault_at(0, RangeFault::Status(StatusCode::OK));
    let f = fixture(server, 3, 1024).await;

    let err = fetch_segment(&f.ctx, f.segments[0]).await.unwrap_err();
    assert_eq!(err.index, 0);
    assert_eq!((err.range.start, err.range.end_inclusive), (0, 99));
    assert!(matches!(err.source, FetchFailure::UnexpectedStatus(StatusCode::OK)), "{err:?}");
    assert_eq!(f.ctx.aggregator.segment_bytes(0), 0);
}

#[tokio::test]
async fn empty_body_fails_segment() {
    let server = FakeServer::new(patterned_payload(300)).fault_at(200, RangeFault::EmptyBody);
    let f = fixture(server, 3, 1024).await;

    let err = fetch_segment(&f.ctx, f.segments[2]).await.unwrap_err();
    assert!(matches!(err.source, FetchFailure::EmptyBody), "{err:?}");
}

#[tokio::test]
async fn short_body_is_incomplete() {
    let server = FakeServer::new(patterned_payload(300)).fault_at(100, RangeFault::Truncate(40));
    let f = fixture(server, 3, 1024).await;

    let err = fetch_segment(&f.ctx, f.segments[1]).await.unwrap_err();
    assert!(
        matches!(err.source, FetchFailure::Incomplete { expected: 100, received: 40 }),
        "{err:?}"
    );
}

#[tokio::test]
async fn stream_error_fails_segment() {
    let server = FakeServer::new(patterned_payload(300)).fault_at(0, RangeFault::StreamError);
    let f = fixture(server, 3, 1024).await;

    let err = fetch_segment(&f.ctx, f.segments[0]).await.unwrap_err();
    assert!(matches!(err.source, FetchFailure::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn mismatched_content_range_fails_segment() {
    let server = FakeServer::new(patterned_payload(300)).fault_at(100, RangeFault::WrongContentRange);
    let f = fixture(server, 3, 1024).await;

    let err = fetch_segment(&f.ctx, f.segments[1]).await.unwrap_err();
    assert!(matches!(err.source, FetchFailure::RangeMismatch(_)), "{err:?}");
}

#[tokio::test]
async fn extra_bytes_overflow_segment() {
    let payload = patterned_payload(300);
    let server = FakeServer::new(payload.clone()).fault_at(0, RangeFault::Overflow);
    let f = fixture(server, 3, 1024).await;

    let err = fetch_segment(&f.ctx, f.segments[0]).await.unwrap_err();
    assert!(matches!(err.source, FetchFailure::Overflow(_)), "{err:?}");

    let on_disk = std::fs::read(&f.path).unwrap();
    assert!(on_disk[100..].iter().all(|&b| b == 0), "溢出字节不应写入相邻分段");
}

/// 传输层的大块被切成不超过 read_chunk_size 的小块，每块上报一次进度。
#[tokio::test]
async fn large_chunks_are_split_before_reporting() {
    use crate::internal::downloader::hooks::OnProgressHookAdapter;

    let reports = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut hooks = DownloadHooksContainer::default();
    {
        let reports = Arc::clone(&reports);
        hooks.add(OnProgressHookAdapter(move |p: &ProgressSnapshot| {
            reports.lock().push(p.downloaded_bytes);
        }));
    }

    let server = FakeServer::new(patterned_payload(100)).body_chunk(100);
    let mut f = fixture(server, 1, 30).await;
    f.ctx.aggregator = Arc::new(ProgressAggregator::new(
        1,
        Some(100),
        hooks,
        UnlockReactiveProperty::new(ProgressSnapshot::default()),
    ));

    fetch_segment(&f.ctx, f.segments[0]).await.unwrap();
    assert_eq!(*reports.lock(), vec![30, 60, 90, 100]);
}

#[test]
fn bounded_pieces_respects_max() {
    let pieces: Vec<Bytes> = bounded_pieces(Bytes::from(vec![1u8; 10]), 4).collect();
    let lens: Vec<usize> = pieces.iter().map(Bytes::len).collect();
    assert_eq!(lens, vec![4, 4, 2]);

    assert_eq!(bounded_pieces(Bytes::new(), 4).count(), 0);
    // 0 视为 1
    assert_eq!(bounded_pieces(Bytes::from_static(b"abc"), 0).count(), 3);
}

#[test]
fn parses_content_range() {
    assert_eq!(parse_content_range("bytes 0-99/600"), Some((0, 99)));
    assert_eq!(parse_content_range("bytes 500-604/*"), Some((500, 604)));
    assert_eq!(parse_content_range("  bytes 7-7/8 "), Some((7, 7)));
    assert_eq!(parse_content_range("bytes */600"), None);
    assert_eq!(parse_content_range("bytes 9-3/600"), None);
    assert_eq!(parse_content_range("items 0-9/10"), None);
    assert_eq!(parse_content_range("bytes 0-9"), None);
}
