use crate::internal::downloader::error::FetchFailure;
use crate::internal::downloader::hooks::DownloadHooksContainer;
use crate::internal::downloader::progress::{ProgressAggregator, ProgressSnapshot};
use crate::internal::downloader::sequential_fetcher::{SequentialFetchParams, fetch_sequential};
use crate::internal::states::unlock_reactive::UnlockReactiveProperty;
use crate::tests::{FakeServer, TEST_URL, random_payload, temp_output};

fn aggregator(total: Option<u64>) -> ProgressAggregator {
    ProgressAggregator::new(
        1,
        total,
        DownloadHooksContainer::default(),
        UnlockReactiveProperty::new(ProgressSnapshot::default()),
    )
}

#[tokio::test]
async fn streams_whole_body_from_offset_zero() {
    let payload = random_payload(10_000);
    let server = FakeServer::new(payload.clone()).without_range_support().body_chunk(999);
    let (_dir, path) = temp_output("out.bin");
    let agg = aggregator(Some(10_000));

    let written = fetch_sequential(SequentialFetchParams {
        transport: &server,
        url: TEST_URL,
        save_path: &path,
        expected_total: Some(10_000),
        aggregator: &agg,
        read_chunk_size: 4096,
    })
    .await
    .unwrap();

    assert_eq!(written, 10_000);
    assert_eq!(std::fs::read(&path).unwrap(), payload);
    assert_eq!(agg.snapshot().downloaded_bytes, 10_000);
    assert_eq!(server.requested_ranges(), vec![None]);
}

#[tokio::test]
async fn unknown_length_accepts_any_nonempty_body() {
    let payload = random_payload(777);
    let server = FakeServer::new(payload.clone()).without_length();
    let (_dir, path) = temp_output("out.bin");
    let agg = aggregator(None);

    let written = fetch_sequential(SequentialFetchParams {
        transport: &server,
        url: TEST_URL,
        save_path: &path,
        expected_total: None,
        aggregator: &agg,
        read_chunk_size: 64,
    })
    .await
    .unwrap();

    assert_eq!(written, 777);
    assert_eq!(std::fs::read(&path).unwrap(), payload);
}

#[tokio::test]
async fn empty_body_fails_unless_zero_expected() {
    let server = FakeServer::new(Vec::<u8>::new()).without_range_support();
    let (_dir, path) = temp_output("out.bin");

    let agg = aggregator(None);
    let err = fetch_sequential(SequentialFetchParams {
        transport: &server,
        url: TEST_URL,
        save_path: &path,
        expected_total: None,
        aggregator: &agg,
        read_chunk_size: 64,
    })
    .await
    .unwrap_err();
    assert!(matches!(err, FetchFailure::EmptyBody), "{err:?}");

    let agg = aggregator(Some(0));
    let written = fetch_sequential(SequentialFetchParams {
        transport: &server,
        url: TEST_URL,
        save_path: &path,
        expected_total: Some(0),
        aggregator: &agg,
        read_chunk_size: 64,
    })
    .await
    .unwrap();
    assert_eq!(written, 0);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
}

#[tokio::test]
async fn length_mismatch_is_incomplete() {
    let server = FakeServer::new(random_payload(100)).without_range_support();
    let (_dir, path) = temp_output("out.bin");
    let agg = aggregator(Some(150));

    let err = fetch_sequential(SequentialFetchParams {
        transport: &server,
        url: TEST_URL,
        save_path: &path,
        expected_total: Some(150),
        aggregator: &agg,
        read_chunk_size: 64,
    })
    .await
    .unwrap_err();

    assert!(
        matches!(err, FetchFailure::Incomplete { expected: 150, received: 100 }),
        "{err:?}"
    );
}
