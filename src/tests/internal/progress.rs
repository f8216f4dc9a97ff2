//! 进度聚合测试：计数汇总、速度采样窗口、并发下的单调性、响应式属性与钩子通知。

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::internal::downloader::hooks::{DownloadHooksContainer, OnProgressHookAdapter};
use crate::internal::downloader::progress::{ProgressAggregator, ProgressSnapshot, SpeedSampler};
use crate::internal::states::unlock_reactive::UnlockReactiveProperty;

fn aggregator(segments: usize, total: Option<u64>) -> ProgressAggregator {
    ProgressAggregator::new(
        segments,
        total,
        DownloadHooksContainer::default(),
        UnlockReactiveProperty::new(ProgressSnapshot::default()),
    )
}

#[test]
fn sums_across_segments() {
    let agg = aggregator(3, Some(300));
    agg.record(0, 10);
    agg.record(2, 25);
    let snap = agg.record(1, 5);

    assert_eq!(snap.downloaded_bytes, 40);
    assert_eq!(snap.total_bytes, Some(300));
    assert_eq!(agg.segment_bytes(0), 10);
    assert_eq!(agg.segment_bytes(1), 5);
    assert_eq!(agg.segment_bytes(2), 25);
    assert_eq!(agg.segment_bytes(9), 0);
    assert_eq!(agg.snapshot().downloaded_bytes, 40);
}

#[test]
fn pct_handles_unknown_and_zero_total() {
    let snap = ProgressSnapshot {
        downloaded_bytes: 50,
        total_bytes: Some(200),
        bytes_per_second: 0,
    };
    assert!((snap.pct() - 25.0).abs() < f64::EPSILON);

    let unknown = ProgressSnapshot {
        total_bytes: None,
        ..snap
    };
    assert!(unknown.pct().is_nan());

    let zero = ProgressSnapshot {
        downloaded_bytes: 0,
        total_bytes: Some(0),
        bytes_per_second: 0,
    };
    assert!(zero.pct().is_nan());
}

#[test]
fn speed_is_held_until_window_elapses() {
    let t0 = Instant::now();
    let mut sampler = SpeedSampler::new(t0);

    assert_eq!(sampler.sample(500, t0 + Duration::from_millis(400)), 0);
    assert_eq!(sampler.sample(1_000, t0 + Duration::from_millis(1_000)), 1_000);
    // 窗口内沿用上次结果
    assert_eq!(sampler.sample(9_000, t0 + Duration::from_millis(1_500)), 1_000);
    // (9000 - 1000) 字节 / 2 秒
    assert_eq!(sampler.sample(9_000, t0 + Duration::from_millis(3_000)), 4_000);
}

#[test]
fn aggregator_samples_speed_from_start_time() {
    let t0 = Instant::now();
    let agg = ProgressAggregator::started_at(
        2,
        Some(10_000),
        DownloadHooksContainer::default(),
        UnlockReactiveProperty::new(ProgressSnapshot::default()),
        t0,
    );

    let s1 = agg.record_at(0, 2_000, t0 + Duration::from_millis(200));
    assert_eq!(s1.bytes_per_second, 0);

    let s2 = agg.record_at(1, 2_000, t0 + Duration::from_millis(2_000));
    assert_eq!(s2.downloaded_bytes, 4_000);
    assert_eq!(s2.bytes_per_second, 2_000);
}

#[test]
fn publishes_initial_and_latest_snapshot() {
    let prop = UnlockReactiveProperty::new(ProgressSnapshot {
        downloaded_bytes: 999,
        total_bytes: None,
        bytes_per_second: 0,
    });
    let agg = ProgressAggregator::new(1, Some(64), DownloadHooksContainer::default(), prop.clone());

    let initial = prop.get_current().unwrap();
    assert_eq!(initial.downloaded_bytes, 0);
    assert_eq!(initial.total_bytes, Some(64));

    agg.record(0, 16);
    assert_eq!(prop.get_current().unwrap().downloaded_bytes, 16);
}

/// 多个分段任务并发上报时，钩子观察到的 `downloaded_bytes` 单调不减，最终等于总量。
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_are_monotonic() {
    const SEGMENTS: usize = 8;
    const CHUNKS: u64 = 500;
    const CHUNK: u64 = 7;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut hooks = DownloadHooksContainer::default();
    {
        let seen = Arc::clone(&seen);
        hooks.add(OnProgressHookAdapter(move |p: &ProgressSnapshot| {
            seen.lock().push(p.downloaded_bytes);
        }));
    }

    let total = SEGMENTS as u64 * CHUNKS * CHUNK;
    let agg = Arc::new(ProgressAggregator::new(
        SEGMENTS,
        Some(total),
        hooks,
        UnlockReactiveProperty::new(ProgressSnapshot::default()),
    ));

    let handles: Vec<_> = (0..SEGMENTS)
        .map(|index| {
            let agg = Arc::clone(&agg);
            tokio::spawn(async move {
                for _ in 0..CHUNKS {
                    agg.record(index, CHUNK);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for h in handles {
        h.await.unwrap();
    }

    let seen = seen.lock();
    assert_eq!(seen.len() as u64, SEGMENTS as u64 * CHUNKS);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "进度出现回退");
    assert_eq!(seen.last().copied(), Some(total));
}

#[test]
fn into_hooks_returns_registered_hooks() {
    let mut hooks = DownloadHooksContainer::default();
    hooks.add(OnProgressHookAdapter(|_: &ProgressSnapshot| {}));
    let agg = ProgressAggregator::new(1, None, hooks, UnlockReactiveProperty::new(ProgressSnapshot::default()));

    assert_eq!(agg.into_hooks().len(), 1);
}
