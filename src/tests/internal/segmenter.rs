//! 分段规划测试：具体场景 + 划分正确性属性测试。

use proptest::prelude::*;

use crate::internal::downloader::segmenter::{Segment, split_segments};
use crate::internal::transport::ByteRange;

fn bounds(segments: &[Segment]) -> Vec<(u64, u64)> {
    segments.iter().map(|s| (s.start, s.end_inclusive)).collect()
}

#[test]
fn even_split_600_into_6() {
    let segments = split_segments(600, 6);
    assert_eq!(
        bounds(&segments),
        vec![(0, 99), (100, 199), (200, 299), (300, 399), (400, 499), (500, 599)]
    );
    assert!(segments.iter().all(|s| s.len() == 100));
}

#[test]
fn last_segment_absorbs_remainder() {
    let segments = split_segments(605, 6);
    assert_eq!(segments.len(), 6);
    assert_eq!(bounds(&segments[..5]), vec![(0, 99), (100, 199), (200, 299), (300, 399), (400, 499)]);
    assert_eq!((segments[5].start, segments[5].end_inclusive), (500, 604));
    assert_eq!(segments[5].len(), 105);
}

#[test]
fn single_segment_covers_everything() {
    let segments = split_segments(1234, 1);
    assert_eq!(bounds(&segments), vec![(0, 1233)]);
}

#[test]
fn more_segments_than_bytes_is_clamped() {
    let segments = split_segments(3, 6);
    assert_eq!(bounds(&segments), vec![(0, 0), (1, 1), (2, 2)]);
}

#[test]
fn degenerate_inputs_yield_nothing() {
    assert!(split_segments(0, 6).is_empty());
    assert!(split_segments(100, 0).is_empty());
}

#[test]
fn indices_follow_offsets() {
    let segments = split_segments(1000, 7);
    for (i, s) in segments.iter().enumerate() {
        assert_eq!(s.index, i);
        assert_eq!(s.range().len(), s.len());
    }
}

#[test]
fn planned_segments_are_never_empty() {
    // 划分出的分段至少 1 字节，len 与 is_empty 一致
    for s in split_segments(3, 6).iter().chain(split_segments(605, 6).iter()) {
        assert!(!s.is_empty());
        assert!(!s.range().is_empty());
        assert!(s.len() >= 1);
    }
}

#[test]
fn inverted_range_is_empty() {
    // 上界小于下界：视为空范围，长度为 0 而不是溢出
    let range = ByteRange::new(5, 4);
    assert!(range.is_empty());
    assert_eq!(range.len(), 0);

    let seg = Segment { index: 0, start: 10, end_inclusive: 9 };
    assert!(seg.is_empty());
    assert_eq!(seg.len(), 0);
    assert!(!ByteRange::new(7, 7).is_empty());
    assert_eq!(ByteRange::new(7, 7).len(), 1);
}

proptest! {
    /// 对任意 total > 0、count >= 1：连续、不重叠，并集恰为 [0, total)。
    #[test]
    fn partition_is_contiguous_and_exact(total in 1u64..5_000_000, count in 1usize..64) {
        let segments = split_segments(total, count);

        prop_assert!(!segments.is_empty());
        prop_assert!(segments.len() <= count);
        prop_assert_eq!(segments[0].start, 0);
        prop_assert_eq!(segments[segments.len() - 1].end_exclusive(), total);

        for pair in segments.windows(2) {
            prop_assert_eq!(pair[0].end_exclusive(), pair[1].start);
        }
        for s in &segments {
            prop_assert!(s.start <= s.end_inclusive);
        }

        let covered: u64 = segments.iter().map(Segment::len).sum();
        prop_assert_eq!(covered, total);
    }
}
