//! 分段规划：把已知总大小切成固定数量的连续、不重叠字节范围。

use crate::internal::transport::ByteRange;

/// 一个分段：序号及其闭区间 `[start, end_inclusive]`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    pub start: u64,
    pub end_inclusive: u64,
}

impl Segment {
    /// 分段字节数。
    pub fn len(&self) -> u64 {
        (self.end_inclusive + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end_inclusive < self.start
    }

    /// 不含上界的结束偏移，即分段写完后游标应到达的位置。
    pub fn end_exclusive(&self) -> u64 {
        self.end_inclusive + 1
    }

    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.start, self.end_inclusive)
    }
}

/// 按 `segment_count` 等分 `total_bytes`，最后一段吸收余数。
///
/// 调用方保证 `total_bytes > 0` 且 `segment_count >= 1`，否则返回空列表。
/// 当 `segment_count > total_bytes` 时，段数收缩为 `total_bytes`，保证每段至少 1 字节。
pub fn split_segments(total_bytes: u64, segment_count: usize) -> Vec<Segment> {
    if total_bytes == 0 || segment_count == 0 {
        return Vec::new();
    }

    let count = (segment_count as u64).min(total_bytes);
    let segment_size = total_bytes / count;

    (0..count)
        .map(|i| {
            let start = i * segment_size;
            let end_inclusive = if i == count - 1 {
                total_bytes - 1
            } else {
                start + segment_size - 1
            };
            Segment {
                index: i as usize,
                start,
                end_inclusive,
            }
        })
        .collect()
}
