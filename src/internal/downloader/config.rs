use serde::{Deserialize, Serialize};

/// 默认分段数
pub const DEFAULT_SEGMENT_COUNT: usize = 6;

/// 默认读块大小：64KB
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

/// 默认连接超时（毫秒）
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// 默认读超时（毫秒）
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 30_000;

/// 探测不到文件大小时的处理策略。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownSizePolicy {
    /// 直接判定失败（保持原有行为）
    #[default]
    Fail,
    /// 走单连接流式下载，不依赖已知大小
    Stream,
}

/// 单次下载的配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// 分段数（并发请求数）
    pub segment_count: usize,
    /// 每次写盘与上报进度的最大块大小（字节）
    pub read_chunk_size: usize,
    /// 连接超时（毫秒）
    pub connect_timeout_ms: u64,
    /// 读超时（毫秒）
    pub read_timeout_ms: u64,
    pub user_agent: String,
    pub unknown_size_policy: UnknownSizePolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            segment_count: DEFAULT_SEGMENT_COUNT,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            user_agent: concat!("segment_fetch/", env!("CARGO_PKG_VERSION")).to_string(),
            unknown_size_policy: UnknownSizePolicy::Fail,
        }
    }
}
