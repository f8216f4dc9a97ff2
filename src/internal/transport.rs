//! 传输层抽象：下载引擎只通过 [`Transport`] 发起 HEAD / GET 请求。
//!
//! 生产环境使用基于 reqwest 的 [`HttpTransport`]；测试中可注入内存实现，
//! 在不访问网络的情况下驱动协调器的全部状态。

pub mod http_transport;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use thiserror::Error;

pub use http_transport::HttpTransport;

/// 传输层错误：连接失败、超时、读流中断等。
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("传输失败: {0}")]
    Other(String),
}

/// 响应体：按块产出的字节流。
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// 闭区间字节范围 `[start, end_inclusive]`，对应 `Range: bytes=start-end`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end_inclusive: u64,
}

impl ByteRange {
    pub fn new(start: u64, end_inclusive: u64) -> Self {
        Self { start, end_inclusive }
    }

    /// 范围内的字节数；`end_inclusive < start` 时为 0。
    pub fn len(&self) -> u64 {
        (self.end_inclusive + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end_inclusive < self.start
    }

    /// `Range` 请求头的值。
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end_inclusive)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end_inclusive)
    }
}

/// 一次请求的响应：状态码、响应头与流式响应体。
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &"<stream>")
            .finish()
    }
}

/// 下载引擎依赖的最小 HTTP 能力。
///
/// 实现方需保证超时等参数对每个请求一致生效；引擎本身不再额外设置超时。
#[async_trait]
pub trait Transport: Send + Sync {
    /// 仅获取元数据，不传输响应体。
    async fn head(&self, url: &str) -> Result<TransportResponse, TransportError>;

    /// GET 请求；`range` 为 `Some` 时附带 `Range` 请求头。
    async fn get(
        &self,
        url: &str,
        range: Option<ByteRange>,
    ) -> Result<TransportResponse, TransportError>;
}
