//! 能力探测：HEAD 请求获取文件大小与是否支持 Range。

use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderMap};
use tracing::{debug, info};

use crate::internal::transport::Transport;

use super::error::ProbeError;

/// 探测结果，创建后不再变化。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub url: String,
    /// 声明的 Content-Length；缺失或非数字时为 `None`
    pub total_bytes: Option<u64>,
    /// 仅当服务器明确声明 `Accept-Ranges: bytes` 时为 true
    pub supports_ranges: bool,
}

/// 发起 HEAD 请求并解析响应头。非 2xx 或传输失败返回 [`ProbeError`]。
pub async fn probe(
    transport: &dyn Transport,
    url: &str,
) -> Result<ResourceDescriptor, ProbeError> {
    let resp = transport.head(url).await?;

    if !resp.status.is_success() {
        debug!(url, status = %resp.status, "探测请求失败");
        return Err(ProbeError::Status(resp.status));
    }

    let descriptor = ResourceDescriptor {
        url: url.to_string(),
        total_bytes: content_length(&resp.headers),
        supports_ranges: accepts_byte_ranges(&resp.headers),
    };

    info!(
        url,
        total_bytes = ?descriptor.total_bytes,
        supports_ranges = descriptor.supports_ranges,
        "探测完成"
    );

    Ok(descriptor)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// `Accept-Ranges` 可能带多个值（如 `bytes, none` 的非标准写法），只要包含 `bytes` 即视为支持。
fn accepts_byte_ranges(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_RANGES)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(','))
        .any(|unit| unit.trim().eq_ignore_ascii_case("bytes"))
}

