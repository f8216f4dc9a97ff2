//! 基于 reqwest 的 [`Transport`] 实现。

use core::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use futures_util::StreamExt;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RANGE};
use reqwest::{Client, Response};

use crate::internal::downloader::config::FetchConfig;

use super::{ByteRange, Transport, TransportError, TransportResponse};

/// HTTP Basic 认证信息。
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn header_value(&self) -> Result<HeaderValue, TransportError> {
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password));
        let mut value = HeaderValue::from_str(&format!("Basic {}", token))
            .map_err(|e| TransportError::Other(e.to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// 防止 debug 泄漏密码
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .finish()
    }
}

/// reqwest 客户端包装，`Client` 内部是 Arc，clone 代价很低。
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// 按配置创建客户端：连接超时、读超时、UA，以及可选的 Basic 认证。
    pub fn new(
        config: &FetchConfig,
        credentials: Option<&Credentials>,
    ) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        if let Some(c) = credentials {
            headers.insert(AUTHORIZATION, c.header_value()?);
        }

        // 关闭自动解压：Content-Length 必须等于写入磁盘的字节数
        let client = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .read_timeout(Duration::from_millis(config.read_timeout_ms))
            .no_gzip()
            .build()?;

        Ok(Self { client })
    }

    /// 直接使用外部构造好的客户端。
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn into_transport_response(resp: Response) -> TransportResponse {
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes_stream()
            .map(|r| r.map_err(TransportError::Http))
            .boxed();

        TransportResponse {
            status,
            headers,
            body,
        }
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("client", &"<Client with hidden authorization>")
            .finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn head(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let resp = self.client.head(url).send().await?;
        Ok(Self::into_transport_response(resp))
    }

    async fn get(
        &self,
        url: &str,
        range: Option<ByteRange>,
    ) -> Result<TransportResponse, TransportError> {
        let mut req = self.client.get(url);
        if let Some(r) = range {
            req = req.header(RANGE, r.header_value());
        }
        let resp = req.send().await?;
        Ok(Self::into_transport_response(resp))
    }
}
