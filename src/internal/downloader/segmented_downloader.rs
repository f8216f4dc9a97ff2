//! 分段下载器：链式配置后调用 [`SegmentedDownloader::send`] 执行下载。

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::internal::states::unlock_reactive::UnlockReactiveProperty;
use crate::internal::transport::http_transport::Credentials;
use crate::internal::transport::{HttpTransport, Transport};

use super::config::{FetchConfig, UnknownSizePolicy};
use super::coordinator::{DownloadCoordinator, DownloadPhase, DownloadReport};
use super::error::DownloadError;
use super::hooks::{
    AfterCompleteHookAdapter, BeforeStartHookAdapter, DownloadHook, DownloadHooksContainer,
    HookAbort, OnProgressHookAdapter,
};
use super::progress::ProgressSnapshot;

/// 分段下载器，不实现 Clone：一个下载器只对应一次下载。
///
/// 拥有两个响应式属性：`progress()`（进度快照）与 `state()`（协调器阶段）。
pub struct SegmentedDownloader {
    url: String,
    save_path: Option<PathBuf>,
    config: FetchConfig,
    transport: Option<Arc<dyn Transport>>,
    credentials: Option<Credentials>,
    hooks: DownloadHooksContainer,
    cancel: CancellationToken,
    progress_state: UnlockReactiveProperty<ProgressSnapshot>,
    phase_state: UnlockReactiveProperty<DownloadPhase>,
}

impl SegmentedDownloader {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            save_path: None,
            config: FetchConfig::default(),
            transport: None,
            credentials: None,
            hooks: DownloadHooksContainer::default(),
            cancel: CancellationToken::new(),
            progress_state: UnlockReactiveProperty::new(ProgressSnapshot::default()),
            phase_state: UnlockReactiveProperty::new(DownloadPhase::Probing),
        }
    }

    /// 设置保存路径；传空路径等同于未设置。
    pub fn save_to(mut self, path: impl AsRef<Path>) -> Self {
        let p = path.as_ref();
        self.save_path = if p.as_os_str().is_empty() {
            None
        } else {
            Some(p.to_path_buf())
        };
        self
    }

    /// 整体替换配置。
    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置分段数（并发请求数），默认 6。
    pub fn segment_count(mut self, n: usize) -> Self {
        self.config.segment_count = n;
        self
    }

    /// 设置每次写盘 / 上报进度的最大块大小，默认 64KB。
    pub fn read_chunk_size(mut self, n: usize) -> Self {
        self.config.read_chunk_size = n;
        self
    }

    /// 设置文件大小未知时的处理策略。
    pub fn unknown_size_policy(mut self, policy: UnknownSizePolicy) -> Self {
        self.config.unknown_size_policy = policy;
        self
    }

    /// 使用 HTTP Basic 认证；仅在未注入自定义传输层时生效。
    pub fn basic_auth(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// 注入自定义传输层（测试或共享连接池时使用）。
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 使用外部取消令牌；不调用则内部自建，可通过 [`Self::cancel_token`] 获取。
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 注册「开始前」钩子；闭包返回 `Err(HookAbort)` 会中止本次下载。
    pub fn with_before_start_hook<F, Fut>(mut self, f: F) -> Self
    where
        F: FnMut() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookAbort>> + Send + 'static,
    {
        self.hooks.add(BeforeStartHookAdapter(f));
        self
    }

    /// 注册「进度」钩子；每写入一块数据调用一次。
    pub fn with_on_progress_hook<F>(mut self, f: F) -> Self
    where
        F: FnMut(&ProgressSnapshot) + Send + Sync + 'static,
    {
        self.hooks.add(OnProgressHookAdapter(f));
        self
    }

    /// 注册「完成后」钩子；下载成功结束后调用。
    pub fn with_after_complete_hook<F, Fut>(mut self, f: F) -> Self
    where
        F: FnMut() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks.add(AfterCompleteHookAdapter(f));
        self
    }

    /// 添加完整钩子；可多次调用，按注册顺序执行。
    pub fn with_hook(mut self, hook: impl DownloadHook + 'static) -> Self {
        self.hooks.add(hook);
        self
    }

    /// 内置的进度状态；返回可共享句柄，`.watch()` 后 `changed().await` 监听。
    pub fn progress(&self) -> UnlockReactiveProperty<ProgressSnapshot> {
        self.progress_state.clone()
    }

    /// 协调器阶段。
    pub fn state(&self) -> UnlockReactiveProperty<DownloadPhase> {
        self.phase_state.clone()
    }

    /// 执行下载。分段全部成功才算成功，否则返回首个失败原因。
    pub async fn send(self) -> Result<DownloadReport, DownloadError> {
        let phase = self.phase_state.clone();
        let result = self.start().await;
        if result.is_err() {
            phase.update(DownloadPhase::Failed);
        }
        result
    }

    async fn start(self) -> Result<DownloadReport, DownloadError> {
        let save_path = self.save_path.ok_or(DownloadError::NoDestination)?;
        if self.config.segment_count == 0 {
            return Err(DownloadError::InvalidSegmentCount);
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&self.config, self.credentials.as_ref())?),
        };

        DownloadCoordinator {
            transport,
            url: self.url,
            save_path,
            config: self.config,
            hooks: self.hooks,
            cancel: self.cancel,
            progress: self.progress_state,
            phase: self.phase_state,
        }
        .run()
        .await
    }
}

impl std::fmt::Debug for SegmentedDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedDownloader")
            .field("url", &self.url)
            .field("save_path", &self.save_path)
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// 平铺入口：下载 `url` 到 `output_path`，每写入一块数据调用一次 `sink`。
pub async fn start_download<F>(
    url: &str,
    output_path: impl AsRef<Path>,
    segment_count: usize,
    sink: F,
) -> Result<DownloadReport, DownloadError>
where
    F: FnMut(&ProgressSnapshot) + Send + Sync + 'static,
{
    SegmentedDownloader::new(url)
        .save_to(output_path)
        .segment_count(segment_count)
        .with_on_progress_hook(sink)
        .send()
        .await
}
