//! 下载钩子：在「开始前 / 进度 / 完成后」插入自定义逻辑。
//!
//! 使用方式二选一（可混用）：
//! - **单阶段**：用 `with_before_start_hook` / `with_on_progress_hook` / `with_after_complete_hook` 传入闭包；
//! - **完整钩子**：实现 [`DownloadHook`]，通过下载器的 `with_hook` 注册。

mod adapters;

use async_trait::async_trait;

use super::progress::ProgressSnapshot;

pub(crate) use adapters::{
    AfterCompleteHookAdapter, BeforeStartHookAdapter, OnProgressHookAdapter,
};

/// 钩子执行时请求中止下载时使用的错误。
#[derive(Debug, Clone)]
pub struct HookAbort;

impl std::fmt::Display for HookAbort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("下载被钩子中止")
    }
}

impl std::error::Error for HookAbort {}

/// 下载流程钩子。
#[async_trait]
pub trait DownloadHook: Send + Sync {
    /// 探测之前调用。返回 `Err` 则中止本次下载，不会发出任何请求。
    async fn before_start(&mut self) -> Result<(), HookAbort> {
        Ok(())
    }

    /// 每写入一块数据后调用。
    ///
    /// 在进度聚合的临界区内执行：各分段的调用被串行化，`downloaded_bytes` 单调不减。
    /// 不要在这里做耗时操作。
    fn on_progress(&mut self, _snapshot: &ProgressSnapshot) {}

    /// 下载成功结束后调用。
    async fn after_complete(&mut self) {}
}

/// 钩子容器，按注册顺序依次执行。
#[derive(Default)]
pub struct DownloadHooksContainer {
    hooks: Vec<Box<dyn DownloadHook>>,
}

impl DownloadHooksContainer {
    pub fn add(&mut self, hook: impl DownloadHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub async fn run_before_start(&mut self) -> Result<(), HookAbort> {
        for h in self.hooks.iter_mut() {
            h.before_start().await?;
        }
        Ok(())
    }

    pub fn run_on_progress(&mut self, snapshot: &ProgressSnapshot) {
        for h in self.hooks.iter_mut() {
            h.on_progress(snapshot);
        }
    }

    pub async fn run_after_complete(&mut self) {
        for h in self.hooks.iter_mut() {
            h.after_complete().await;
        }
    }
}

impl std::fmt::Debug for DownloadHooksContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadHooksContainer")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
