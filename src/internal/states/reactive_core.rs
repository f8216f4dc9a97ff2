//! # ReactiveProperty — 响应式属性内核
//!
//! 基于 [`tokio::sync::watch`]：写入方覆盖最新值，监听方只关心最新值。
//! 下载进度、协调器阶段都通过它对外发布。
//!
//! 本模块**不对外导出**，对外类型见 [`super::unlock_reactive`]。

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::sync::watch::error::RecvError;

/// 响应式属性统一错误类型
#[derive(Debug, Error)]
pub enum ReactivePropertyError {
    /// 属性已被销毁
    #[error("属性已被销毁")]
    Destroyed,

    /// watch 通道接收失败
    #[error("接收失败: {0}")]
    RecvError(#[from] RecvError),
}

/// 内部共享状态：值发送器。
///
/// 最后一个持有者销毁时发送 `None`，监听方据此得知属性已销毁。
#[derive(Debug)]
pub(crate) struct Inner<T> {
    pub(crate) sender: watch::Sender<Option<T>>,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        self.sender.send_replace(None);
    }
}

/// 响应式属性内核：new / update / get_current / watch。
#[derive(Clone, Debug)]
pub struct ReactiveProperty<T: Clone + Send + Sync> {
    pub(crate) inner: Arc<Inner<T>>,
    pub(crate) cache_receiver: watch::Receiver<Option<T>>,
}

impl<T> ReactiveProperty<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(value: T) -> Self {
        let (sender, _) = watch::channel(Some(value));
        let cache_receiver = sender.subscribe();
        Self {
            inner: Arc::new(Inner { sender }),
            cache_receiver,
        }
    }

    /// 覆盖当前值并通知所有监听者。没有监听者时也会保存最新值。
    ///
    /// 句柄存活期间内核必然存活，因此写入不会失败。
    pub fn update(&self, new_value: T) -> &Self {
        self.inner.sender.send_replace(Some(new_value));
        self
    }

    /// 当前值的快照（会 clone）。
    pub fn get_current(&self) -> Option<T> {
        self.cache_receiver.borrow().as_ref().cloned()
    }

    /// 当前值，属性已销毁时返回默认值。
    pub fn get_or_default(&self) -> T
    where
        T: Default,
    {
        self.get_current().unwrap_or_default()
    }

    /// 创建监听器。
    pub fn watch(&self) -> PropertyWatcher<T> {
        PropertyWatcher {
            receiver: self.inner.sender.subscribe(),
        }
    }
}

/// 属性监听器，用于异步接收属性值的变化。
///
/// 不持有内核引用：所有属性句柄释放后，`changed` 返回 [`ReactivePropertyError::Destroyed`]。
pub struct PropertyWatcher<T> {
    receiver: watch::Receiver<Option<T>>,
}

impl<T> PropertyWatcher<T>
where
    T: Clone + Send + Sync,
{
    /// 等待下一次变化并返回新值。
    pub async fn changed(&mut self) -> Result<T, ReactivePropertyError> {
        self.receiver.changed().await?;
        match self.receiver.borrow_and_update().as_ref() {
            None => Err(ReactivePropertyError::Destroyed),
            Some(value) => Ok(value.clone()),
        }
    }

    /// 当前值的克隆。
    pub fn borrow(&self) -> Option<T> {
        self.receiver.borrow().clone()
    }
}
