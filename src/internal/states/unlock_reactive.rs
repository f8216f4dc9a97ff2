//! # UnlockReactiveProperty
//!
//! 轻量级响应式属性容器，读写不阻塞，适合下载进度这类高频更新。
//! 内部直接复用 [`super::reactive_core::ReactiveProperty`]。
//!
//! ## 使用示例
//! ```rust,no_run
//! use segment_fetch::states::unlock_reactive::UnlockReactiveProperty;
//!
//! let prop = UnlockReactiveProperty::new(0u64);
//! prop.update(1);
//! assert_eq!(prop.get_current(), Some(1));
//! ```

pub use super::reactive_core::{
    PropertyWatcher, ReactivePropertyError as UnlockReactivePropertyError,
};

/// 轻量级响应式属性容器。
pub type UnlockReactiveProperty<T> = super::reactive_core::ReactiveProperty<T>;
