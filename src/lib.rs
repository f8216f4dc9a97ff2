/// 内部实现模块
mod internal;


/// 分段并发下载引擎：探测、分段、Range 取数、写盘、进度与单连接回退
pub mod downloader {
    use crate::internal;
    pub use internal::downloader::*;
}

/// 传输层抽象，测试或自定义客户端时实现 [`transport::Transport`]
pub mod transport {
    use crate::internal;
    pub use internal::transport::*;
    pub use internal::transport::http_transport::Credentials;
}

pub mod states {
    pub mod unlock_reactive {
        use crate::internal;
        pub use internal::states::unlock_reactive::*;
    }
}

/// 编排层使用的任务记录
pub mod task {
    use crate::internal;
    pub use internal::task::*;
}

pub use internal::downloader::{
    DownloadError, DownloadReport, ProgressSnapshot, SegmentedDownloader, start_download,
};
