//! 下载任务记录：编排层持久化、展示所用的数据形状。
//!
//! 本 crate 不负责持久化，只提供记录本身以及从下载事件更新记录的方法。

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::internal::downloader::{DownloadError, DownloadReport, ProgressSnapshot};

/// 无法从 URL 得到文件名时使用的默认名
pub const DEFAULT_FILE_NAME: &str = "download.bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
}

/// 一条下载任务记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTask {
    pub id: Uuid,
    pub url: String,
    pub file_name: String,
    /// 总大小，未知时为 `None`
    pub total_bytes: Option<u64>,
    pub downloaded_bytes: u64,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    /// 失败原因（仅 `Failed` 时有值）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadTask {
    pub fn new(url: &str, file_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            file_name: file_name.to_string(),
            total_bytes: None,
            downloaded_bytes: 0,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            error: None,
        }
    }

    /// 用进度快照更新记录；终态记录不再变化。
    pub fn apply_progress(&mut self, snapshot: &ProgressSnapshot) {
        if self.is_finished() {
            return;
        }
        self.status = TaskStatus::Downloading;
        self.downloaded_bytes = snapshot.downloaded_bytes;
        if snapshot.total_bytes.is_some() {
            self.total_bytes = snapshot.total_bytes;
        }
    }

    pub fn complete(&mut self, report: &DownloadReport) {
        self.status = TaskStatus::Completed;
        self.total_bytes = Some(report.total_bytes);
        self.downloaded_bytes = report.total_bytes;
        self.error = None;
    }

    pub fn fail(&mut self, error: &DownloadError) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.to_string());
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// 从 URL 最后一段路径得到文件名：解码百分号编码，去掉路径分隔符等非法字符。
pub fn file_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .map(|s| percent_decode_str(&s).decode_utf8_lossy().to_string())
        .map(|s| sanitize_file_name(&s))
        .filter(|s| !s.is_empty() && s != "." && s != "..")
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
