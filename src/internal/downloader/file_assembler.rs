//! 分段写盘：预分配输出文件，每个分段持有独立的文件句柄按绝对偏移写入。
//!
//! 各分段独立 `open`（而不是 `try_clone`），因此各自拥有独立的游标，
//! 写文件不需要任何锁；分段范围互不重叠，也不会争用同一文件区域。

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use super::error::{DownloadError, FetchFailure};
use super::segmenter::Segment;

/// 输出文件的所有者：负责创建与预分配，并为分段发放写入器。
#[derive(Debug)]
pub struct FileAssembler {
    path: PathBuf,
    total_len: u64,
}

impl FileAssembler {
    /// 创建（或截断）输出文件并把长度设为 `total_len`。
    pub async fn preallocate(
        path: impl AsRef<Path>,
        total_len: u64,
    ) -> Result<Self, DownloadError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .await
            .map_err(DownloadError::CreateFile)?;
        file.set_len(total_len)
            .await
            .map_err(DownloadError::PreallocateFile)?;

        Ok(Self { path, total_len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    /// 为分段打开独立句柄，游标定位到分段起点。
    pub async fn open_segment(
        &self,
        segment: &Segment,
    ) -> Result<SegmentWriter, FetchFailure> {
        if segment.end_exclusive() > self.total_len {
            return Err(FetchFailure::Overflow(segment.range()));
        }

        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .await
            .map_err(FetchFailure::OpenFile)?;
        file.seek(SeekFrom::Start(segment.start))
            .await
            .map_err(FetchFailure::WriteFile)?;

        Ok(SegmentWriter {
            file,
            segment: *segment,
            cursor: segment.start,
        })
    }
}

/// 单个分段的写入器，只能写入本分段范围。
#[derive(Debug)]
pub struct SegmentWriter {
    file: File,
    segment: Segment,
    cursor: u64,
}

impl SegmentWriter {
    /// 在绝对偏移 `offset` 处写入 `bytes`；越出分段范围时拒绝写入。
    pub async fn write_at(
        &mut self,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), FetchFailure> {
        let end = offset + bytes.len() as u64;
        if offset < self.segment.start || end > self.segment.end_exclusive() {
            return Err(FetchFailure::Overflow(self.segment.range()));
        }

        if offset != self.cursor {
            self.file
                .seek(SeekFrom::Start(offset))
                .await
                .map_err(FetchFailure::WriteFile)?;
        }
        self.file
            .write_all(bytes)
            .await
            .map_err(FetchFailure::WriteFile)?;
        self.cursor = end;
        Ok(())
    }

    /// 在当前游标处顺序写入。
    pub async fn write_next(&mut self, bytes: &[u8]) -> Result<(), FetchFailure> {
        self.write_at(self.cursor, bytes).await
    }

    /// 当前游标（绝对偏移）。
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// 已写入本分段的字节数。
    pub fn written(&self) -> u64 {
        self.cursor - self.segment.start
    }

    /// 刷新并关闭句柄。
    pub async fn finish(mut self) -> Result<(), FetchFailure> {
        self.file.flush().await.map_err(FetchFailure::WriteFile)
    }
}
