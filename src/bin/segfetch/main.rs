//! `segfetch` 命令行入口：解析参数、显示进度条、Ctrl-C 取消，结束时输出任务记录（JSON）。

mod args;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use args::Args;
use clap::Parser;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use segment_fetch::downloader::{SegmentedDownloader, UnknownSizePolicy};
use segment_fetch::task::{DownloadTask, file_name_from_url};
use tracing::{error, warn};

fn progress_bar() -> ProgressBar {
    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
    )
    .map(|s| s.progress_chars("=>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    let pb = ProgressBar::new(0);
    pb.set_style(style);
    pb
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();
    let args = Args::parse();

    let file_name = args
        .output
        .clone()
        .unwrap_or_else(|| file_name_from_url(&args.url));
    let dir = args
        .dir
        .clone()
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        error!(dir = %dir.display(), error = %e, "创建输出目录失败");
        return ExitCode::FAILURE;
    }
    let save_path = dir.join(&file_name);

    let task = Arc::new(Mutex::new(DownloadTask::new(&args.url, &file_name)));
    let pb = progress_bar();

    let mut downloader = SegmentedDownloader::new(args.url.as_str())
        .save_to(&save_path)
        .segment_count(args.segments)
        .read_chunk_size(args.chunk_size);
    if args.stream_unknown_size {
        downloader = downloader.unknown_size_policy(UnknownSizePolicy::Stream);
    }
    if let (Some(user), Some(password)) = (&args.user, &args.password) {
        downloader = downloader.basic_auth(user, password);
    }

    let downloader = {
        let pb = pb.clone();
        let task = Arc::clone(&task);
        downloader.with_on_progress_hook(move |snapshot| {
            if let Some(total) = snapshot.total_bytes {
                pb.set_length(total);
            }
            pb.set_position(snapshot.downloaded_bytes);
            pb.set_message(format!("{}/s", HumanBytes(snapshot.bytes_per_second)));
            task.lock().apply_progress(snapshot);
        })
    };

    let cancel = downloader.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，取消下载");
            cancel.cancel();
        }
    });

    let result = downloader.send().await;

    let mut record = task.lock().clone();
    let code = match &result {
        Ok(report) => {
            pb.finish_with_message(format!("已保存到 {}", report.save_path.display()));
            record.complete(report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            pb.abandon_with_message(format!("失败: {}", e));
            record.fail(e);
            ExitCode::FAILURE
        }
    };

    match serde_json::to_string_pretty(&record) {
        Ok(json) => println!("{}", json),
        Err(e) => error!(error = %e, "序列化任务记录失败"),
    }

    code
}
