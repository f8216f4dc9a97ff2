use std::path::PathBuf;

use clap::Parser;

/// 分段并发下载一个 HTTP 资源。
///
/// 服务器支持 Range 时按分段并发下载，否则回退为单连接下载。
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// 资源 URL
    pub url: String,

    /// 输出文件名，默认取 URL 最后一段路径
    #[arg(short, long)]
    pub output: Option<String>,

    /// 输出目录，默认系统下载目录（取不到时为当前目录）
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// 分段数
    #[arg(short, long, default_value_t = 6)]
    pub segments: usize,

    /// 每次写盘的最大块大小（字节）
    #[arg(long, default_value_t = 64 * 1024)]
    pub chunk_size: usize,

    /// 探测不到文件大小时仍以单连接下载，而不是直接失败
    #[arg(long)]
    pub stream_unknown_size: bool,

    /// HTTP Basic 认证用户名
    #[arg(long, requires = "password")]
    pub user: Option<String>,

    /// HTTP Basic 认证密码
    #[arg(long, requires = "user")]
    pub password: Option<String>,
}
