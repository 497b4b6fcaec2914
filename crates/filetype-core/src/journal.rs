//! 注册表操作日志（registry.log）格式与日志初始化。
//!
//! 行格式：
//! - `<Unix 毫秒时间戳> | <Oct 18, 2026, 07:37 AM> | <消息>`，每条一行
//! - 同时输出到标准输出并追加写入日志文件
//!
//! 实现方式：
//! - 工作流内部统一使用 `tracing` 宏记录日志
//! - 本模块提供自定义事件格式 [`RegistryLogFormat`]，由 `tracing-subscriber` 负责分发与写入
//! - 日志同步写入，因此日志顺序与工作流步骤顺序一致
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::paths;

/// 日志行中的可读日期格式（12 小时制）。
const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year], [hour repr:12]:[minute] [period]");

/// 日志配置。
///
/// 字段说明：
/// - `log_file`：追加写入的日志文件；为 `None` 时只输出到标准输出
/// - `stdout`：是否同步输出到标准输出
/// - `default_directive`：未设置 `RUST_LOG` 时的过滤级别
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_file: Option<PathBuf>,
    pub stdout: bool,
    pub default_directive: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            stdout: true,
            default_directive: "info".to_string(),
        }
    }
}

/// registry.log 的事件格式：`<毫秒时间戳> | <日期> | <消息>`。
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryLogFormat;

impl<S, N> FormatEvent<S, N> for RegistryLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{} | ", line_prefix(now()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// 当前时间（优先本地时区，无法确定时退回 UTC）。
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// 行前缀：`<毫秒时间戳> | <日期>`。
pub fn line_prefix(at: OffsetDateTime) -> String {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    let date = at.format(DATE_FORMAT).unwrap_or_default();
    format!("{millis} | {date}")
}

/// 生成完整日志行（不含换行）。
pub fn format_line(at: OffsetDateTime, message: &str) -> String {
    format!("{} | {message}", line_prefix(at))
}

/// 初始化全局日志（进程启动时调用一次）。
///
/// 异常处理：
/// - 日志文件目录创建失败或文件打开失败返回错误
/// - 全局日志已初始化时返回错误
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let writer = build_writer(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(&config.default_directive))
        .event_format(RegistryLogFormat)
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("初始化日志失败: {e}"))?;
    Ok(())
}

/// 在 `f` 执行期间将日志按 registry.log 格式写入 `buffer`（用于测试与嵌入场景）。
pub fn capture<T>(buffer: &LogBuffer, f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .event_format(RegistryLogFormat)
        .with_writer(buffer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

fn build_writer(config: &LogConfig) -> Result<BoxMakeWriter> {
    let file = match &config.log_file {
        Some(path) => {
            paths::ensure_parent_dir(path)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("打开日志文件失败: {}", path.display()))?;
            Some(Mutex::new(file))
        }
        None => None,
    };
    Ok(match (config.stdout, file) {
        (true, Some(file)) => BoxMakeWriter::new(io::stdout.and(file)),
        (false, Some(file)) => BoxMakeWriter::new(file),
        (true, None) => BoxMakeWriter::new(io::stdout),
        (false, None) => BoxMakeWriter::new(io::sink),
    })
}

/// `RUST_LOG` 优先，否则使用默认级别。
fn build_env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// 内存日志缓冲区（可克隆，克隆体共享同一缓冲）。
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前全部内容。
    pub fn contents(&self) -> String {
        self.inner
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }

    /// 按行拆分的内容。
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// 去掉时间戳前缀后的消息部分。
    pub fn messages(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .map(|line| {
                let message = line.splitn(3, " | ").nth(2).map(str::to_string);
                message.unwrap_or(line)
            })
            .collect()
    }
}

/// [`LogBuffer`] 的写入句柄。
pub struct LogBufferWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogBufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("log buffer lock poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}
