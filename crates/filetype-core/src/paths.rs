//! 统一路径约定（日志文件位置、相对路径解析）。
//!
//! 目标：
//! - 将落盘路径集中管理，避免散落在各模块中
//! - 默认日志文件位于宿主可执行文件所在目录的上一级：`<exe 目录>\..\registry.log`
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// 默认日志文件名。
pub const LOG_FILE_NAME: &str = "registry.log";

/// 默认日志文件路径：宿主可执行文件所在目录的上一级下的 `registry.log`。
///
/// 异常处理：
/// - 无法获取当前可执行文件路径时返回错误。
pub fn default_log_file() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("获取当前可执行文件路径失败")?;
    log_file_for_exe(&exe)
}

/// 按给定可执行文件路径计算日志文件位置。
pub fn log_file_for_exe(exe: &Path) -> Result<PathBuf> {
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow!("可执行文件路径没有上级目录: {}", exe.display()))?;
    Ok(dir.parent().unwrap_or(dir).join(LOG_FILE_NAME))
}

/// 确保目录存在（不存在则递归创建）。
///
/// 异常处理：
/// - 目录创建失败（权限、路径非法等）会返回错误。
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).with_context(|| format!("创建目录失败: {}", path.display()))?;
    Ok(())
}

/// 确保文件的上级目录存在（相对当前目录的文件名无需创建）。
pub fn ensure_parent_dir(file: &Path) -> Result<()> {
    match file.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// 将配置中的路径字段解析为实际路径。
///
/// 返回值：
/// - `raw` 为绝对路径：直接返回
/// - `raw` 为相对路径：返回 `base.join(raw)`
///
/// 异常处理：
/// - `raw` 为空字符串时返回错误，避免误用导致写入基准目录本身。
pub fn resolve_path(base: &Path, raw: &str) -> Result<PathBuf> {
    if raw.is_empty() {
        return Err(anyhow!("空路径"));
    }
    let p = PathBuf::from(raw);
    if p.is_absolute() {
        Ok(p)
    } else {
        Ok(base.join(p))
    }
}
