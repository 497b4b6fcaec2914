//! 关联清单（association manifest）定义与加载。
//!
//! 清单描述一次批量注册/清理需要的全部输入：
//! - 若干 ProgID 描述（[`ProgIdDescriptor`]）
//! - 可选的日志文件位置（相对路径按清单所在目录解析）
//!
//! 示例：
//! ```json
//! {
//!   "log_file": "logs/registry.log",
//!   "prog_ids": [
//!     { "progID": "App.Document", "description": "App Document", "extensions": ["myext"] }
//!   ]
//! }
//! ```
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::paths;
use crate::progid::{validate_prog_id, ProgIdDescriptor};

/// 关联清单根对象。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssociationManifest {
    #[serde(default)]
    /// 日志文件；为空时使用默认位置。
    pub log_file: Option<String>,
    #[serde(default, alias = "progIDs", alias = "progIds")]
    /// 需要注册/清理的 ProgID 列表（按顺序处理）。
    pub prog_ids: Vec<ProgIdDescriptor>,
}

/// 已加载的清单及其所在目录。
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub manifest: AssociationManifest,
    pub base_dir: PathBuf,
}

impl LoadedManifest {
    /// 清单中配置的日志文件（已按清单目录解析）。
    pub fn log_file(&self) -> Result<Option<PathBuf>> {
        match self.manifest.log_file.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                paths::resolve_path(&self.base_dir, raw).map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// 读取并解析关联清单（JSON）。
///
/// 异常处理：
/// - 文件读取失败（不存在/权限/IO）返回错误
/// - JSON 解析失败返回错误
/// - 存在空 ProgID 时返回错误
pub fn load_manifest(path: &Path) -> Result<LoadedManifest> {
    let bytes = std::fs::read(path).with_context(|| format!("读取清单失败: {}", path.display()))?;
    let manifest: AssociationManifest =
        serde_json::from_slice(&bytes).context("解析清单 JSON 失败")?;
    validate(&manifest)?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(LoadedManifest { manifest, base_dir })
}

fn validate(manifest: &AssociationManifest) -> Result<()> {
    for (pos, d) in manifest.prog_ids.iter().enumerate() {
        validate_prog_id(&d.prog_id)
            .map_err(|e| anyhow!("清单第 {} 项 prog_id 不合法: {e}", pos + 1))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("filetype-core-manifest-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("associations.json");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn relative_log_file_resolves_against_manifest_dir() {
        let (dir, path) = write_temp(
            r#"{ "log_file": "logs/registry.log", "prog_ids": [ { "progID": "App.Document" } ] }"#,
        );
        let loaded = load_manifest(&path).unwrap();
        assert_eq!(loaded.manifest.prog_ids.len(), 1);
        assert_eq!(
            loaded.log_file().unwrap(),
            Some(dir.join("logs").join("registry.log"))
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_log_file_means_default() {
        let (dir, path) = write_temp(r#"{ "prog_ids": [] }"#);
        let loaded = load_manifest(&path).unwrap();
        assert!(loaded.log_file().unwrap().is_none());
        assert!(loaded.manifest.prog_ids.is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_prog_id_is_rejected() {
        let (dir, path) = write_temp(r#"{ "prog_ids": [ { "prog_id": " " } ] }"#);
        let err = load_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("prog_id"), "{err}");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn nested_prog_id_is_rejected() {
        let (dir, path) = write_temp(r#"{ "prog_ids": [ { "prog_id": "A.Doc" }, { "prog_id": "A\\Doc" } ] }"#);
        let err = load_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("第 2 项"), "{err}");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
