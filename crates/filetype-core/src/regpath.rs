//! 注册表路径构造器：根键 + 路径段序列，统一用 `\` 拼接。
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::fmt;

use crate::value::RootHive;

/// 注册表路径分隔符。
pub const SEPARATOR: char = '\\';

/// 带根键的注册表路径。
///
/// 说明：
/// - 解析字符串时按 `\` 切分并丢弃空段，因此首尾多余的分隔符不影响结果
/// - [`RegPath::join`] 是唯一的拼接出口，调用方不再手工拼接字符串
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegPath {
    hive: RootHive,
    segments: Vec<String>,
}

impl RegPath {
    /// 根键本身（无路径段）。
    pub fn root(hive: RootHive) -> Self {
        Self {
            hive,
            segments: Vec::new(),
        }
    }

    /// 由调用方给出的路径字符串构造。
    pub fn parse(hive: RootHive, path: &str) -> Self {
        Self {
            hive,
            segments: split(path).map(str::to_string).collect(),
        }
    }

    /// 追加一个或多个路径段（`segment` 内可再含分隔符）。
    pub fn child(&self, segment: &str) -> Self {
        let mut next = self.clone();
        next.segments.extend(split(segment).map(str::to_string));
        next
    }

    pub fn hive(&self) -> RootHive {
        self.hive
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// 最后一段（根键返回 `None`）。
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// 上一级路径（根键返回 `None`）。
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// 拼接为相对根键的子键路径（不含根键名），如 `Software\Classes\.txt`。
    pub fn join(&self) -> String {
        let mut out = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push(SEPARATOR);
            }
            out.push_str(seg);
        }
        out
    }
}

impl fmt::Display for RegPath {
    /// 输出含根键名的完整路径，如 `HKEY_CURRENT_USER\Software\Classes`。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hive.name())?;
        for seg in &self.segments {
            write!(f, "{SEPARATOR}{seg}")?;
        }
        Ok(())
    }
}

/// 按分隔符切分并丢弃空段。
pub fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}
