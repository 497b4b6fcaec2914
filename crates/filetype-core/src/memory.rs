//! 内存注册表：[`RegistryStore`] 的纯内存实现。
//!
//! 用途：
//! - 单元/集成测试中替代真实注册表
//! - 命令行 `--store <json>` 沙箱模式（非 Windows 平台也可运行完整流程）
//!
//! 行为约定（与 Windows 注册表一致）：
//! - 键名、值名大小写不敏感，但保留首次写入时的大小写
//! - 子键按名称排序返回
//! - 可通过 [`MemoryRegistry::deny`] 注入“拒绝访问”，模拟权限不足
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result as AnyResult};
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::paths;
use crate::regpath::{self, RegPath};
use crate::store::RegistryStore;
use crate::value::{RegistryData, RegistryKeySnapshot, RegistryValue, RootHive, ValueType};

/// 内存中的一个键节点（map 的 key 为小写名称）。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MemoryKey {
    name: String,
    #[serde(default)]
    values: BTreeMap<String, RegistryValue>,
    #[serde(default)]
    subkeys: BTreeMap<String, MemoryKey>,
}

impl MemoryKey {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn find(&self, segments: &[&str]) -> Option<&MemoryKey> {
        let mut node = self;
        for seg in segments {
            node = node.subkeys.get(&fold(seg))?;
        }
        Some(node)
    }

    fn find_mut(&mut self, segments: &[&str]) -> Option<&mut MemoryKey> {
        let mut node = self;
        for seg in segments {
            node = node.subkeys.get_mut(&fold(seg))?;
        }
        Some(node)
    }

    fn snapshot(&self) -> RegistryKeySnapshot {
        self.values.values().cloned().collect()
    }

    /// 按名称重建 map 的 key（手工编辑的沙箱文件可能使用任意大小写）。
    ///
    /// 异常处理：
    /// - 折叠大小写后同名的值或子键返回错误
    fn rekey(self, path: &str) -> AnyResult<Self> {
        let mut values = BTreeMap::new();
        for value in self.values.into_values() {
            let folded = fold(&value.name);
            if values.contains_key(&folded) {
                return Err(anyhow!("{path} 下存在重复的值名: {:?}", value.name));
            }
            values.insert(folded, value);
        }
        let mut subkeys = BTreeMap::new();
        for (raw, mut key) in self.subkeys {
            if key.name.is_empty() {
                key.name = raw;
            }
            let folded = fold(&key.name);
            let child_path = format!("{path}\\{}", key.name);
            if subkeys.contains_key(&folded) {
                return Err(anyhow!("{path} 下存在重复的子键名: {:?}", key.name));
            }
            subkeys.insert(folded, key.rekey(&child_path)?);
        }
        Ok(Self {
            name: self.name,
            values,
            subkeys,
        })
    }
}

/// 可落盘的注册表内容（按根键名组织）。
#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryHives {
    #[serde(default)]
    hives: BTreeMap<String, MemoryKey>,
    #[serde(skip)]
    denied: Vec<(RootHive, Vec<String>)>,
}

impl MemoryHives {
    fn root(&self, hive: RootHive) -> Option<&MemoryKey> {
        self.hives.get(hive.name())
    }

    fn root_mut(&mut self, hive: RootHive) -> &mut MemoryKey {
        self.hives
            .entry(hive.name().to_string())
            .or_insert_with(|| MemoryKey::named(hive.name()))
    }

    fn find(&self, hive: RootHive, segments: &[&str]) -> Option<&MemoryKey> {
        self.root(hive)?.find(segments)
    }

    /// 根键名统一为长名（接受 `hkcu` 等别名），各级 map 的 key 统一为折叠后的名称。
    fn rekey(self) -> AnyResult<Self> {
        let mut hives = BTreeMap::new();
        for (raw, key) in self.hives {
            let hive: RootHive = raw.parse()?;
            let key = MemoryKey {
                name: hive.name().to_string(),
                ..key
            }
            .rekey(hive.name())?;
            if hives.insert(hive.name().to_string(), key).is_some() {
                return Err(anyhow!("重复的根键: {}", hive.name()));
            }
        }
        Ok(Self {
            hives,
            denied: self.denied,
        })
    }

    fn check_access(&self, hive: RootHive, segments: &[&str]) -> Result<()> {
        let folded: Vec<String> = segments.iter().map(|s| fold(s)).collect();
        let denied = self.denied.iter().any(|(h, prefix)| {
            *h == hive && prefix.len() <= folded.len() && folded[..prefix.len()] == prefix[..]
        });
        if denied {
            return Err(RegistryError::AccessDenied {
                path: display_path(hive, segments),
            });
        }
        Ok(())
    }
}

/// 线程安全的内存注册表。
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    inner: Mutex<MemoryHives>,
}

impl MemoryRegistry {
    /// 创建一个空注册表（所有根键存在但没有子键）。
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 文件加载；文件不存在时返回空注册表。
    ///
    /// 异常处理：
    /// - 文件读取失败（权限/IO）或 JSON 解析失败返回错误
    /// - 根键名无法识别，或同一层级存在仅大小写不同的重名项返回错误
    pub fn load(path: &Path) -> AnyResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes =
            std::fs::read(path).with_context(|| format!("读取注册表沙箱文件失败: {}", path.display()))?;
        let hives: MemoryHives = serde_json::from_slice(&bytes)
            .with_context(|| format!("解析注册表沙箱文件失败: {}", path.display()))?;
        let hives = hives
            .rekey()
            .with_context(|| format!("注册表沙箱文件内容不一致: {}", path.display()))?;
        Ok(Self {
            inner: Mutex::new(hives),
        })
    }

    /// 将当前内容写入 JSON 文件（不包含注入的访问限制）。
    pub fn save(&self, path: &Path) -> AnyResult<()> {
        let guard = self.lock()?;
        let bytes = serde_json::to_vec_pretty(&*guard).context("序列化注册表沙箱失败")?;
        paths::ensure_parent_dir(path)?;
        std::fs::write(path, bytes)
            .with_context(|| format!("写入注册表沙箱文件失败: {}", path.display()))?;
        Ok(())
    }

    /// 对指定路径及其全部子路径的修改操作返回“拒绝访问”。
    pub fn deny(&self, hive: RootHive, path: &str) {
        if let Ok(mut guard) = self.inner.lock() {
            let prefix = regpath::split(path).map(fold).collect();
            guard.denied.push((hive, prefix));
        }
    }

    /// 清除所有注入的访问限制。
    pub fn allow_all(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.denied.clear();
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryHives>> {
        self.inner.lock().map_err(|_| RegistryError::Poisoned)
    }
}

impl RegistryStore for MemoryRegistry {
    fn get_key(&self, hive: RootHive, path: &str) -> Result<Option<RegistryKeySnapshot>> {
        let segments: Vec<&str> = regpath::split(path).collect();
        let guard = self.lock()?;
        match guard.find(hive, &segments) {
            Some(key) => Ok(Some(key.snapshot())),
            // 根键本身总是存在
            None if segments.is_empty() => Ok(Some(RegistryKeySnapshot::new())),
            None => Ok(None),
        }
    }

    fn set_value(
        &self,
        hive: RootHive,
        path: &str,
        name: &str,
        value_type: ValueType,
        data: &RegistryData,
    ) -> Result<()> {
        if value_type.shape() != data.shape() {
            return Err(RegistryError::TypeMismatch {
                name: name.to_string(),
                value_type,
                actual: data.kind_name(),
            });
        }
        let segments: Vec<&str> = regpath::split(path).collect();
        let mut guard = self.lock()?;
        guard.check_access(hive, &segments)?;
        let key = guard
            .root_mut(hive)
            .find_mut(&segments)
            .ok_or_else(|| RegistryError::KeyNotFound {
                path: display_path(hive, &segments),
            })?;
        let folded = fold(name);
        // 覆盖时保留原有值名的大小写
        let stored_name = key
            .values
            .get(&folded)
            .map(|v| v.name.clone())
            .unwrap_or_else(|| name.to_string());
        key.values
            .insert(folded, RegistryValue::new(stored_name, value_type, data.clone()));
        Ok(())
    }

    fn create_key(&self, hive: RootHive, path: &str) -> Result<()> {
        let segments: Vec<&str> = regpath::split(path).collect();
        let mut guard = self.lock()?;
        if guard.find(hive, &segments).is_some() {
            return Ok(());
        }
        guard.check_access(hive, &segments)?;
        let mut node = guard.root_mut(hive);
        for seg in &segments {
            node = node
                .subkeys
                .entry(fold(seg))
                .or_insert_with(|| MemoryKey::named(seg));
        }
        Ok(())
    }

    fn delete_key(&self, hive: RootHive, path: &str) -> Result<()> {
        let segments: Vec<&str> = regpath::split(path).collect();
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(RegistryError::InvalidPath {
                path: path.to_string(),
            });
        };
        let mut guard = self.lock()?;
        guard.check_access(hive, &segments)?;
        let removed = guard
            .root_mut(hive)
            .find_mut(parents)
            .and_then(|parent| parent.subkeys.remove(&fold(leaf)));
        match removed {
            Some(_) => Ok(()),
            None => Err(RegistryError::KeyNotFound {
                path: display_path(hive, &segments),
            }),
        }
    }

    fn delete_value(&self, hive: RootHive, path: &str, name: &str) -> Result<()> {
        let segments: Vec<&str> = regpath::split(path).collect();
        let mut guard = self.lock()?;
        guard.check_access(hive, &segments)?;
        let key = guard
            .root_mut(hive)
            .find_mut(&segments)
            .ok_or_else(|| RegistryError::KeyNotFound {
                path: display_path(hive, &segments),
            })?;
        match key.values.remove(&fold(name)) {
            Some(_) => Ok(()),
            None => Err(RegistryError::ValueNotFound {
                path: display_path(hive, &segments),
                name: name.to_string(),
            }),
        }
    }

    fn list_subkeys(&self, hive: RootHive, path: &str) -> Result<Vec<String>> {
        let segments: Vec<&str> = regpath::split(path).collect();
        let guard = self.lock()?;
        Ok(guard
            .find(hive, &segments)
            .map(|key| key.subkeys.values().map(|k| k.name.clone()).collect())
            .unwrap_or_default())
    }
}

/// 注册表名称比较规则：大小写不敏感。
fn fold(name: &str) -> String {
    name.to_lowercase()
}

fn display_path(hive: RootHive, segments: &[&str]) -> String {
    RegPath::parse(hive, &segments.join("\\")).to_string()
}
