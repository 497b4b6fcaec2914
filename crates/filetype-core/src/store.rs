//! 注册表访问能力接口（RegistryStore）及其便捷函数。
//!
//! 目标：
//! - 将“按路径访问注册表”的原语集中为一个 trait，上层工作流通过注入使用
//! - 真实注册表（`filetype-windows`）与内存实现（[`crate::memory::MemoryRegistry`]）可互换
//!
//! 约定：
//! - 路径为调用方拼接的字符串，使用 `\` 分隔，不含根键名
//! - 键/值不存在属于正常结果，读取接口返回 `Ok(None)` 而不是错误
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::sync::Arc;

use crate::error::Result;
use crate::value::{RegistryData, RegistryKeySnapshot, RootHive, ValueType};

/// 注册表原语操作。
///
/// 所有方法都是“请求-响应”式的，无内部状态要求；实现需保证 `Send + Sync`。
pub trait RegistryStore: Send + Sync {
    /// 读取键下全部命名值。
    ///
    /// 返回值：
    /// - `Ok(Some(snapshot))`：键存在（可能没有任何值）
    /// - `Ok(None)`：键不存在
    fn get_key(&self, hive: RootHive, path: &str) -> Result<Option<RegistryKeySnapshot>>;

    /// 读取单个值的数据；键或值不存在时返回 `Ok(None)`。
    fn get_value(&self, hive: RootHive, path: &str, name: &str) -> Result<Option<RegistryData>> {
        Ok(self
            .get_key(hive, path)?
            .and_then(|key| key.get(name).map(|v| v.data.clone())))
    }

    /// 创建或覆盖命名值；`name` 为空字符串时写入默认值。
    ///
    /// 异常处理：
    /// - 键不存在、权限不足、类型与数据形态不一致时返回错误
    fn set_value(
        &self,
        hive: RootHive,
        path: &str,
        name: &str,
        value_type: ValueType,
        data: &RegistryData,
    ) -> Result<()>;

    /// 创建键（含缺失的中间键）；键已存在时视为成功。
    fn create_key(&self, hive: RootHive, path: &str) -> Result<()>;

    /// 递归删除键及其全部子键。
    fn delete_key(&self, hive: RootHive, path: &str) -> Result<()>;

    /// 删除命名值。
    fn delete_value(&self, hive: RootHive, path: &str, name: &str) -> Result<()>;

    /// 列出直接子键名；键不存在时返回空列表。
    fn list_subkeys(&self, hive: RootHive, path: &str) -> Result<Vec<String>>;

    /// 键是否存在。
    fn key_exists(&self, hive: RootHive, path: &str) -> Result<bool> {
        Ok(self.get_key(hive, path)?.is_some())
    }
}

impl<S: RegistryStore + ?Sized> RegistryStore for &S {
    fn get_key(&self, hive: RootHive, path: &str) -> Result<Option<RegistryKeySnapshot>> {
        (**self).get_key(hive, path)
    }

    fn get_value(&self, hive: RootHive, path: &str, name: &str) -> Result<Option<RegistryData>> {
        (**self).get_value(hive, path, name)
    }

    fn set_value(
        &self,
        hive: RootHive,
        path: &str,
        name: &str,
        value_type: ValueType,
        data: &RegistryData,
    ) -> Result<()> {
        (**self).set_value(hive, path, name, value_type, data)
    }

    fn create_key(&self, hive: RootHive, path: &str) -> Result<()> {
        (**self).create_key(hive, path)
    }

    fn delete_key(&self, hive: RootHive, path: &str) -> Result<()> {
        (**self).delete_key(hive, path)
    }

    fn delete_value(&self, hive: RootHive, path: &str, name: &str) -> Result<()> {
        (**self).delete_value(hive, path, name)
    }

    fn list_subkeys(&self, hive: RootHive, path: &str) -> Result<Vec<String>> {
        (**self).list_subkeys(hive, path)
    }
}

impl<S: RegistryStore + ?Sized> RegistryStore for Arc<S> {
    fn get_key(&self, hive: RootHive, path: &str) -> Result<Option<RegistryKeySnapshot>> {
        (**self).get_key(hive, path)
    }

    fn get_value(&self, hive: RootHive, path: &str, name: &str) -> Result<Option<RegistryData>> {
        (**self).get_value(hive, path, name)
    }

    fn set_value(
        &self,
        hive: RootHive,
        path: &str,
        name: &str,
        value_type: ValueType,
        data: &RegistryData,
    ) -> Result<()> {
        (**self).set_value(hive, path, name, value_type, data)
    }

    fn create_key(&self, hive: RootHive, path: &str) -> Result<()> {
        (**self).create_key(hive, path)
    }

    fn delete_key(&self, hive: RootHive, path: &str) -> Result<()> {
        (**self).delete_key(hive, path)
    }

    fn delete_value(&self, hive: RootHive, path: &str, name: &str) -> Result<()> {
        (**self).delete_value(hive, path, name)
    }

    fn list_subkeys(&self, hive: RootHive, path: &str) -> Result<Vec<String>> {
        (**self).list_subkeys(hive, path)
    }
}

impl<S: RegistryStore + ?Sized> RegistryStore for Box<S> {
    fn get_key(&self, hive: RootHive, path: &str) -> Result<Option<RegistryKeySnapshot>> {
        (**self).get_key(hive, path)
    }

    fn get_value(&self, hive: RootHive, path: &str, name: &str) -> Result<Option<RegistryData>> {
        (**self).get_value(hive, path, name)
    }

    fn set_value(
        &self,
        hive: RootHive,
        path: &str,
        name: &str,
        value_type: ValueType,
        data: &RegistryData,
    ) -> Result<()> {
        (**self).set_value(hive, path, name, value_type, data)
    }

    fn create_key(&self, hive: RootHive, path: &str) -> Result<()> {
        (**self).create_key(hive, path)
    }

    fn delete_key(&self, hive: RootHive, path: &str) -> Result<()> {
        (**self).delete_key(hive, path)
    }

    fn delete_value(&self, hive: RootHive, path: &str, name: &str) -> Result<()> {
        (**self).delete_value(hive, path, name)
    }

    fn list_subkeys(&self, hive: RootHive, path: &str) -> Result<Vec<String>> {
        (**self).list_subkeys(hive, path)
    }
}

/// 读取键快照；键不存在返回 `Ok(None)`。
pub fn get_registry_key<S: RegistryStore + ?Sized>(
    store: &S,
    hive: RootHive,
    path: &str,
) -> Result<Option<RegistryKeySnapshot>> {
    store.get_key(hive, path)
}

/// 读取单个值；键或值不存在返回 `Ok(None)`。
pub fn get_registry_value<S: RegistryStore + ?Sized>(
    store: &S,
    hive: RootHive,
    path: &str,
    name: &str,
) -> Result<Option<RegistryData>> {
    store.get_value(hive, path, name)
}

/// 写入值（类型标签由调用方保证与数据一致）。
pub fn set_registry_value<S: RegistryStore + ?Sized>(
    store: &S,
    hive: RootHive,
    path: &str,
    name: &str,
    value_type: ValueType,
    data: &RegistryData,
) -> Result<()> {
    store.set_value(hive, path, name, value_type, data)
}

pub fn create_registry_key<S: RegistryStore + ?Sized>(
    store: &S,
    hive: RootHive,
    path: &str,
) -> Result<()> {
    store.create_key(hive, path)
}

pub fn delete_registry_key<S: RegistryStore + ?Sized>(
    store: &S,
    hive: RootHive,
    path: &str,
) -> Result<()> {
    store.delete_key(hive, path)
}

pub fn delete_registry_value<S: RegistryStore + ?Sized>(
    store: &S,
    hive: RootHive,
    path: &str,
    name: &str,
) -> Result<()> {
    store.delete_value(hive, path, name)
}

pub fn list_registry_subkeys<S: RegistryStore + ?Sized>(
    store: &S,
    hive: RootHive,
    path: &str,
) -> Result<Vec<String>> {
    store.list_subkeys(hive, path)
}
