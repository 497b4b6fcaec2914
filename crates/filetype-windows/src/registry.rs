//! 基于 `winreg` 的真实注册表存储。
//!
//! 约定：
//! - 键/值不存在时读取返回 `None`，列子键返回空列表
//! - 权限不足映射为 [`RegistryError::AccessDenied`]，其余系统错误映射为 `Io`
//! - 读取时遇到不支持的值类型会跳过该值（记录 debug 日志）
//! - 字符串与 DWORD 使用 winreg 自带的 `ToRegValue`/`FromRegValue` 转换，其余类型走 [`codec`]
//!
//! 权限要求：
//! - 读写 `HKCU` 通常不需要管理员权限；写入 `HKLM`/`HKCR` 通常需要
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::io;

use filetype_core::error::{RegistryError, Result};
use filetype_core::regpath::RegPath;
use filetype_core::store::RegistryStore;
use filetype_core::value::{RegistryData, RegistryKeySnapshot, RegistryValue, RootHive, ValueType};
use tracing::debug;
use winreg::enums::{
    RegType, HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_DYN_DATA,
    HKEY_LOCAL_MACHINE, HKEY_PERFORMANCE_DATA, HKEY_USERS, KEY_READ, KEY_SET_VALUE,
};
use winreg::types::{FromRegValue, ToRegValue};
use winreg::{RegKey, RegValue};

use crate::codec;

/// Windows 注册表存储（无内部状态，每次操作独立打开键）。
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsRegistry;

impl WindowsRegistry {
    pub fn new() -> Self {
        Self
    }
}

impl RegistryStore for WindowsRegistry {
    fn get_key(&self, hive: RootHive, path: &str) -> Result<Option<RegistryKeySnapshot>> {
        let target = RegPath::parse(hive, path);
        let Some(key) = open(&target, KEY_READ)? else {
            return Ok(None);
        };
        let mut snapshot = RegistryKeySnapshot::new();
        for item in key.enum_values() {
            let (name, raw) = item.map_err(|e| map_io(e, "枚举值", &target))?;
            match decode_value(&name, &raw) {
                Some(value) => snapshot.insert(value),
                None => debug!("跳过不支持的值: {target} [{name}] ({:?})", raw.vtype),
            }
        }
        Ok(Some(snapshot))
    }

    fn set_value(
        &self,
        hive: RootHive,
        path: &str,
        name: &str,
        value_type: ValueType,
        data: &RegistryData,
    ) -> Result<()> {
        let target = RegPath::parse(hive, path);
        let raw = encode_value(name, value_type, data)?;
        let key = open(&target, KEY_SET_VALUE)?.ok_or_else(|| RegistryError::KeyNotFound {
            path: target.to_string(),
        })?;
        key.set_raw_value(name, &raw)
            .map_err(|e| map_io(e, "写入值", &target))
    }

    fn create_key(&self, hive: RootHive, path: &str) -> Result<()> {
        let target = RegPath::parse(hive, path);
        predef(hive)
            .create_subkey(target.join())
            .map(|_| ())
            .map_err(|e| map_io(e, "创建键", &target))
    }

    fn delete_key(&self, hive: RootHive, path: &str) -> Result<()> {
        let target = RegPath::parse(hive, path);
        // 不允许删除根键本身
        if target.is_root() {
            return Err(RegistryError::InvalidPath {
                path: path.to_string(),
            });
        }
        match predef(hive).delete_subkey_all(target.join()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RegistryError::KeyNotFound {
                path: target.to_string(),
            }),
            Err(e) => Err(map_io(e, "删除键", &target)),
        }
    }

    fn delete_value(&self, hive: RootHive, path: &str, name: &str) -> Result<()> {
        let target = RegPath::parse(hive, path);
        let key = open(&target, KEY_SET_VALUE)?.ok_or_else(|| RegistryError::KeyNotFound {
            path: target.to_string(),
        })?;
        match key.delete_value(name) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RegistryError::ValueNotFound {
                path: target.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(map_io(e, "删除值", &target)),
        }
    }

    fn list_subkeys(&self, hive: RootHive, path: &str) -> Result<Vec<String>> {
        let target = RegPath::parse(hive, path);
        let Some(key) = open(&target, KEY_READ)? else {
            return Ok(Vec::new());
        };
        key.enum_keys()
            .map(|item| item.map_err(|e| map_io(e, "枚举子键", &target)))
            .collect()
    }
}

fn predef(hive: RootHive) -> RegKey {
    RegKey::predef(match hive {
        RootHive::ClassesRoot => HKEY_CLASSES_ROOT,
        RootHive::CurrentUser => HKEY_CURRENT_USER,
        RootHive::LocalMachine => HKEY_LOCAL_MACHINE,
        RootHive::Users => HKEY_USERS,
        RootHive::PerformanceData => HKEY_PERFORMANCE_DATA,
        RootHive::CurrentConfig => HKEY_CURRENT_CONFIG,
        RootHive::DynData => HKEY_DYN_DATA,
    })
}

/// 打开已有键；不存在时返回 `Ok(None)`。
fn open(target: &RegPath, access: u32) -> Result<Option<RegKey>> {
    match predef(target.hive()).open_subkey_with_flags(target.join(), access) {
        Ok(key) => Ok(Some(key)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(map_io(e, "打开键", target)),
    }
}

fn map_io(err: io::Error, operation: &str, target: &RegPath) -> RegistryError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return RegistryError::AccessDenied {
            path: target.to_string(),
        };
    }
    RegistryError::Io {
        operation: format!("{operation} {target}"),
        source: err,
    }
}

fn encode_value(name: &str, value_type: ValueType, data: &RegistryData) -> Result<RegValue> {
    let raw = match (value_type, data) {
        (ValueType::Sz, RegistryData::String(s)) => s.to_reg_value(),
        // 与 REG_SZ 字节布局相同，仅类型标记不同
        (ValueType::ExpandSz, RegistryData::String(s)) => RegValue {
            vtype: RegType::REG_EXPAND_SZ,
            ..s.to_reg_value()
        },
        (ValueType::MultiSz, RegistryData::MultiString(items)) => items.to_reg_value(),
        (ValueType::Dword, RegistryData::U32(v)) => v.to_reg_value(),
        _ => RegValue {
            bytes: codec::encode(name, value_type, data)?,
            vtype: reg_type(value_type),
        },
    };
    Ok(raw)
}

fn decode_value(name: &str, raw: &RegValue) -> Option<RegistryValue> {
    let value_type = value_type(&raw.vtype)?;
    let data = match value_type {
        ValueType::Sz | ValueType::ExpandSz => RegistryData::String(String::from_reg_value(raw).ok()?),
        ValueType::MultiSz => RegistryData::MultiString(Vec::<String>::from_reg_value(raw).ok()?),
        ValueType::Dword => RegistryData::U32(u32::from_reg_value(raw).ok()?),
        _ => codec::decode(value_type, &raw.bytes)?,
    };
    Some(RegistryValue::new(name, value_type, data))
}

fn value_type(vtype: &RegType) -> Option<ValueType> {
    Some(match vtype {
        RegType::REG_SZ => ValueType::Sz,
        RegType::REG_EXPAND_SZ => ValueType::ExpandSz,
        RegType::REG_BINARY => ValueType::Binary,
        RegType::REG_DWORD => ValueType::Dword,
        RegType::REG_DWORD_BIG_ENDIAN => ValueType::DwordBigEndian,
        RegType::REG_LINK => ValueType::Link,
        RegType::REG_MULTI_SZ => ValueType::MultiSz,
        RegType::REG_RESOURCE_LIST => ValueType::ResourceList,
        _ => return None,
    })
}

fn reg_type(value_type: ValueType) -> RegType {
    match value_type {
        ValueType::Sz => RegType::REG_SZ,
        ValueType::ExpandSz => RegType::REG_EXPAND_SZ,
        ValueType::Binary => RegType::REG_BINARY,
        ValueType::Dword => RegType::REG_DWORD,
        ValueType::DwordBigEndian => RegType::REG_DWORD_BIG_ENDIAN,
        ValueType::Link => RegType::REG_LINK,
        ValueType::MultiSz => RegType::REG_MULTI_SZ,
        ValueType::ResourceList => RegType::REG_RESOURCE_LIST,
    }
}
