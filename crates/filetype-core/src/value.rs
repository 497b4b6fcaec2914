//! 注册表数据模型：根键、值类型、值与键快照。
//!
//! 约定：
//! - 根键与值类型的数值与 Win32 定义保持一致（便于与原生 API 互转）
//! - [`RegistryKeySnapshot`] 是读取时刻的独立副本，与存储之间没有任何关联
//! - 值类型标签与数据形态是否一致由存储层判断，本模块只描述“期望的形态”
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// 注册表根键（顶层 hive）。
///
/// 数值即 Win32 预定义句柄 `HKEY_*` 的 32 位值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootHive {
    /// HKEY_CLASSES_ROOT。
    ClassesRoot,
    /// HKEY_CURRENT_USER。
    CurrentUser,
    /// HKEY_LOCAL_MACHINE。
    LocalMachine,
    /// HKEY_USERS。
    Users,
    /// HKEY_PERFORMANCE_DATA。
    PerformanceData,
    /// HKEY_CURRENT_CONFIG。
    CurrentConfig,
    /// HKEY_DYN_DATA。
    DynData,
}

impl RootHive {
    /// 全部根键（按句柄值升序）。
    pub const ALL: [RootHive; 7] = [
        RootHive::ClassesRoot,
        RootHive::CurrentUser,
        RootHive::LocalMachine,
        RootHive::Users,
        RootHive::PerformanceData,
        RootHive::CurrentConfig,
        RootHive::DynData,
    ];

    /// 返回 Win32 预定义句柄值。
    pub fn raw(self) -> u32 {
        match self {
            RootHive::ClassesRoot => 0x8000_0000,
            RootHive::CurrentUser => 0x8000_0001,
            RootHive::LocalMachine => 0x8000_0002,
            RootHive::Users => 0x8000_0003,
            RootHive::PerformanceData => 0x8000_0004,
            RootHive::CurrentConfig => 0x8000_0005,
            RootHive::DynData => 0x8000_0006,
        }
    }

    /// 由句柄值解析根键；未知值返回 `None`。
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.raw() == raw)
    }

    /// 完整名称（例如 `HKEY_CURRENT_USER`）。
    pub fn name(self) -> &'static str {
        match self {
            RootHive::ClassesRoot => "HKEY_CLASSES_ROOT",
            RootHive::CurrentUser => "HKEY_CURRENT_USER",
            RootHive::LocalMachine => "HKEY_LOCAL_MACHINE",
            RootHive::Users => "HKEY_USERS",
            RootHive::PerformanceData => "HKEY_PERFORMANCE_DATA",
            RootHive::CurrentConfig => "HKEY_CURRENT_CONFIG",
            RootHive::DynData => "HKEY_DYN_DATA",
        }
    }

    /// 缩写名称（例如 `HKCU`）。
    pub fn short_name(self) -> &'static str {
        match self {
            RootHive::ClassesRoot => "HKCR",
            RootHive::CurrentUser => "HKCU",
            RootHive::LocalMachine => "HKLM",
            RootHive::Users => "HKU",
            RootHive::PerformanceData => "HKPD",
            RootHive::CurrentConfig => "HKCC",
            RootHive::DynData => "HKDD",
        }
    }
}

impl fmt::Display for RootHive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RootHive {
    type Err = RegistryError;

    /// 接受完整名称、缩写（大小写不敏感）。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|h| s.eq_ignore_ascii_case(h.name()) || s.eq_ignore_ascii_case(h.short_name()))
            .ok_or_else(|| RegistryError::UnknownHive(s.to_string()))
    }
}

/// 注册表值类型（数值与 Win32 `REG_*` 一致）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ValueType {
    /// REG_SZ：以 NUL 结尾的字符串。
    Sz,
    /// REG_EXPAND_SZ：含环境变量引用的字符串。
    ExpandSz,
    /// REG_BINARY。
    Binary,
    /// REG_DWORD（小端 32 位，与 REG_DWORD_LITTLE_ENDIAN 相同）。
    Dword,
    /// REG_DWORD_BIG_ENDIAN。
    DwordBigEndian,
    /// REG_LINK。
    Link,
    /// REG_MULTI_SZ：字符串序列。
    MultiSz,
    /// REG_RESOURCE_LIST。
    ResourceList,
}

/// 数据的期望形态（由值类型决定）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataShape {
    Bytes,
    String,
    U32,
    MultiString,
}

impl ValueType {
    /// REG_DWORD_LITTLE_ENDIAN 与 REG_DWORD 是同一个值。
    pub const DWORD_LITTLE_ENDIAN: ValueType = ValueType::Dword;

    const ALL: [ValueType; 8] = [
        ValueType::Sz,
        ValueType::ExpandSz,
        ValueType::Binary,
        ValueType::Dword,
        ValueType::DwordBigEndian,
        ValueType::Link,
        ValueType::MultiSz,
        ValueType::ResourceList,
    ];

    pub fn raw(self) -> u32 {
        match self {
            ValueType::Sz => 1,
            ValueType::ExpandSz => 2,
            ValueType::Binary => 3,
            ValueType::Dword => 4,
            ValueType::DwordBigEndian => 5,
            ValueType::Link => 6,
            ValueType::MultiSz => 7,
            ValueType::ResourceList => 8,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.raw() == raw)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Sz => "REG_SZ",
            ValueType::ExpandSz => "REG_EXPAND_SZ",
            ValueType::Binary => "REG_BINARY",
            ValueType::Dword => "REG_DWORD",
            ValueType::DwordBigEndian => "REG_DWORD_BIG_ENDIAN",
            ValueType::Link => "REG_LINK",
            ValueType::MultiSz => "REG_MULTI_SZ",
            ValueType::ResourceList => "REG_RESOURCE_LIST",
        }
    }

    /// 该类型期望的数据形态。
    pub fn shape(self) -> DataShape {
        match self {
            ValueType::Sz | ValueType::ExpandSz => DataShape::String,
            ValueType::Dword | ValueType::DwordBigEndian => DataShape::U32,
            ValueType::MultiSz => DataShape::MultiString,
            ValueType::Binary | ValueType::Link | ValueType::ResourceList => DataShape::Bytes,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = RegistryError;

    /// 接受 `REG_SZ` / `sz` / `DWORD_LITTLE_ENDIAN` 等写法（大小写不敏感）。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("REG_").unwrap_or(&upper);
        if bare == "DWORD_LITTLE_ENDIAN" {
            return Ok(ValueType::DWORD_LITTLE_ENDIAN);
        }
        Self::ALL
            .into_iter()
            .find(|t| &t.name()[4..] == bare)
            .ok_or_else(|| RegistryError::UnknownValueType(s.to_string()))
    }
}

impl TryFrom<u32> for ValueType {
    type Error = RegistryError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or_else(|| RegistryError::UnknownValueType(raw.to_string()))
    }
}

impl From<ValueType> for u32 {
    fn from(t: ValueType) -> u32 {
        t.raw()
    }
}

/// 注册表值数据（字节/字符串/32 位整数/字符串序列）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryData {
    String(String),
    U32(u32),
    MultiString(Vec<String>),
    Bytes(Vec<u8>),
}

impl RegistryData {
    pub fn shape(&self) -> DataShape {
        match self {
            RegistryData::String(_) => DataShape::String,
            RegistryData::U32(_) => DataShape::U32,
            RegistryData::MultiString(_) => DataShape::MultiString,
            RegistryData::Bytes(_) => DataShape::Bytes,
        }
    }

    /// 形态名称（用于错误信息）。
    pub fn kind_name(&self) -> &'static str {
        match self {
            RegistryData::String(_) => "string",
            RegistryData::U32(_) => "u32",
            RegistryData::MultiString(_) => "string[]",
            RegistryData::Bytes(_) => "bytes",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RegistryData::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            RegistryData::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// 按值类型修正 JSON 反序列化时的歧义（空数组既可能是字节也可能是字符串序列）。
    fn coerce(self, value_type: ValueType) -> Self {
        match (self, value_type.shape()) {
            (RegistryData::MultiString(v), DataShape::Bytes) if v.is_empty() => {
                RegistryData::Bytes(Vec::new())
            }
            (RegistryData::Bytes(v), DataShape::MultiString) if v.is_empty() => {
                RegistryData::MultiString(Vec::new())
            }
            (data, _) => data,
        }
    }
}

impl From<&str> for RegistryData {
    fn from(s: &str) -> Self {
        RegistryData::String(s.to_string())
    }
}

impl From<String> for RegistryData {
    fn from(s: String) -> Self {
        RegistryData::String(s)
    }
}

impl From<u32> for RegistryData {
    fn from(v: u32) -> Self {
        RegistryData::U32(v)
    }
}

impl From<Vec<String>> for RegistryData {
    fn from(v: Vec<String>) -> Self {
        RegistryData::MultiString(v)
    }
}

impl From<Vec<u8>> for RegistryData {
    fn from(v: Vec<u8>) -> Self {
        RegistryData::Bytes(v)
    }
}

impl fmt::Display for RegistryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryData::String(s) => f.write_str(s),
            RegistryData::U32(v) => write!(f, "{v} (0x{v:08x})"),
            RegistryData::MultiString(v) => f.write_str(&v.join("\n")),
            RegistryData::Bytes(b) => {
                for (i, byte) in b.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// 键下的一个命名值；`name` 为空字符串表示默认值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRegistryValue")]
pub struct RegistryValue {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(rename = "value")]
    pub data: RegistryData,
}

#[derive(Deserialize)]
struct RawRegistryValue {
    name: String,
    #[serde(rename = "type")]
    value_type: ValueType,
    value: RegistryData,
}

impl From<RawRegistryValue> for RegistryValue {
    fn from(raw: RawRegistryValue) -> Self {
        Self {
            name: raw.name,
            value_type: raw.value_type,
            data: raw.value.coerce(raw.value_type),
        }
    }
}

impl RegistryValue {
    pub fn new(name: impl Into<String>, value_type: ValueType, data: impl Into<RegistryData>) -> Self {
        Self {
            name: name.into(),
            value_type,
            data: data.into(),
        }
    }

    /// 构造 REG_SZ 值。
    pub fn sz(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, ValueType::Sz, RegistryData::String(value.into()))
    }

    /// 类型标签与数据形态是否一致。
    pub fn is_well_formed(&self) -> bool {
        self.value_type.shape() == self.data.shape()
    }
}

/// 单个键在读取时刻的全部命名值（值名唯一）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryKeySnapshot {
    values: BTreeMap<String, RegistryValue>,
}

impl RegistryKeySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入一个值；同名值会被覆盖。
    pub fn insert(&mut self, value: RegistryValue) {
        self.values.insert(value.name.clone(), value);
    }

    /// 按值名查找；先精确匹配，再按注册表规则忽略大小写匹配。
    pub fn get(&self, name: &str) -> Option<&RegistryValue> {
        self.values.get(name).or_else(|| {
            self.values
                .values()
                .find(|v| v.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 默认值（空名称）。
    pub fn default_value(&self) -> Option<&RegistryValue> {
        self.values.get("")
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &RegistryValue> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<RegistryValue> for RegistryKeySnapshot {
    fn from_iter<I: IntoIterator<Item = RegistryValue>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for value in iter {
            snapshot.insert(value);
        }
        snapshot
    }
}
