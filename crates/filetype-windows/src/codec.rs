//! winreg 没有内置转换的值类型的原始字节编解码。
//!
//! 格式：
//! - `REG_DWORD_BIG_ENDIAN`：4 字节大端
//! - `REG_BINARY`/`REG_LINK`/`REG_RESOURCE_LIST`：原样字节
//!
//! `REG_SZ`/`REG_EXPAND_SZ`/`REG_MULTI_SZ`/`REG_DWORD` 由 `winreg` 的
//! `ToRegValue`/`FromRegValue` 处理，见 `registry` 模块。
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use filetype_core::error::{RegistryError, Result};
use filetype_core::value::{RegistryData, ValueType};

/// 按值类型编码数据。
///
/// 异常处理：
/// - 数据形态与值类型不一致，或值类型不属于本模块处理范围时返回 [`RegistryError::TypeMismatch`]
pub fn encode(name: &str, value_type: ValueType, data: &RegistryData) -> Result<Vec<u8>> {
    match (value_type, data) {
        (ValueType::DwordBigEndian, RegistryData::U32(v)) => Ok(v.to_be_bytes().to_vec()),
        (
            ValueType::Binary | ValueType::Link | ValueType::ResourceList,
            RegistryData::Bytes(b),
        ) => Ok(b.clone()),
        _ => Err(RegistryError::TypeMismatch {
            name: name.to_string(),
            value_type,
            actual: data.kind_name(),
        }),
    }
}

/// 按值类型解码原始字节；长度不合法或类型不属于本模块时返回 `None`。
pub fn decode(value_type: ValueType, bytes: &[u8]) -> Option<RegistryData> {
    match value_type {
        ValueType::DwordBigEndian => {
            let raw: [u8; 4] = bytes.try_into().ok()?;
            Some(RegistryData::U32(u32::from_be_bytes(raw)))
        }
        ValueType::Binary | ValueType::Link | ValueType::ResourceList => {
            Some(RegistryData::Bytes(bytes.to_vec()))
        }
        ValueType::Sz | ValueType::ExpandSz | ValueType::MultiSz | ValueType::Dword => None,
    }
}
