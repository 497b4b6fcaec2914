//! 注册表访问错误类型。
//!
//! 分类约定：
//! - “不存在”（键/值缺失）是正常结果，通过 `Option` 表达，不属于本类型
//! - 写入/创建/删除被存储拒绝（权限不足、类型不匹配等）时返回 [`RegistryError`]
//! - 其它底层故障统一归入 `Io`，工作流层面不做区分
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::io;

use thiserror::Error;

use crate::value::ValueType;

/// 注册表存储层错误。
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("拒绝访问: {path}")]
    AccessDenied { path: String },

    #[error("注册表键不存在: {path}")]
    KeyNotFound { path: String },

    #[error("注册表值不存在: {path} [{name}]")]
    ValueNotFound { path: String, name: String },

    /// 值类型标签与数据形态不一致（调用方错误，由存储层发现）。
    #[error("值类型与数据不匹配: {name} 声明为 {value_type}，实际数据为 {actual}")]
    TypeMismatch {
        name: String,
        value_type: ValueType,
        actual: &'static str,
    },

    #[error("非法注册表路径: {path:?}")]
    InvalidPath { path: String },

    #[error("未知根键: {0}")]
    UnknownHive(String),

    #[error("未知值类型: {0}")]
    UnknownValueType(String),

    #[error("注册表操作失败: {operation}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("注册表存储锁已损坏")]
    Poisoned,
}

/// 注册表存储层结果别名。
pub type Result<T> = std::result::Result<T, RegistryError>;
