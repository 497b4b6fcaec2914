//! Windows 注册表能力封装。
//!
//! 目标：
//! - 以 [`filetype_core::RegistryStore`] 的形式提供真实注册表访问，上层工作流不直接依赖 Win32 细节
//! - 值数据的原始字节编解码集中在 [`codec`]，与平台无关，可在任意平台测试
//!
//! 权限要求：
//! - 读写 `HKCU` 通常不需要管理员权限；写入 `HKLM`/`HKCR` 通常需要
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

pub mod codec;
#[cfg(windows)]
pub mod registry;

#[cfg(windows)]
pub use registry::WindowsRegistry;
