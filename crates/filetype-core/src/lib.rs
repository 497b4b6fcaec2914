//! 文件类型关联核心库（跨平台/与具体注册表实现无关）。
//!
//! 功能：
//! - 定义注册表模型：根键、值类型、值、键快照与路径构造器
//! - 定义注册表存储能力（[`RegistryStore`]）及内存实现（测试/沙箱）
//! - 提供 ProgID 注册/清理工作流与执行报告
//! - 提供 registry.log 日志格式、关联清单加载与路径约定
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

pub mod config;
pub mod error;
pub mod journal;
pub mod memory;
pub mod paths;
pub mod progid;
pub mod regpath;
pub mod report;
pub mod store;
pub mod value;

pub use error::RegistryError;
pub use memory::MemoryRegistry;
pub use progid::{
    register_prog_id, remove_prog_id, validate_prog_id, ProgIdDescriptor, ProgIdManager,
};
pub use regpath::RegPath;
pub use report::{StepAction, StepFailure, Workflow, WorkflowReport};
pub use store::{
    create_registry_key, delete_registry_key, delete_registry_value, get_registry_key,
    get_registry_value, list_registry_subkeys, set_registry_value, RegistryStore,
};
pub use value::{RegistryData, RegistryKeySnapshot, RegistryValue, RootHive, ValueType};
