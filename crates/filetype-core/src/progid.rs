//! ProgID（文件类型关联）注册与清理工作流。
//!
//! 注册写入的键（均位于 `HKCU\Software\Classes` 下）：
//! - `<ProgID>`：默认值 = 类型描述
//! - `<ProgID>\DefaultIcon`：默认值 = 图标路径
//! - `<ProgID>\shell\open`：默认值 = `Open with <应用名>`，`FriendlyAppName` = 应用名
//! - `<ProgID>\shell\open\command`：默认值 = `"<命令>" "--process-start-args" "%1"`
//! - `.<扩展名>` 与 `.<扩展名>\OpenWithProgids`：后者含名为 `<ProgID>` 的空字符串值
//!
//! 执行策略（尽力而为）：
//! - 每一步按顺序执行，失败只记录日志与报告，不中断后续步骤
//! - 工作流本身总是返回 [`WorkflowReport`]，调用方据此判断是否存在部分失败
//! - 不做冲突检测：已存在的 ProgID 会被原地覆盖
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{RegistryError, Result};
use crate::regpath::{RegPath, SEPARATOR};
use crate::report::{StepAction, Workflow, WorkflowReport};
use crate::store::RegistryStore;
use crate::value::{RegistryData, RegistryKeySnapshot, RootHive, ValueType};

/// 文件类型注册的基准路径（相对根键）。
pub const CLASSES_BASE: &str = "Software\\Classes";

/// 打开文件时传给应用的参数标记。
pub const PROCESS_START_ARGS_FLAG: &str = "--process-start-args";

/// 扩展名关联键名。
pub const OPEN_WITH_PROGIDS: &str = "OpenWithProgids";

/// 友好应用名的值名。
pub const FRIENDLY_APP_NAME: &str = "FriendlyAppName";

/// ProgID 描述（由调用方在每次注册/清理前构造，工作流不保留）。
///
/// 说明：
/// - 清理流程只使用 `prog_id` 与 `extensions`，其余字段可留空
/// - JSON 中 `progID` 可作为 `prog_id` 的别名
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgIdDescriptor {
    #[serde(alias = "progID", alias = "progId")]
    pub prog_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_path: String,
    #[serde(default)]
    pub app_name: String,
    /// 应用可执行文件路径（注册时会被包装为完整的 shell 命令）。
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

impl ProgIdDescriptor {
    /// 已规范化（带前导 `.`）的扩展名列表；未提供时为空。
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .flatten()
            .map(|ext| normalize_extension(ext))
            .collect()
    }
}

/// 名称能否作为单个子键名使用：非空白且不含 `\`。
fn is_key_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(SEPARATOR)
}

/// 校验 ProgID：不能为空白，也不能包含 `\`（否则会落到 `Software\Classes` 本身或其嵌套键上）。
pub fn validate_prog_id(prog_id: &str) -> Result<()> {
    if is_key_name(prog_id) {
        return Ok(());
    }
    Err(RegistryError::InvalidPath {
        path: prog_id.to_string(),
    })
}

/// 扩展名规范化：缺少前导 `.` 时补上，已有时原样返回（幂等）。
pub fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

/// 生成 `shell\open\command` 的默认值；`%1` 由系统在打开文件时替换为文件路径。
pub fn shell_command(command: &str) -> String {
    format!("\"{command}\" \"{PROCESS_START_ARGS_FLAG}\" \"%1\"")
}

/// ProgID 注册/清理编排器。
///
/// 存储能力通过构造参数注入；同一个实例可以被多次调用，调用之间不共享状态。
#[derive(Debug, Clone)]
pub struct ProgIdManager<S> {
    store: S,
    classes: RegPath,
}

impl<S: RegistryStore> ProgIdManager<S> {
    /// 使用 `HKCU\Software\Classes` 作为注册根。
    pub fn new(store: S) -> Self {
        Self {
            store,
            classes: RegPath::parse(RootHive::CurrentUser, CLASSES_BASE),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 注册根路径（`HKCU\Software\Classes`）。
    pub fn classes_path(&self) -> &RegPath {
        &self.classes
    }

    /// `Software\Classes\<ProgID>`。
    pub fn prog_id_path(&self, prog_id: &str) -> RegPath {
        self.classes.child(prog_id)
    }

    /// `Software\Classes\<.ext>`（`ext` 需已规范化）。
    pub fn extension_path(&self, ext: &str) -> RegPath {
        self.classes.child(ext)
    }

    /// 注册 ProgID 及（可选的）扩展名关联。
    ///
    /// 主要步骤：
    /// 1) 若 ProgID 键已存在，记录其当前内容（仅信息，不阻止覆盖）
    /// 2) 创建 ProgID 键，写入类型描述
    /// 3) 创建 `DefaultIcon`，写入图标路径
    /// 4) 创建 `shell`、`shell\open`，写入“Open with”描述与 `FriendlyAppName`
    /// 5) 创建 `shell\open\command`，写入 shell 命令
    /// 6) 逐个扩展名创建 `.<ext>` 与 `OpenWithProgids`，写入以 ProgID 命名的空值
    ///
    /// 返回值：
    /// - 总是返回报告；单步失败记录在 [`WorkflowReport::failures`] 中
    pub fn register(&self, descriptor: &ProgIdDescriptor) -> WorkflowReport {
        let id = descriptor.prog_id.as_str();
        let mut steps = Steps::new(&self.store, Workflow::Register, id);
        let Some(root) = self.checked_prog_id_path(&mut steps, StepAction::CreateKey) else {
            return steps.finish();
        };

        if let Some(Some(existing)) = steps.read_key(&root) {
            info!("{id} | Existing registry entries: {}", snapshot_json(&existing));
        }

        info!("{id} | Type Description: {}", descriptor.description);
        steps.create_key(&root);
        steps.set_sz(&root, "", &descriptor.description);

        info!("{id} | Icon Path: {}", descriptor.icon_path);
        let icon = root.child("DefaultIcon");
        steps.create_key(&icon);
        steps.set_sz(&icon, "", &descriptor.icon_path);

        info!("{id} | Shell Name: {}", descriptor.app_name);
        let shell = root.child("shell");
        steps.create_key(&shell);
        let open = shell.child("open");
        steps.create_key(&open);
        steps.set_sz(&open, "", &format!("Open with {}", descriptor.app_name));
        steps.set_sz(&open, FRIENDLY_APP_NAME, &descriptor.app_name);

        let command = shell_command(&descriptor.command);
        info!("{id} | Shell Command: {command}");
        let command_key = open.child("command");
        steps.create_key(&command_key);
        steps.set_sz(&command_key, "", &command);

        for ext in descriptor.normalized_extensions() {
            let Some(ext_key) = self.checked_extension_path(&mut steps, &ext, StepAction::CreateKey) else {
                continue;
            };
            info!("{id} | Register extension: {ext}");
            steps.create_key(&ext_key);
            steps.set_sz(&ext_key, "", "");
            let open_with = ext_key.child(OPEN_WITH_PROGIDS);
            steps.create_key(&open_with);
            steps.set_sz(&open_with, id, "");
        }

        steps.finish()
    }

    /// 清理 ProgID 及其扩展名关联（容忍从未创建过的条目）。
    ///
    /// 主要步骤：
    /// 1) ProgID 键存在则递归删除，不存在则记录“未找到”
    /// 2) 逐个扩展名检查 `OpenWithProgids` 下是否有以 ProgID 命名的值，有则删除
    ///
    /// 说明：
    /// - 扩展名逐个顺序处理，全部完成后才返回
    /// - `.<ext>` 键本身不删除（可能被其它应用共享）
    pub fn remove(&self, descriptor: &ProgIdDescriptor) -> WorkflowReport {
        let id = descriptor.prog_id.as_str();
        let mut steps = Steps::new(&self.store, Workflow::Remove, id);
        let Some(root) = self.checked_prog_id_path(&mut steps, StepAction::ReadKey) else {
            return steps.finish();
        };

        info!("{id} | Checking {root}");
        match steps.read_key(&root) {
            Some(Some(_)) => {
                info!("{id} | Cleaning up registry");
                if steps.delete_key(&root) {
                    info!("{id} | Registry cleaned up for {id}");
                }
            }
            Some(None) => info!("{id} | No registry entries found for {id}"),
            None => {}
        }

        for ext in descriptor.normalized_extensions() {
            let Some(ext_key) = self.checked_extension_path(&mut steps, &ext, StepAction::ReadKey) else {
                continue;
            };
            let open_with = ext_key.child(OPEN_WITH_PROGIDS);
            match steps.read_key(&open_with) {
                Some(Some(key)) if key.contains(id) => {
                    if steps.delete_value(&open_with, id) {
                        info!("{id} | Removed association for {ext}");
                    }
                }
                Some(_) => info!("{id} | No association found for {ext}"),
                None => {}
            }
        }

        steps.finish()
    }

    /// ProgID 键是否存在；ProgID 不合法时返回 [`RegistryError::InvalidPath`]。
    pub fn is_registered(&self, prog_id: &str) -> Result<bool> {
        validate_prog_id(prog_id)?;
        let root = self.prog_id_path(prog_id);
        self.store.key_exists(root.hive(), &root.join())
    }

    /// 校验 ProgID；不合法时记录失败，整个工作流不再访问存储。
    fn checked_prog_id_path(&self, steps: &mut Steps<'_, S>, action: StepAction) -> Option<RegPath> {
        let id = steps.report.prog_id.clone();
        match validate_prog_id(&id) {
            Ok(()) => Some(self.prog_id_path(&id)),
            Err(err) => {
                warn!("{id:?} | Skip invalid ProgID");
                steps.reject(action, &self.classes, err);
                None
            }
        }
    }

    /// 校验扩展名能作为单个子键名使用；否则按 `action` 记录失败并跳过。
    fn checked_extension_path(
        &self,
        steps: &mut Steps<'_, S>,
        ext: &str,
        action: StepAction,
    ) -> Option<RegPath> {
        if ext.strip_prefix('.').is_some_and(is_key_name) {
            return Some(self.extension_path(ext));
        }
        warn!("{} | Skip invalid extension: {ext:?}", steps.report.prog_id);
        let err = RegistryError::InvalidPath {
            path: ext.to_string(),
        };
        steps.reject(action, &self.classes, err);
        None
    }
}

/// 注册 ProgID（便捷函数）。
pub fn register_prog_id<S: RegistryStore>(store: S, descriptor: &ProgIdDescriptor) -> WorkflowReport {
    ProgIdManager::new(store).register(descriptor)
}

/// 清理 ProgID（便捷函数）。
pub fn remove_prog_id<S: RegistryStore>(store: S, descriptor: &ProgIdDescriptor) -> WorkflowReport {
    ProgIdManager::new(store).remove(descriptor)
}

/// 单次工作流的步骤执行器：调用存储、检查结果、记录失败。
struct Steps<'a, S> {
    store: &'a S,
    report: WorkflowReport,
}

impl<'a, S: RegistryStore> Steps<'a, S> {
    fn new(store: &'a S, workflow: Workflow, prog_id: &str) -> Self {
        Self {
            store,
            report: WorkflowReport::new(workflow, prog_id),
        }
    }

    /// 读取失败时返回 `None`（已记录），键不存在时返回 `Some(None)`。
    fn read_key(&mut self, path: &RegPath) -> Option<Option<RegistryKeySnapshot>> {
        let result = self.store.get_key(path.hive(), &path.join());
        self.check(StepAction::ReadKey, path, None, result)
    }

    fn create_key(&mut self, path: &RegPath) -> bool {
        let result = self.store.create_key(path.hive(), &path.join());
        self.check(StepAction::CreateKey, path, None, result).is_some()
    }

    fn set_sz(&mut self, path: &RegPath, name: &str, value: &str) -> bool {
        let data = RegistryData::String(value.to_string());
        let result = self
            .store
            .set_value(path.hive(), &path.join(), name, ValueType::Sz, &data);
        self.check(StepAction::SetValue, path, Some(name), result).is_some()
    }

    fn delete_key(&mut self, path: &RegPath) -> bool {
        let result = self.store.delete_key(path.hive(), &path.join());
        self.check(StepAction::DeleteKey, path, None, result).is_some()
    }

    fn delete_value(&mut self, path: &RegPath, name: &str) -> bool {
        let result = self.store.delete_value(path.hive(), &path.join(), name);
        self.check(StepAction::DeleteValue, path, Some(name), result).is_some()
    }

    /// 未执行即判定失败的步骤（参数不合法），同样计入尝试次数。
    fn reject(&mut self, action: StepAction, path: &RegPath, err: RegistryError) {
        self.check::<()>(action, path, None, Err(err));
    }

    /// 检查单步结果：失败则写日志并记入报告，从不中断流程。
    fn check<T>(
        &mut self,
        action: StepAction,
        path: &RegPath,
        value_name: Option<&str>,
        result: Result<T>,
    ) -> Option<T> {
        self.report.attempt();
        match result {
            Ok(v) => Some(v),
            Err(err) => {
                let failure = self.report.record(action, path, value_name, &err);
                error!("Error: {failure}");
                None
            }
        }
    }

    fn finish(self) -> WorkflowReport {
        let report = self.report;
        if !report.is_clean() {
            warn!(
                "{} | Finished with {} failed step(s) out of {}",
                report.prog_id,
                report.failures.len(),
                report.steps_attempted
            );
        }
        report
    }
}

fn snapshot_json(snapshot: &RegistryKeySnapshot) -> String {
    serde_json::to_string(snapshot).unwrap_or_else(|e| format!("<{e}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRegistry;

    fn sample() -> ProgIdDescriptor {
        ProgIdDescriptor {
            prog_id: "App.Document".to_string(),
            description: "App Document".to_string(),
            icon_path: "C:\\app\\icon.ico".to_string(),
            app_name: "MyApp".to_string(),
            command: "C:\\app\\myapp.exe".to_string(),
            extensions: Some(vec!["myext".to_string()]),
        }
    }

    #[test]
    fn normalize_extension_is_idempotent() {
        for ext in ["txt", ".txt", "", ".", "tar.gz"] {
            let once = normalize_extension(ext);
            assert!(once.starts_with('.'));
            assert_eq!(normalize_extension(&once), once);
        }
        assert_eq!(normalize_extension("myext"), ".myext");
        assert_eq!(normalize_extension(".myext"), ".myext");
    }

    #[test]
    fn shell_command_quotes_executable_and_placeholder() {
        assert_eq!(
            shell_command("C:\\app\\myapp.exe"),
            "\"C:\\app\\myapp.exe\" \"--process-start-args\" \"%1\""
        );
    }

    #[test]
    fn descriptor_accepts_prog_id_alias_and_optional_fields() {
        let d: ProgIdDescriptor =
            serde_json::from_str(r#"{ "progID": "App.Document", "extensions": ["a", ".b"] }"#).unwrap();
        assert_eq!(d.prog_id, "App.Document");
        assert!(d.description.is_empty());
        assert_eq!(d.normalized_extensions(), [".a", ".b"]);

        let d: ProgIdDescriptor = serde_json::from_str(r#"{ "prog_id": "X" }"#).unwrap();
        assert!(d.extensions.is_none());
        assert!(d.normalized_extensions().is_empty());
    }

    #[test]
    fn register_counts_every_step() {
        let reg = MemoryRegistry::new();
        let manager = ProgIdManager::new(&reg);
        let report = manager.register(&sample());
        // 1 次读取 + 5 次建键 + 5 次写值 + 每个扩展名 2 次建键 2 次写值
        assert_eq!(report.steps_attempted, 1 + 5 + 5 + 4);
        assert!(report.is_clean());
        assert!(manager.is_registered("App.Document").unwrap());
    }

    #[test]
    fn invalid_extension_is_skipped_and_reported() {
        let reg = MemoryRegistry::new();
        let mut d = sample();
        d.extensions = Some(vec!["".to_string(), "a\\b".to_string(), "ok".to_string()]);
        let report = ProgIdManager::new(&reg).register(&d);
        assert_eq!(report.failures().len(), 2);
        assert!(report
            .failures()
            .iter()
            .all(|f| f.action == StepAction::CreateKey));
        // 两个非法扩展名也计入尝试次数
        assert_eq!(report.steps_attempted, 1 + 5 + 5 + 4 + 2);
        assert_eq!(
            reg.list_subkeys(RootHive::CurrentUser, CLASSES_BASE).unwrap(),
            [".ok", "App.Document"]
        );

        let report = ProgIdManager::new(&reg).remove(&d);
        assert_eq!(report.failures().len(), 2);
        assert!(report
            .failures()
            .iter()
            .all(|f| f.action == StepAction::ReadKey));
        // 读 ProgID + 删除 + 合法扩展名的读取与删值 + 两个非法扩展名
        assert_eq!(report.steps_attempted, 2 + 2 + 2);
    }

    #[test]
    fn prog_id_must_be_single_key_name() {
        for id in ["App.Document", "a b", "x"] {
            assert!(validate_prog_id(id).is_ok(), "{id:?}");
        }
        for id in ["", "  ", "\\", "App\\Document"] {
            assert!(
                matches!(validate_prog_id(id), Err(RegistryError::InvalidPath { .. })),
                "{id:?}"
            );
        }
    }

    #[test]
    fn invalid_prog_id_is_reported_without_store_access() {
        let reg = MemoryRegistry::new();
        let mut d = sample();
        d.prog_id = String::new();
        let report = ProgIdManager::new(&reg).register(&d);
        assert_eq!(report.steps_attempted, 1);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].action, StepAction::CreateKey);
        assert!(reg.list_subkeys(RootHive::CurrentUser, "").unwrap().is_empty());

        let report = ProgIdManager::new(&reg).remove(&d);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].action, StepAction::ReadKey);
        assert!(ProgIdManager::new(&reg).is_registered("").is_err());
    }
}
