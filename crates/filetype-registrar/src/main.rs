//! 文件类型关联注册工具（命令行入口）。
//!
//! 职责：
//! - `register`/`remove`：按命令行参数或关联清单注册/清理 ProgID 与扩展名关联
//! - `get-key`/`get-value`/`set-value`/`create-key`/`delete-key`/`delete-value`/`list-subkeys`：
//!   直接访问注册表原语，便于排障与脚本化
//! - 初始化 registry.log 日志（标准输出 + 日志文件）
//!
//! 存储选择：
//! - 指定 `--store <json>` 时使用 JSON 文件沙箱（任意平台可用，修改后写回文件）
//! - 否则在 Windows 上直接操作当前用户注册表；其它平台必须指定 `--store`
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use filetype_core::config::{load_manifest, LoadedManifest};
use filetype_core::journal::{self, LogConfig};
use filetype_core::paths;
use filetype_core::progid::{ProgIdDescriptor, ProgIdManager};
use filetype_core::{
    create_registry_key, delete_registry_key, delete_registry_value, get_registry_key,
    get_registry_value, list_registry_subkeys, set_registry_value, validate_prog_id,
    MemoryRegistry, RegistryData, RegistryError, RegistryStore, RootHive, ValueType, Workflow,
    WorkflowReport,
};
use tracing::info;

/// 命令行参数。
///
/// 说明：
/// - `log_file` 覆盖默认日志位置（`<exe 目录>\..\registry.log`）与清单中的配置
/// - `store` 指向 JSON 沙箱注册表文件（不存在时视为空注册表）
/// - `silent` 关闭日志的标准输出镜像，仅写日志文件
#[derive(Debug, Parser)]
#[command(name = "filetype-registrar", version)]
struct Cli {
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = false)]
    silent: bool,

    #[command(subcommand)]
    command: Commands,
}

/// 支持的子命令。
#[derive(Debug, Subcommand)]
enum Commands {
    /// 注册 ProgID 及扩展名关联（单步失败不中断）。
    Register(WorkflowArgs),
    /// 清理 ProgID 及扩展名关联（容忍不存在的条目）。
    Remove(WorkflowArgs),
    /// 输出键下全部命名值（JSON）。
    GetKey(KeyArgs),
    /// 输出单个值（JSON）。
    GetValue(ValueArgs),
    /// 写入单个值。
    SetValue(SetValueArgs),
    /// 创建键（含中间键）。
    CreateKey(KeyArgs),
    /// 递归删除键。
    DeleteKey(KeyArgs),
    /// 删除单个值。
    DeleteValue(ValueArgs),
    /// 列出直接子键。
    ListSubkeys(KeyArgs),
}

/// ProgID 描述来源：`--manifest` 或逐项参数。
#[derive(Debug, Args)]
struct WorkflowArgs {
    #[arg(long, conflicts_with = "prog_id")]
    manifest: Option<PathBuf>,

    /// ProgID（不能为空白，也不能包含 `\`）。
    #[arg(long, required_unless_present = "manifest", value_parser = parse_prog_id)]
    prog_id: Option<String>,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long, default_value = "")]
    icon_path: String,

    #[arg(long, default_value = "")]
    app_name: String,

    /// 应用可执行文件路径。
    #[arg(long = "command", default_value = "")]
    exe: String,

    /// 扩展名（可重复；带不带前导 `.` 均可）。
    #[arg(long = "ext")]
    extensions: Vec<String>,

    /// 以 JSON 输出执行报告。
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl WorkflowArgs {
    fn descriptor(&self) -> Option<ProgIdDescriptor> {
        let prog_id = self.prog_id.clone()?;
        Some(ProgIdDescriptor {
            prog_id,
            description: self.description.clone(),
            icon_path: self.icon_path.clone(),
            app_name: self.app_name.clone(),
            command: self.exe.clone(),
            extensions: (!self.extensions.is_empty()).then(|| self.extensions.clone()),
        })
    }
}

fn parse_prog_id(raw: &str) -> std::result::Result<String, RegistryError> {
    validate_prog_id(raw).map(|()| raw.to_string())
}

#[derive(Debug, Args)]
struct KeyArgs {
    /// 根键（如 hkcu、HKEY_LOCAL_MACHINE）。
    #[arg(long, default_value = "hkcu")]
    hive: RootHive,

    /// 相对根键的路径，以 `\` 分隔。
    path: String,
}

#[derive(Debug, Args)]
struct ValueArgs {
    #[command(flatten)]
    key: KeyArgs,

    /// 值名；省略时为默认值。
    #[arg(long, default_value = "")]
    name: String,
}

#[derive(Debug, Args)]
struct SetValueArgs {
    #[command(flatten)]
    value: ValueArgs,

    /// 值类型（如 REG_SZ、dword、multi_sz）。
    #[arg(long = "type", default_value = "REG_SZ")]
    value_type: ValueType,

    /// 数据：字符串原样；DWORD 为十进制或 0x 十六进制；二进制为十六进制串；MULTI_SZ 可给多项。
    data: Vec<String>,
}

/// 程序入口：解析参数、初始化日志、选择存储并分发子命令。
///
/// 异常处理：
/// - 参数/清单/日志/存储打开失败返回 `Err`（非零退出码）
/// - 注册/清理中的单步失败只输出摘要，不影响退出码
fn main() -> Result<()> {
    let cli = Cli::parse();

    let manifest = match &cli.command {
        Commands::Register(args) | Commands::Remove(args) => {
            args.manifest.as_deref().map(load_manifest).transpose()?
        }
        _ => None,
    };

    let log_file = resolve_log_file(&cli, manifest.as_ref())?;
    journal::init_logging(&LogConfig {
        log_file,
        stdout: !cli.silent,
        ..LogConfig::default()
    })?;

    match &cli.store {
        Some(path) => {
            let store = MemoryRegistry::load(path)?;
            if dispatch(&cli, manifest.as_ref(), &store)? {
                store.save(path)?;
            }
            Ok(())
        }
        None => run_native(&cli, manifest.as_ref()),
    }
}

#[cfg(windows)]
fn run_native(cli: &Cli, manifest: Option<&LoadedManifest>) -> Result<()> {
    dispatch(cli, manifest, &filetype_windows::WindowsRegistry::new()).map(|_| ())
}

#[cfg(not(windows))]
fn run_native(_cli: &Cli, _manifest: Option<&LoadedManifest>) -> Result<()> {
    Err(anyhow!("当前平台没有系统注册表，请通过 --store 指定沙箱文件"))
}

/// 日志文件优先级：`--log-file` > 清单 `log_file` > 默认位置。
fn resolve_log_file(cli: &Cli, manifest: Option<&LoadedManifest>) -> Result<Option<PathBuf>> {
    if let Some(path) = &cli.log_file {
        return Ok(Some(path.clone()));
    }
    if let Some(path) = manifest.map(LoadedManifest::log_file).transpose()?.flatten() {
        return Ok(Some(path));
    }
    Ok(Some(paths::default_log_file()?))
}

/// 执行子命令；返回值表示存储内容是否可能被修改。
fn dispatch<S: RegistryStore>(
    cli: &Cli,
    manifest: Option<&LoadedManifest>,
    store: &S,
) -> Result<bool> {
    match &cli.command {
        Commands::Register(args) => {
            let manager = ProgIdManager::new(store);
            let reports = descriptors(args, manifest)?
                .iter()
                .map(|d| manager.register(d))
                .collect::<Vec<_>>();
            print_reports(cli, args, &reports)?;
            Ok(true)
        }
        Commands::Remove(args) => {
            let manager = ProgIdManager::new(store);
            let reports = descriptors(args, manifest)?
                .iter()
                .map(|d| manager.remove(d))
                .collect::<Vec<_>>();
            print_reports(cli, args, &reports)?;
            Ok(true)
        }
        Commands::GetKey(args) => {
            let snapshot = get_registry_key(store, args.hive, &args.path)?;
            print_json(&snapshot)?;
            Ok(false)
        }
        Commands::GetValue(args) => {
            let data = get_registry_value(store, args.key.hive, &args.key.path, &args.name)?;
            print_json(&data)?;
            Ok(false)
        }
        Commands::SetValue(args) => {
            let target = &args.value;
            let data = parse_data(args.value_type, &args.data)?;
            set_registry_value(
                store,
                target.key.hive,
                &target.key.path,
                &target.name,
                args.value_type,
                &data,
            )
            .with_context(|| format!("写入值失败: {}\\{} [{}]", target.key.hive, target.key.path, target.name))?;
            Ok(true)
        }
        Commands::CreateKey(args) => {
            create_registry_key(store, args.hive, &args.path)
                .with_context(|| format!("创建键失败: {}\\{}", args.hive, args.path))?;
            Ok(true)
        }
        Commands::DeleteKey(args) => {
            delete_registry_key(store, args.hive, &args.path)
                .with_context(|| format!("删除键失败: {}\\{}", args.hive, args.path))?;
            Ok(true)
        }
        Commands::DeleteValue(args) => {
            delete_registry_value(store, args.key.hive, &args.key.path, &args.name).with_context(
                || format!("删除值失败: {}\\{} [{}]", args.key.hive, args.key.path, args.name),
            )?;
            Ok(true)
        }
        Commands::ListSubkeys(args) => {
            for name in list_registry_subkeys(store, args.hive, &args.path)? {
                println!("{name}");
            }
            Ok(false)
        }
    }
}

/// 本次要处理的 ProgID 描述（清单中的全部条目，或命令行给出的单个条目）。
fn descriptors(args: &WorkflowArgs, manifest: Option<&LoadedManifest>) -> Result<Vec<ProgIdDescriptor>> {
    if let Some(loaded) = manifest {
        info!(
            "Loaded manifest with {} ProgID(s) from {}",
            loaded.manifest.prog_ids.len(),
            loaded.base_dir.display()
        );
        return Ok(loaded.manifest.prog_ids.clone());
    }
    args.descriptor()
        .map(|d| vec![d])
        .ok_or_else(|| anyhow!("缺少 --prog-id 或 --manifest"))
}

/// 输出执行摘要；存在失败步骤时逐条列出。
fn print_reports(cli: &Cli, args: &WorkflowArgs, reports: &[WorkflowReport]) -> Result<()> {
    if args.json {
        return print_json(reports);
    }
    if cli.silent {
        return Ok(());
    }
    for report in reports {
        let workflow = match report.workflow {
            Workflow::Register => "register",
            Workflow::Remove => "remove",
        };
        if report.is_clean() {
            println!("{} {workflow}: ok ({} steps)", report.prog_id, report.steps_attempted);
            continue;
        }
        println!(
            "{} {workflow}: {} of {} steps failed",
            report.prog_id,
            report.failures.len(),
            report.steps_attempted
        );
        for failure in report.failures() {
            println!("  - {failure}");
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("序列化输出失败")?;
    println!("{text}");
    Ok(())
}

/// 将命令行数据参数转换为与值类型匹配的数据。
///
/// 异常处理：
/// - 参数个数不符、数字/十六进制解析失败返回错误
fn parse_data(value_type: ValueType, raw: &[String]) -> Result<RegistryData> {
    let data = match value_type {
        ValueType::Sz | ValueType::ExpandSz => RegistryData::String(single_arg(value_type, raw)?.to_string()),
        ValueType::Dword | ValueType::DwordBigEndian => {
            let text = single_arg(value_type, raw)?.trim();
            let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some(hex_digits) => u32::from_str_radix(hex_digits, 16),
                None => text.parse::<u32>(),
            };
            RegistryData::U32(parsed.with_context(|| format!("无效的 DWORD 数据: {text:?}"))?)
        }
        ValueType::MultiSz => RegistryData::MultiString(raw.to_vec()),
        ValueType::Binary | ValueType::Link | ValueType::ResourceList => {
            let text = single_arg(value_type, raw)?.trim();
            let digits = text.strip_prefix("0x").unwrap_or(text);
            RegistryData::Bytes(hex::decode(digits).with_context(|| format!("无效的十六进制数据: {text:?}"))?)
        }
    };
    Ok(data)
}

fn single_arg(value_type: ValueType, raw: &[String]) -> Result<&str> {
    match raw {
        [] => Ok(""),
        [one] => Ok(one.as_str()),
        _ => Err(anyhow!("{value_type} 只接受一个数据参数")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_data_follows_value_type() {
        assert_eq!(
            parse_data(ValueType::Sz, &strings(&["hello world"])).unwrap(),
            RegistryData::from("hello world")
        );
        assert_eq!(parse_data(ValueType::Sz, &[]).unwrap(), RegistryData::from(""));
        assert_eq!(
            parse_data(ValueType::Dword, &strings(&["0x10"])).unwrap(),
            RegistryData::U32(16)
        );
        assert_eq!(
            parse_data(ValueType::Dword, &strings(&["42"])).unwrap(),
            RegistryData::U32(42)
        );
        assert_eq!(
            parse_data(ValueType::Binary, &strings(&["0a0B"])).unwrap(),
            RegistryData::Bytes(vec![0x0a, 0x0b])
        );
        assert_eq!(
            parse_data(ValueType::MultiSz, &strings(&["a", "b"])).unwrap(),
            RegistryData::MultiString(strings(&["a", "b"]))
        );
    }

    #[test]
    fn parse_data_rejects_bad_input() {
        assert!(parse_data(ValueType::Dword, &strings(&["nope"])).is_err());
        assert!(parse_data(ValueType::Binary, &strings(&["xyz"])).is_err());
        assert!(parse_data(ValueType::Sz, &strings(&["a", "b"])).is_err());
    }

    #[test]
    fn cli_accepts_descriptor_flags() {
        let cli = Cli::try_parse_from([
            "filetype-registrar",
            "--store",
            "reg.json",
            "register",
            "--prog-id",
            "App.Document",
            "--app-name",
            "MyApp",
            "--command",
            "C:\\app\\myapp.exe",
            "--ext",
            "myext",
            "--ext",
            ".other",
        ])
        .unwrap();
        let Commands::Register(args) = &cli.command else {
            panic!("expected register");
        };
        let d = args.descriptor().unwrap();
        assert_eq!(d.prog_id, "App.Document");
        assert_eq!(d.command, "C:\\app\\myapp.exe");
        assert_eq!(d.normalized_extensions(), [".myext", ".other"]);
    }

    #[test]
    fn cli_requires_prog_id_or_manifest() {
        assert!(Cli::try_parse_from(["filetype-registrar", "register"]).is_err());
        assert!(Cli::try_parse_from([
            "filetype-registrar",
            "remove",
            "--manifest",
            "m.json",
            "--prog-id",
            "X"
        ])
        .is_err());
    }

    #[test]
    fn cli_rejects_invalid_prog_id() {
        for id in ["", "  ", "App\\Document"] {
            let parsed = Cli::try_parse_from(["filetype-registrar", "remove", "--prog-id", id]);
            assert!(parsed.is_err(), "{id:?}");
        }
    }

    #[test]
    fn hive_defaults_to_current_user() {
        let cli = Cli::try_parse_from(["filetype-registrar", "list-subkeys", "Software"]).unwrap();
        let Commands::ListSubkeys(args) = &cli.command else {
            panic!("expected list-subkeys");
        };
        assert_eq!(args.hive, RootHive::CurrentUser);

        let cli =
            Cli::try_parse_from(["filetype-registrar", "get-key", "--hive", "HKLM", "Software"])
                .unwrap();
        let Commands::GetKey(args) = &cli.command else {
            panic!("expected get-key");
        };
        assert_eq!(args.hive, RootHive::LocalMachine);
    }
}
