//! Chips Orc 命令行入口
//!
//! 用命令适配组装的演示程序，每个子命令都是一次模块调用。
//!
//! # 命令概览
//!
//! - `hello` - 打印问候语
//! - `echo` - 原样输出位置参数
//! - `check-config` - 验证配置文件
//!
//! 所有子命令都依赖日志模块，支持 `--log-level` 和 `--log-json`。
//!
//! # 使用示例
//!
//! ```bash
//! chips-orc hello --name 薯片
//! chips-orc echo a b c --log-level debug
//! chips-orc check-config orc.yaml
//! ORC_LOG_GRAPH=true chips-orc hello
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Arg, ArgAction, Command};
use parking_lot::Mutex;
use tracing::{debug, info};

use chips_orc::{
    Body, FlagSet, FlagsModule, LogConfig, LogGuard, Logger, LoggerConfig, Module, ModuleBundle,
    ModuleContext, ModuleRef, OrcCommand, OrcConfig, OrcError, Registry, Result,
};

/// 日志模块的共享状态
struct LoggingState {
    config: LogConfig,
    flag_sets: Mutex<Vec<FlagSet>>,
    guard: Mutex<Option<LogGuard>>,
}

/// 日志模块
///
/// 激活时登记日志参数；Setup 初始化日志系统，Teardown 释放日志守卫。
struct LoggingModule {
    state: Arc<LoggingState>,
}

impl LoggingModule {
    fn new(config: LogConfig) -> Self {
        Self {
            state: Arc::new(LoggingState {
                config,
                flag_sets: Mutex::new(Vec::new()),
                guard: Mutex::new(None),
            }),
        }
    }
}

impl LoggingState {
    /// 已绑定解析结果的参数集即本次执行的命令
    fn bound_flags(&self) -> Option<FlagSet> {
        self.flag_sets.lock().iter().find(|f| f.is_bound()).cloned()
    }

    fn logger_config(&self) -> Result<LoggerConfig> {
        let mut log_config = self.config.clone();
        if let Some(flags) = self.bound_flags() {
            if let Some(level) = flags.get_one::<String>("log-level") {
                log_config.level = level;
            }
            if flags.get_flag("log-json") {
                log_config.json_format = true;
            }
        }
        LoggerConfig::from_log_config(&log_config)
    }
}

impl Module for LoggingModule {
    fn on_register(&self, hooks: &mut ModuleContext) {
        let state = Arc::clone(&self.state);
        hooks.on_use(move |ctx| {
            let flags = ctx
                .flags()
                .ok_or_else(|| OrcError::FlagsNotBound(chips_orc::describe(ctx.module())))?;
            flags.add(
                Arg::new("log-level")
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("日志级别 (trace, debug, info, warn, error)"),
            )?;
            flags.add(
                Arg::new("log-json")
                    .long("log-json")
                    .action(ArgAction::SetTrue)
                    .help("以 JSON 格式输出日志"),
            )?;
            state.flag_sets.lock().push(flags.clone());
            Ok(())
        });

        let state = Arc::clone(&self.state);
        hooks.on_setup(move || {
            let guard = Logger::init(state.logger_config()?)?;
            *state.guard.lock() = Some(guard);
            debug!("日志系统已初始化");
            Ok(())
        });

        let state = Arc::clone(&self.state);
        hooks.on_teardown(move || {
            debug!("释放日志守卫");
            state.guard.lock().take();
            Ok(())
        });
    }

    fn module_name(&self) -> Option<&str> {
        Some("Logging")
    }
}

type Slot = Arc<Mutex<Option<FlagSet>>>;

/// 创建一个参数模块，并返回能在主体中读取参数的槽位
fn flags_module<F>(define: F) -> (ModuleRef, Slot)
where
    F: Fn(&FlagSet) -> Result<()> + Send + Sync + 'static,
{
    let slot: Slot = Arc::default();
    let captured = Arc::clone(&slot);
    let module = FlagsModule::new(move |flags| {
        define(flags)?;
        *captured.lock() = Some(flags.clone());
        Ok(())
    })
    .into_ref();
    (module, slot)
}

fn read_one(slot: &Slot, id: &str) -> Option<String> {
    slot.lock().as_ref().and_then(|f| f.get_one::<String>(id))
}

fn hello_command(registry: &Arc<Registry>, logging: &ModuleRef) -> Result<OrcCommand> {
    let (flags, slot) = flags_module(|flags| {
        flags.add(
            Arg::new("name")
                .long("name")
                .default_value("world")
                .help("问候对象"),
        )
    });
    let prereq = ModuleBundle::new([Arc::clone(logging), flags]).into_ref();

    OrcCommand::new(
        registry,
        Some(prereq),
        Command::new("hello").about("打印问候语"),
        Some(Body::new(move || {
            let name = read_one(&slot, "name").unwrap_or_else(|| "world".to_string());
            info!(name = %name, "问候");
            println!("hello, {}", name);
            Ok(())
        })),
        Vec::new(),
    )
}

fn echo_command(registry: &Arc<Registry>, logging: &ModuleRef) -> Result<OrcCommand> {
    OrcCommand::new(
        registry,
        Some(Arc::clone(logging)),
        Command::new("echo").about("原样输出位置参数"),
        Some(Body::with_args(|args| {
            println!("{}", args.join(" "));
            Ok(())
        })),
        Vec::new(),
    )
}

fn check_config_command(registry: &Arc<Registry>, logging: &ModuleRef) -> Result<OrcCommand> {
    let (flags, slot) = flags_module(|flags| {
        flags.add(
            Arg::new("path")
                .required(true)
                .value_name("PATH")
                .help("配置文件路径"),
        )
    });
    let prereq = ModuleBundle::new([Arc::clone(logging), flags]).into_ref();

    OrcCommand::new(
        registry,
        Some(prereq),
        Command::new("check-config").about("验证配置文件"),
        Some(Body::new(move || {
            let path = read_one(&slot, "path")
                .map(PathBuf::from)
                .ok_or_else(|| OrcError::Internal("缺少配置文件路径".to_string()))?;

            println!("检查配置文件: {}", path.display());
            let config = OrcConfig::from_file(&path)?;
            println!("✅ 配置文件有效！");
            println!("────────────────────────────────────────");
            print!("{}", serde_yaml::to_string(&config)?);
            println!("────────────────────────────────────────");
            Ok(())
        })),
        Vec::new(),
    )
}

fn run() -> Result<()> {
    let config = OrcConfig::load(None)?;
    let registry = Arc::new(Registry::with_config(config.run.clone()));

    let mut log_config = config.logging.clone();
    log_config.level = config.effective_log_level().to_string();
    let logging: ModuleRef = Arc::new(LoggingModule::new(log_config));

    let root = OrcCommand::new(
        &registry,
        None,
        Command::new("chips-orc")
            .version(chips_orc::VERSION)
            .about("薯片模块编排内核演示程序"),
        None,
        Vec::new(),
    )?
    .subcommand(hello_command(&registry, &logging)?)
    .subcommand(echo_command(&registry, &logging)?)
    .subcommand(check_config_command(&registry, &logging)?);

    root.execute_or_exit(std::env::args_os())
}

fn main() {
    if let Err(e) = run() {
        match e {
            OrcError::Cli(err) => err.exit(),
            other => {
                eprintln!("错误 [{}]: {}", other.error_code(), other);
                std::process::exit(other.exit_code());
            }
        }
    }
}
