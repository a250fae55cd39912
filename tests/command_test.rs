//! 命令适配集成测试
//!
//! 测试参数登记、子命令分发、参数绑定以及主体参数传递。

mod common;

use std::sync::Arc;

use clap::{Arg, ArgAction, Command};
use parking_lot::Mutex;

use chips_orc::{
    with_param, Body, FlagSet, FlagsModule, Module, ModuleBundle, ModuleContext, ModuleRef,
    OrcCommand, OrcError, Registry,
};
use common::{entries, new_log, HookRecorder};

/// Setup 阶段读取参数的模块
struct ServerModule {
    flag_sets: Arc<Mutex<Vec<FlagSet>>>,
    seen_port: Arc<Mutex<Option<String>>>,
}

impl Module for ServerModule {
    fn on_register(&self, hooks: &mut ModuleContext) {
        let flag_sets = Arc::clone(&self.flag_sets);
        hooks.on_use(move |ctx| {
            let flags = ctx
                .flags()
                .ok_or_else(|| OrcError::FlagsNotBound("Server".to_string()))?;
            flags.add(Arg::new("port").long("port").default_value("8080"))?;
            flag_sets.lock().push(flags.clone());
            Ok(())
        });

        let flag_sets = Arc::clone(&self.flag_sets);
        let seen_port = Arc::clone(&self.seen_port);
        hooks.on_setup(move || {
            let bound = flag_sets.lock().iter().find(|f| f.is_bound()).cloned();
            *seen_port.lock() = bound.and_then(|f| f.get_one::<String>("port"));
            Ok(())
        });
    }

    fn module_name(&self) -> Option<&str> {
        Some("Server")
    }
}

/// 测试 Setup 钩子能读取命令行参数
#[test]
fn test_flags_visible_to_setup_hooks() {
    let registry = Arc::new(Registry::new());
    let seen_port = Arc::new(Mutex::new(None));
    let server: ModuleRef = Arc::new(ServerModule {
        flag_sets: Arc::default(),
        seen_port: Arc::clone(&seen_port),
    });

    let cmd = OrcCommand::new(
        &registry,
        Some(server),
        Command::new("serve"),
        Some(Body::new(|| Ok(()))),
        Vec::new(),
    )
    .unwrap();

    assert!(cmd.flags().is_defined("port"));
    cmd.execute(["serve", "--port", "9000"]).unwrap();
    assert_eq!(seen_port.lock().as_deref(), Some("9000"));
}

/// 测试子命令分发：只执行叶子命令的调用
#[test]
fn test_subcommand_dispatch() {
    let log = new_log();
    let registry = Arc::new(Registry::new());
    let a = HookRecorder::new("A", &log).build();
    let b = HookRecorder::new("B", &log).build();

    let body_log = Arc::clone(&log);
    let child_a = OrcCommand::new(
        &registry,
        Some(a),
        Command::new("alpha"),
        Some(Body::new(move || {
            body_log.lock().push("alpha.body".to_string());
            Ok(())
        })),
        Vec::new(),
    )
    .unwrap();
    let child_b = OrcCommand::new(
        &registry,
        Some(b),
        Command::new("beta"),
        Some(Body::new(|| Ok(()))),
        Vec::new(),
    )
    .unwrap();

    let root = OrcCommand::new(&registry, None, Command::new("app"), None, Vec::new())
        .unwrap()
        .subcommand(child_a)
        .subcommand(child_b);

    log.lock().clear();
    root.execute(["app", "alpha"]).unwrap();

    let log = entries(&log);
    assert!(log.contains(&"alpha.body".to_string()));
    assert!(log.contains(&"A.setup".to_string()));
    assert!(!log.iter().any(|e| e.starts_with("B.")));
}

/// 测试带位置参数的主体
#[test]
fn test_body_receives_positional_args() {
    let registry = Arc::new(Registry::new());
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    let cmd = OrcCommand::new(
        &registry,
        None,
        Command::new("echo"),
        Some(Body::with_args(move |args| {
            *sink.lock() = args;
            Ok(())
        })),
        Vec::new(),
    )
    .unwrap();

    cmd.execute(["echo", "a", "b", "c"]).unwrap();
    assert_eq!(*received.lock(), vec!["a", "b", "c"]);
}

/// 测试参数模块与命令选项一起工作
#[test]
fn test_flags_module_with_command_options() {
    let registry = Arc::new(Registry::new());
    let verbose = Arc::new(Mutex::new(None::<FlagSet>));
    let slot = Arc::clone(&verbose);
    let flags = FlagsModule::new(move |flags| {
        flags.add(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))?;
        *slot.lock() = Some(flags.clone());
        Ok(())
    })
    .into_ref();
    let prereq = ModuleBundle::new([flags]).into_ref();

    let cmd = OrcCommand::new(
        &registry,
        Some(prereq),
        Command::new("run"),
        Some(Body::new(|| Ok(()))),
        vec![with_param("profile", "test")],
    )
    .unwrap();

    cmd.execute(["run", "--verbose"]).unwrap();
    let flags = verbose.lock().clone().unwrap();
    assert!(flags.get_flag("verbose"));
}

/// 测试未知参数返回命令行错误
#[test]
fn test_unknown_flag_is_cli_error() {
    let registry = Arc::new(Registry::new());
    let cmd = OrcCommand::new(
        &registry,
        None,
        Command::new("strict"),
        Some(Body::new(|| Ok(()))),
        Vec::new(),
    )
    .unwrap();

    let err = cmd.execute(["strict", "--nope"]).unwrap_err();
    assert!(matches!(err, OrcError::Cli(_)));
    assert_eq!(err.exit_code(), chips_orc::exit_code::USAGE);
}

/// 测试主体错误从命令返回
#[test]
fn test_body_error_propagates() {
    let registry = Arc::new(Registry::new());
    let cmd = OrcCommand::new(
        &registry,
        None,
        Command::new("fail"),
        Some(Body::new(|| Err(OrcError::Internal("失败".to_string())))),
        Vec::new(),
    )
    .unwrap();

    let err = cmd.execute(["fail"]).unwrap_err();
    assert!(matches!(err, OrcError::Internal(_)));
}

/// 测试两个命令登记同名参数时报错
#[test]
fn test_duplicate_flag_across_modules() {
    let registry = Arc::new(Registry::new());
    let first = FlagsModule::new(|flags| flags.add(Arg::new("name").long("name"))).into_ref();
    let second = FlagsModule::new(|flags| flags.add(Arg::new("name").long("name"))).into_ref();
    let prereq = ModuleBundle::new([first, second]).into_ref();

    let err = OrcCommand::new(
        &registry,
        Some(prereq),
        Command::new("dup"),
        None,
        Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, OrcError::DuplicateFlag(ref id) if id == "name"));
}

/// 测试位置参数之后的参数仍按参数解析
#[test]
fn test_flags_after_positional_args() {
    let registry = Arc::new(Registry::new());
    let slot = Arc::new(Mutex::new(None::<FlagSet>));
    let captured = Arc::clone(&slot);
    let flags = FlagsModule::new(move |flags| {
        flags.add(Arg::new("flag").long("flag"))?;
        *captured.lock() = Some(flags.clone());
        Ok(())
    })
    .into_ref();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let cmd = OrcCommand::new(
        &registry,
        Some(flags),
        Command::new("echo"),
        Some(Body::with_args(move |args| {
            *sink.lock() = args;
            Ok(())
        })),
        Vec::new(),
    )
    .unwrap();

    cmd.execute(["echo", "a", "--flag", "v", "b"]).unwrap();
    assert_eq!(*received.lock(), vec!["a", "b"]);
    let flags = slot.lock().clone().unwrap();
    assert_eq!(flags.get_one::<String>("flag").as_deref(), Some("v"));
}

/// 测试前置模块占用位置参数 ID 时报错
#[test]
fn test_args_id_reserved_for_positional_body() {
    let registry = Arc::new(Registry::new());
    let flags = FlagsModule::new(|flags| flags.add(Arg::new("args").long("args"))).into_ref();

    let err = OrcCommand::new(
        &registry,
        Some(flags),
        Command::new("echo"),
        Some(Body::with_args(|_| Ok(()))),
        Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, OrcError::DuplicateFlag(ref id) if id == "args"));
}

/// 测试不接收位置参数的主体可以使用 `args` 参数
#[test]
fn test_args_id_free_without_positional_body() {
    let registry = Arc::new(Registry::new());
    let flags = FlagsModule::new(|flags| flags.add(Arg::new("args").long("args"))).into_ref();

    let cmd = OrcCommand::new(
        &registry,
        Some(flags),
        Command::new("plain"),
        Some(Body::new(|| Ok(()))),
        Vec::new(),
    )
    .unwrap();
    cmd.execute(["plain", "--args", "x"]).unwrap();
}

/// 测试致命执行在成功时正常返回并运行清理
#[test]
fn test_execute_or_exit_success() {
    let registry = Arc::new(Registry::new());
    let log = new_log();
    let module = HookRecorder::new("A", &log).build();

    let cmd = OrcCommand::new(
        &registry,
        Some(module),
        Command::new("ok"),
        Some(Body::new(|| Ok(()))),
        Vec::new(),
    )
    .unwrap();

    cmd.execute_or_exit(["ok"]).unwrap();
    assert_eq!(
        entries(&log),
        vec!["A.use", "A.validate", "A.setup", "A.start", "A.stop", "A.teardown"]
    );
}
