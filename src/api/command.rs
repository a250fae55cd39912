//! 命令适配
//!
//! 把一个 `clap::Command` 骨架与一次模块调用连接起来：
//! 构造时激活前置模块（模块在激活阶段登记参数），执行时解析命令行、
//! 绑定参数、沿子命令找到叶子命令并运行它的调用。

use std::ffi::OsString;
use std::fmt;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::debug;

use super::flags::FlagSet;
use crate::module::{with_flags, ModuleBundle, ModuleRef, Registry, RunContext, UseOption};
use crate::utils::{OrcError, Result};

/// 位置参数的 ID
pub const ARGS_ID: &str = "args";

enum BodyKind {
    NoArgs(Box<dyn FnOnce() -> Result<()>>),
    WithArgs(Box<dyn FnOnce(Vec<String>) -> Result<()>>),
}

/// 命令主体
pub struct Body {
    kind: BodyKind,
}

impl Body {
    /// 不接受位置参数的主体
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        Self {
            kind: BodyKind::NoArgs(Box::new(f)),
        }
    }

    /// 接收位置参数的主体
    pub fn with_args<F>(f: F) -> Self
    where
        F: FnOnce(Vec<String>) -> Result<()> + 'static,
    {
        Self {
            kind: BodyKind::WithArgs(Box::new(f)),
        }
    }

    fn accepts_args(&self) -> bool {
        matches!(self.kind, BodyKind::WithArgs(_))
    }

    /// 以位置参数调用主体
    pub fn call(self, args: Vec<String>) -> Result<()> {
        match self.kind {
            BodyKind::NoArgs(f) => {
                if !args.is_empty() {
                    return Err(OrcError::InvalidOption {
                        option: ARGS_ID.to_string(),
                        reason: format!("不接受位置参数，收到: {:?}", args),
                    });
                }
                f()
            }
            BodyKind::WithArgs(f) => f(args),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("accepts_args", &self.accepts_args())
            .finish()
    }
}

/// 与模块调用绑定的命令
pub struct OrcCommand {
    command: Command,
    flags: FlagSet,
    run: RunContext,
    body: Option<Body>,
    children: Vec<OrcCommand>,
}

impl OrcCommand {
    /// 创建命令
    ///
    /// 在选项链末尾追加绑定本命令参数集的选项；未提供前置模块时使用空组合。
    /// 前置模块在此处完成激活，激活期间登记的参数会加到命令上。
    pub fn new(
        registry: &Arc<Registry>,
        prereq: Option<ModuleRef>,
        skeleton: Command,
        body: Option<Body>,
        options: Vec<UseOption>,
    ) -> Result<Self> {
        let flags = FlagSet::new();
        let mut options = options;
        options.push(with_flags(flags.clone()));

        let prereq = prereq.unwrap_or_else(|| ModuleBundle::default().into_ref());
        let run = registry.use_module(&prereq, options)?;

        let mut command = flags
            .args()
            .into_iter()
            .fold(skeleton, |cmd, arg| cmd.arg(arg));
        if body.as_ref().map_or(false, Body::accepts_args) {
            if flags.is_defined(ARGS_ID) {
                return Err(OrcError::DuplicateFlag(ARGS_ID.to_string()));
            }
            command = command.arg(
                Arg::new(ARGS_ID)
                    .num_args(0..)
                    .action(ArgAction::Append),
            );
        }

        debug!(
            command = %command.get_name(),
            run_id = run.id(),
            modules = run.len(),
            "命令已创建"
        );

        Ok(Self {
            command,
            flags,
            run,
            body,
            children: Vec::new(),
        })
    }

    /// 添加子命令
    pub fn subcommand(mut self, child: OrcCommand) -> Self {
        self.children.push(child);
        self
    }

    /// 命令名称
    pub fn name(&self) -> &str {
        self.command.get_name()
    }

    /// 命令的参数集
    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    /// 命令对应的调用上下文
    pub fn run_context(&self) -> &RunContext {
        &self.run
    }

    /// 生成完整的 `clap::Command`（含子命令）
    pub fn to_clap(&self) -> Command {
        self.children
            .iter()
            .fold(self.command.clone(), |cmd, child| cmd.subcommand(child.to_clap()))
    }

    /// 解析命令行并执行叶子命令
    ///
    /// `--help`/`--version` 与解析错误以 [`OrcError::Cli`] 返回。
    pub fn execute<I, T>(self, argv: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.to_clap().try_get_matches_from(argv)?;
        self.dispatch(&matches, false)
    }

    /// 解析命令行并执行叶子命令，失败时终止进程
    ///
    /// 命令行错误按 clap 的方式输出并退出；叶子命令的调用失败时
    /// 经 [`RunContext::run_or_exit`] 以注册表配置的退出码退出。
    pub fn execute_or_exit<I, T>(self, argv: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self
            .to_clap()
            .try_get_matches_from(argv)
            .unwrap_or_else(|e| e.exit());
        self.dispatch(&matches, true)
    }

    fn dispatch(self, matches: &ArgMatches, fatal: bool) -> Result<()> {
        if let Some((name, sub_matches)) = matches.subcommand() {
            let child = self
                .children
                .into_iter()
                .find(|c| c.name() == name)
                .ok_or_else(|| OrcError::Internal(format!("未知子命令: {}", name)))?;
            return child.dispatch(sub_matches, fatal);
        }

        self.flags.bind(matches.clone());

        let Self {
            command,
            run,
            body,
            children,
            ..
        } = self;

        match body {
            Some(body) => {
                let args: Vec<String> = matches
                    .try_get_many::<String>(ARGS_ID)
                    .ok()
                    .flatten()
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default();
                debug!(command = %command.get_name(), run_id = run.id(), "执行命令");
                if fatal {
                    run.run_or_exit(move || body.call(args));
                    Ok(())
                } else {
                    run.run(move || body.call(args))
                }
            }
            None => {
                let mut help = children
                    .iter()
                    .fold(command, |cmd, child| cmd.subcommand(child.to_clap()));
                help.print_help()?;
                Ok(())
            }
        }
    }
}

impl fmt::Debug for OrcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrcCommand")
            .field("name", &self.name())
            .field("flags", &self.flags)
            .field("run", &self.run)
            .field("body", &self.body)
            .field("children", &self.children.len())
            .finish()
    }
}
