//! # Chips Orc - 薯片模块编排内核
//!
//! 进程内的模块编排器：把各自独立编写的模块连接起来，
//! 每次调用只解析一次传递依赖，并按固定的生命周期驱动它们：
//! validate → setup → start → 主体 → stop → teardown。
//!
//! - **注册表**: 模块身份 → 模块上下文，首次出现时注册一次
//! - **递归激活**: 单次调用内去重、记录依赖边、检测循环依赖
//! - **生命周期执行**: 分阶段执行钩子，清理钩子后进先出、失败时尽力清理
//! - **命令适配**: 基于 clap 的参数集与命令
//! - **配置与日志**: 统一的配置加载和结构化日志
//!
//! ## 快速开始
//!
//! ```rust
//! use std::sync::Arc;
//! use chips_orc::{Module, ModuleContext, ModuleRef, Registry};
//!
//! struct Database;
//!
//! impl Module for Database {
//!     fn on_register(&self, hooks: &mut ModuleContext) {
//!         hooks.on_setup(|| Ok(()));
//!         hooks.on_teardown(|| Ok(()));
//!     }
//!
//!     fn module_name(&self) -> Option<&str> {
//!         Some("Database")
//!     }
//! }
//!
//! let registry = Arc::new(Registry::new());
//! let db: ModuleRef = Arc::new(Database);
//!
//! let answer = registry
//!     .use_module(&db, Vec::new())?
//!     .run(|| Ok(42))?;
//! assert_eq!(answer, 42);
//! # Ok::<(), chips_orc::OrcError>(())
//! ```
//!
//! ## 模块结构
//!
//! - `module` - 模块编排相关类型
//! - `api` - 参数集与命令适配
//! - `utils` - 错误类型和日志
//! - `core` - 配置

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod core;
pub mod module;
pub mod utils;

// 重导出常用类型，方便使用
pub use module::{
    describe, fail, parse_options, with_flags, with_param, DependencyGraph, Edge, HookStage,
    Module, ModuleBundle, ModuleContext, ModuleId, ModuleRef, ModulesWithSetup, Registry,
    RunContext, UseConfig, UseContext, UseOption,
};

pub use api::{Body, FlagSet, FlagsModule, OrcCommand};

pub use utils::{error_code, exit_code, OrcError, Result};
pub use utils::logger::{LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};

pub use core::config::{LogConfig, OrcConfig, OrcConfigBuilder, RunConfig};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
