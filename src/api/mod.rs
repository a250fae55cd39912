//! API 模块
//!
//! 面向命令行程序的对外接口。
//!
//! # 模块概览
//!
//! - `flags`: 参数集与参数模块
//! - `command`: 把 `clap::Command` 与模块调用连接起来的命令适配
//!
//! # 示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clap::{Arg, Command};
//! use chips_orc::api::{Body, FlagsModule, OrcCommand};
//! use chips_orc::module::Registry;
//!
//! fn main() -> chips_orc::Result<()> {
//!     let registry = Arc::new(Registry::new());
//!     let flags = FlagsModule::new(|flags| flags.add(Arg::new("name").long("name")))
//!         .into_ref();
//!
//!     let hello = OrcCommand::new(
//!         &registry,
//!         Some(flags),
//!         Command::new("hello"),
//!         Some(Body::new(|| Ok(()))),
//!         Vec::new(),
//!     )?;
//!     hello.execute(std::env::args())
//! }
//! ```

pub mod command;
pub mod flags;

// 重导出主要类型
pub use command::{Body, OrcCommand, ARGS_ID};
pub use flags::{FlagSet, FlagsModule};
