//! 模块编排
//!
//! 包含模块编排系统的核心组件：
//! - 模块能力接口与身份
//! - 注册表与递归激活
//! - 调用上下文、激活选项与依赖记录
//! - 生命周期执行器
//! - 模块组合

pub mod bundle;
pub mod context;
pub mod dependency;
pub mod lifecycle;
pub mod metadata;
pub mod options;
pub mod registry;

// 重导出常用类型
pub use bundle::{ModuleBundle, ModulesWithSetup};
pub use context::{RunContext, UseContext};
pub use dependency::{DependencyGraph, Edge, EdgeRecord};
pub use lifecycle::{CleanupStack, LifecycleRunner};
pub use metadata::{describe, fail, HookStage, Module, ModuleId, ModuleRef};
pub use options::{parse_options, with_flags, with_param, UseConfig, UseOption};
pub use registry::{LabelledHook, ModuleContext, Registry};
