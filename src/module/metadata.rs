//! 模块元数据定义
//!
//! 定义模块能力接口、模块身份与生命周期阶段，以及诊断用的描述/终止辅助函数。

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::registry::ModuleContext;

/// 模块能力接口
///
/// 模块第一次被任何调用激活时，注册表调用一次 [`Module::on_register`]，
/// 模块在其中向 [`ModuleContext`] 声明激活回调和生命周期钩子。
/// 声明结果在进程生命周期内固定，所有后续调用共享。
pub trait Module: Send + Sync + 'static {
    /// 注册钩子（每个模块实例在进程内只执行一次）
    fn on_register(&self, hooks: &mut ModuleContext);

    /// 诊断用的可读名称，不影响任何行为
    fn module_name(&self) -> Option<&str> {
        None
    }
}

/// 模块句柄
///
/// 模块身份即 `Arc` 分配的身份：同一个 `Arc` 的克隆是同一个模块，
/// 两次 `Arc::new` 得到的结构相同的值是两个不同的模块。
pub type ModuleRef = Arc<dyn Module>;

/// 模块身份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(usize);

impl ModuleId {
    /// 取模块句柄的身份
    pub fn of(module: &ModuleRef) -> Self {
        Self(Arc::as_ptr(module) as *const () as usize)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// 生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookStage {
    /// 校验
    Validate,
    /// 准备
    Setup,
    /// 收尾（与 Setup 配对）
    Teardown,
    /// 启动
    Start,
    /// 停止（与 Start 配对）
    Stop,
}

impl HookStage {
    /// 是否为清理阶段
    pub fn is_cleanup(&self) -> bool {
        matches!(self, HookStage::Teardown | HookStage::Stop)
    }

    /// 与该阶段配对的清理阶段
    pub fn cleanup(&self) -> Option<HookStage> {
        match self {
            HookStage::Setup => Some(HookStage::Teardown),
            HookStage::Start => Some(HookStage::Stop),
            _ => None,
        }
    }

    /// 阶段名称
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::Validate => "validate",
            HookStage::Setup => "setup",
            HookStage::Teardown => "teardown",
            HookStage::Start => "start",
            HookStage::Stop => "stop",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 生成模块的可读描述：`名称<身份>`，未命名时为 `<身份>`
pub fn describe(module: &ModuleRef) -> String {
    let id = ModuleId::of(module);
    match module.module_name() {
        Some(name) => format!("{}<{}>", name, id),
        None => format!("<{}>", id),
    }
}

/// 以致命错误终止进程
///
/// 只用于表示编程错误的配置期问题（例如无效的选项链），不用于运行期错误。
pub fn fail(err: impl fmt::Display) -> ! {
    tracing::error!("致命错误: 编排配置错误: {}", err);
    eprintln!("fatal: internal error: orc setup error: {}", err);
    std::process::exit(crate::utils::exit_code::FAILURE)
}
