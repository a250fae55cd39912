//! 模块组合
//!
//! 把多个模块打包成一个模块：激活组合时依次声明每个成员。

use std::fmt;
use std::sync::Arc;

use super::metadata::{Module, ModuleRef};
use super::registry::ModuleContext;
use crate::utils::Result;

/// 模块组合
///
/// 空组合是合法的，常用作「无前置模块」的根。
#[derive(Clone, Default)]
pub struct ModuleBundle {
    modules: Vec<ModuleRef>,
}

impl ModuleBundle {
    /// 由成员列表创建组合
    pub fn new(modules: impl IntoIterator<Item = ModuleRef>) -> Self {
        Self {
            modules: modules.into_iter().collect(),
        }
    }

    /// 成员模块
    pub fn modules(&self) -> &[ModuleRef] {
        &self.modules
    }

    /// 转为模块句柄
    pub fn into_ref(self) -> ModuleRef {
        Arc::new(self)
    }
}

impl Module for ModuleBundle {
    fn on_register(&self, hooks: &mut ModuleContext) {
        let members = self.modules.clone();
        hooks.on_use(move |ctx| ctx.declare_all(&members));
    }

    fn module_name(&self) -> Option<&str> {
        Some("Modules(...)")
    }
}

impl fmt::Debug for ModuleBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleBundle")
            .field("modules", &self.modules.len())
            .finish()
    }
}

type SetupFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// 带准备步骤的模块组合
///
/// 激活时先执行准备闭包，再声明成员。准备闭包在每次调用的激活阶段执行一次，
/// 早于任何生命周期钩子。
#[derive(Clone)]
pub struct ModulesWithSetup {
    setup: SetupFn,
    modules: Vec<ModuleRef>,
}

impl ModulesWithSetup {
    /// 创建组合
    pub fn new<F>(setup: F, modules: impl IntoIterator<Item = ModuleRef>) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self {
            setup: Arc::new(setup),
            modules: modules.into_iter().collect(),
        }
    }

    /// 成员模块
    pub fn modules(&self) -> &[ModuleRef] {
        &self.modules
    }

    /// 转为模块句柄
    pub fn into_ref(self) -> ModuleRef {
        Arc::new(self)
    }
}

impl Module for ModulesWithSetup {
    fn on_register(&self, hooks: &mut ModuleContext) {
        let setup = Arc::clone(&self.setup);
        let members = self.modules.clone();
        hooks.on_use(move |ctx| {
            setup()?;
            ctx.declare_all(&members)
        });
    }

    fn module_name(&self) -> Option<&str> {
        Some("ModulesWithSetup(...)")
    }
}

impl fmt::Debug for ModulesWithSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModulesWithSetup")
            .field("modules", &self.modules.len())
            .finish()
    }
}
