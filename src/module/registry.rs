//! 模块注册表
//!
//! 进程内模块身份 → [`ModuleContext`] 的唯一来源，负责：
//! - 模块首次出现时执行一次注册（收集钩子）
//! - 单次调用内的递归激活算法
//!
//! 注册表通过 `Arc<Registry>` 显式传递，不存在隐式的全局实例。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use super::context::{RunContext, UseContext};
use super::metadata::{describe, fail, HookStage, ModuleId, ModuleRef};
use super::options::{parse_options, UseOption};
use crate::core::config::RunConfig;
use crate::utils::{OrcError, Result};

type UseHook = Box<dyn Fn(&mut UseContext<'_>) -> Result<()> + Send + Sync>;
type HookFn = Box<dyn Fn() -> Result<()> + Send + Sync>;

/// 带阶段标签的生命周期钩子
pub struct LabelledHook {
    stage: HookStage,
    hook: HookFn,
}

impl LabelledHook {
    /// 钩子所属阶段
    pub fn stage(&self) -> HookStage {
        self.stage
    }

    pub(crate) fn call(&self) -> Result<()> {
        (self.hook)()
    }
}

impl fmt::Debug for LabelledHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelledHook").field("stage", &self.stage).finish()
    }
}

/// 模块上下文
///
/// 注册表为每个模块身份维护一份，进程内只创建一次、永不销毁。
/// 注册阶段它是钩子的登记目标；注册完成后内容不再变化，被所有调用共享。
pub struct ModuleContext {
    id: ModuleId,
    module: ModuleRef,
    use_hooks: Vec<UseHook>,
    hooks: Vec<LabelledHook>,
}

impl ModuleContext {
    fn new(module: ModuleRef) -> Self {
        Self {
            id: ModuleId::of(&module),
            module,
            use_hooks: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// 登记激活回调（同一调用内最多执行一次）
    ///
    /// 回调可以通过 [`UseContext::declare`] 声明更多依赖，依赖会被递归激活。
    pub fn on_use<F>(&mut self, f: F)
    where
        F: Fn(&mut UseContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.use_hooks.push(Box::new(f));
    }

    /// 登记校验钩子
    pub fn on_validate<F>(&mut self, f: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook(HookStage::Validate, f);
    }

    /// 登记准备钩子
    pub fn on_setup<F>(&mut self, f: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook(HookStage::Setup, f);
    }

    /// 登记收尾钩子
    pub fn on_teardown<F>(&mut self, f: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook(HookStage::Teardown, f);
    }

    /// 登记启动钩子
    pub fn on_start<F>(&mut self, f: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook(HookStage::Start, f);
    }

    /// 登记停止钩子
    pub fn on_stop<F>(&mut self, f: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.add_hook(HookStage::Stop, f);
    }

    fn add_hook<F>(&mut self, stage: HookStage, f: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        debug!(
            hook_index = self.hooks.len(),
            stage = %stage,
            module = %describe(&self.module),
            "登记钩子"
        );
        self.hooks.push(LabelledHook {
            stage,
            hook: Box::new(f),
        });
    }

    /// 模块身份
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// 模块句柄
    pub fn module(&self) -> &ModuleRef {
        &self.module
    }

    /// 模块描述
    pub fn describe(&self) -> String {
        describe(&self.module)
    }

    /// 按登记顺序排列的生命周期钩子
    pub fn hooks(&self) -> &[LabelledHook] {
        &self.hooks
    }

    /// 某个阶段的钩子数量
    pub fn hook_count(&self, stage: HookStage) -> usize {
        self.hooks.iter().filter(|h| h.stage == stage).count()
    }

    /// 激活回调数量
    pub fn use_hook_count(&self) -> usize {
        self.use_hooks.len()
    }

    fn run_use_hooks(&self, ctx: &mut UseContext<'_>) -> Result<()> {
        for hook in &self.use_hooks {
            hook(ctx)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("module", &self.describe())
            .field("use_hooks", &self.use_hooks.len())
            .field("hooks", &self.hooks)
            .finish()
    }
}

type ContextMap = HashMap<ModuleId, Arc<ModuleContext>>;

/// 模块注册表
///
/// 同一把互斥锁保护「查找或创建」步骤，也在整个生命周期执行期间持有，
/// 因此同一注册表上同一时刻只有一个调用处于 `run` 中。
/// 钩子和主体内不能再对同一注册表调用 [`Registry::use_module`]。
pub struct Registry {
    modules: Mutex<ContextMap>,
    config: RunConfig,
}

impl Registry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::with_config(RunConfig::default())
    }

    /// 使用执行配置创建注册表
    pub fn with_config(config: RunConfig) -> Self {
        Self {
            modules: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// 执行配置
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// 已注册模块数量
    pub fn len(&self) -> usize {
        self.modules.lock().len()
    }

    /// 是否没有任何已注册模块
    pub fn is_empty(&self) -> bool {
        self.modules.lock().is_empty()
    }

    /// 模块是否已注册
    pub fn contains(&self, module: &ModuleRef) -> bool {
        self.modules.lock().contains_key(&ModuleId::of(module))
    }

    /// 查找或创建模块上下文
    ///
    /// 返回上下文以及它是否已经存在。新模块的注册步骤在同一临界区内执行，
    /// 并发调用者不会看到尚未填充完毕的上下文，注册步骤也只会执行一次。
    pub fn get_or_create_context(&self, module: &ModuleRef) -> (Arc<ModuleContext>, bool) {
        let id = ModuleId::of(module);
        let mut modules = self.modules.lock();

        if let Some(ctx) = modules.get(&id) {
            return (Arc::clone(ctx), true);
        }

        let mut ctx = ModuleContext::new(Arc::clone(module));
        module.on_register(&mut ctx);
        let ctx = Arc::new(ctx);
        modules.insert(id, Arc::clone(&ctx));

        (ctx, false)
    }

    /// 在调用上下文中激活模块
    ///
    /// 解析选项、执行激活回调（同一调用内只执行一次），并把模块追加到激活顺序中。
    /// 重复激活不是错误，只是对顺序没有影响。
    pub fn activate(
        &self,
        run: &mut RunContext,
        module: &ModuleRef,
        options: Vec<UseOption>,
    ) -> Result<()> {
        let (mod_ctx, existed) = self.get_or_create_context(module);
        if !existed {
            debug!(
                run_id = run.id(),
                module = %mod_ctx.describe(),
                hooks = mod_ctx.hooks().len(),
                "模块已注册"
            );
        }

        let config = parse_options(&options).unwrap_or_else(|e| fail(e));

        if let Some(path) = run.cycle_path(mod_ctx.id(), module) {
            return Err(OrcError::CircularDependency(path));
        }

        if run.has_begun(mod_ctx.id()) {
            debug!(
                run_id = run.id(),
                module = %mod_ctx.describe(),
                "模块已在本次调用中激活，跳过激活回调"
            );
        } else {
            run.begin_use(&mod_ctx);
            let result = {
                let mut use_ctx = UseContext::new(self, run, &mod_ctx, &options, config);
                mod_ctx.run_use_hooks(&mut use_ctx)
            };
            run.finish_use();

            if let Err(e) = result {
                debug!(
                    run_id = run.id(),
                    module = %mod_ctx.describe(),
                    error = %e,
                    "激活回调失败"
                );
                return Err(e);
            }
        }

        run.push_ordered(mod_ctx);
        Ok(())
    }

    /// 顶层入口：创建新的调用上下文并激活根模块
    pub fn use_module<I>(self: &Arc<Self>, module: &ModuleRef, options: I) -> Result<RunContext>
    where
        I: IntoIterator<Item = UseOption>,
    {
        let mut run = RunContext::new(Arc::clone(self));
        debug!(run_id = run.id(), module = %describe(module), "顶层激活");
        self.activate(&mut run, module, options.into_iter().collect())?;
        Ok(run)
    }

    pub(crate) fn lock_for_run(&self) -> MutexGuard<'_, ContextMap> {
        self.modules.lock()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("modules", &self.len())
            .field("config", &self.config)
            .finish()
    }
}
