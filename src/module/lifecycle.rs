//! 生命周期执行器
//!
//! 按激活顺序驱动五个阶段：Validate → Setup → Start → 主体 → Stop → Teardown。
//!
//! Setup/Start 阶段遇到 Teardown/Stop 钩子时把它压入对应的清理栈，
//! 清理时先弹空 Stop 栈再弹空 Teardown 栈，各自后进先出。
//! 清理栈在析构时也会弹空，主体 panic 时已调度的清理钩子同样执行。

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::metadata::HookStage;
use super::registry::{LabelledHook, ModuleContext};
use crate::utils::Result;

/// 清理栈
pub struct CleanupStack<'a> {
    stage: HookStage,
    entries: Vec<(String, &'a LabelledHook)>,
}

impl<'a> CleanupStack<'a> {
    /// 创建某个清理阶段的空栈
    pub fn new(stage: HookStage) -> Self {
        Self {
            stage,
            entries: Vec::new(),
        }
    }

    /// 所属清理阶段
    pub fn stage(&self) -> HookStage {
        self.stage
    }

    /// 调度一个清理钩子
    pub fn push(&mut self, module: String, hook: &'a LabelledHook) {
        debug!(module = %module, stage = %self.stage, depth = self.entries.len(), "调度清理钩子");
        self.entries.push((module, hook));
    }

    /// 已调度的钩子数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否没有已调度的钩子
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 后进先出执行全部已调度钩子
    ///
    /// 钩子错误记录为警告后忽略，不影响其余钩子。返回失败的钩子数量。
    pub fn unwind(&mut self) -> usize {
        let mut failures = 0;
        while let Some((module, hook)) = self.entries.pop() {
            debug!(module = %module, stage = %self.stage, "执行清理钩子");
            if let Err(e) = hook.call() {
                failures += 1;
                warn!(
                    module = %module,
                    stage = %self.stage,
                    error_code = e.error_code(),
                    "清理钩子失败（已忽略）: {}",
                    e
                );
            }
        }
        failures
    }
}

impl Drop for CleanupStack<'_> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            self.unwind();
        }
    }
}

/// 生命周期执行器
pub struct LifecycleRunner<'a> {
    run_id: u64,
    modules: &'a [Arc<ModuleContext>],
}

impl<'a> LifecycleRunner<'a> {
    /// 为一次调用的激活顺序创建执行器
    pub fn new(run_id: u64, modules: &'a [Arc<ModuleContext>]) -> Self {
        Self { run_id, modules }
    }

    /// 执行全部阶段和主体
    pub fn run<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.validate()?;

        // teardown 先声明，后析构
        let mut teardown = CleanupStack::new(HookStage::Teardown);
        let mut stop = CleanupStack::new(HookStage::Stop);

        let result = self
            .setup(&mut teardown)
            .and_then(|_| self.start(&mut stop))
            .and_then(|_| {
                debug!(run_id = self.run_id, "执行主体");
                body()
            });

        let stop_failures = stop.unwind();
        let teardown_failures = teardown.unwind();
        if stop_failures + teardown_failures > 0 {
            info!(
                run_id = self.run_id,
                stop_failures,
                teardown_failures,
                "清理完成，部分钩子失败"
            );
        } else {
            debug!(run_id = self.run_id, "清理完成");
        }

        result
    }

    /// 执行全部 Validate 钩子，第一个错误立即返回
    pub fn validate(&self) -> Result<()> {
        debug!(run_id = self.run_id, "阶段: validate");
        for ctx in self.modules {
            for hook in ctx.hooks().iter().filter(|h| h.stage() == HookStage::Validate) {
                hook.call().map_err(|e| {
                    debug!(run_id = self.run_id, module = %ctx.describe(), error = %e, "校验失败");
                    e
                })?;
            }
        }
        Ok(())
    }

    /// 执行 Setup 钩子并调度 Teardown 钩子
    pub fn setup(&self, teardown: &mut CleanupStack<'a>) -> Result<()> {
        self.staged(HookStage::Setup, teardown)
    }

    /// 执行 Start 钩子并调度 Stop 钩子
    pub fn start(&self, stop: &mut CleanupStack<'a>) -> Result<()> {
        self.staged(HookStage::Start, stop)
    }

    fn staged(&self, stage: HookStage, cleanup: &mut CleanupStack<'a>) -> Result<()> {
        debug!(run_id = self.run_id, stage = %stage, "阶段开始");
        let modules: &'a [Arc<ModuleContext>] = self.modules;
        for ctx in modules {
            for hook in ctx.hooks() {
                if hook.stage() == stage {
                    hook.call().map_err(|e| {
                        debug!(
                            run_id = self.run_id,
                            module = %ctx.describe(),
                            stage = %stage,
                            error = %e,
                            "钩子失败"
                        );
                        e
                    })?;
                } else if Some(hook.stage()) == stage.cleanup() {
                    cleanup.push(ctx.describe(), hook);
                }
            }
        }
        Ok(())
    }
}
