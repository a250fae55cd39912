//! 集成测试共用的记录模块

#![allow(dead_code)]

use std::sync::Arc;

use chips_orc::{HookStage, Module, ModuleContext, ModuleRef, OrcError};
use parking_lot::Mutex;

/// 事件日志，所有记录模块共享
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().clone()
}

/// 记录每个钩子调用的记录模块
///
/// 依赖在激活回调中按顺序声明；`fail_stage` 指定的阶段返回错误。
pub struct HookRecorder {
    name: &'static str,
    log: Log,
    deps: Vec<ModuleRef>,
    fail_stage: Option<HookStage>,
    stages: Vec<HookStage>,
}

impl HookRecorder {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Arc::clone(log),
            deps: Vec::new(),
            fail_stage: None,
            stages: vec![
                HookStage::Validate,
                HookStage::Setup,
                HookStage::Teardown,
                HookStage::Start,
                HookStage::Stop,
            ],
        }
    }

    pub fn depends_on(mut self, dep: &ModuleRef) -> Self {
        self.deps.push(Arc::clone(dep));
        self
    }

    pub fn failing_at(mut self, stage: HookStage) -> Self {
        self.fail_stage = Some(stage);
        self
    }

    /// 只登记给定阶段的钩子，按给定顺序
    pub fn stages(mut self, stages: &[HookStage]) -> Self {
        self.stages = stages.to_vec();
        self
    }

    pub fn build(self) -> ModuleRef {
        Arc::new(self)
    }
}

impl Module for HookRecorder {
    fn on_register(&self, hooks: &mut ModuleContext) {
        let name = self.name;

        let log = Arc::clone(&self.log);
        let deps = self.deps.clone();
        hooks.on_use(move |ctx| {
            log.lock().push(format!("{}.use", name));
            ctx.declare_all(&deps)
        });

        for &stage in &self.stages {
            let log = Arc::clone(&self.log);
            let fail = self.fail_stage == Some(stage);
            let hook = move || {
                log.lock().push(format!("{}.{}", name, stage));
                if fail {
                    return Err(OrcError::hook(name, stage, "注入失败"));
                }
                Ok(())
            };
            match stage {
                HookStage::Validate => hooks.on_validate(hook),
                HookStage::Setup => hooks.on_setup(hook),
                HookStage::Teardown => hooks.on_teardown(hook),
                HookStage::Start => hooks.on_start(hook),
                HookStage::Stop => hooks.on_stop(hook),
            }
        }
    }

    fn module_name(&self) -> Option<&str> {
        Some(self.name)
    }
}
