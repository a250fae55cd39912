//! 调用上下文与激活上下文
//!
//! - [`RunContext`]：每个顶层入口一份，记录本次调用的激活顺序与依赖边
//! - [`UseContext`]：传给模块激活回调，允许继续声明依赖并读取选项解析结果

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use super::dependency::DependencyGraph;
use super::lifecycle::LifecycleRunner;
use super::metadata::{describe, ModuleId, ModuleRef};
use super::options::{UseConfig, UseOption};
use super::registry::{ModuleContext, Registry};
use crate::api::flags::FlagSet;
use crate::utils::Result;

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// 调用上下文
///
/// 由 [`Registry::use_module`] 创建，随后通过 [`RunContext::run`] 执行一次。
pub struct RunContext {
    id: u64,
    registry: Arc<Registry>,
    began_use: HashSet<ModuleId>,
    activating: Vec<Arc<ModuleContext>>,
    ordered: Vec<Arc<ModuleContext>>,
    graph: DependencyGraph,
}

impl RunContext {
    pub(crate) fn new(registry: Arc<Registry>) -> Self {
        Self {
            id: NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed),
            registry,
            began_use: HashSet::new(),
            activating: Vec::new(),
            ordered: Vec::new(),
            graph: DependencyGraph::new(),
        }
    }

    /// 调用 ID（仅用于日志关联）
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 按首次激活顺序排列的模块
    pub fn ordered_modules(&self) -> Vec<ModuleRef> {
        self.ordered.iter().map(|c| Arc::clone(c.module())).collect()
    }

    /// 按激活顺序排列的模块描述
    pub fn describe_order(&self) -> Vec<String> {
        self.ordered.iter().map(|c| c.describe()).collect()
    }

    /// 模块是否在本次调用的激活顺序中
    pub fn contains(&self, module: &ModuleRef) -> bool {
        let id = ModuleId::of(module);
        self.ordered.iter().any(|c| c.id() == id)
    }

    /// 本次调用记录的依赖边
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// 激活的模块数量
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// 是否没有激活任何模块
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// 执行生命周期并运行主体
    ///
    /// 执行期间持有注册表锁。返回 Validate/Setup/Start 中第一个错误，
    /// 否则返回主体的结果；清理阶段的错误只记录日志。
    pub fn run<T, F>(self, body: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let registry = Arc::clone(&self.registry);
        let _guard = registry.lock_for_run();

        debug!(run_id = self.id, "枚举模块执行顺序");
        for (i, ctx) in self.ordered.iter().enumerate() {
            debug!(run_id = self.id, index = i, module = %ctx.describe(), "模块");
        }

        if registry.config().log_graph {
            info!(run_id = self.id, order = ?self.describe_order(), "激活顺序");
            for edge in self.graph.edges() {
                info!(run_id = self.id, "依赖: {:?}", edge);
            }
        }

        LifecycleRunner::new(self.id, &self.ordered).run(body)
    }

    /// 执行生命周期，失败时记录错误并以配置的退出码终止进程
    pub fn run_or_exit<T, F>(self, body: F) -> T
    where
        F: FnOnce() -> Result<T>,
    {
        let exit_code = self.registry.config().exit_code;
        match self.run(body) {
            Ok(value) => value,
            Err(e) => {
                error!(error_code = e.error_code(), "致命错误: {}", e);
                eprintln!("fatal: {}", e);
                std::process::exit(exit_code)
            }
        }
    }

    pub(crate) fn register_edge(&mut self, dependent: &ModuleRef, dependency: &ModuleRef) {
        debug!(
            run_id = self.id,
            dependent = %describe(dependent),
            dependency = %describe(dependency),
            "记录依赖"
        );
        self.graph.record(dependent, dependency);
    }

    /// 若模块正在激活中，返回形如 `A -> B -> A` 的环路径
    pub(crate) fn cycle_path(&self, id: ModuleId, module: &ModuleRef) -> Option<String> {
        let start = self.activating.iter().position(|c| c.id() == id)?;
        let mut path: Vec<String> = self.activating[start..]
            .iter()
            .map(|c| c.describe())
            .collect();
        path.push(describe(module));
        Some(path.join(" -> "))
    }

    pub(crate) fn has_begun(&self, id: ModuleId) -> bool {
        self.began_use.contains(&id)
    }

    pub(crate) fn begin_use(&mut self, ctx: &Arc<ModuleContext>) {
        self.began_use.insert(ctx.id());
        self.activating.push(Arc::clone(ctx));
    }

    pub(crate) fn finish_use(&mut self) {
        self.activating.pop();
    }

    pub(crate) fn push_ordered(&mut self, ctx: Arc<ModuleContext>) {
        if !self.ordered.iter().any(|c| c.id() == ctx.id()) {
            self.ordered.push(ctx);
        }
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("id", &self.id)
            .field("ordered", &self.describe_order())
            .field("edges", &self.graph.len())
            .finish()
    }
}

/// 激活上下文
///
/// 每一步激活新建一份，只在模块的激活回调执行期间存在。
pub struct UseContext<'a> {
    registry: &'a Registry,
    run: &'a mut RunContext,
    module_ctx: &'a ModuleContext,
    options: &'a [UseOption],
    config: UseConfig,
}

impl<'a> UseContext<'a> {
    pub(crate) fn new(
        registry: &'a Registry,
        run: &'a mut RunContext,
        module_ctx: &'a ModuleContext,
        options: &'a [UseOption],
        config: UseConfig,
    ) -> Self {
        Self {
            registry,
            run,
            module_ctx,
            options,
            config,
        }
    }

    /// 正在激活的模块
    pub fn module(&self) -> &ModuleRef {
        self.module_ctx.module()
    }

    /// 所属调用 ID
    pub fn run_id(&self) -> u64 {
        self.run.id()
    }

    /// 选项解析结果
    pub fn config(&self) -> &UseConfig {
        &self.config
    }

    /// 绑定的参数集
    pub fn flags(&self) -> Option<&FlagSet> {
        self.config.flags.as_ref()
    }

    /// 读取键值参数
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.config.params.get(key)
    }

    /// 声明依赖，沿用当前选项链
    pub fn declare(&mut self, dependency: &ModuleRef) -> Result<()> {
        self.declare_with(dependency, Vec::new())
    }

    /// 声明依赖，并在当前选项链之后追加选项
    ///
    /// 无论依赖是否已激活都会记录依赖边；依赖及其全部传递依赖在返回前完成激活。
    pub fn declare_with<I>(&mut self, dependency: &ModuleRef, options: I) -> Result<()>
    where
        I: IntoIterator<Item = UseOption>,
    {
        self.run.register_edge(self.module_ctx.module(), dependency);

        let mut chained = self.options.to_vec();
        chained.extend(options);
        self.registry.activate(self.run, dependency, chained)
    }

    /// 依次声明多个依赖，遇到第一个错误即停止
    pub fn declare_all<'m, I>(&mut self, dependencies: I) -> Result<()>
    where
        I: IntoIterator<Item = &'m ModuleRef>,
    {
        for dependency in dependencies {
            self.declare(dependency)?;
        }
        Ok(())
    }
}

impl fmt::Debug for UseContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseContext")
            .field("run_id", &self.run.id())
            .field("module", &self.module_ctx.describe())
            .field("options", &self.options)
            .finish()
    }
}
