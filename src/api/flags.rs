//! 参数集与参数模块
//!
//! [`FlagSet`] 是一次调用共享的参数袋：激活阶段由模块登记 `clap::Arg` 定义，
//! 命令解析完成后绑定 `ArgMatches`，之后钩子和主体可以读取参数值。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use clap::{Arg, ArgMatches};
use parking_lot::Mutex;
use tracing::debug;

use crate::module::{describe, Module, ModuleContext, ModuleRef};
use crate::utils::{OrcError, Result};

#[derive(Default)]
struct FlagSetInner {
    args: Vec<Arg>,
    matches: Option<ArgMatches>,
}

/// 参数集
///
/// 克隆共享同一份底层数据。
#[derive(Clone, Default)]
pub struct FlagSet {
    inner: Arc<Mutex<FlagSetInner>>,
}

impl FlagSet {
    /// 创建空参数集
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否与另一个句柄指向同一参数集
    pub fn same_as(&self, other: &FlagSet) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// 登记参数定义，ID 重复时报错
    pub fn add(&self, arg: Arg) -> Result<()> {
        let mut inner = self.inner.lock();
        let id = arg.get_id().as_str().to_string();
        if inner.args.iter().any(|a| a.get_id() == arg.get_id()) {
            return Err(OrcError::DuplicateFlag(id));
        }
        debug!(flag = %id, "登记参数");
        inner.args.push(arg);
        Ok(())
    }

    /// 参数是否已登记
    pub fn is_defined(&self, id: &str) -> bool {
        self.inner.lock().args.iter().any(|a| a.get_id() == id)
    }

    /// 已登记的参数定义
    pub fn args(&self) -> Vec<Arg> {
        self.inner.lock().args.clone()
    }

    /// 绑定解析结果
    pub fn bind(&self, matches: ArgMatches) {
        self.inner.lock().matches = Some(matches);
    }

    /// 是否已绑定解析结果
    pub fn is_bound(&self) -> bool {
        self.inner.lock().matches.is_some()
    }

    /// 读取单值参数，未绑定、未定义或类型不符时返回 `None`
    pub fn get_one<T>(&self, id: &str) -> Option<T>
    where
        T: Any + Clone + Send + Sync + 'static,
    {
        let inner = self.inner.lock();
        inner
            .matches
            .as_ref()
            .and_then(|m| m.try_get_one::<T>(id).ok().flatten().cloned())
    }

    /// 读取开关参数
    pub fn get_flag(&self, id: &str) -> bool {
        self.get_one::<bool>(id).unwrap_or(false)
    }

    /// 读取多值参数
    pub fn get_many<T>(&self, id: &str) -> Vec<T>
    where
        T: Any + Clone + Send + Sync + 'static,
    {
        let inner = self.inner.lock();
        inner
            .matches
            .as_ref()
            .and_then(|m| m.try_get_many::<T>(id).ok().flatten())
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        let ids: Vec<&str> = inner.args.iter().map(|a| a.get_id().as_str()).collect();
        f.debug_struct("FlagSet")
            .field("args", &ids)
            .field("bound", &inner.matches.is_some())
            .finish()
    }
}

type DefineFn = Arc<dyn Fn(&FlagSet) -> Result<()> + Send + Sync>;

/// 参数模块
///
/// 每次激活时调用定义闭包，向当前调用绑定的参数集登记参数。
#[derive(Clone)]
pub struct FlagsModule {
    define: DefineFn,
}

impl FlagsModule {
    /// 创建参数模块
    pub fn new<F>(define: F) -> Self
    where
        F: Fn(&FlagSet) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            define: Arc::new(define),
        }
    }

    /// 转为模块句柄
    pub fn into_ref(self) -> ModuleRef {
        Arc::new(self)
    }
}

impl Module for FlagsModule {
    fn on_register(&self, hooks: &mut ModuleContext) {
        let define = Arc::clone(&self.define);
        hooks.on_use(move |ctx| {
            let flags = ctx
                .flags()
                .ok_or_else(|| OrcError::FlagsNotBound(describe(ctx.module())))?;
            define(flags)
        });
    }

    fn module_name(&self) -> Option<&str> {
        Some("Flags")
    }
}

impl fmt::Debug for FlagsModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FlagsModule")
    }
}
