//! 激活选项
//!
//! 选项是作用于 [`UseConfig`] 的具名修改器。选项链按「父级选项 + 调用点选项」拼接，
//! 从左到右依次应用，同一字段以最后一次写入为准。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::api::flags::FlagSet;
use crate::utils::{OrcError, Result};

/// 选项解析后的配置记录
#[derive(Debug, Clone, Default)]
pub struct UseConfig {
    /// 外部提供的参数集
    pub flags: Option<FlagSet>,

    /// 通用键值参数
    pub params: BTreeMap<String, Value>,
}

type ApplyFn = dyn Fn(&mut UseConfig) -> Result<()> + Send + Sync;

/// 激活选项
#[derive(Clone)]
pub struct UseOption {
    name: &'static str,
    apply: Arc<ApplyFn>,
}

impl UseOption {
    /// 创建自定义选项
    pub fn new<F>(name: &'static str, apply: F) -> Self
    where
        F: Fn(&mut UseConfig) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            apply: Arc::new(apply),
        }
    }

    /// 选项名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, config: &mut UseConfig) -> Result<()> {
        (self.apply)(config)
    }
}

impl fmt::Debug for UseOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseOption").field("name", &self.name).finish()
    }
}

/// 依次应用选项链，第一个失败的选项中止解析
pub fn parse_options(options: &[UseOption]) -> Result<UseConfig> {
    let mut config = UseConfig::default();
    for option in options {
        option.apply(&mut config)?;
    }
    Ok(config)
}

/// 绑定参数集
pub fn with_flags(flags: FlagSet) -> UseOption {
    UseOption::new("with_flags", move |config| {
        config.flags = Some(flags.clone());
        Ok(())
    })
}

/// 设置一个键值参数，空键视为无效选项
pub fn with_param(key: impl Into<String>, value: impl Into<Value>) -> UseOption {
    let key = key.into();
    let value = value.into();
    UseOption::new("with_param", move |config| {
        if key.trim().is_empty() {
            return Err(OrcError::InvalidOption {
                option: "with_param".to_string(),
                reason: "参数键不能为空".to_string(),
            });
        }
        config.params.insert(key.clone(), value.clone());
        Ok(())
    })
}
