//! 内核配置
//!
//! 定义编排内核的配置结构和加载逻辑。配置来源按优先级从低到高：
//! 默认值 → 配置文件（YAML/JSON）→ `ORC_*` 环境变量。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::{exit_code, OrcError, Result};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "ORC";

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_dir: None,
            json_format: false,
            rotation: default_rotation(),
        }
    }
}

/// 调用执行配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// `run_or_exit` 在运行失败时使用的退出码
    #[serde(default = "default_exit_code")]
    pub exit_code: i32,

    /// 执行前以 info 级别输出激活顺序和依赖图
    #[serde(default)]
    pub log_graph: bool,
}

fn default_exit_code() -> i32 {
    exit_code::FAILURE
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            exit_code: default_exit_code(),
            log_graph: false,
        }
    }
}

/// 编排内核配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrcConfig {
    /// 配置文件路径
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// 日志配置
    #[serde(default)]
    pub logging: LogConfig,

    /// 调用执行配置
    #[serde(default)]
    pub run: RunConfig,

    /// 是否为开发模式（日志级别提升到 debug）
    #[serde(default)]
    pub dev_mode: bool,
}

impl OrcConfig {
    /// 创建配置构建器
    pub fn builder() -> OrcConfigBuilder {
        OrcConfigBuilder::default()
    }

    /// 从文件加载配置，`.json` 后缀按 JSON 解析，其余按 YAML 解析
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            OrcError::ConfigLoadFailed(format!("无法读取 {}: {}", path.display(), e))
        })?;

        let mut config: OrcConfig = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        config.config_path = Some(path);
        config.validate()?;
        Ok(config)
    }

    /// 加载配置：文件（可选）叠加环境变量
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 用环境变量覆盖配置
    ///
    /// 支持 `ORC_LOG_LEVEL`、`ORC_LOG_JSON`、`ORC_LOG_DIR`、`ORC_EXIT_CODE`、`ORC_LOG_GRAPH`、`ORC_DEV`。
    /// 变量读取通过 `lookup` 注入，便于测试。
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name));

        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = var("LOG_JSON") {
            self.logging.json_format = parse_bool("LOG_JSON", &json)?;
        }
        if let Some(dir) = var("LOG_DIR") {
            self.logging.file_output = true;
            self.logging.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(code) = var("EXIT_CODE") {
            self.run.exit_code = code.trim().parse().map_err(|_| OrcError::InvalidConfigValue {
                key: format!("{}_EXIT_CODE", ENV_PREFIX),
                reason: format!("不是有效的整数: '{}'", code),
            })?;
        }
        if let Some(graph) = var("LOG_GRAPH") {
            self.run.log_graph = parse_bool("LOG_GRAPH", &graph)?;
        }
        if let Some(dev) = var("DEV") {
            self.dev_mode = parse_bool("DEV", &dev)?;
        }

        self.validate()
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        if !(1..=255).contains(&self.run.exit_code) {
            return Err(OrcError::InvalidConfigValue {
                key: "run.exit_code".to_string(),
                reason: format!("退出码必须在 1..=255 之间，当前为 {}", self.run.exit_code),
            });
        }
        if self.logging.file_output && self.logging.log_dir.is_none() {
            return Err(OrcError::InvalidConfigValue {
                key: "logging.log_dir".to_string(),
                reason: "启用文件日志时必须指定日志目录".to_string(),
            });
        }
        Ok(())
    }

    /// 实际生效的日志级别
    pub fn effective_log_level(&self) -> &str {
        if self.dev_mode && self.logging.level == default_log_level() {
            "debug"
        } else {
            &self.logging.level
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(OrcError::InvalidConfigValue {
            key: format!("{}_{}", ENV_PREFIX, name),
            reason: format!("不是有效的布尔值: '{}'", value),
        }),
    }
}

/// 配置构建器
#[derive(Debug, Default)]
pub struct OrcConfigBuilder {
    config: OrcConfig,
}

impl OrcConfigBuilder {
    /// 设置日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 启用文件日志
    pub fn file_logging(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config.logging.file_output = true;
        self.config.logging.log_dir = Some(log_dir.into());
        self
    }

    /// 启用 JSON 格式日志
    pub fn json_logging(mut self) -> Self {
        self.config.logging.json_format = true;
        self
    }

    /// 设置失败退出码
    pub fn exit_code(mut self, code: i32) -> Self {
        self.config.run.exit_code = code;
        self
    }

    /// 执行前输出依赖图
    pub fn log_graph(mut self) -> Self {
        self.config.run.log_graph = true;
        self
    }

    /// 启用开发模式
    pub fn dev_mode(mut self) -> Self {
        self.config.dev_mode = true;
        self
    }

    /// 构建配置
    pub fn build(self) -> OrcConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = OrcConfig::default();
        assert!(!config.dev_mode);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.run.exit_code, 1);
        assert!(!config.run.log_graph);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = OrcConfig::builder()
            .log_level("warn")
            .exit_code(3)
            .log_graph()
            .dev_mode()
            .build();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.run.exit_code, 3);
        assert!(config.run.log_graph);
        assert!(config.dev_mode);
    }

    #[test]
    fn test_effective_log_level() {
        let config = OrcConfig::builder().dev_mode().build();
        assert_eq!(config.effective_log_level(), "debug");

        // 显式配置的级别优先于开发模式
        let config = OrcConfig::builder().dev_mode().log_level("trace").build();
        assert_eq!(config.effective_log_level(), "trace");
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = OrcConfig::default();
        config
            .apply_env(env(&[
                ("ORC_LOG_LEVEL", "debug"),
                ("ORC_LOG_JSON", "true"),
                ("ORC_EXIT_CODE", "42"),
                ("ORC_LOG_GRAPH", "1"),
            ]))
            .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.run.exit_code, 42);
        assert!(config.run.log_graph);
    }

    #[test]
    fn test_apply_env_invalid_values() {
        let mut config = OrcConfig::default();
        let err = config
            .apply_env(env(&[("ORC_EXIT_CODE", "abc")]))
            .unwrap_err();
        assert!(matches!(err, OrcError::InvalidConfigValue { .. }));

        let mut config = OrcConfig::default();
        let err = config.apply_env(env(&[("ORC_EXIT_CODE", "0")])).unwrap_err();
        assert!(matches!(err, OrcError::InvalidConfigValue { ref key, .. } if key == "run.exit_code"));

        let mut config = OrcConfig::default();
        let err = config.apply_env(env(&[("ORC_DEV", "maybe")])).unwrap_err();
        assert!(matches!(err, OrcError::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_file_output_requires_dir() {
        let mut config = OrcConfig::default();
        config.logging.file_output = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = OrcConfig::builder().log_level("warn").exit_code(5).build();

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: OrcConfig = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed, config);
    }
}
