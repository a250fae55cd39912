//! 编排内核错误类型定义
//!
//! 本模块定义了内核中使用的所有错误类型。

use thiserror::Error;

/// 编排内核核心错误类型
#[derive(Error, Debug)]
pub enum OrcError {
    // ==================== 模块编排错误 ====================

    /// 循环依赖
    #[error("检测到循环依赖: {0}")]
    CircularDependency(String),

    /// 钩子执行失败
    #[error("钩子执行失败: '{module}' [{stage}] - {reason}")]
    HookFailed {
        module: String,
        stage: String,
        reason: String,
    },

    // ==================== 选项与参数错误 ====================

    /// 选项无效
    #[error("选项无效: '{option}' - {reason}")]
    InvalidOption {
        option: String,
        reason: String,
    },

    /// 未绑定参数集
    #[error("模块 '{0}' 需要参数集，但当前调用未绑定参数集")]
    FlagsNotBound(String),

    /// 参数重复定义
    #[error("参数已存在: '{0}'")]
    DuplicateFlag(String),

    /// 命令行参数错误
    #[error("命令行参数错误: {0}")]
    Cli(#[from] clap::Error),

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        key: String,
        reason: String,
    },

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ==================== 通用错误 ====================

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 内核操作结果类型别名
pub type Result<T> = std::result::Result<T, OrcError>;

/// 错误码常量
pub mod error_code {
    // 模块错误 (MODULE-xxx)
    pub const MODULE_HOOK_FAILED: &str = "MODULE-002";
    pub const MODULE_CIRCULAR_DEPENDENCY: &str = "MODULE-005";

    // 选项错误 (OPTION-xxx)
    pub const OPTION_INVALID: &str = "OPTION-001";
    pub const OPTION_FLAGS_NOT_BOUND: &str = "OPTION-002";
    pub const OPTION_DUPLICATE_FLAG: &str = "OPTION-003";

    // 命令行错误 (CLI-xxx)
    pub const CLI_PARSE_FAILED: &str = "CLI-001";

    // 配置错误 (CONFIG-xxx)
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";

    // 核心错误 (CORE-xxx)
    pub const CORE_INTERNAL: &str = "CORE-001";
    pub const CORE_INIT_FAILED: &str = "CORE-003";
}

/// 进程退出码常量
pub mod exit_code {
    /// 运行期错误（钩子或主体失败）
    pub const FAILURE: i32 = 1;

    /// 命令行用法错误
    pub const USAGE: i32 = 2;

    /// 配置错误
    pub const CONFIG: i32 = 78;
}

impl OrcError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            OrcError::CircularDependency(_) => error_code::MODULE_CIRCULAR_DEPENDENCY,
            OrcError::HookFailed { .. } => error_code::MODULE_HOOK_FAILED,
            OrcError::InvalidOption { .. } => error_code::OPTION_INVALID,
            OrcError::FlagsNotBound(_) => error_code::OPTION_FLAGS_NOT_BOUND,
            OrcError::DuplicateFlag(_) => error_code::OPTION_DUPLICATE_FLAG,
            OrcError::Cli(_) => error_code::CLI_PARSE_FAILED,
            OrcError::ConfigLoadFailed(_) => error_code::CONFIG_LOAD_FAILED,
            OrcError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            OrcError::Internal(_) => error_code::CORE_INTERNAL,
            OrcError::InitFailed(_) => error_code::CORE_INIT_FAILED,
            _ => "UNKNOWN",
        }
    }

    /// 获取建议的进程退出码
    pub fn exit_code(&self) -> i32 {
        match self {
            OrcError::Cli(_) => exit_code::USAGE,
            OrcError::ConfigLoadFailed(_) | OrcError::InvalidConfigValue { .. } => {
                exit_code::CONFIG
            }
            _ => exit_code::FAILURE,
        }
    }

    /// 创建钩子失败错误
    pub fn hook(module: impl Into<String>, stage: impl ToString, reason: impl Into<String>) -> Self {
        OrcError::HookFailed {
            module: module.into(),
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrcError::CircularDependency("A -> B -> A".to_string());
        assert!(err.to_string().contains("A -> B -> A"));
    }

    #[test]
    fn test_error_code() {
        let err = OrcError::CircularDependency("A -> A".to_string());
        assert_eq!(err.error_code(), error_code::MODULE_CIRCULAR_DEPENDENCY);

        let err = OrcError::hook("DB", "setup", "连接失败");
        assert_eq!(err.error_code(), error_code::MODULE_HOOK_FAILED);
    }

    #[test]
    fn test_exit_code() {
        let err = OrcError::ConfigLoadFailed("missing".to_string());
        assert_eq!(err.exit_code(), exit_code::CONFIG);

        let err = OrcError::Internal("boom".to_string());
        assert_eq!(err.exit_code(), exit_code::FAILURE);
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: OrcError = anyhow::anyhow!("database unreachable").into();
        assert!(matches!(err, OrcError::Other(_)));
        assert_eq!(err.to_string(), "database unreachable");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let orc_err: OrcError = io_err.into();
        assert!(matches!(orc_err, OrcError::Io(_)));
    }
}
