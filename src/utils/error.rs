//! Action 内核错误类型定义
//!
//! 本模块定义了内核在配置、装配阶段使用的错误类型。
//! 单个请求内产生的错误（校验失败、超时、Action 报错等）不会以 `Err`
//! 的形式向外传播，它们被收敛进响应和日志，参见 [`crate::action::ActionError`]。

use thiserror::Error;

/// Action 内核核心错误类型
#[derive(Error, Debug)]
pub enum CoreError {
    // ==================== 校验规则错误 ====================

    /// 规则名未注册
    #[error("未注册的校验规则: '{0}'")]
    UnknownRule(String),

    /// 规则参数不足
    #[error("校验规则 {rule} 至少需要 {count} 个参数")]
    MissingRuleParameters {
        rule: String,
        count: usize,
    },

    /// 规则参数无效
    #[error("校验规则 {rule} 的参数无效: {reason}")]
    InvalidRuleArgument {
        rule: String,
        reason: String,
    },

    /// 正则表达式无法编译
    #[error("无效的正则表达式 '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    /// 规则缺少错误消息模板
    #[error("校验规则 '{0}' 没有配置错误消息")]
    NoMessage(String),

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
}

/// 内核操作结果类型别名
pub type Result<T> = std::result::Result<T, CoreError>;

/// 状态码常量
pub mod status_code {
    /// 成功
    pub const OK: u16 = 200;

    /// 请求参数错误
    pub const BAD_REQUEST: u16 = 400;

    /// 权限不足
    pub const FORBIDDEN: u16 = 403;

    /// 未找到
    pub const NOT_FOUND: u16 = 404;

    /// 请求超时
    pub const TIMEOUT: u16 = 408;

    /// 请求过多
    pub const TOO_MANY_REQUESTS: u16 = 429;

    /// 内部错误
    pub const INTERNAL_ERROR: u16 = 500;

    /// 服务不可用
    pub const SERVICE_UNAVAILABLE: u16 = 503;
}

/// 错误码常量
pub mod error_code {
    // 校验器错误 (VALIDATOR-xxx)
    pub const VALIDATOR_UNKNOWN_RULE: &str = "VALIDATOR-001";
    pub const VALIDATOR_MISSING_PARAMETERS: &str = "VALIDATOR-002";
    pub const VALIDATOR_INVALID_ARGUMENT: &str = "VALIDATOR-003";
    pub const VALIDATOR_INVALID_PATTERN: &str = "VALIDATOR-004";
    pub const VALIDATOR_NO_MESSAGE: &str = "VALIDATOR-005";

    // 配置错误 (CONFIG-xxx)
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";

    // 核心错误 (CORE-xxx)
    pub const CORE_INIT_FAILED: &str = "CORE-003";
}

impl CoreError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::UnknownRule(_) => error_code::VALIDATOR_UNKNOWN_RULE,
            CoreError::MissingRuleParameters { .. } => error_code::VALIDATOR_MISSING_PARAMETERS,
            CoreError::InvalidRuleArgument { .. } => error_code::VALIDATOR_INVALID_ARGUMENT,
            CoreError::InvalidPattern { .. } => error_code::VALIDATOR_INVALID_PATTERN,
            CoreError::NoMessage(_) => error_code::VALIDATOR_NO_MESSAGE,
            CoreError::ConfigLoadFailed(_) => error_code::CONFIG_LOAD_FAILED,
            CoreError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            CoreError::InitFailed(_) => error_code::CORE_INIT_FAILED,
            _ => "UNKNOWN",
        }
    }

    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        status_code::INTERNAL_ERROR
    }

    /// 是否为校验规则配置错误
    ///
    /// 这类错误属于开发者的配置问题，会中断整次校验调用。
    pub fn is_rule_error(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownRule(_)
                | CoreError::MissingRuleParameters { .. }
                | CoreError::InvalidRuleArgument { .. }
                | CoreError::InvalidPattern { .. }
                | CoreError::NoMessage(_)
        )
    }
}
