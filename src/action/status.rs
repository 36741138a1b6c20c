//! Action 完成状态与错误值

use serde_json::Value;
use std::fmt;

use crate::utils::CoreError;

/// 请求级错误值
///
/// 作为响应中的 `error` 字段返回给调用方，不会以 `Err` 的形式传出处理器。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    /// 文本错误
    #[error("{0}")]
    Message(String),

    /// 任意结构化错误值，显示为 JSON 文本
    #[error("{0}")]
    Value(Value),
}

impl ActionError {
    /// 创建文本错误
    pub fn message(message: impl Into<String>) -> Self {
        ActionError::Message(message.into())
    }

    /// 创建结构化错误
    pub fn value(value: impl Into<Value>) -> Self {
        ActionError::Value(value.into())
    }

    /// 写入响应时使用的 JSON 表示
    pub fn to_value(&self) -> Value {
        match self {
            ActionError::Message(message) => Value::String(message.clone()),
            ActionError::Value(value) => value.clone(),
        }
    }

    /// 写入日志时使用的文本
    pub fn log_string(&self) -> String {
        match self {
            ActionError::Message(message) => message.clone(),
            ActionError::Value(value) => {
                serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        ActionError::Message(message)
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        ActionError::Message(message.to_string())
    }
}

impl From<Value> for ActionError {
    fn from(value: Value) -> Self {
        ActionError::Value(value)
    }
}

impl From<anyhow::Error> for ActionError {
    fn from(err: anyhow::Error) -> Self {
        ActionError::Message(format!("{:#}", err))
    }
}

impl From<CoreError> for ActionError {
    fn from(err: CoreError) -> Self {
        ActionError::Message(err.to_string())
    }
}

/// Action 的完成状态
#[derive(Debug, Clone, PartialEq)]
pub enum ActionStatus {
    /// 成功
    Success,
    /// 服务器内部错误
    ServerError,
    /// 服务器不在运行状态
    ServerShuttingDown,
    /// 连接上待处理的请求过多
    TooManyRequests,
    /// 未知的 Action 或版本
    UnknownAction,
    /// Action 禁止当前连接类型
    UnsupportedServerType,
    /// 参数校验失败
    ValidatorErrors,
    /// 执行超时
    ResponseTimeout,
    /// Action、中间件或访问控制给出的错误
    Failed(ActionError),
}

impl ActionStatus {
    /// 状态名
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Success => "success",
            ActionStatus::ServerError => "server_error",
            ActionStatus::ServerShuttingDown => "server_shutting_down",
            ActionStatus::TooManyRequests => "too_many_requests",
            ActionStatus::UnknownAction => "unknown_action",
            ActionStatus::UnsupportedServerType => "unsupported_server_type",
            ActionStatus::ValidatorErrors => "validator_errors",
            ActionStatus::ResponseTimeout => "response_timeout",
            ActionStatus::Failed(_) => "error",
        }
    }

    /// 是否成功
    pub fn is_success(&self) -> bool {
        matches!(self, ActionStatus::Success)
    }

    /// 对应的 HTTP 风格状态码
    pub fn status_code(&self) -> u16 {
        use crate::utils::status_code;
        match self {
            ActionStatus::Success => status_code::OK,
            ActionStatus::ServerError => status_code::INTERNAL_ERROR,
            ActionStatus::ServerShuttingDown => status_code::SERVICE_UNAVAILABLE,
            ActionStatus::TooManyRequests => status_code::TOO_MANY_REQUESTS,
            ActionStatus::UnknownAction => status_code::NOT_FOUND,
            ActionStatus::UnsupportedServerType => status_code::FORBIDDEN,
            ActionStatus::ValidatorErrors => status_code::BAD_REQUEST,
            ActionStatus::ResponseTimeout => status_code::TIMEOUT,
            ActionStatus::Failed(_) => status_code::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Failed(err) => write!(f, "{}", err),
            other => f.write_str(other.as_str()),
        }
    }
}

impl From<ActionError> for ActionStatus {
    fn from(err: ActionError) -> Self {
        ActionStatus::Failed(err)
    }
}

impl From<Option<ActionError>> for ActionStatus {
    fn from(err: Option<ActionError>) -> Self {
        err.map(ActionStatus::Failed).unwrap_or(ActionStatus::Success)
    }
}
