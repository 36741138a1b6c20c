//! 错误目录
//!
//! 把命名的拒绝原因转换为最终返回给调用方的错误值。部署方可以实现
//! [`ErrorCatalog`] 替换默认的英文文案。

use crate::validator::ValidationErrors;

use super::status::ActionError;

/// 错误目录
pub trait ErrorCatalog: Send + Sync {
    /// 服务器内部错误
    fn server_error_message(&self) -> ActionError;

    /// 服务器正在关闭
    fn server_shutting_down(&self) -> ActionError;

    /// 待处理请求过多
    fn too_many_pending_actions(&self) -> ActionError;

    /// 未知 Action（名称可能缺失）
    fn unknown_action(&self, action: Option<&str>) -> ActionError;

    /// Action 不支持当前连接类型
    fn unsupported_server_type(&self, connection_type: &str) -> ActionError;

    /// 参数校验失败
    fn invalid_params(&self, errors: &ValidationErrors) -> ActionError;

    /// 执行超时
    fn response_timeout(&self, action: &str) -> ActionError;

    /// 从非内部连接调用私有 Action
    fn private_action_called(&self, action: &str) -> ActionError;

    /// 参数格式转换失败，返回记录到字段上的消息
    fn param_invalid_type(&self, field: &str, format: &str) -> String;
}

/// 默认英文错误目录
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorCatalog;

impl ErrorCatalog for DefaultErrorCatalog {
    fn server_error_message(&self) -> ActionError {
        ActionError::message("The server experienced an internal error")
    }

    fn server_shutting_down(&self) -> ActionError {
        ActionError::message("The server is shutting down")
    }

    fn too_many_pending_actions(&self) -> ActionError {
        ActionError::message("you have too many pending requests")
    }

    fn unknown_action(&self, action: Option<&str>) -> ActionError {
        match action {
            Some(action) => ActionError::message(format!(
                "unknown action or invalid apiVersion: '{}'",
                action
            )),
            None => ActionError::message("unknown action or invalid apiVersion"),
        }
    }

    fn unsupported_server_type(&self, connection_type: &str) -> ActionError {
        ActionError::message(format!(
            "this action does not support the {} connection type",
            connection_type
        ))
    }

    fn invalid_params(&self, errors: &ValidationErrors) -> ActionError {
        ActionError::Value(errors.to_value())
    }

    fn response_timeout(&self, action: &str) -> ActionError {
        ActionError::message(format!("Response timeout for action '{}'", action))
    }

    fn private_action_called(&self, action: &str) -> ActionError {
        ActionError::message(format!(
            "the action '{}' is private and can only be called internally",
            action
        ))
    }

    fn param_invalid_type(&self, field: &str, format: &str) -> String {
        format!("param '{}' has an invalid type, expected {}", field, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_messages() {
        let catalog = DefaultErrorCatalog;
        assert_eq!(
            catalog.unknown_action(Some("sleep")).to_string(),
            "unknown action or invalid apiVersion: 'sleep'"
        );
        assert!(catalog.unsupported_server_type("web").to_string().contains("web"));
        assert!(catalog.response_timeout("sleep").to_string().contains("sleep"));
        assert_eq!(
            catalog.param_invalid_type("age", "integer"),
            "param 'age' has an invalid type, expected integer"
        );
    }

    #[test]
    fn test_invalid_params_is_structured() {
        let mut errors = ValidationErrors::new();
        errors.insert("age", "The age must be an integer.");
        let err = DefaultErrorCatalog.invalid_params(&errors);
        assert_eq!(err.to_value(), json!({"age": "The age must be an integer."}));
    }
}
