//! 单次请求的状态
//!
//! 每个入站调用对应一个 [`ActionRequest`]，由处理器独占，
//! 在完成回调触发后交给调用方。

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::utils::generate_request_id;
use crate::validator::value::is_truthy;
use crate::validator::ValidationErrors;

use super::connection::Connection;
use super::status::{ActionError, ActionStatus};
use super::template::ActionTemplate;

/// 单次请求
#[derive(Debug)]
pub struct ActionRequest {
    /// 请求 ID
    pub id: String,
    /// 发起请求的连接
    pub connection: Arc<Connection>,
    /// 请求参数（可被默认值、格式转换和中间件修改）
    pub params: Map<String, Value>,
    /// 解析出的 Action 名
    pub action: Option<String>,
    /// 解析出的 API 版本
    pub api_version: Option<u32>,
    /// 绑定的模板
    pub template: Option<Arc<ActionTemplate>>,
    /// 响应（对象、字符串或数组）
    pub response: Value,
    /// 参数校验错误
    pub validator_errors: ValidationErrors,
    /// 开始时间
    pub started_at: Instant,
    /// 处理耗时，完成时写入
    pub duration: Option<Duration>,
    /// 是否正在处理
    pub working: bool,
    /// 是否执行 Action 主体
    pub to_process: bool,
    /// 传输层是否需要渲染响应
    pub to_render: bool,
    /// 是否已经完成（完成只允许发生一次）
    pub error_rendered: bool,
    /// 创建请求时连接上的消息序号
    pub message_count: u64,
    /// 完成状态
    pub status: Option<ActionStatus>,
}

impl ActionRequest {
    /// 创建请求
    pub fn new(connection: Arc<Connection>, params: Map<String, Value>) -> Self {
        let message_count = connection.message_count();
        Self {
            id: generate_request_id(),
            connection,
            params,
            action: None,
            api_version: None,
            template: None,
            response: Value::Object(Map::new()),
            validator_errors: ValidationErrors::new(),
            started_at: Instant::now(),
            duration: None,
            working: false,
            to_process: true,
            to_render: true,
            error_rendered: false,
            message_count,
            status: None,
        }
    }

    /// 响应中的错误
    pub fn error(&self) -> Option<&Value> {
        self.response.get("error")
    }

    /// 是否已完成
    pub fn is_completed(&self) -> bool {
        self.status.is_some()
    }

    /// 把错误合并进响应
    ///
    /// 对象响应设置 `error` 字段，已有错误时保持不变；字符串或数组
    /// 响应整体替换为错误文本。
    pub fn merge_error(&mut self, error: &ActionError) {
        match &mut self.response {
            Value::Object(map) => {
                if !is_truthy(map.get("error")) {
                    map.insert("error".to_string(), error.to_value());
                }
            }
            Value::String(_) | Value::Array(_) => {
                self.response = Value::String(error.to_string());
            }
            Value::Null => {
                let mut map = Map::new();
                map.insert("error".to_string(), error.to_value());
                self.response = Value::Object(map);
            }
            Value::Bool(_) | Value::Number(_) => {}
        }
    }
}
