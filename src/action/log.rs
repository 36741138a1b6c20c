//! 完成日志
//!
//! 每次完成（无论成败）写入一条结构化日志。参数在写入前过滤：
//! 配置中列出的参数名替换为 `[FILTERED]`，字符串值按配置长度截断。

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::Level;

use crate::core::config::ActionConfig;
use crate::utils::fields;

/// 被屏蔽参数的占位文本
pub const FILTERED: &str = "[FILTERED]";

/// 一条完成日志
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionLogEntry {
    /// 请求 ID
    pub request_id: String,
    /// 连接类型
    pub connection_type: String,
    /// 远端地址
    pub to: String,
    /// Action 名
    pub action: Option<String>,
    /// 过滤后的参数
    pub params: Map<String, Value>,
    /// 耗时（毫秒）
    pub duration_ms: u64,
    /// 完成状态名
    pub status: String,
    /// 错误文本
    pub error: Option<String>,
}

impl ActionLogEntry {
    /// 过滤后参数的 JSON 文本
    pub fn params_json(&self) -> String {
        serde_json::to_string(&self.params).unwrap_or_default()
    }

    /// 以日志字段名为键的 JSON 对象
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(fields::REQUEST_ID.into(), Value::String(self.request_id.clone()));
        map.insert(fields::CONNECTION_TYPE.into(), Value::String(self.connection_type.clone()));
        map.insert(fields::REMOTE_IP.into(), Value::String(self.to.clone()));
        map.insert(
            fields::ACTION.into(),
            self.action.clone().map(Value::String).unwrap_or(Value::Null),
        );
        map.insert(fields::PARAMS.into(), Value::String(self.params_json()));
        map.insert(fields::DURATION_MS.into(), Value::from(self.duration_ms));
        map.insert(fields::STATUS.into(), Value::String(self.status.clone()));
        if let Some(error) = &self.error {
            map.insert(fields::ERROR.into(), Value::String(error.clone()));
        }
        Value::Object(map)
    }
}

/// 屏蔽敏感参数并截断长字符串
pub fn filter_params(params: &Map<String, Value>, config: &ActionConfig) -> Map<String, Value> {
    let max_length = config.logger.max_log_string_length;
    params
        .iter()
        .map(|(name, value)| {
            let filtered = if config.is_filtered_param(name) {
                Value::String(FILTERED.to_string())
            } else {
                match value {
                    Value::String(s) if s.chars().count() > max_length => {
                        Value::String(s.chars().take(max_length).collect())
                    }
                    other => other.clone(),
                }
            };
            (name.clone(), filtered)
        })
        .collect()
}

/// 日志输出端
pub trait LogSink: Send + Sync {
    /// 写入一条完成日志
    fn log(&self, message: &str, level: Level, entry: &ActionLogEntry);
}

/// 输出到 `tracing` 的日志端
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

macro_rules! emit {
    ($level:expr, $message:expr, $entry:expr) => {
        tracing::event!(
            $level,
            request_id = %$entry.request_id,
            connection_type = %$entry.connection_type,
            to = %$entry.to,
            action = $entry.action.as_deref().unwrap_or_default(),
            params = %$entry.params_json(),
            duration_ms = $entry.duration_ms,
            status = %$entry.status,
            error = $entry.error.as_deref(),
            "{}",
            $message
        )
    };
}

impl LogSink for TracingLogSink {
    fn log(&self, message: &str, level: Level, entry: &ActionLogEntry) {
        match level {
            Level::TRACE => emit!(Level::TRACE, message, entry),
            Level::DEBUG => emit!(Level::DEBUG, message, entry),
            Level::INFO => emit!(Level::INFO, message, entry),
            Level::WARN => emit!(Level::WARN, message, entry),
            Level::ERROR => emit!(Level::ERROR, message, entry),
        }
    }
}
