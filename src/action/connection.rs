//! 客户端连接
//!
//! 连接由传输层创建并在多个请求之间共享。处理器只修改
//! `total_actions` 和 `pending_actions` 两个计数器，其余字段只读。

use serde_json::{Map, Value};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::RwLock;

use crate::utils::generate_request_id;

/// 客户端连接
#[derive(Debug)]
pub struct Connection {
    id: String,
    connection_type: String,
    remote_ip: String,
    total_actions: AtomicU64,
    pending_actions: AtomicI64,
    message_count: AtomicU64,
    params: RwLock<Map<String, Value>>,
}

impl Connection {
    /// 创建连接
    pub fn new(connection_type: impl Into<String>, remote_ip: impl Into<String>) -> Self {
        Self {
            id: generate_request_id(),
            connection_type: connection_type.into(),
            remote_ip: remote_ip.into(),
            total_actions: AtomicU64::new(0),
            pending_actions: AtomicI64::new(0),
            message_count: AtomicU64::new(0),
            params: RwLock::new(Map::new()),
        }
    }

    /// 设置连接上携带的参数
    pub fn with_params(self, params: Map<String, Value>) -> Self {
        match self.params.write() {
            Ok(mut guard) => *guard = params,
            Err(poisoned) => *poisoned.into_inner() = params,
        }
        self
    }

    /// 连接 ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 传输类型（如 `web`、`websocket`、`internal`）
    pub fn connection_type(&self) -> &str {
        &self.connection_type
    }

    /// 远端地址
    pub fn remote_ip(&self) -> &str {
        &self.remote_ip
    }

    /// 累计处理的 Action 数
    pub fn total_actions(&self) -> u64 {
        self.total_actions.load(Ordering::SeqCst)
    }

    /// 当前待处理的 Action 数
    pub fn pending_actions(&self) -> i64 {
        self.pending_actions.load(Ordering::SeqCst)
    }

    /// 已收到的消息数
    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::SeqCst)
    }

    /// 累计 Action 数加一
    pub fn increment_total_actions(&self) -> u64 {
        self.total_actions.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 调整待处理 Action 数，返回调整后的值
    pub fn increment_pending_actions(&self, delta: i64) -> i64 {
        self.pending_actions.fetch_add(delta, Ordering::SeqCst) + delta
    }

    /// 记录一条新消息，返回消息序号
    pub fn next_message(&self) -> u64 {
        self.message_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 连接参数的快照
    pub fn params(&self) -> Map<String, Value> {
        match self.params.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 设置单个连接参数
    pub fn set_param(&self, key: impl Into<String>, value: Value) {
        match self.params.write() {
            Ok(mut guard) => {
                guard.insert(key.into(), value);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(key.into(), value);
            }
        }
    }
}
