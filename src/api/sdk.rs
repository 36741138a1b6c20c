//! Action 内核 SDK
//!
//! [`ActionApi`] 把处理请求所需的共享协作者打包在一起：配置、运行状态、
//! 错误目录、模板提供者、中间件、校验器、日志输出端和统计。它在启动时
//! 构建一次，之后以 `Arc` 在所有请求之间共享。
//!
//! # 示例
//!
//! ```rust,no_run
//! use chips_action::action::{ActionRegistry, ActionTemplate, CallbackAction, Connection};
//! use chips_action::{ActionApi, ActionConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut actions = ActionRegistry::new();
//!     actions.register(ActionTemplate::new(
//!         "ping",
//!         CallbackAction::new(|_, _, next| next.respond(json!({"pong": true}))),
//!     ));
//!
//!     let api = ActionApi::builder(ActionConfig::default())
//!         .provider(actions)
//!         .build()?;
//!     api.start();
//!
//!     let params = json!({"action": "ping"}).as_object().cloned().unwrap_or_default();
//!     let request = api.call(Arc::new(Connection::new("web", "127.0.0.1")), params).await?;
//!     assert_eq!(request.response["pong"], json!(true));
//!     Ok(())
//! }
//! ```

use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::action::{
    ActionProcessor, ActionProvider, ActionRegistry, ActionRequest, ActionStats,
    ActionStatsSnapshot, Connection, DefaultErrorCatalog, ErrorCatalog, LogSink,
    MiddlewareRegistry, TracingLogSink,
};
use crate::core::config::ActionConfig;
use crate::utils::{CoreError, Result};
use crate::validator::{Validator, ValidatorRegistry};

/// Action 内核的共享上下文
pub struct ActionApi {
    config: ActionConfig,
    running: AtomicBool,
    catalog: Box<dyn ErrorCatalog>,
    provider: Box<dyn ActionProvider>,
    middleware: MiddlewareRegistry,
    validator: Validator,
    log_sink: Box<dyn LogSink>,
    stats: ActionStats,
}

impl ActionApi {
    /// 创建构建器
    pub fn builder(config: ActionConfig) -> ActionApiBuilder {
        ActionApiBuilder::new(config)
    }

    /// 配置
    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// 进入运行状态，开始接受请求
    pub fn start(&self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            info!("Action API started");
        }
    }

    /// 停止接受新请求
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Action API shutting down");
        }
    }

    /// 是否处于运行状态
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 错误目录
    pub fn catalog(&self) -> &dyn ErrorCatalog {
        self.catalog.as_ref()
    }

    /// 模板提供者
    pub fn provider(&self) -> &dyn ActionProvider {
        self.provider.as_ref()
    }

    /// 中间件注册表
    pub fn middleware(&self) -> &MiddlewareRegistry {
        &self.middleware
    }

    /// 校验器
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// 日志输出端
    pub fn log_sink(&self) -> &dyn LogSink {
        self.log_sink.as_ref()
    }

    /// 统计计数器
    pub fn action_stats(&self) -> &ActionStats {
        &self.stats
    }

    /// 统计快照
    pub fn stats(&self) -> ActionStatsSnapshot {
        self.stats.snapshot()
    }

    /// 在后台处理一个请求，完成后调用 `callback`
    pub fn dispatch<F>(
        self: &Arc<Self>,
        connection: Arc<Connection>,
        params: Map<String, Value>,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(ActionRequest) + Send + 'static,
    {
        let processor = ActionProcessor::with_params(Arc::clone(self), connection, params, callback);
        tokio::spawn(processor.process_action())
    }

    /// 处理一个请求并等待完成
    pub async fn call(
        self: &Arc<Self>,
        connection: Arc<Connection>,
        params: Map<String, Value>,
    ) -> Result<ActionRequest> {
        let (sender, receiver) = oneshot::channel();
        let processor = ActionProcessor::with_params(Arc::clone(self), connection, params, move |request| {
            let _ = sender.send(request);
        });
        processor.process_action().await;
        receiver
            .await
            .map_err(|_| CoreError::Internal("completion callback was dropped".to_string()))
    }
}

/// [`ActionApi`] 构建器
pub struct ActionApiBuilder {
    config: ActionConfig,
    catalog: Box<dyn ErrorCatalog>,
    provider: Box<dyn ActionProvider>,
    middleware: MiddlewareRegistry,
    validator: Validator,
    log_sink: Box<dyn LogSink>,
}

impl ActionApiBuilder {
    /// 使用默认协作者创建构建器
    pub fn new(config: ActionConfig) -> Self {
        Self {
            config,
            catalog: Box::new(DefaultErrorCatalog),
            provider: Box::new(ActionRegistry::new()),
            middleware: MiddlewareRegistry::new(),
            validator: Validator::default(),
            log_sink: Box::new(TracingLogSink),
        }
    }

    /// 设置错误目录
    pub fn catalog(mut self, catalog: impl ErrorCatalog + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    /// 设置模板提供者
    pub fn provider(mut self, provider: impl ActionProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    /// 设置中间件注册表
    pub fn middleware(mut self, middleware: MiddlewareRegistry) -> Self {
        self.middleware = middleware;
        self
    }

    /// 使用自定义规则注册表
    pub fn validators(mut self, registry: ValidatorRegistry) -> Self {
        self.validator = Validator::new(registry);
        self
    }

    /// 设置日志输出端
    pub fn log_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.log_sink = Box::new(sink);
        self
    }

    /// 构建上下文，初始为非运行状态
    pub fn build(self) -> Result<Arc<ActionApi>> {
        self.config.validate()?;
        info!(
            simultaneous_actions = self.config.general.simultaneous_actions,
            action_timeout_ms = self.config.general.action_timeout_ms,
            validators = self.validator.registry().len(),
            middleware = self.middleware.len(),
            "Action API initialized"
        );
        Ok(Arc::new(ActionApi {
            config: self.config,
            running: AtomicBool::new(false),
            catalog: self.catalog,
            provider: self.provider,
            middleware: self.middleware,
            validator: self.validator,
            log_sink: self.log_sink,
            stats: ActionStats::new(),
        }))
    }
}
