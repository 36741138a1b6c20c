//! Action 处理
//!
//! 单个请求从准入到完成的全部环节。
//!
//! # 模块概览
//!
//! - `processor`: 生命周期控制器
//! - `template` / `registry`: Action 模板及其提供者
//! - `middleware`: 前置/后置中间件管道
//! - `timeout`: 超时守卫
//! - `connection` / `request`: 连接与单次请求的状态
//! - `status` / `catalog`: 完成状态与错误目录
//! - `log` / `stats`: 完成日志与执行统计

pub mod catalog;
pub mod connection;
pub mod log;
pub mod middleware;
pub mod processor;
pub mod registry;
pub mod request;
pub mod stats;
pub mod status;
pub mod template;
pub mod timeout;

pub use catalog::{DefaultErrorCatalog, ErrorCatalog};
pub use connection::Connection;
pub use log::{filter_params, ActionLogEntry, LogSink, TracingLogSink, FILTERED};
pub use middleware::{Middleware, MiddlewarePoint, MiddlewareRegistry};
pub use processor::{ActionProcessor, CompletionCallback};
pub use registry::{ActionProvider, ActionRegistry};
pub use request::ActionRequest;
pub use stats::{ActionStats, ActionStatsSnapshot};
pub use status::{ActionError, ActionStatus};
pub use template::{
    ActionRunner, ActionTemplate, CallbackAction, DefaultFn, FormatFn, InputDefault, InputFormat,
    InputSpec, Next,
};
pub use timeout::{race_deadline, RaceOutcome, TimeoutGuard};
