//! # Chips Action - 薯片 Action 内核
//!
//! 多协议 Action 分发框架的请求执行核心。传输层把入站调用转换为参数表
//! 交给内核，内核负责：
//!
//! - **准入控制**: 运行状态、单连接并发上限、Action 与版本解析、连接类型限制
//! - **参数校验**: 声明式规则串、正则与自定义检查函数，约 30 条内置规则
//! - **中间件管道**: 全局与模板级前置/后置处理器，串行执行
//! - **超时守卫**: Action 主体与截止时间赛跑，迟到的结果被丢弃
//! - **完成与日志**: 每个请求恰好完成一次，并写入一条结构化日志
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use chips_action::action::{
//!     ActionRegistry, ActionTemplate, CallbackAction, Connection, InputFormat, InputSpec,
//! };
//! use chips_action::{ActionApi, ActionConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut actions = ActionRegistry::new();
//!     actions.register(
//!         ActionTemplate::new(
//!             "double",
//!             CallbackAction::new(|_, request, next| {
//!                 let n = request.params["n"].as_i64().unwrap_or_default();
//!                 next.respond(json!({"result": n * 2}));
//!             }),
//!         )
//!         .input("n", InputSpec::new().required().format(InputFormat::Integer)),
//!     );
//!
//!     let api = ActionApi::builder(ActionConfig::default())
//!         .provider(actions)
//!         .build()?;
//!     api.start();
//!
//!     let connection = Arc::new(Connection::new("web", "127.0.0.1"));
//!     let params = json!({"action": "double", "n": "21"});
//!     let request = api
//!         .call(connection, params.as_object().cloned().unwrap_or_default())
//!         .await?;
//!     assert_eq!(request.response, json!({"result": 42}));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## 模块结构
//!
//! - `action` - 生命周期控制器、模板、中间件、超时守卫
//! - `validator` - 规则解析、规则注册表与校验引擎
//! - `api` - 共享上下文 `ActionApi`
//! - `core` - 配置
//! - `utils` - 错误类型、日志系统与 ID 生成

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod action;
pub mod api;
pub mod core;
pub mod utils;
pub mod validator;

// 重导出常用类型，方便使用
pub use action::{
    ActionError, ActionProcessor, ActionRequest, ActionRunner, ActionStatus, ActionTemplate,
    CallbackAction, Connection, ErrorCatalog, InputSpec, Middleware, MiddlewarePoint, Next,
};

pub use validator::{RuleSpec, Validation, ValidationErrors, Validator, ValidatorRegistry};

pub use utils::logger::{fields, LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};
pub use utils::{error_code, generate_request_id, status_code, CoreError, Result};

pub use api::{ActionApi, ActionApiBuilder};
pub use core::config::{ActionConfig, ActionConfigBuilder, GeneralConfig, LogConfig};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
