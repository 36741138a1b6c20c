//! Action 模板
//!
//! 模板由注册方提供，对处理器只读：名称、版本、访问控制、输入声明、
//! 中间件列表、日志级别以及 Action 主体。
//!
//! 主体有两种写法，处理器对它们一视同仁：
//!
//! - 实现 [`ActionRunner`]，直接返回 `Result`
//! - 使用 [`CallbackAction`]，在任意时刻通过 [`Next`] 报告完成

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::api::ActionApi;
use crate::validator::value::{number_value, parse_float, parse_int, to_js_string};
use crate::validator::RuleSpec;

use super::request::ActionRequest;
use super::status::ActionError;

/// Action 主体
#[async_trait]
pub trait ActionRunner: Send + Sync {
    /// 执行 Action
    ///
    /// 返回 `Err` 时该错误直接作为响应错误，跳过后置中间件。
    async fn run(&self, api: &ActionApi, request: &mut ActionRequest) -> Result<(), ActionError>;
}

/// 完成通知
///
/// 回调式主体通过它报告结果。超时之后的报告会被丢弃。
#[derive(Debug)]
pub struct Next {
    sender: oneshot::Sender<Result<Option<Value>, ActionError>>,
}

impl Next {
    /// 成功完成，不修改响应
    pub fn ok(self) {
        self.done(Ok(None));
    }

    /// 成功完成并替换响应
    pub fn respond(self, response: Value) {
        self.done(Ok(Some(response)));
    }

    /// 以错误完成
    pub fn fail(self, error: impl Into<ActionError>) {
        self.done(Err(error.into()));
    }

    /// 报告结果
    pub fn done(self, result: Result<Option<Value>, ActionError>) {
        if self.sender.send(result).is_err() {
            warn!("Action completed after the request was finalized, result discarded");
        }
    }
}

type CallbackBody = dyn Fn(&ActionApi, &mut ActionRequest, Next) + Send + Sync;

/// 回调式 Action 主体
///
/// 闭包可以同步调用 `next`，也可以把它移入后台任务稍后调用。
/// `Next` 被丢弃而没有调用时，请求等待超时。
pub struct CallbackAction {
    body: Box<CallbackBody>,
}

impl CallbackAction {
    /// 包装回调闭包
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&ActionApi, &mut ActionRequest, Next) + Send + Sync + 'static,
    {
        Self {
            body: Box::new(body),
        }
    }
}

#[async_trait]
impl ActionRunner for CallbackAction {
    async fn run(&self, api: &ActionApi, request: &mut ActionRequest) -> Result<(), ActionError> {
        let (sender, receiver) = oneshot::channel();
        (self.body)(api, request, Next { sender });

        match receiver.await {
            Ok(Ok(Some(response))) => {
                request.response = response;
                Ok(())
            }
            Ok(Ok(None)) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(_) => {
                debug!(
                    action = request.action.as_deref().unwrap_or_default(),
                    "Completion handle dropped, waiting for timeout"
                );
                futures::future::pending().await
            }
        }
    }
}

impl fmt::Debug for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallbackAction(..)")
    }
}

/// 默认值生成函数
pub type DefaultFn = Arc<dyn Fn(&ActionRequest) -> Value + Send + Sync>;

/// 自定义格式转换函数，返回 `None` 表示无法转换
pub type FormatFn = Arc<dyn Fn(&Value, &ActionRequest) -> Option<Value> + Send + Sync>;

/// 输入默认值
#[derive(Clone)]
pub enum InputDefault {
    /// 静态值
    Value(Value),
    /// 按请求生成
    Fn(DefaultFn),
}

impl InputDefault {
    /// 计算默认值
    pub fn produce(&self, request: &ActionRequest) -> Value {
        match self {
            InputDefault::Value(value) => value.clone(),
            InputDefault::Fn(produce) => produce(request),
        }
    }
}

/// 输入格式转换
#[derive(Clone)]
pub enum InputFormat {
    /// 按前缀解析整数
    Integer,
    /// 按前缀解析浮点数
    Float,
    /// 转换为字符串
    String,
    /// 自定义转换
    Custom(FormatFn),
}

impl InputFormat {
    /// 由转换函数创建
    pub fn custom<F>(format: F) -> Self
    where
        F: Fn(&Value, &ActionRequest) -> Option<Value> + Send + Sync + 'static,
    {
        InputFormat::Custom(Arc::new(format))
    }

    /// 格式名，用于错误消息
    pub fn name(&self) -> &'static str {
        match self {
            InputFormat::Integer => "integer",
            InputFormat::Float => "float",
            InputFormat::String => "string",
            InputFormat::Custom(_) => "custom",
        }
    }

    /// 转换参数值，无法得到数字时返回 `None`
    pub fn apply(&self, value: &Value, request: &ActionRequest) -> Option<Value> {
        match self {
            InputFormat::Integer => parse_int(value).map(number_value),
            InputFormat::Float => parse_float(value).map(number_value),
            InputFormat::String => Some(Value::String(to_js_string(Some(value)))),
            InputFormat::Custom(format) => format(value, request),
        }
    }
}

impl fmt::Debug for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 单个输入字段的声明
#[derive(Clone, Default)]
pub struct InputSpec {
    /// 缺失时的默认值
    pub default: Option<InputDefault>,
    /// 格式转换
    pub format: Option<InputFormat>,
    /// 校验规则
    pub validator: Option<RuleSpec>,
    /// 是否必填
    pub required: bool,
}

impl InputSpec {
    /// 创建空声明
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记为必填
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 设置静态默认值
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(InputDefault::Value(value.into()));
        self
    }

    /// 设置默认值生成函数
    pub fn default_with<F>(mut self, produce: F) -> Self
    where
        F: Fn(&ActionRequest) -> Value + Send + Sync + 'static,
    {
        self.default = Some(InputDefault::Fn(Arc::new(produce)));
        self
    }

    /// 设置格式转换
    pub fn format(mut self, format: InputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// 设置校验规则
    pub fn validator(mut self, spec: impl Into<RuleSpec>) -> Self {
        self.validator = Some(spec.into());
        self
    }
}

impl fmt::Debug for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSpec")
            .field("default", &self.default.is_some())
            .field("format", &self.format)
            .field("validator", &self.validator)
            .field("required", &self.required)
            .finish()
    }
}

/// Action 模板
#[derive(Clone)]
pub struct ActionTemplate {
    /// 名称
    pub name: String,
    /// 版本号
    pub version: u32,
    /// 描述
    pub description: String,
    /// 是否只允许内部连接调用
    pub private: bool,
    /// 允许的连接类型，为空时不限制
    pub allowed_connection_types: Vec<String>,
    /// 禁止的连接类型
    pub blocked_connection_types: Vec<String>,
    /// 输入声明（保持声明顺序）
    pub inputs: Vec<(String, InputSpec)>,
    /// 模板级中间件名
    pub middleware: Vec<String>,
    /// 完成日志级别
    pub log_level: Option<String>,
    runner: Arc<dyn ActionRunner>,
}

impl ActionTemplate {
    /// 创建版本为 1 的模板
    pub fn new(name: impl Into<String>, runner: impl ActionRunner + 'static) -> Self {
        Self {
            name: name.into(),
            version: 1,
            description: String::new(),
            private: false,
            allowed_connection_types: Vec::new(),
            blocked_connection_types: Vec::new(),
            inputs: Vec::new(),
            middleware: Vec::new(),
            log_level: None,
            runner: Arc::new(runner),
        }
    }

    /// 设置版本号
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// 设置描述
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 标记为私有
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// 只允许指定连接类型
    pub fn allow_connection_type(mut self, connection_type: impl Into<String>) -> Self {
        self.allowed_connection_types.push(connection_type.into());
        self
    }

    /// 禁止指定连接类型
    pub fn block_connection_type(mut self, connection_type: impl Into<String>) -> Self {
        self.blocked_connection_types.push(connection_type.into());
        self
    }

    /// 声明输入字段
    pub fn input(mut self, name: impl Into<String>, spec: InputSpec) -> Self {
        let name = name.into();
        match self.inputs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = spec,
            None => self.inputs.push((name, spec)),
        }
        self
    }

    /// 追加模板级中间件
    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middleware.push(name.into());
        self
    }

    /// 设置完成日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// 连接类型是否被拒绝
    pub fn rejects_connection_type(&self, connection_type: &str) -> bool {
        self.blocked_connection_types.iter().any(|t| t == connection_type)
            || (!self.allowed_connection_types.is_empty()
                && !self.allowed_connection_types.iter().any(|t| t == connection_type))
    }

    /// Action 主体
    pub fn runner(&self) -> Arc<dyn ActionRunner> {
        Arc::clone(&self.runner)
    }
}

impl fmt::Debug for ActionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTemplate")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("private", &self.private)
            .field("blocked_connection_types", &self.blocked_connection_types)
            .field("inputs", &self.inputs)
            .field("middleware", &self.middleware)
            .field("log_level", &self.log_level)
            .finish()
    }
}
