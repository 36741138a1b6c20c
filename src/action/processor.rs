//! Action 生命周期控制器
//!
//! 一个 [`ActionProcessor`] 处理一个请求，步骤严格串行：
//!
//! 1. 准入：计数器加一，依次检查运行状态、并发上限、Action 是否存在、
//!    连接类型是否被拒绝
//! 2. 私有 Action 检查与前置中间件
//! 3. 默认值、格式转换与参数校验
//! 4. 主体执行（与超时赛跑，捕获 panic）
//! 5. 后置中间件（仅成功路径）
//! 6. 完成：合并错误、计数器减一、记录统计和日志
//!
//! 无论走哪条路径，完成只发生一次，完成回调在下一次调度时异步触发。
//! 准入之后任何环节（默认值、格式转换、校验函数、中间件、主体）panic
//! 都以 `server_error` 完成。

use futures::FutureExt;
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use crate::api::ActionApi;
use crate::utils::{parse_level, Result};
use crate::validator::value::{is_truthy, parse_int};
use crate::validator::{parse_field, RuleSpec, ValidationRuleSet};

use super::connection::Connection;
use super::log::{filter_params, ActionLogEntry};
use super::middleware::MiddlewarePoint;
use super::request::ActionRequest;
use super::status::{ActionError, ActionStatus};
use super::template::ActionTemplate;
use super::timeout::{panic_message, RaceOutcome, TimeoutGuard};

/// 完成回调
pub type CompletionCallback = Box<dyn FnOnce(ActionRequest) + Send + 'static>;

/// Action 生命周期控制器
pub struct ActionProcessor {
    api: Arc<ActionApi>,
    request: ActionRequest,
    callback: CompletionCallback,
}

impl ActionProcessor {
    /// 使用连接上携带的参数创建处理器
    pub fn new<F>(api: Arc<ActionApi>, connection: Arc<Connection>, callback: F) -> Self
    where
        F: FnOnce(ActionRequest) + Send + 'static,
    {
        let params = connection.params();
        Self::with_params(api, connection, params, callback)
    }

    /// 使用给定参数创建处理器
    pub fn with_params<F>(
        api: Arc<ActionApi>,
        connection: Arc<Connection>,
        params: Map<String, Value>,
        callback: F,
    ) -> Self
    where
        F: FnOnce(ActionRequest) + Send + 'static,
    {
        Self {
            api,
            request: ActionRequest::new(connection, params),
            callback: Box::new(callback),
        }
    }

    /// 当前请求状态
    pub fn request(&self) -> &ActionRequest {
        &self.request
    }

    /// 处理请求直到完成，然后调度完成回调
    pub async fn process_action(mut self) {
        self.request.started_at = Instant::now();
        self.request.working = true;

        let connection = Arc::clone(&self.request.connection);
        connection.increment_total_actions();
        let pending = connection.increment_pending_actions(1);

        self.resolve_action();

        let limit = self.api.config().general.simultaneous_actions as i64;
        let rejection = if !self.api.is_running() {
            Some(ActionStatus::ServerShuttingDown)
        } else if pending > limit {
            Some(ActionStatus::TooManyRequests)
        } else if self.request.template.is_none() {
            Some(ActionStatus::UnknownAction)
        } else if self
            .request
            .template
            .as_ref()
            .map(|t| t.rejects_connection_type(connection.connection_type()))
            .unwrap_or(false)
        {
            Some(ActionStatus::UnsupportedServerType)
        } else {
            None
        };

        match rejection {
            Some(status) => {
                debug!(
                    request_id = %self.request.id,
                    action = self.request.action.as_deref().unwrap_or_default(),
                    status = status.as_str(),
                    "Action rejected at admission"
                );
                self.complete_action(status);
            }
            None => {
                let outcome = AssertUnwindSafe(self.run_action()).catch_unwind().await;
                if let Err(payload) = outcome {
                    error!(
                        request_id = %self.request.id,
                        action = self.request.action.as_deref().unwrap_or_default(),
                        panic = %panic_message(&*payload),
                        "Action lifecycle panicked"
                    );
                    self.complete_action(ActionStatus::ServerError);
                }
            }
        }

        self.finish();
    }

    /// 解析 Action 名与版本，绑定模板
    ///
    /// 请求未指定 `apiVersion`（或为 `0`、空串等假值）时选用最新版本，并写回参数。
    fn resolve_action(&mut self) {
        let name = match self.request.params.get("action").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => return,
        };
        self.request.action = Some(name.clone());

        let provider = self.api.provider();
        let latest = match provider.latest_version(&name) {
            Some(latest) => latest,
            None => return,
        };

        let requested = self
            .request
            .params
            .get("apiVersion")
            .filter(|v| is_truthy(Some(*v)))
            .cloned();
        let version = match requested {
            Some(requested) => parse_int(&requested)
                .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
                .map(|v| v as u32),
            None => {
                self.request
                    .params
                    .insert("apiVersion".to_string(), Value::from(latest));
                Some(latest)
            }
        };

        self.request.api_version = version;
        self.request.template = version.and_then(|v| provider.get(&name, v));
    }

    async fn run_action(&mut self) {
        let template = match self.request.template.clone() {
            Some(template) => template,
            None => return self.complete_action(ActionStatus::UnknownAction),
        };
        let api = Arc::clone(&self.api);

        if template.private
            && self.request.connection.connection_type() != api.config().general.internal_connection_type
        {
            let denied = api.catalog().private_action_called(&template.name);
            return self.complete_action(ActionStatus::Failed(denied));
        }

        if let Err(err) = api
            .middleware()
            .run(MiddlewarePoint::PreProcess, &template.middleware, &mut self.request)
            .await
        {
            return self.complete_action(ActionStatus::Failed(err));
        }

        if let Err(err) = self.validate_params(&template) {
            error!(
                request_id = %self.request.id,
                action = %template.name,
                error_code = err.error_code(),
                error = %err,
                "Invalid validator configuration"
            );
            return self.complete_action(ActionStatus::ServerError);
        }

        if !self.request.validator_errors.is_empty() {
            return self.complete_action(ActionStatus::ValidatorErrors);
        }

        if !self.request.to_process {
            debug!(request_id = %self.request.id, "Action body skipped by middleware");
            return self.complete_action(ActionStatus::Success);
        }

        let guard = TimeoutGuard::new(api.config().action_timeout());
        let runner = template.runner();
        let outcome = guard.run(runner.run(&api, &mut self.request)).await;

        match outcome {
            RaceOutcome::TimedOut => {
                self.complete_action(ActionStatus::ResponseTimeout);
            }
            RaceOutcome::Panicked(message) => {
                error!(
                    request_id = %self.request.id,
                    action = %template.name,
                    panic = %message,
                    "Action panicked"
                );
                self.complete_action(ActionStatus::ServerError);
            }
            RaceOutcome::Completed(Err(err)) => {
                self.complete_action(ActionStatus::Failed(err));
            }
            RaceOutcome::Completed(Ok(())) => {
                let post = api
                    .middleware()
                    .run(MiddlewarePoint::PostProcess, &template.middleware, &mut self.request)
                    .await;
                self.complete_action(post.err().into());
            }
        }
    }

    /// 应用默认值与格式转换，然后执行校验
    ///
    /// 字段错误写入 `validator_errors`；规则配置错误以 `Err` 返回。
    fn validate_params(&mut self, template: &ActionTemplate) -> Result<()> {
        let catalog = self.api.catalog();
        let mut rules = ValidationRuleSet::default();

        for (name, input) in &template.inputs {
            if !self.request.params.contains_key(name) {
                if let Some(default) = &input.default {
                    let value = default.produce(&self.request);
                    self.request.params.insert(name.clone(), value);
                }
            }

            if let Some(format) = &input.format {
                if is_truthy(self.request.params.get(name)) {
                    let current = self.request.params.get(name).cloned().unwrap_or(Value::Null);
                    match format.apply(&current, &self.request) {
                        Some(converted) => {
                            self.request.params.insert(name.clone(), converted);
                        }
                        None => {
                            self.request.params.insert(name.clone(), Value::Null);
                            self.request
                                .validator_errors
                                .insert(name.clone(), catalog.param_invalid_type(name, format.name()));
                        }
                    }
                }
            }

            match &input.validator {
                Some(spec) => rules.push(name, parse_field(spec, input.required)),
                None if input.required => rules.push(name, parse_field(&RuleSpec::rules(""), true)),
                None => {}
            }
        }

        self.api
            .validator()
            .check_into(&self.request.params, &rules, &mut self.request.validator_errors)
    }

    /// 完成请求
    ///
    /// 只有第一次调用生效，之后的调用直接返回。
    pub(crate) fn complete_action(&mut self, status: ActionStatus) {
        if self.request.error_rendered {
            debug!(
                request_id = %self.request.id,
                status = status.as_str(),
                "Action already completed, status ignored"
            );
            return;
        }
        self.request.error_rendered = true;

        let error = self.resolve_error(&status);
        if let Some(err) = &error {
            self.request.merge_error(err);
        }

        self.request.connection.increment_pending_actions(-1);
        let duration = self.request.started_at.elapsed();
        self.request.duration = Some(duration);
        self.request.working = false;

        self.api
            .action_stats()
            .record(&status, duration.as_micros() as u64);
        self.request.status = Some(status);
        self.log_action(error.as_ref());
    }

    fn resolve_error(&self, status: &ActionStatus) -> Option<ActionError> {
        let catalog = self.api.catalog();
        let action = self.request.action.as_deref();
        match status {
            ActionStatus::Success => None,
            ActionStatus::ServerError => Some(catalog.server_error_message()),
            ActionStatus::ServerShuttingDown => Some(catalog.server_shutting_down()),
            ActionStatus::TooManyRequests => Some(catalog.too_many_pending_actions()),
            ActionStatus::UnknownAction => Some(catalog.unknown_action(action)),
            ActionStatus::UnsupportedServerType => Some(
                catalog.unsupported_server_type(self.request.connection.connection_type()),
            ),
            ActionStatus::ValidatorErrors => {
                Some(catalog.invalid_params(&self.request.validator_errors))
            }
            ActionStatus::ResponseTimeout => {
                Some(catalog.response_timeout(action.unwrap_or_default()))
            }
            ActionStatus::Failed(err) => Some(err.clone()),
        }
    }

    fn log_action(&self, error: Option<&ActionError>) {
        let config = self.api.config();
        let level = self
            .request
            .template
            .as_ref()
            .and_then(|t| t.log_level.as_deref())
            .unwrap_or(config.general.default_log_level.as_str());

        let connection = &self.request.connection;
        let entry = ActionLogEntry {
            request_id: self.request.id.clone(),
            connection_type: connection.connection_type().to_string(),
            to: connection.remote_ip().to_string(),
            action: self.request.action.clone(),
            params: filter_params(&self.request.params, config),
            duration_ms: self
                .request
                .duration
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
            status: self
                .request
                .status
                .as_ref()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            error: error.map(ActionError::log_string),
        };

        let message = format!("[ action @ {} ]", connection.connection_type());
        self.api.log_sink().log(&message, parse_level(level), &entry);
    }

    /// 把请求交给完成回调，回调在当前调用返回后执行
    fn finish(self) {
        let ActionProcessor {
            request, callback, ..
        } = self;
        tokio::spawn(async move { callback(request) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::log::LogSink;
    use crate::action::registry::ActionRegistry;
    use crate::action::template::CallbackAction;
    use crate::core::config::ActionConfig;
    use serde_json::json;
    use std::sync::Mutex;
    use tracing::Level;

    #[derive(Clone, Default)]
    struct Recorder {
        entries: Arc<Mutex<Vec<ActionLogEntry>>>,
    }

    impl LogSink for Recorder {
        fn log(&self, _message: &str, _level: Level, entry: &ActionLogEntry) {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }

    fn api(recorder: Recorder) -> Arc<ActionApi> {
        let mut actions = ActionRegistry::new();
        actions.register(ActionTemplate::new(
            "echo",
            CallbackAction::new(|_, request, next| {
                request.response = json!({"echo": request.params.get("value").cloned()});
                next.ok();
            }),
        ));
        let api = ActionApi::builder(ActionConfig::default())
            .provider(actions)
            .log_sink(recorder)
            .build()
            .unwrap();
        api.start();
        api
    }

    fn processor(api: Arc<ActionApi>) -> ActionProcessor {
        let connection = Arc::new(Connection::new("web", "127.0.0.1"));
        let params = json!({"action": "echo"}).as_object().cloned().unwrap();
        ActionProcessor::with_params(api, connection, params, |_| {})
    }

    #[tokio::test]
    async fn test_complete_action_only_once() {
        let recorder = Recorder::default();
        let mut processor = processor(api(recorder.clone()));
        processor.request.connection.increment_pending_actions(1);

        processor.complete_action(ActionStatus::ResponseTimeout);
        processor.complete_action(ActionStatus::Success);

        assert_eq!(processor.request().connection.pending_actions(), 0);
        assert_eq!(processor.request().status, Some(ActionStatus::ResponseTimeout));
        assert_eq!(recorder.entries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_action_selects_latest_version() {
        let mut processor = processor(api(Recorder::default()));
        processor.resolve_action();
        assert_eq!(processor.request().api_version, Some(1));
        assert_eq!(processor.request().params["apiVersion"], json!(1));
        assert!(processor.request().template.is_some());
    }

    #[tokio::test]
    async fn test_resolve_action_unknown_version() {
        let mut processor = processor(api(Recorder::default()));
        processor.request.params.insert("apiVersion".into(), json!("7"));
        processor.resolve_action();
        assert_eq!(processor.request().api_version, Some(7));
        assert!(processor.request().template.is_none());
    }

    #[tokio::test]
    async fn test_resolve_action_falsy_version_selects_latest() {
        for falsy in [json!(0), json!(""), json!(false)] {
            let mut processor = processor(api(Recorder::default()));
            processor.request.params.insert("apiVersion".into(), falsy);
            processor.resolve_action();
            assert_eq!(processor.request().api_version, Some(1));
            assert_eq!(processor.request().params["apiVersion"], json!(1));
            assert!(processor.request().template.is_some());
        }
    }

    #[tokio::test]
    async fn test_success_logs_filtered_entry() {
        let recorder = Recorder::default();
        let api = api(recorder.clone());
        let connection = Arc::new(Connection::new("web", "10.1.1.1"));
        let params = json!({"action": "echo", "value": "hi"}).as_object().cloned().unwrap();
        let request = api.call(connection, params).await.unwrap();

        assert_eq!(request.status, Some(ActionStatus::Success));
        assert_eq!(request.response, json!({"echo": "hi"}));

        let entries = recorder.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].to, "10.1.1.1");
        assert_eq!(entries[0].action.as_deref(), Some("echo"));
        assert!(entries[0].error.is_none());
    }
}
