//! 中间件管道
//!
//! 中间件在 Action 主体前后串行执行：先全局中间件，再模板中间件，
//! 各自保持声明顺序。只调用声明了对应挂载点的中间件，第一个失败的
//! 中间件终止整条管道。

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::request::ActionRequest;
use super::status::ActionError;

/// 中间件挂载点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiddlewarePoint {
    /// 主体执行前
    PreProcess,
    /// 主体成功执行后
    PostProcess,
}

/// 中间件
#[async_trait]
pub trait Middleware: Send + Sync {
    /// 中间件名
    fn name(&self) -> &str;

    /// 挂载点
    fn points(&self) -> &[MiddlewarePoint];

    /// 前置处理
    ///
    /// 可以修改参数，或把 `to_process` 置为 `false` 跳过主体。
    async fn pre_process(&self, _request: &mut ActionRequest) -> Result<(), ActionError> {
        Ok(())
    }

    /// 后置处理
    async fn post_process(&self, _request: &mut ActionRequest) -> Result<(), ActionError> {
        Ok(())
    }
}

/// 中间件注册表
#[derive(Default)]
pub struct MiddlewareRegistry {
    middleware: HashMap<String, Arc<dyn Middleware>>,
    global: Vec<String>,
}

impl MiddlewareRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册具名中间件，模板通过名称引用
    pub fn register(&mut self, middleware: impl Middleware + 'static) {
        let name = middleware.name().to_string();
        debug!(middleware = %name, "Middleware registered");
        self.middleware.insert(name, Arc::new(middleware));
    }

    /// 注册全局中间件，对所有 Action 生效
    pub fn register_global(&mut self, middleware: impl Middleware + 'static) {
        let name = middleware.name().to_string();
        self.register(middleware);
        if !self.global.contains(&name) {
            self.global.push(name);
        }
    }

    /// 按名称获取中间件
    pub fn get(&self, name: &str) -> Option<Arc<dyn Middleware>> {
        self.middleware.get(name).cloned()
    }

    /// 全局中间件名（声明顺序）
    pub fn global(&self) -> &[String] {
        &self.global
    }

    /// 组装某个挂载点上的中间件链
    pub fn chain(&self, template: &[String], point: MiddlewarePoint) -> Vec<Arc<dyn Middleware>> {
        self.global
            .iter()
            .chain(template.iter())
            .filter_map(|name| {
                let found = self.get(name);
                if found.is_none() {
                    warn!(middleware = %name, "Middleware not registered, skipped");
                }
                found
            })
            .filter(|m| m.points().contains(&point))
            .collect()
    }

    /// 串行执行中间件链，返回第一个错误
    pub async fn run(
        &self,
        point: MiddlewarePoint,
        template: &[String],
        request: &mut ActionRequest,
    ) -> Result<(), ActionError> {
        for middleware in self.chain(template, point) {
            debug!(
                middleware = middleware.name(),
                point = ?point,
                request_id = %request.id,
                "Running middleware"
            );
            let result = match point {
                MiddlewarePoint::PreProcess => middleware.pre_process(request).await,
                MiddlewarePoint::PostProcess => middleware.post_process(request).await,
            };
            if let Err(err) = result {
                debug!(middleware = middleware.name(), error = %err, "Middleware aborted the pipeline");
                return Err(err);
            }
        }
        Ok(())
    }

    /// 已注册的中间件数
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::connection::Connection;
    use serde_json::{json, Map, Value};

    struct Tag {
        name: &'static str,
        points: Vec<MiddlewarePoint>,
        fail: bool,
    }

    impl Tag {
        fn new(name: &'static str, points: &[MiddlewarePoint]) -> Self {
            Self {
                name,
                points: points.to_vec(),
                fail: false,
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn append(&self, request: &mut ActionRequest, stage: &str) -> Result<(), ActionError> {
            let entry = Value::String(format!("{}:{}", stage, self.name));
            match request.params.get_mut("trace") {
                Some(Value::Array(items)) => items.push(entry),
                _ => {
                    request.params.insert("trace".into(), Value::Array(vec![entry]));
                }
            }
            if self.fail {
                Err(ActionError::message(format!("{} failed", self.name)))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Middleware for Tag {
        fn name(&self) -> &str {
            self.name
        }

        fn points(&self) -> &[MiddlewarePoint] {
            &self.points
        }

        async fn pre_process(&self, request: &mut ActionRequest) -> Result<(), ActionError> {
            self.append(request, "pre")
        }

        async fn post_process(&self, request: &mut ActionRequest) -> Result<(), ActionError> {
            self.append(request, "post")
        }
    }

    fn request() -> ActionRequest {
        ActionRequest::new(Arc::new(Connection::new("web", "127.0.0.1")), Map::new())
    }

    const BOTH: &[MiddlewarePoint] = &[MiddlewarePoint::PreProcess, MiddlewarePoint::PostProcess];

    #[tokio::test]
    async fn test_global_runs_before_template() {
        let mut registry = MiddlewareRegistry::new();
        registry.register(Tag::new("local", BOTH));
        registry.register_global(Tag::new("global", BOTH));

        let mut req = request();
        registry
            .run(MiddlewarePoint::PreProcess, &["local".to_string()], &mut req)
            .await
            .unwrap();
        assert_eq!(req.params["trace"], json!(["pre:global", "pre:local"]));
    }

    #[tokio::test]
    async fn test_skips_middleware_without_point() {
        let mut registry = MiddlewareRegistry::new();
        registry.register_global(Tag::new("pre-only", &[MiddlewarePoint::PreProcess]));
        registry.register_global(Tag::new("post-only", &[MiddlewarePoint::PostProcess]));

        let mut req = request();
        registry.run(MiddlewarePoint::PostProcess, &[], &mut req).await.unwrap();
        assert_eq!(req.params["trace"], json!(["post:post-only"]));
    }

    #[tokio::test]
    async fn test_first_error_stops_series() {
        let mut registry = MiddlewareRegistry::new();
        registry.register_global(Tag::new("first", BOTH).failing());
        registry.register_global(Tag::new("second", BOTH));

        let mut req = request();
        let err = registry
            .run(MiddlewarePoint::PreProcess, &[], &mut req)
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::message("first failed"));
        assert_eq!(req.params["trace"], json!(["pre:first"]));
    }

    #[test]
    fn test_unknown_template_middleware_is_skipped() {
        let registry = MiddlewareRegistry::new();
        let chain = registry.chain(&["missing".to_string()], MiddlewarePoint::PreProcess);
        assert!(chain.is_empty());
    }
}
