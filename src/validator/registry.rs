//! 校验规则注册表
//!
//! 规则名到（检查函数、消息模板、占位符替换函数）的显式映射。
//! 注册表在启动时填充，之后只读；查找不到的规则名是配置错误。

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::messages::{MessageTemplate, Replacer};
use super::rules;
use crate::utils::{CoreError, Result};

/// 规则检查时可访问的上下文
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// 本次校验的全部参数，用于跨字段比较
    pub data: &'a Map<String, Value>,
}

impl<'a> RuleContext<'a> {
    /// 创建上下文
    pub fn new(data: &'a Map<String, Value>) -> Self {
        Self { data }
    }

    /// 读取其他字段的值
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.data.get(field)
    }
}

/// 规则检查函数：`(context, value, parameters, field) -> passed`
pub type RulePredicate =
    Arc<dyn Fn(&RuleContext<'_>, Option<&Value>, &[String], &str) -> Result<bool> + Send + Sync>;

/// 注册表中的一条规则
#[derive(Clone)]
pub struct RuleEntry {
    predicate: RulePredicate,
    message: MessageTemplate,
    replacer: Option<Replacer>,
    implicit: bool,
    min_params: usize,
}

impl RuleEntry {
    /// 创建规则
    pub fn new<F>(predicate: F, message: MessageTemplate) -> Self
    where
        F: Fn(&RuleContext<'_>, Option<&Value>, &[String], &str) -> Result<bool>
            + Send
            + Sync
            + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            message,
            replacer: None,
            implicit: false,
            min_params: 0,
        }
    }

    /// 标记为隐式规则（字段缺失时仍然执行）
    pub fn implicit(mut self) -> Self {
        self.implicit = true;
        self
    }

    /// 设置最少参数个数
    pub fn min_params(mut self, count: usize) -> Self {
        self.min_params = count;
        self
    }

    /// 设置占位符替换函数
    pub fn replacer(mut self, replacer: Replacer) -> Self {
        self.replacer = Some(replacer);
        self
    }

    /// 是否为隐式规则
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    /// 消息模板
    pub fn message(&self) -> &MessageTemplate {
        &self.message
    }

    /// 占位符替换函数
    pub fn replacer_fn(&self) -> Option<Replacer> {
        self.replacer
    }

    /// 执行检查
    ///
    /// 参数个数不足时返回 `CoreError::MissingRuleParameters`。
    pub fn check(
        &self,
        rule: &str,
        context: &RuleContext<'_>,
        value: Option<&Value>,
        params: &[String],
        field: &str,
    ) -> Result<bool> {
        if params.len() < self.min_params {
            return Err(CoreError::MissingRuleParameters {
                rule: rule.to_string(),
                count: self.min_params,
            });
        }
        (self.predicate)(context, value, params, field)
    }
}

impl fmt::Debug for RuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEntry")
            .field("message", &self.message)
            .field("implicit", &self.implicit)
            .field("min_params", &self.min_params)
            .finish()
    }
}

/// 校验规则注册表
#[derive(Debug, Clone)]
pub struct ValidatorRegistry {
    rules: HashMap<String, RuleEntry>,
}

impl ValidatorRegistry {
    /// 创建空注册表
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// 创建包含全部内置规则的注册表
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for (name, entry) in rules::builtin_rules() {
            registry.register(name, entry);
        }
        registry
    }

    /// 注册规则，返回被替换的同名规则
    pub fn register(&mut self, name: impl Into<String>, entry: RuleEntry) -> Option<RuleEntry> {
        self.rules.insert(name.into(), entry)
    }

    /// 查找规则
    pub fn get(&self, name: &str) -> Option<&RuleEntry> {
        self.rules.get(name)
    }

    /// 查找规则，不存在时返回 `CoreError::UnknownRule`
    pub fn require(&self, name: &str) -> Result<&RuleEntry> {
        self.get(name)
            .ok_or_else(|| CoreError::UnknownRule(name.to_string()))
    }

    /// 是否已注册
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// 是否为隐式规则；未注册的规则视为非隐式
    pub fn is_implicit(&self, name: &str) -> bool {
        self.get(name).map(RuleEntry::is_implicit).unwrap_or(false)
    }

    /// 已注册的规则数
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins_registered() {
        let registry = ValidatorRegistry::with_builtins();
        for name in [
            "required", "filled", "alpha", "alpha_num", "alpha_dash", "integer", "numeric",
            "boolean", "array", "date", "json", "email", "ip", "url", "min", "max", "size",
            "between", "in", "not_in", "regex", "same", "different", "confirmed", "before",
            "required_if", "required_unless", "required_with", "required_with_all",
            "required_without", "required_without_all",
        ] {
            assert!(registry.contains(name), "missing builtin rule: {}", name);
        }
    }

    #[test]
    fn test_implicit_rules() {
        let registry = ValidatorRegistry::default();
        for name in [
            "required", "required_if", "required_unless", "filled", "required_with",
            "required_with_all", "required_without", "required_without_all",
        ] {
            assert!(registry.is_implicit(name), "{} should be implicit", name);
        }
        assert!(!registry.is_implicit("alpha"));
        assert!(!registry.is_implicit("not_registered"));
    }

    #[test]
    fn test_require_unknown_rule() {
        let registry = ValidatorRegistry::empty();
        let err = registry.require("alpha").unwrap_err();
        assert!(matches!(err, CoreError::UnknownRule(ref name) if name == "alpha"));
    }

    #[test]
    fn test_register_custom_rule() {
        let mut registry = ValidatorRegistry::with_builtins();
        let entry = RuleEntry::new(
            |_, value, _, _| Ok(value.and_then(Value::as_str).map(|s| s == s.to_uppercase()).unwrap_or(false)),
            MessageTemplate::plain("The :attribute must be uppercase."),
        );
        assert!(registry.register("uppercase", entry).is_none());

        let data = Map::new();
        let context = RuleContext::new(&data);
        let rule = registry.get("uppercase").unwrap();
        assert!(rule.check("uppercase", &context, Some(&json!("ABC")), &[], "code").unwrap());
        assert!(!rule.check("uppercase", &context, Some(&json!("abc")), &[], "code").unwrap());
    }

    #[test]
    fn test_check_enforces_parameter_count() {
        let registry = ValidatorRegistry::with_builtins();
        let data = Map::new();
        let context = RuleContext::new(&data);
        let err = registry
            .get("between")
            .unwrap()
            .check("between", &context, Some(&json!("abc")), &["1".to_string()], "name")
            .unwrap_err();
        match err {
            CoreError::MissingRuleParameters { rule, count } => {
                assert_eq!(rule, "between");
                assert_eq!(count, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
