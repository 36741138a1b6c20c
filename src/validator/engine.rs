//! 校验引擎
//!
//! 按字段声明顺序、字段内按规则声明顺序执行校验。一个字段有多条规则
//! 失败时，最后一条失败规则的消息覆盖之前的消息。

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::messages::{replace_attribute, SizeKind};
use super::parser::{
    parse_rules, CheckOutcome, FieldRules, ParsedRule, RuleSpec, ValidationRuleSet, FUNCTION_RULE,
};
use super::registry::{RuleContext, ValidatorRegistry};
use crate::utils::{CoreError, Result};

/// 字段 → 错误消息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, String>,
}

impl ValidationErrors {
    /// 创建空错误表
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录字段错误，覆盖该字段已有的消息
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(field.into(), message.into());
    }

    /// 获取字段的错误消息
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    /// 字段是否有错误
    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// 错误字段数
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// 是否没有错误
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// 遍历全部错误
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 转换为 JSON 对象
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.errors
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

/// 校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// 全部通过
    Valid,
    /// 存在字段错误
    Invalid(ValidationErrors),
}

impl Validation {
    /// 是否通过
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    /// 字段错误（通过时为 `None`）
    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            Validation::Valid => None,
            Validation::Invalid(errors) => Some(errors),
        }
    }
}

impl From<ValidationErrors> for Validation {
    fn from(errors: ValidationErrors) -> Self {
        if errors.is_empty() {
            Validation::Valid
        } else {
            Validation::Invalid(errors)
        }
    }
}

/// 校验器
///
/// 持有只读的规则注册表，可以在多个请求之间共享。
#[derive(Debug, Clone, Default)]
pub struct Validator {
    registry: Arc<ValidatorRegistry>,
}

impl Validator {
    /// 使用指定注册表创建校验器
    pub fn new(registry: ValidatorRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// 规则注册表
    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// 解析规则描述并校验参数
    ///
    /// 未注册的规则名、参数不足等配置错误以 `Err` 返回，并中止整次校验。
    pub fn validate<'a, I>(&self, data: &Map<String, Value>, specs: I) -> Result<Validation>
    where
        I: IntoIterator<Item = (&'a str, &'a RuleSpec)>,
    {
        let rules = parse_rules(specs);
        self.validate_rules(data, &rules)
    }

    /// 使用已解析的规则集校验参数
    pub fn validate_rules(
        &self,
        data: &Map<String, Value>,
        rules: &ValidationRuleSet,
    ) -> Result<Validation> {
        let mut errors = ValidationErrors::new();
        self.check_into(data, rules, &mut errors)?;
        Ok(errors.into())
    }

    /// 校验参数，把字段错误写入已有的错误表
    pub fn check_into(
        &self,
        data: &Map<String, Value>,
        rules: &ValidationRuleSet,
        errors: &mut ValidationErrors,
    ) -> Result<()> {
        let context = RuleContext::new(data);
        for (field, field_rules) in rules.iter() {
            self.check_field(&context, field, field_rules, errors)?;
        }
        debug!(
            fields = rules.len(),
            failed = errors.len(),
            "Validation finished"
        );
        Ok(())
    }

    fn check_field(
        &self,
        context: &RuleContext<'_>,
        field: &str,
        field_rules: &FieldRules,
        errors: &mut ValidationErrors,
    ) -> Result<()> {
        let value = context.get(field);

        for rule in field_rules.iter() {
            if value.is_none() && !self.registry.is_implicit(&rule.name) {
                break;
            }

            if rule.name == FUNCTION_RULE {
                let check = field_rules
                    .custom()
                    .ok_or_else(|| CoreError::UnknownRule(rule.name.clone()))?;
                match check(value, context.data) {
                    CheckOutcome::Pass => {}
                    CheckOutcome::Fail => errors.insert(
                        field,
                        format!("The {} field does not match the validator function.", field),
                    ),
                    CheckOutcome::Message(message) => errors.insert(field, message),
                }
                continue;
            }

            let entry = self.registry.require(&rule.name)?;
            if !entry.check(&rule.name, context, value, &rule.params, field)? {
                errors.insert(field, self.render_message(field, rule, field_rules)?);
            }
        }

        Ok(())
    }

    fn render_message(&self, field: &str, rule: &ParsedRule, field_rules: &FieldRules) -> Result<String> {
        let entry = self.registry.require(&rule.name)?;
        let kind = if field_rules.has("numeric") {
            SizeKind::Numeric
        } else if field_rules.has("array") {
            SizeKind::Array
        } else {
            SizeKind::String
        };

        let template = entry.message().select(kind);
        if template.is_empty() {
            return Err(CoreError::NoMessage(rule.name.clone()));
        }

        let message = replace_attribute(template, field);
        Ok(match entry.replacer_fn() {
            Some(replace) => replace(&message, field, &rule.params),
            None => message,
        })
    }
}
