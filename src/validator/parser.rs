//! 规则解析器
//!
//! 把字段的规则描述解析为结构化的规则集。规则描述有三种形式：
//!
//! - 管道分隔的规则串：`"required|between:3,10"`
//! - 正则表达式：编译为 `regex` 规则，参数为 `[source, flags]`
//! - 自定义检查函数：编译为无参数的 `function` 规则

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// 自定义检查函数对应的合成规则名
pub const FUNCTION_RULE: &str = "function";

/// 自定义检查函数的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// 通过
    Pass,
    /// 失败，使用通用错误消息
    Fail,
    /// 失败，使用给定的错误消息
    Message(String),
}

impl From<bool> for CheckOutcome {
    fn from(passed: bool) -> Self {
        if passed {
            CheckOutcome::Pass
        } else {
            CheckOutcome::Fail
        }
    }
}

/// 自定义检查函数
///
/// 参数依次为字段值（缺失时为 `None`）和本次校验的全部参数。
pub type CustomCheck = Arc<dyn Fn(Option<&Value>, &Map<String, Value>) -> CheckOutcome + Send + Sync>;

/// 单个字段的规则描述
#[derive(Clone)]
pub enum RuleSpec {
    /// 管道分隔的规则串
    Rules(String),
    /// 正则表达式
    Pattern {
        /// 表达式源码
        source: String,
        /// 标志位（`i`、`m`、`s`、`x`）
        flags: String,
    },
    /// 自定义检查函数
    Custom(CustomCheck),
}

impl RuleSpec {
    /// 由规则串创建
    pub fn rules(rules: impl Into<String>) -> Self {
        RuleSpec::Rules(rules.into())
    }

    /// 由正则表达式创建
    pub fn pattern(source: impl Into<String>, flags: impl Into<String>) -> Self {
        RuleSpec::Pattern {
            source: source.into(),
            flags: flags.into(),
        }
    }

    /// 由自定义检查函数创建
    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(Option<&Value>, &Map<String, Value>) -> CheckOutcome + Send + Sync + 'static,
    {
        RuleSpec::Custom(Arc::new(check))
    }
}

impl From<&str> for RuleSpec {
    fn from(rules: &str) -> Self {
        RuleSpec::Rules(rules.to_string())
    }
}

impl From<String> for RuleSpec {
    fn from(rules: String) -> Self {
        RuleSpec::Rules(rules)
    }
}

impl fmt::Debug for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSpec::Rules(rules) => f.debug_tuple("Rules").field(rules).finish(),
            RuleSpec::Pattern { source, flags } => f
                .debug_struct("Pattern")
                .field("source", source)
                .field("flags", flags)
                .finish(),
            RuleSpec::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// 解析后的单条规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    /// 规则名
    pub name: String,
    /// 规则参数
    pub params: Vec<String>,
}

/// 单个字段的有序规则表
///
/// 同名规则只保留一条，后出现的参数覆盖先出现的，但位置保持不变。
#[derive(Clone, Default)]
pub struct FieldRules {
    rules: Vec<ParsedRule>,
    custom: Option<CustomCheck>,
}

impl FieldRules {
    fn insert(&mut self, name: &str, params: Vec<String>) {
        match self.rules.iter_mut().find(|r| r.name == name) {
            Some(existing) => existing.params = params,
            None => self.rules.push(ParsedRule {
                name: name.to_string(),
                params,
            }),
        }
    }

    /// 是否包含指定规则
    pub fn has(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name == name)
    }

    /// 获取指定规则的参数
    pub fn params(&self, name: &str) -> Option<&[String]> {
        self.rules
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.params.as_slice())
    }

    /// 按声明顺序遍历规则
    pub fn iter(&self) -> impl Iterator<Item = &ParsedRule> {
        self.rules.iter()
    }

    /// 规则数量
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 自定义检查函数
    pub fn custom(&self) -> Option<&CustomCheck> {
        self.custom.as_ref()
    }
}

impl fmt::Debug for FieldRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRules")
            .field("rules", &self.rules)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// 一次校验调用的完整规则集（字段 → 规则表），构建后不再修改
#[derive(Debug, Clone, Default)]
pub struct ValidationRuleSet {
    fields: Vec<(String, FieldRules)>,
}

impl ValidationRuleSet {
    pub(crate) fn push(&mut self, name: &str, rules: FieldRules) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = rules,
            None => self.fields.push((name.to_string(), rules)),
        }
    }

    /// 获取字段的规则表
    pub fn field(&self, name: &str) -> Option<&FieldRules> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// 字段是否声明了指定规则
    pub fn has_rule(&self, field: &str, rule: &str) -> bool {
        self.field(field).map(|r| r.has(rule)).unwrap_or(false)
    }

    /// 按声明顺序遍历字段
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRules)> {
        self.fields.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// 字段数量
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// 解析单个字段的规则描述
///
/// `required` 为真时在规则表最前面插入 `required` 规则，对三种描述形式都生效。
pub fn parse_field(spec: &RuleSpec, required: bool) -> FieldRules {
    let mut field = FieldRules::default();
    if required {
        field.insert("required", Vec::new());
    }

    match spec {
        RuleSpec::Pattern { source, flags } => {
            field.insert("regex", vec![source.clone(), flags.clone()]);
        }
        RuleSpec::Custom(check) => {
            field.insert(FUNCTION_RULE, Vec::new());
            field.custom = Some(Arc::clone(check));
        }
        RuleSpec::Rules(rules) => {
            for segment in rules.split('|') {
                let mut parts = segment.splitn(2, ':');
                let name = parts.next().unwrap_or_default().trim();
                if name.is_empty() {
                    continue;
                }
                let params = match parts.next() {
                    Some(raw) if !raw.is_empty() => raw.split(',').map(str::to_string).collect(),
                    _ => Vec::new(),
                };
                field.insert(name, params);
            }
        }
    }

    field
}

/// 解析一组字段规则描述
pub fn parse_rules<'a, I>(specs: I) -> ValidationRuleSet
where
    I: IntoIterator<Item = (&'a str, &'a RuleSpec)>,
{
    let mut set = ValidationRuleSet::default();
    for (name, spec) in specs {
        set.push(name, parse_field(spec, false));
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(field: &FieldRules) -> Vec<&str> {
        field.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_parse_pipe_rules() {
        let field = parse_field(&RuleSpec::rules("required|between:3,10|in:a,b,c"), false);
        assert_eq!(names(&field), vec!["required", "between", "in"]);
        assert_eq!(field.params("between"), Some(&["3".to_string(), "10".to_string()][..]));
        assert_eq!(field.params("in").map(|p| p.len()), Some(3));
        assert_eq!(field.params("required"), Some(&[][..]));
    }

    #[test]
    fn test_parse_keeps_colons_in_parameters() {
        let field = parse_field(&RuleSpec::rules("before:2016-01-01T10:00:00Z"), false);
        assert_eq!(
            field.params("before"),
            Some(&["2016-01-01T10:00:00Z".to_string()][..])
        );
    }

    #[test]
    fn test_parse_duplicate_rule_keeps_position() {
        let field = parse_field(&RuleSpec::rules("min:1|alpha|min:3"), false);
        assert_eq!(names(&field), vec!["min", "alpha"]);
        assert_eq!(field.params("min"), Some(&["3".to_string()][..]));
    }

    #[test]
    fn test_parse_skips_empty_segments() {
        let field = parse_field(&RuleSpec::rules("alpha||numeric|"), false);
        assert_eq!(names(&field), vec!["alpha", "numeric"]);
    }

    #[test]
    fn test_parse_pattern() {
        let field = parse_field(&RuleSpec::pattern("^[a-z]+$", "i"), false);
        assert_eq!(names(&field), vec!["regex"]);
        assert_eq!(
            field.params("regex"),
            Some(&["^[a-z]+$".to_string(), "i".to_string()][..])
        );
    }

    #[test]
    fn test_parse_custom() {
        let field = parse_field(&RuleSpec::custom(|_, _| CheckOutcome::Pass), false);
        assert_eq!(names(&field), vec![FUNCTION_RULE]);
        assert!(field.custom().is_some());
    }

    #[test]
    fn test_required_flag_prepends_rule() {
        let field = parse_field(&RuleSpec::pattern("^a", ""), true);
        assert_eq!(names(&field), vec!["required", "regex"]);

        let field = parse_field(&RuleSpec::custom(|_, _| CheckOutcome::Pass), true);
        assert_eq!(names(&field), vec!["required", FUNCTION_RULE]);
    }

    #[test]
    fn test_parse_rules_set() {
        let name = RuleSpec::rules("required|alpha");
        let age = RuleSpec::rules("numeric|between:0,130");
        let set = parse_rules([("name", &name), ("age", &age)]);

        assert_eq!(set.len(), 2);
        assert!(set.has_rule("age", "numeric"));
        assert!(!set.has_rule("name", "numeric"));
        assert!(!set.has_rule("missing", "numeric"));
        let order: Vec<&str> = set.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["name", "age"]);
    }
}
