//! 校验错误消息模板与占位符替换
//!
//! 每条规则对应一个消息模板。`size`、`between`、`min`、`max` 按字段的
//! 推断类型（数值、数组、字符串）选择不同的模板。模板中的 `:attribute`
//! 总会被替换为字段名，其余占位符由规则各自的替换函数处理。

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

static ATTRIBUTE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i):attribute").expect("Invalid placeholder regex"));

static NAMED_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i):(values|other|date|size|min|max)").expect("Invalid named placeholder regex")
});

/// 占位符替换函数：`(message, attribute, parameters) -> message`
pub type Replacer = fn(&str, &str, &[String]) -> String;

/// 参与尺寸比较的字段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeKind {
    /// 数值
    Numeric,
    /// 数组
    Array,
    /// 字符串
    String,
}

/// 消息模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTemplate {
    /// 单一模板
    Plain(Cow<'static, str>),
    /// 按字段类型区分的模板
    Sized {
        /// 数值字段
        numeric: Cow<'static, str>,
        /// 数组字段
        array: Cow<'static, str>,
        /// 字符串字段
        string: Cow<'static, str>,
    },
}

impl MessageTemplate {
    /// 创建单一模板
    pub fn plain(message: impl Into<Cow<'static, str>>) -> Self {
        MessageTemplate::Plain(message.into())
    }

    /// 创建按类型区分的模板
    pub const fn sized(numeric: &'static str, array: &'static str, string: &'static str) -> Self {
        MessageTemplate::Sized {
            numeric: Cow::Borrowed(numeric),
            array: Cow::Borrowed(array),
            string: Cow::Borrowed(string),
        }
    }

    /// 按字段类型选择模板文本
    pub fn select(&self, kind: SizeKind) -> &str {
        match self {
            MessageTemplate::Plain(message) => &**message,
            MessageTemplate::Sized { numeric, array, string } => match kind {
                SizeKind::Numeric => &**numeric,
                SizeKind::Array => &**array,
                SizeKind::String => &**string,
            },
        }
    }
}

/// 替换 `:attribute` 占位符（不区分大小写）
pub fn replace_attribute(message: &str, attribute: &str) -> String {
    ATTRIBUTE_PLACEHOLDER
        .replace_all(message, regex::NoExpand(attribute))
        .into_owned()
}

/// 按名称表替换占位符（不区分大小写）
///
/// 不在名称表中的已知占位符保持原样。
fn replace_named(message: &str, names: &[&str], values: &[&str]) -> String {
    NAMED_PLACEHOLDER
        .replace_all(message, |caps: &Captures<'_>| {
            let matched = caps[0].to_lowercase();
            match names.iter().position(|n| *n == matched) {
                Some(i) => values.get(i).copied().unwrap_or_default().to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn param(parameters: &[String], index: usize) -> &str {
    parameters.get(index).map(String::as_str).unwrap_or_default()
}

pub(crate) fn replace_before(message: &str, _attribute: &str, parameters: &[String]) -> String {
    replace_named(message, &[":date"], &[param(parameters, 0)])
}

pub(crate) fn replace_between(message: &str, _attribute: &str, parameters: &[String]) -> String {
    replace_named(
        message,
        &[":min", ":max"],
        &[param(parameters, 0), param(parameters, 1)],
    )
}

pub(crate) fn replace_min(message: &str, _attribute: &str, parameters: &[String]) -> String {
    replace_named(message, &[":min"], &[param(parameters, 0)])
}

pub(crate) fn replace_max(message: &str, _attribute: &str, parameters: &[String]) -> String {
    replace_named(message, &[":max"], &[param(parameters, 0)])
}

pub(crate) fn replace_size(message: &str, _attribute: &str, parameters: &[String]) -> String {
    replace_named(message, &[":size"], &[param(parameters, 0)])
}

pub(crate) fn replace_other(message: &str, _attribute: &str, parameters: &[String]) -> String {
    replace_named(message, &[":other"], &[param(parameters, 0)])
}

/// `:other` 为第一个参数，`:values` 为其余参数
pub(crate) fn replace_other_values(message: &str, _attribute: &str, parameters: &[String]) -> String {
    let values = parameters.get(1..).unwrap_or_default().join(", ");
    replace_named(
        message,
        &[":other", ":values"],
        &[param(parameters, 0), values.as_str()],
    )
}

/// `:values` 为全部参数
pub(crate) fn replace_values(message: &str, _attribute: &str, parameters: &[String]) -> String {
    let values = parameters.join(", ");
    replace_named(message, &[":values"], &[values.as_str()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_template_select() {
        let template = MessageTemplate::sized("numeric", "array", "string");
        assert_eq!(template.select(SizeKind::Numeric), "numeric");
        assert_eq!(template.select(SizeKind::Array), "array");
        assert_eq!(template.select(SizeKind::String), "string");

        let plain = MessageTemplate::plain("plain");
        assert_eq!(plain.select(SizeKind::Numeric), "plain");
    }

    #[test]
    fn test_replace_attribute_case_insensitive() {
        let message = replace_attribute("The :attribute and :ATTRIBUTE", "name");
        assert_eq!(message, "The name and name");
    }

    #[test]
    fn test_replace_attribute_is_literal() {
        let message = replace_attribute("The :attribute field", "$0");
        assert_eq!(message, "The $0 field");
    }

    #[test]
    fn test_replace_between() {
        let message = replace_between("between :min and :max", "f", &params(&["3", "10"]));
        assert_eq!(message, "between 3 and 10");
    }

    #[test]
    fn test_replace_other_values() {
        let message = replace_other_values(
            "required when :other is :values",
            "f",
            &params(&["type", "a", "b"]),
        );
        assert_eq!(message, "required when type is a, b");
    }

    #[test]
    fn test_replace_values() {
        let message = replace_values("when :values is present", "f", &params(&["a", "b"]));
        assert_eq!(message, "when a, b is present");
    }

    #[test]
    fn test_replace_named_is_case_insensitive_and_selective() {
        let message = replace_min("at least :MIN, at most :max", "f", &params(&["3"]));
        assert_eq!(message, "at least 3, at most :max");
    }

    #[test]
    fn test_replace_missing_parameter_is_empty() {
        let message = replace_size("must be :size", "f", &[]);
        assert_eq!(message, "must be ");
    }
}
