//! 内置校验规则
//!
//! 每条规则由检查函数、消息模板和可选的占位符替换函数组成。
//! 标记为隐式的规则在字段缺失时依然执行，其余规则遇到缺失字段直接跳过。

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::messages::{self, MessageTemplate};
use super::registry::{RuleContext, RuleEntry};
use super::value::{parse_date, parse_int, to_js_string, to_number};
use crate::utils::{CoreError, Result};

static ALPHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]*$").expect("Invalid alpha regex"));

static ALPHA_NUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]*$").expect("Invalid alpha_num regex"));

static ALPHA_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-]*$").expect("Invalid alpha_dash regex"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .expect("Invalid email regex")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(http|ftp|https)://[\w\-]+(\.[\w\-]*)+([\w.,@?^=%&:/~+#\-]*[\w@?^=%&/~+#\-])?$")
        .expect("Invalid url regex")
});

/// 全部内置规则
pub(crate) fn builtin_rules() -> Vec<(&'static str, RuleEntry)> {
    vec![
        (
            "required",
            RuleEntry::new(|_, value, _, _| Ok(value.is_some()), required_message()).implicit(),
        ),
        (
            "filled",
            RuleEntry::new(|_, value, _, _| Ok(is_filled(value)), required_message()).implicit(),
        ),
        (
            "alpha",
            RuleEntry::new(
                |_, value, _, _| Ok(matches!(value, Some(Value::String(s)) if ALPHA.is_match(s))),
                MessageTemplate::plain("The :attribute may only contain letters."),
            ),
        ),
        (
            "alpha_num",
            RuleEntry::new(
                |_, value, _, _| Ok(ALPHA_NUM.is_match(&to_js_string(value))),
                MessageTemplate::plain("The :attribute may only contain letters and numbers."),
            ),
        ),
        (
            "alpha_dash",
            RuleEntry::new(
                |_, value, _, _| Ok(ALPHA_DASH.is_match(&to_js_string(value))),
                MessageTemplate::plain(
                    "The :attribute may only contain letters, numbers, and dashes.",
                ),
            ),
        ),
        (
            "array",
            RuleEntry::new(
                |_, value, _, _| Ok(matches!(value, Some(Value::Array(_)))),
                MessageTemplate::plain("The :attribute must be an array."),
            ),
        ),
        (
            "before",
            RuleEntry::new(check_before, MessageTemplate::plain("The :attribute must be a date before :date."))
                .min_params(1)
                .replacer(messages::replace_before),
        ),
        (
            "between",
            RuleEntry::new(
                |_, value, params, _| {
                    let (min, max) = (to_number(&params[0]), to_number(&params[1]));
                    Ok(measure(value).map(|size| size >= min && size <= max).unwrap_or(false))
                },
                MessageTemplate::sized(
                    "The :attribute must be between :min and :max.",
                    "The :attribute must have between :min and :max items.",
                    "The :attribute must be between :min and :max characters.",
                ),
            )
            .min_params(2)
            .replacer(messages::replace_between),
        ),
        (
            "boolean",
            RuleEntry::new(
                |_, value, _, _| Ok(matches!(value, Some(Value::Bool(_)))),
                MessageTemplate::plain("The :attribute field must be true or false."),
            ),
        ),
        (
            "confirmed",
            RuleEntry::new(
                |context, value, _, field| {
                    let confirmation = context.get(&format!("{}_confirmation", field));
                    Ok(confirmation.is_some() && confirmation == value)
                },
                MessageTemplate::plain("The :attribute confirmation does not match."),
            ),
        ),
        (
            "date",
            RuleEntry::new(
                |_, value, _, _| Ok(parse_date(&to_js_string(value)).is_some()),
                MessageTemplate::plain("The :attribute is not a valid date."),
            ),
        ),
        (
            "different",
            RuleEntry::new(
                |context, value, params, _| Ok(context.get(&params[0]) != value),
                MessageTemplate::plain("The :attribute and :other must be different."),
            )
            .min_params(1)
            .replacer(messages::replace_other),
        ),
        (
            "email",
            RuleEntry::new(
                |_, value, _, _| Ok(EMAIL.is_match(&to_js_string(value))),
                MessageTemplate::plain("The :attribute must be a valid email address."),
            ),
        ),
        (
            "in",
            RuleEntry::new(
                |_, value, params, _| Ok(contains(params, &to_js_string(value))),
                MessageTemplate::plain("The selected :attribute is invalid."),
            )
            .min_params(1),
        ),
        (
            "not_in",
            RuleEntry::new(
                |_, value, params, _| Ok(!contains(params, &to_js_string(value))),
                MessageTemplate::plain("The selected :attribute is invalid."),
            )
            .min_params(1),
        ),
        (
            "integer",
            RuleEntry::new(
                |_, value, _, _| Ok(value.and_then(parse_int).is_some()),
                MessageTemplate::plain("The :attribute must be an integer."),
            ),
        ),
        (
            "ip",
            RuleEntry::new(
                |_, value, _, _| Ok(is_ipv4(&to_js_string(value))),
                MessageTemplate::plain("The :attribute must be a valid IP address."),
            ),
        ),
        (
            "json",
            RuleEntry::new(
                |_, value, _, _| {
                    let parsed = serde_json::from_str::<Value>(&to_js_string(value));
                    Ok(matches!(parsed, Ok(Value::Object(_)) | Ok(Value::Array(_))))
                },
                MessageTemplate::plain("The :attribute must be a valid JSON string."),
            ),
        ),
        (
            "max",
            RuleEntry::new(
                |_, value, params, _| {
                    let max = to_number(&params[0]);
                    Ok(measure(value).map(|size| size <= max).unwrap_or(false))
                },
                MessageTemplate::sized(
                    "The :attribute may not be greater than :max.",
                    "The :attribute may not have more than :max items.",
                    "The :attribute may not be greater than :max characters.",
                ),
            )
            .min_params(1)
            .replacer(messages::replace_max),
        ),
        (
            "min",
            RuleEntry::new(
                |_, value, params, _| {
                    let min = to_number(&params[0]);
                    Ok(measure(value).map(|size| size >= min).unwrap_or(false))
                },
                MessageTemplate::sized(
                    "The :attribute must be at least :min.",
                    "The :attribute must have at least :min items.",
                    "The :attribute must be at least :min characters.",
                ),
            )
            .min_params(1)
            .replacer(messages::replace_min),
        ),
        (
            "numeric",
            RuleEntry::new(
                |_, value, _, _| Ok(matches!(value, Some(Value::Number(_)))),
                MessageTemplate::plain("The :attribute must be a number."),
            ),
        ),
        (
            "regex",
            RuleEntry::new(
                |_, value, params, _| {
                    let flags = params.get(1).map(String::as_str).unwrap_or_default();
                    let pattern = build_pattern(&params[0], flags)?;
                    Ok(pattern.is_match(&to_js_string(value)))
                },
                MessageTemplate::plain("The :attribute format is invalid."),
            )
            .min_params(1),
        ),
        (
            "required_if",
            RuleEntry::new(
                |context, value, params, _| {
                    let other = to_js_string(context.get(&params[0]));
                    Ok(!contains(&params[1..], &other) || is_filled(value))
                },
                MessageTemplate::plain("The :attribute field is required when :other is :values."),
            )
            .implicit()
            .min_params(2)
            .replacer(messages::replace_other_values),
        ),
        (
            "required_unless",
            RuleEntry::new(
                |context, value, params, _| {
                    let other = to_js_string(context.get(&params[0]));
                    Ok(contains(&params[1..], &other) || is_filled(value))
                },
                MessageTemplate::plain(
                    "The :attribute field is required unless :other is in :values.",
                ),
            )
            .implicit()
            .min_params(2)
            .replacer(messages::replace_other_values),
        ),
        (
            "required_with",
            RuleEntry::new(
                |context, value, params, _| {
                    let triggered = params.iter().any(|p| context.get(p).is_some());
                    Ok(!triggered || is_filled(value))
                },
                MessageTemplate::plain("The :attribute field is required when :values is present."),
            )
            .implicit()
            .min_params(1)
            .replacer(messages::replace_values),
        ),
        (
            "required_with_all",
            RuleEntry::new(
                |context, value, params, _| {
                    let triggered = params.iter().all(|p| context.get(p).is_some());
                    Ok(!triggered || is_filled(value))
                },
                MessageTemplate::plain("The :attribute field is required when :values is present."),
            )
            .implicit()
            .min_params(2)
            .replacer(messages::replace_values),
        ),
        (
            "required_without",
            RuleEntry::new(
                |context, value, params, _| {
                    let triggered = params.iter().any(|p| context.get(p).is_none());
                    Ok(!triggered || is_filled(value))
                },
                MessageTemplate::plain(
                    "The :attribute field is required when :values is not present.",
                ),
            )
            .implicit()
            .min_params(1)
            .replacer(messages::replace_values),
        ),
        (
            "required_without_all",
            RuleEntry::new(
                |context, value, params, _| {
                    let triggered = params.iter().all(|p| context.get(p).is_none());
                    Ok(!triggered || is_filled(value))
                },
                MessageTemplate::plain(
                    "The :attribute field is required when none of :values are present.",
                ),
            )
            .implicit()
            .min_params(2)
            .replacer(messages::replace_values),
        ),
        (
            "same",
            RuleEntry::new(
                |context, value, params, _| Ok(context.get(&params[0]) == value),
                MessageTemplate::plain("The :attribute and :other must match."),
            )
            .min_params(1)
            .replacer(messages::replace_other),
        ),
        (
            "size",
            RuleEntry::new(
                |_, value, params, _| {
                    let expected = parse_int(&Value::String(params[0].clone()));
                    Ok(match (measure(value), expected) {
                        (Some(size), Some(expected)) => size == expected,
                        _ => false,
                    })
                },
                MessageTemplate::sized(
                    "The :attribute must be :size.",
                    "The :attribute must contain :size items.",
                    "The :attribute must be :size characters.",
                ),
            )
            .min_params(1)
            .replacer(messages::replace_size),
        ),
        (
            "url",
            RuleEntry::new(
                |_, value, _, _| Ok(URL.is_match(&to_js_string(value))),
                MessageTemplate::plain("The :attribute format is invalid."),
            ),
        ),
    ]
}

fn required_message() -> MessageTemplate {
    MessageTemplate::plain("The :attribute field is required.")
}

/// 字段存在、非 null 且不是空字符串
fn is_filled(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null)) && value != Some(&Value::String(String::new()))
}

fn contains(params: &[String], needle: &str) -> bool {
    params.iter().any(|p| p == needle)
}

/// 字符串取字符数，数组取长度，数字取数值，其余类型不可比较
fn measure(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(items) => Some(items.len() as f64),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// 点分十进制 IPv4，首字符不能是 `0`，各段允许前导零
fn is_ipv4(text: &str) -> bool {
    if text.starts_with('0') {
        return false;
    }
    let octets: Vec<&str> = text.split('.').collect();
    octets.len() == 4
        && octets.iter().all(|octet| {
            (1..=3).contains(&octet.len())
                && octet.bytes().all(|b| b.is_ascii_digit())
                && octet.parse::<u16>().map(|n| n <= 255).unwrap_or(false)
        })
}

fn check_before(
    _context: &RuleContext<'_>,
    value: Option<&Value>,
    params: &[String],
    _field: &str,
) -> Result<bool> {
    let argument = params.join(",");
    let limit = parse_date(&argument).ok_or_else(|| CoreError::InvalidRuleArgument {
        rule: "before".to_string(),
        reason: format!("'{}' is not a valid date", argument),
    })?;
    Ok(parse_date(&to_js_string(value))
        .map(|date| date < limit)
        .unwrap_or(false))
}

/// 编译 `regex` 规则的表达式，标志位转换为内联标志
pub(crate) fn build_pattern(source: &str, flags: &str) -> Result<Regex> {
    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' | 'x' => {
                if !inline.contains(flag) {
                    inline.push(flag);
                }
            }
            // 全局匹配、Unicode、粘连匹配对单次检测没有影响
            'g' | 'u' | 'y' => {}
            other => {
                return Err(CoreError::InvalidPattern {
                    pattern: source.to_string(),
                    reason: format!("unsupported flag '{}'", other),
                })
            }
        }
    }

    let full = if inline.is_empty() {
        source.to_string()
    } else {
        format!("(?{}){}", inline, source)
    };
    Regex::new(&full).map_err(|e| CoreError::InvalidPattern {
        pattern: source.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::registry::ValidatorRegistry;
    use serde_json::{json, Map};

    fn check(rule: &str, value: Option<Value>, params: &[&str]) -> Result<bool> {
        check_with(rule, value, params, Map::new())
    }

    fn check_with(
        rule: &str,
        value: Option<Value>,
        params: &[&str],
        data: Map<String, Value>,
    ) -> Result<bool> {
        let registry = ValidatorRegistry::with_builtins();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let context = RuleContext::new(&data);
        registry
            .require(rule)?
            .check(rule, &context, value.as_ref(), &params, "field")
    }

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_presence_rules() {
        assert!(check("required", Some(json!("")), &[]).unwrap());
        assert!(!check("required", None, &[]).unwrap());
        assert!(check("filled", Some(json!("x")), &[]).unwrap());
        assert!(!check("filled", Some(json!("")), &[]).unwrap());
        assert!(!check("filled", Some(Value::Null), &[]).unwrap());
    }

    #[test]
    fn test_alpha_family() {
        assert!(check("alpha", Some(json!("abcXYZ")), &[]).unwrap());
        assert!(!check("alpha", Some(json!("abc1")), &[]).unwrap());
        assert!(!check("alpha", Some(json!(12)), &[]).unwrap());
        assert!(check("alpha_num", Some(json!(12)), &[]).unwrap());
        assert!(!check("alpha_num", Some(json!("a-b")), &[]).unwrap());
        assert!(check("alpha_dash", Some(json!("a-b_c1")), &[]).unwrap());
        assert!(!check("alpha_dash", Some(json!("a b")), &[]).unwrap());
    }

    #[test]
    fn test_type_rules() {
        assert!(check("integer", Some(json!("42")), &[]).unwrap());
        assert!(!check("integer", Some(json!("abc")), &[]).unwrap());
        assert!(check("numeric", Some(json!(1.5)), &[]).unwrap());
        assert!(!check("numeric", Some(json!("1.5")), &[]).unwrap());
        assert!(check("boolean", Some(json!(false)), &[]).unwrap());
        assert!(!check("boolean", Some(json!("true")), &[]).unwrap());
        assert!(check("array", Some(json!([1])), &[]).unwrap());
        assert!(!check("array", Some(json!({})), &[]).unwrap());
        assert!(check("json", Some(json!("{\"a\":1}")), &[]).unwrap());
        assert!(!check("json", Some(json!("42")), &[]).unwrap());
        assert!(check("date", Some(json!("2016-01-01")), &[]).unwrap());
        assert!(!check("date", Some(json!("yesterday")), &[]).unwrap());
    }

    #[test]
    fn test_format_rules() {
        assert!(check("email", Some(json!("user@example.com")), &[]).unwrap());
        assert!(!check("email", Some(json!("user@")), &[]).unwrap());
        assert!(check("ip", Some(json!("192.168.1.10")), &[]).unwrap());
        assert!(!check("ip", Some(json!("0.1.2.3")), &[]).unwrap());
        assert!(!check("ip", Some(json!("256.1.1.1")), &[]).unwrap());
        assert!(!check("ip", Some(json!("1.2.3")), &[]).unwrap());
        assert!(check("url", Some(json!("https://example.com/path?q=1")), &[]).unwrap());
        assert!(!check("url", Some(json!("example.com")), &[]).unwrap());
    }

    #[test]
    fn test_size_rules() {
        assert!(!check("between", Some(json!("ab")), &["3", "10"]).unwrap());
        assert!(check("between", Some(json!("abcd")), &["3", "10"]).unwrap());
        assert!(check("between", Some(json!(5)), &["3", "10"]).unwrap());
        assert!(check("between", Some(json!([1, 2, 3])), &["3", "10"]).unwrap());
        assert!(!check("between", Some(json!(true)), &["3", "10"]).unwrap());
        assert!(check("min", Some(json!("abc")), &["3"]).unwrap());
        assert!(!check("min", Some(json!(2)), &["3"]).unwrap());
        assert!(check("max", Some(json!([1, 2])), &["2"]).unwrap());
        assert!(!check("max", Some(json!("abc")), &["2"]).unwrap());
        assert!(!check("max", Some(json!("a")), &["x"]).unwrap());
        assert!(check("size", Some(json!("abcd")), &["4"]).unwrap());
        assert!(!check("size", Some(json!(3)), &["4"]).unwrap());
    }

    #[test]
    fn test_membership_rules() {
        assert!(check("in", Some(json!("b")), &["a", "b"]).unwrap());
        assert!(check("in", Some(json!(1)), &["1", "2"]).unwrap());
        assert!(!check("in", Some(json!("c")), &["a", "b"]).unwrap());
        assert!(check("not_in", Some(json!("c")), &["a", "b"]).unwrap());
    }

    #[test]
    fn test_regex_rule() {
        assert!(check("regex", Some(json!("ABC")), &["^[a-z]+$", "i"]).unwrap());
        assert!(!check("regex", Some(json!("ABC")), &["^[a-z]+$"]).unwrap());
        let err = check("regex", Some(json!("a")), &["(unclosed"]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPattern { .. }));
    }

    #[test]
    fn test_field_comparison_rules() {
        let fields = data(json!({"password": "secret", "password_confirmation": "secret"}));
        assert!(check_with("same", Some(json!("secret")), &["password"], fields.clone()).unwrap());
        assert!(!check_with("different", Some(json!("secret")), &["password"], fields.clone()).unwrap());
        assert!(check_with("confirmed", Some(json!("secret")), &[], {
            let mut d = fields.clone();
            d.insert("field_confirmation".into(), json!("secret"));
            d
        })
        .unwrap());
        assert!(!check_with("confirmed", Some(json!("secret")), &[], fields).unwrap());
    }

    #[test]
    fn test_before_rule() {
        assert!(check("before", Some(json!("2015-12-31")), &["2016-01-01"]).unwrap());
        assert!(!check("before", Some(json!("2016-02-01")), &["2016-01-01"]).unwrap());
        assert!(!check("before", Some(json!("garbage")), &["2016-01-01"]).unwrap());
        let err = check("before", Some(json!("2015-12-31")), &["not-a-date"]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRuleArgument { .. }));
    }

    #[test]
    fn test_conditional_required_rules() {
        let fields = data(json!({"type": "company", "vat": "X1"}));

        assert!(!check_with("required_if", None, &["type", "company"], fields.clone()).unwrap());
        assert!(check_with("required_if", None, &["type", "person"], fields.clone()).unwrap());
        assert!(check_with("required_unless", None, &["type", "company"], fields.clone()).unwrap());
        assert!(!check_with("required_unless", None, &["type", "person"], fields.clone()).unwrap());

        assert!(!check_with("required_with", None, &["vat"], fields.clone()).unwrap());
        assert!(check_with("required_with", Some(json!("x")), &["vat"], fields.clone()).unwrap());
        assert!(check_with("required_with_all", None, &["vat", "iban"], fields.clone()).unwrap());
        assert!(!check_with("required_without", None, &["iban"], fields.clone()).unwrap());
        assert!(check_with("required_without_all", None, &["vat", "iban"], fields.clone()).unwrap());
        assert!(!check_with("required_without_all", None, &["iban", "bic"], fields).unwrap());
    }

    #[test]
    fn test_build_pattern_flags() {
        assert!(build_pattern("^a$", "im").unwrap().is_match("A"));
        assert!(build_pattern("^a$", "g").unwrap().is_match("a"));
        assert!(build_pattern("^a$", "q").is_err());
    }
}
