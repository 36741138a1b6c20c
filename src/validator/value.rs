//! 参数值的宽松类型转换
//!
//! 传输层送来的参数是无类型的 JSON 值，规则在比较前需要把它们转换成
//! 字符串、数字或时间戳。这里的转换规则与客户端约定的语义保持一致：
//! 数字字符串可以参与数值比较，缺失值转为 `"undefined"` 等。

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{Number, Value};
use std::sync::LazyLock;

static INT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+").expect("Invalid integer prefix regex"));

static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("Invalid float prefix regex")
});

/// 把 JSON 数字格式化为字符串，整数值不带小数点
pub fn number_to_string(number: &Number) -> String {
    if let Some(i) = number.as_i64() {
        return i.to_string();
    }
    if let Some(u) = number.as_u64() {
        return u.to_string();
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => number.to_string(),
    }
}

/// 把参数值转换为字符串
///
/// 缺失值为 `"undefined"`，数组按元素以逗号拼接，对象为 `"[object Object]"`。
pub fn to_js_string(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => number_to_string(n),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_js_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

/// 把规则参数转换为数字，无法转换时返回 NaN
///
/// 空字符串视为 0。
pub fn to_number(param: &str) -> f64 {
    let trimmed = param.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// 按前缀解析整数
///
/// 字符串只取开头的数字部分（`"42px"` 得到 42），数字直接截断小数。
/// 无法得到数字时返回 `None`。
pub fn parse_int(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(f64::trunc),
        other => {
            let text = to_js_string(Some(other));
            let matched = INT_PREFIX.find(text.trim_start())?;
            matched.as_str().parse::<f64>().ok()
        }
    }
}

/// 按前缀解析浮点数
pub fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        other => {
            let text = to_js_string(Some(other));
            let matched = FLOAT_PREFIX.find(text.trim_start())?;
            matched
                .as_str()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
        }
    }
}

/// 把数值包装为 JSON 值，整数值保持整数表示
pub fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < 9.0e15 {
        Value::from(number as i64)
    } else {
        Number::from_f64(number).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// 参数值的真值判断
///
/// 缺失、null、false、0、NaN 和空字符串为假，其余为真。
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// 解析日期字符串，返回 Unix 毫秒时间戳
///
/// 支持 RFC 3339、RFC 2822、`YYYY-MM-DD`、`YYYY/MM/DD` 以及
/// `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS`（按 UTC 解释）。
pub fn parse_date(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_js_string() {
        assert_eq!(to_js_string(None), "undefined");
        assert_eq!(to_js_string(Some(&Value::Null)), "null");
        assert_eq!(to_js_string(Some(&json!(true))), "true");
        assert_eq!(to_js_string(Some(&json!(3))), "3");
        assert_eq!(to_js_string(Some(&json!(3.0))), "3");
        assert_eq!(to_js_string(Some(&json!(2.5))), "2.5");
        assert_eq!(to_js_string(Some(&json!("abc"))), "abc");
        assert_eq!(to_js_string(Some(&json!([1, null, "a"]))), "1,,a");
        assert_eq!(to_js_string(Some(&json!({"a": 1}))), "[object Object]");
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number("10"), 10.0);
        assert_eq!(to_number(" 2.5 "), 2.5);
        assert_eq!(to_number(""), 0.0);
        assert!(to_number("abc").is_nan());
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(&json!("200")), Some(200.0));
        assert_eq!(parse_int(&json!("  -12abc")), Some(-12.0));
        assert_eq!(parse_int(&json!(7.9)), Some(7.0));
        assert_eq!(parse_int(&json!("abc")), None);
        assert_eq!(parse_int(&json!(true)), None);
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float(&json!("3.25kg")), Some(3.25));
        assert_eq!(parse_float(&json!(".5")), Some(0.5));
        assert_eq!(parse_float(&json!("1e3")), Some(1000.0));
        assert_eq!(parse_float(&json!("x1")), None);
    }

    #[test]
    fn test_number_value() {
        assert_eq!(number_value(200.0), json!(200));
        assert_eq!(number_value(1.5), json!(1.5));
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(is_truthy(Some(&json!("0"))));
        assert!(is_truthy(Some(&json!([]))));
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2016-01-01").is_some());
        assert!(parse_date("2016/01/01").is_some());
        assert!(parse_date("2016-01-01T10:00:00Z").is_some());
        assert!(parse_date("2016-01-01 10:00:00").is_some());
        assert!(parse_date("Fri, 01 Jan 2016 10:00:00 +0000").is_some());
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("").is_none());

        let earlier = parse_date("2015-12-31").unwrap();
        let later = parse_date("2016-01-01").unwrap();
        assert!(earlier < later);
    }
}
