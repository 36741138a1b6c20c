//! 参数校验
//!
//! 声明式的参数校验：规则串 `"required|between:3,10"`、正则表达式或
//! 自定义检查函数，经解析后由注册表中的内置规则逐条执行。
//!
//! # 示例
//!
//! ```rust
//! use chips_action::validator::{RuleSpec, Validator};
//! use serde_json::json;
//!
//! let validator = Validator::default();
//! let data = json!({"name": "ab"});
//! let spec = RuleSpec::rules("required|between:3,10");
//! let result = validator
//!     .validate(data.as_object().unwrap(), [("name", &spec)])
//!     .unwrap();
//! assert!(!result.is_valid());
//! ```

pub mod engine;
pub mod messages;
pub mod parser;
pub mod registry;
pub mod rules;
pub mod value;

pub use engine::{Validation, ValidationErrors, Validator};
pub use messages::{MessageTemplate, Replacer, SizeKind};
pub use parser::{
    parse_field, parse_rules, CheckOutcome, CustomCheck, FieldRules, ParsedRule, RuleSpec,
    ValidationRuleSet, FUNCTION_RULE,
};
pub use registry::{RuleContext, RuleEntry, RulePredicate, ValidatorRegistry};
