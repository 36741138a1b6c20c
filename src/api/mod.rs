//! API 模块
//!
//! 对外提供的 SDK 接口。

pub mod sdk;

pub use sdk::{ActionApi, ActionApiBuilder};
