//! 工具模块
//!
//! 包含错误类型、请求 ID 生成与日志系统。

pub mod error;
pub mod id;
pub mod logger;

// 重导出常用类型
pub use error::{error_code, status_code, CoreError, Result};
pub use id::generate_request_id;
pub use logger::{fields, parse_level, LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};
