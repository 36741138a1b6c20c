//! 内核配置
//!
//! 定义 Action 内核消费的配置项以及加载逻辑。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::{CoreError, Result};

/// 请求处理的通用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// 单个连接允许同时处理的最大 Action 数
    #[serde(default = "default_simultaneous_actions")]
    pub simultaneous_actions: usize,

    /// Action 执行超时时间（毫秒）
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,

    /// 记录日志时需要屏蔽的参数名
    #[serde(default)]
    pub filtered_params: Vec<String>,

    /// Action 未声明日志级别时使用的级别
    #[serde(default = "default_log_level")]
    pub default_log_level: String,

    /// 受信任的内部连接类型，只有该类型可以调用私有 Action
    #[serde(default = "default_internal_connection_type")]
    pub internal_connection_type: String,
}

fn default_simultaneous_actions() -> usize {
    5
}

fn default_action_timeout_ms() -> u64 {
    30000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_internal_connection_type() -> String {
    "internal".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            simultaneous_actions: default_simultaneous_actions(),
            action_timeout_ms: default_action_timeout_ms(),
            filtered_params: Vec::new(),
            default_log_level: default_log_level(),
            internal_connection_type: default_internal_connection_type(),
        }
    }
}

/// Action 日志输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLogConfig {
    /// 日志中字符串参数的最大长度
    #[serde(default = "default_max_log_string_length")]
    pub max_log_string_length: usize,
}

fn default_max_log_string_length() -> usize {
    100
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            max_log_string_length: default_max_log_string_length(),
        }
    }
}

/// 日志系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_dir: None,
            json_format: false,
            rotation: default_rotation(),
        }
    }
}

/// Action 内核配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionConfig {
    /// 配置文件路径
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// 通用配置
    #[serde(default)]
    pub general: GeneralConfig,

    /// Action 日志配置
    #[serde(default)]
    pub logger: ActionLogConfig,

    /// 日志系统配置
    #[serde(default)]
    pub logging: LogConfig,
}

impl ActionConfig {
    /// 创建配置构建器
    pub fn builder() -> ActionConfigBuilder {
        ActionConfigBuilder::new()
    }

    /// 从文件加载配置
    ///
    /// 扩展名为 `.json` 时按 JSON 解析，否则按 YAML 解析。
    pub async fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            CoreError::ConfigLoadFailed(format!("{}: {}", path.display(), e))
        })?;

        let mut config: ActionConfig = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        config.validate()?;
        config.config_path = Some(path);
        Ok(config)
    }

    /// 检查配置值是否合法
    pub fn validate(&self) -> Result<()> {
        if self.general.action_timeout_ms == 0 {
            return Err(CoreError::InvalidConfigValue {
                key: "general.action_timeout_ms".to_string(),
                reason: "超时时间必须大于 0".to_string(),
            });
        }
        if self.logger.max_log_string_length == 0 {
            return Err(CoreError::InvalidConfigValue {
                key: "logger.max_log_string_length".to_string(),
                reason: "日志字符串长度必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    /// Action 超时时间
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.general.action_timeout_ms)
    }

    /// 参数名是否需要在日志中屏蔽
    pub fn is_filtered_param(&self, name: &str) -> bool {
        self.general.filtered_params.iter().any(|p| p == name)
    }
}

/// 配置构建器
#[derive(Debug, Default)]
pub struct ActionConfigBuilder {
    config: ActionConfig,
}

impl ActionConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: ActionConfig::default(),
        }
    }

    /// 设置单连接最大并发 Action 数
    pub fn simultaneous_actions(mut self, count: usize) -> Self {
        self.config.general.simultaneous_actions = count;
        self
    }

    /// 设置 Action 超时时间（毫秒）
    pub fn action_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.general.action_timeout_ms = timeout_ms;
        self
    }

    /// 添加需要在日志中屏蔽的参数名
    pub fn filtered_param(mut self, name: impl Into<String>) -> Self {
        self.config.general.filtered_params.push(name.into());
        self
    }

    /// 设置默认 Action 日志级别
    pub fn default_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.general.default_log_level = level.into();
        self
    }

    /// 设置受信任的内部连接类型
    pub fn internal_connection_type(mut self, connection_type: impl Into<String>) -> Self {
        self.config.general.internal_connection_type = connection_type.into();
        self
    }

    /// 设置日志字符串最大长度
    pub fn max_log_string_length(mut self, length: usize) -> Self {
        self.config.logger.max_log_string_length = length;
        self
    }

    /// 设置日志系统级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 启用 JSON 格式日志
    pub fn json_logging(mut self) -> Self {
        self.config.logging.json_format = true;
        self
    }

    /// 构建配置
    pub fn build(self) -> ActionConfig {
        self.config
    }
}
