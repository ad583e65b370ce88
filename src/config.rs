//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `STEPWISE__*` 覆盖（双下划线表示嵌套，如 `STEPWISE__DIALOGUE__AUTO_ADVANCE=false`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::session::EvictionPolicy;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub sessions: SessionsSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub dialogue: DialogueSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [server] 段：HTTP 与 WebSocket 监听地址
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
    #[serde(default = "default_ws_addr")]
    pub ws_addr: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            ws_addr: default_ws_addr(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_ws_addr() -> String {
    "127.0.0.1:5001".to_string()
}

/// 会话淘汰策略名（配置文件中的字符串形式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvictionKind {
    #[default]
    Lru,
    Ttl,
}

/// [sessions] 段：容量上限、淘汰策略、空闲过期、清理间隔、历史条数
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsSection {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub eviction: EvictionKind,
    /// 仅 eviction = "ttl" 时生效
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// 每个会话保留的对话记录条数
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            eviction: EvictionKind::default(),
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_history: default_max_history(),
        }
    }
}

impl SessionsSection {
    pub fn eviction_policy(&self) -> EvictionPolicy {
        match self.eviction {
            EvictionKind::Lru => EvictionPolicy::Lru,
            EvictionKind::Ttl => EvictionPolicy::Ttl(Duration::from_secs(self.idle_timeout_secs)),
        }
    }
}

fn default_capacity() -> usize {
    10_000
}

fn default_idle_timeout_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_max_history() -> usize {
    50
}

/// [cache] 段：工具结果与任务步骤模板的缓存时长（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_tool_ttl_secs")]
    pub tool_ttl_secs: u64,
    #[serde(default = "default_steps_ttl_secs")]
    pub steps_ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            tool_ttl_secs: default_tool_ttl_secs(),
            steps_ttl_secs: default_steps_ttl_secs(),
        }
    }
}

fn default_tool_ttl_secs() -> u64 {
    300
}

fn default_steps_ttl_secs() -> u64 {
    3600
}

/// [dialogue] 段
#[derive(Debug, Clone, Deserialize)]
pub struct DialogueSection {
    /// true：每次请求下一步都直接推进游标；false：发出一步后等待 confirm_step
    #[serde(default = "default_auto_advance")]
    pub auto_advance: bool,
}

impl Default for DialogueSection {
    fn default() -> Self {
        Self {
            auto_advance: default_auto_advance(),
        }
    }
}

fn default_auto_advance() -> bool {
    true
}

/// [tools] 段：外部服务地址
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_weather_geocoding_url")]
    pub weather_geocoding_url: String,
    #[serde(default = "default_weather_forecast_url")]
    pub weather_forecast_url: String,
    #[serde(default = "default_dictionary_url")]
    pub dictionary_url: String,
    #[serde(default = "default_image_url")]
    pub image_url: String,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            weather_geocoding_url: default_weather_geocoding_url(),
            weather_forecast_url: default_weather_forecast_url(),
            dictionary_url: default_dictionary_url(),
            image_url: default_image_url(),
        }
    }
}

fn default_weather_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_weather_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_dictionary_url() -> String {
    "https://api.dictionaryapi.dev/api/v2/entries/en".to_string()
}

fn default_image_url() -> String {
    "https://image.pollinations.ai/prompt".to_string()
}

/// 从 config 目录加载配置，环境变量 STEPWISE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 STEPWISE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("STEPWISE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
