use config::{Config as ConfigBuilder, ConfigError, Environment, File, Source};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Azure 相关环境变量与配置键的映射（无默认值，缺一不可）
pub const AZURE_ENV_VARS: [(&str, &str); 3] = [
    ("AZURE_STORAGE_CONNECTION_STRING", "azure.connection_string"),
    ("AZURE_CONTAINER_NAME", "azure.container_name"),
    ("AZURE_STORAGE_ACCOUNT", "azure.account"),
];

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_wildcard")]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_wildcard")]
    pub allowed_headers: Vec<String>,
    /// 暴露的响应头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// 是否允许携带凭证（Cookie/Authorization）
    #[serde(default)]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_allowed_origins() -> Vec<String> {
        vec!["http://localhost:3000".to_string()]
    }

    fn default_wildcard() -> Vec<String> {
        vec!["*".to_string()]
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Self::default_allowed_origins(),
            allowed_methods: Self::default_wildcard(),
            allowed_headers: Self::default_wildcard(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age_secs: None,
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 收到退出信号后等待在途请求完成的最长时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// Azure Blob Storage 配置
#[derive(Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    /// 存储连接字符串（凭据与端点）
    pub connection_string: String,
    /// 上传目标容器
    pub container_name: String,
    /// 账户名，仅用于拼接返回的公开 URL
    pub account: String,
}

impl fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureConfig")
            .field("connection_string", &"<redacted>")
            .field("container_name", &self.container_name)
            .field("account", &self.account)
            .finish()
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
    /// Azure 存储配置（必填）
    pub azure: AzureConfig,
}

impl AppConfig {
    /// 依次叠加：`config.toml`（可选）→ `APP_` 前缀环境变量 → Azure 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();
        tracing::info!("正在从 {:?} 加载配置文件（可选）", config_path);

        Self::load_from(File::from(config_path).required(false), |name| {
            std::env::var(name).ok()
        })
    }

    /// 以给定的文件源与环境变量查找函数构建配置，便于测试注入。
    pub fn load_from<S, F>(file: S, lookup: F) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ConfigBuilder::builder()
            .add_source(file)
            // 例如：APP_SERVER__PORT=9000
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        for (var, key) in AZURE_ENV_VARS {
            builder = builder.set_override_option(key, lookup(var).filter(|v| !v.is_empty()))?;
        }
        let built = builder.build()?;

        let missing: Vec<&str> = AZURE_ENV_VARS
            .iter()
            .filter(|(_, key)| {
                built
                    .get_string(key)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .map(|(var, _)| *var)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Message(format!(
                "缺少必需的环境变量: {}",
                missing.join(", ")
            )));
        }

        let config: Self = built.try_deserialize()?;
        tracing::debug!(
            "配置加载完成: server={} container={} account={}",
            config.server_addr(),
            config.azure.container_name,
            config.azure.account
        );
        Ok(config)
    }

    /// 获取配置文件路径（`APP_CONFIG_PATH` 可覆盖）
    fn get_config_path() -> PathBuf {
        std::env::var("APP_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
