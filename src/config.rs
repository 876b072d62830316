//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，凭证为空时从环境变量补齐

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HTTP 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Finnhub（美股）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinnhubConfig {
    /// API Key（为空则服务不可用）
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_finnhub_url")]
    pub base_url: String,
}

/// Tushare（A股）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TushareConfig {
    /// Tushare Pro token（为空则代码表和分钟线不可用）
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_tushare_url")]
    pub base_url: String,
}

/// 本地缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 缓存目录
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// 过期时间（小时）
    #[serde(default = "default_expire_hours")]
    pub expire_hours: u64,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub finnhub: FinnhubConfig,
    #[serde(default)]
    pub tushare: TushareConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

// 默认值函数
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_finnhub_url() -> String { "https://finnhub.io/api/v1".to_string() }
fn default_tushare_url() -> String { "http://api.tushare.pro".to_string() }
fn default_cache_dir() -> PathBuf { PathBuf::from("data/cache/tushare") }
fn default_expire_hours() -> u64 { 24 }

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for FinnhubConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_finnhub_url(),
        }
    }
}

impl Default for TushareConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: default_tushare_url(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            expire_hours: default_expire_hours(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl CacheConfig {
    /// 缓存有效期
    pub fn expire_after(&self) -> chrono::Duration {
        chrono::Duration::hours(self.expire_hours as i64)
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值；随后用环境变量补齐凭证
    pub fn load() -> Self {
        let config_paths = ["config.json", "config/config.json"];

        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        log::info!("从 {} 加载配置成功", path);
                        return config.apply_env();
                    }
                    Err(e) => {
                        log::warn!("加载配置文件 {} 失败: {}", path, e);
                    }
                }
            }
        }

        log::info!("使用默认配置");
        Self::default().apply_env()
    }

    /// 凭证为空时读取 FINNHUB_API_KEY / TUSHARE_TOKEN
    pub fn apply_env(mut self) -> Self {
        if self.finnhub.api_key.is_empty() {
            if let Ok(key) = env::var("FINNHUB_API_KEY") {
                self.finnhub.api_key = key;
            }
        }
        if self.tushare.token.is_empty() {
            if let Ok(token) = env::var("TUSHARE_TOKEN") {
                self.tushare.token = token;
            }
        }
        self
    }
}
