use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
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
            port: 3000,
        }
    }
}

/// 静态资源配置（字体）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesConfig {
    /// 资源基础路径，`font_path` 相对于此目录解析
    #[serde(default = "ResourcesConfig::default_base_path")]
    pub base_path: String,
    /// 字体文件相对路径
    #[serde(default = "ResourcesConfig::default_font_path")]
    pub font_path: String,
    /// 字体远程地址（可选）。设置后优先通过 HTTP 拉取，不再读取本地文件
    #[serde(default)]
    pub font_url: Option<String>,
    /// 字体读取/拉取超时（毫秒）
    #[serde(default = "ResourcesConfig::default_font_fetch_timeout_ms")]
    pub font_fetch_timeout_ms: u64,
}

impl ResourcesConfig {
    fn default_base_path() -> String {
        "./public".to_string()
    }
    fn default_font_path() -> String {
        "resources/Inter-Bold.ttf".to_string()
    }
    fn default_font_fetch_timeout_ms() -> u64 {
        5_000
    }
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            base_path: Self::default_base_path(),
            font_path: Self::default_font_path(),
            font_url: None,
            font_fetch_timeout_ms: Self::default_font_fetch_timeout_ms(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（`RUST_LOG` 未设置时生效）
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// 图片渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRenderConfig {
    /// 是否优先速度渲染（OptimizeSpeed），提升栅格化性能，可能略降画质
    #[serde(default)]
    pub optimize_speed: bool,
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
    /// 单次请求（字体获取 + 渲染）的超时时间（毫秒）
    #[serde(default = "ImageRenderConfig::default_render_timeout_ms")]
    pub render_timeout_ms: u64,
    /// 成功响应的 Cache-Control，交给边缘缓存处理
    #[serde(default = "ImageRenderConfig::default_cache_control")]
    pub cache_control: String,
}

impl ImageRenderConfig {
    fn default_render_timeout_ms() -> u64 {
        10_000
    }
    fn default_cache_control() -> String {
        "public, immutable, no-transform, max-age=31536000".to_string()
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms.max(1))
    }

    /// 实际并发渲染许可数
    pub fn effective_parallelism(&self) -> usize {
        match self.max_parallel {
            0 => num_cpus::get().max(1),
            n => n as usize,
        }
    }
}

impl Default for ImageRenderConfig {
    fn default() -> Self {
        Self {
            optimize_speed: false,
            max_parallel: 0,
            render_timeout_ms: Self::default_render_timeout_ms(),
            cache_control: Self::default_cache_control(),
        }
    }
}

/// 指标推送配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// 是否启用指标采集
    #[serde(default = "MetricsConfig::default_enabled")]
    pub enabled: bool,
    /// Pushgateway 地址；为空时只在内存中聚合，不推送
    #[serde(default)]
    pub push_gateway: Option<String>,
    /// 推送间隔（毫秒）。0 表示每次观测后立即推送，不做批量
    #[serde(default)]
    pub push_interval_ms: u64,
    /// Pushgateway job 名称
    #[serde(default = "MetricsConfig::default_job")]
    pub job: String,
    /// 推送请求超时（毫秒）
    #[serde(default = "MetricsConfig::default_push_timeout_ms")]
    pub push_timeout_ms: u64,
    /// 观测队列容量，满时丢弃新观测
    #[serde(default = "MetricsConfig::default_queue_capacity")]
    pub queue_capacity: usize,
}

impl MetricsConfig {
    fn default_enabled() -> bool {
        true
    }
    fn default_job() -> String {
        "docs-og".to_string()
    }
    fn default_push_timeout_ms() -> u64 {
        3_000
    }
    fn default_queue_capacity() -> usize {
        1024
    }

    pub fn push_interval(&self) -> Duration {
        Duration::from_millis(self.push_interval_ms)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms.max(1))
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            push_gateway: None,
            push_interval_ms: 0,
            job: Self::default_job(),
            push_timeout_ms: Self::default_push_timeout_ms(),
            queue_capacity: Self::default_queue_capacity(),
        }
    }
}

/// 部署环境配置（用于生成预览图绝对地址）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeploymentConfig {
    /// 是否为生产部署
    #[serde(default)]
    pub is_production: bool,
    /// 生产域名（不含协议），如 `docs.autometrics.dev`
    #[serde(default)]
    pub host: Option<String>,
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        10
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 图片渲染配置
    #[serde(default)]
    pub image: ImageRenderConfig,
    /// 指标配置
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 部署环境
    #[serde(default)]
    pub deployment: DeploymentConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    ///
    /// 配置文件缺失时全部使用默认值。
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            .add_source(File::from(config_path).required(false))
            // 支持环境变量覆盖，例如：APP_SERVER__PORT=8080
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;

        tracing::debug!(
            "配置加载完成: font = {:?}, push_gateway = {:?}",
            config.font_path(),
            config.metrics.push_gateway
        );

        Ok(config)
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 获取字体文件完整路径
    pub fn font_path(&self) -> PathBuf {
        PathBuf::from(&self.resources.base_path).join(&self.resources.font_path)
    }

    pub fn font_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.resources.font_fetch_timeout_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;
    use std::path::PathBuf;

    #[test]
    fn defaults_point_at_bundled_font() {
        let cfg = AppConfig::default();
        assert_eq!(
            cfg.font_path(),
            PathBuf::from("./public").join("resources/Inter-Bold.ttf")
        );
        assert_eq!(cfg.server_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn zero_push_interval_is_the_default() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.metrics.push_interval_ms, 0);
        assert!(cfg.metrics.push_interval().is_zero());
    }

    #[test]
    fn effective_parallelism_never_zero() {
        let cfg = AppConfig::default();
        assert!(cfg.image.effective_parallelism() >= 1);
    }

    #[test]
    fn partial_toml_keeps_section_defaults() {
        let built = config::Config::builder()
            .add_source(config::File::from_str(
                "[metrics]\npush_gateway = \"http://gw:9091\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .expect("build config");
        let cfg: AppConfig = built.try_deserialize().expect("deserialize");
        assert_eq!(cfg.metrics.push_gateway.as_deref(), Some("http://gw:9091"));
        assert_eq!(cfg.metrics.job, "docs-og");
        assert_eq!(cfg.image.render_timeout_ms, 10_000);
    }
}
