use axum::http::HeaderValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::AppConfig;
use crate::features::og::{AssetProvider, RenderOptions, SceneStyle};

/// 成功响应的默认缓存策略
const DEFAULT_CACHE_CONTROL: &str = "public, immutable, no-transform, max-age=31536000";

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 字体与矢量图
    pub assets: Arc<AssetProvider>,
    /// 场景样式（注入给合成器）
    pub scene_style: Arc<SceneStyle>,
    /// 控制并发渲染的信号量（限制 CPU 密集型任务数量）
    pub render_semaphore: Arc<Semaphore>,
    pub render_options: RenderOptions,
    /// 字体获取 + 渲染的整体超时
    pub render_timeout: Duration,
    pub cache_control: HeaderValue,
}

impl AppState {
    pub fn new(config: &AppConfig, assets: Arc<AssetProvider>) -> Self {
        let cache_control = HeaderValue::from_str(&config.image.cache_control).unwrap_or_else(|_| {
            tracing::warn!(
                "image.cache_control 不是合法的头部值，使用默认值: {}",
                DEFAULT_CACHE_CONTROL
            );
            HeaderValue::from_static(DEFAULT_CACHE_CONTROL)
        });

        Self {
            assets,
            scene_style: Arc::new(SceneStyle::default()),
            render_semaphore: Arc::new(Semaphore::new(config.image.effective_parallelism())),
            render_options: RenderOptions {
                optimize_speed: config.image.optimize_speed,
            },
            render_timeout: config.image.render_timeout(),
            cache_control,
        }
    }

    /// 替换场景样式
    pub fn with_scene_style(mut self, style: SceneStyle) -> Self {
        self.scene_style = Arc::new(style);
        self
    }
}
