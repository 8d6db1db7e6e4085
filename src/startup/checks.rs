use std::sync::Arc;

use crate::config::AppConfig;
use crate::features::og::{
    AssetProvider, FontSource, RenderOptions, SceneStyle, compose, render_async, sanitize,
};

/// 执行启动检查（只告警，不阻断启动）
///
/// 1. 检查字体文件是否存在
/// 2. 预热：加载字体并渲染一次默认标题，降低首个请求的冷启动延迟
pub async fn run_startup_checks(config: &AppConfig, assets: &AssetProvider) {
    tracing::info!("🔍 开始执行启动检查...");

    check_font_source(assets);

    let t_prewarm = std::time::Instant::now();
    match prewarm(config, assets).await {
        Ok(bytes) => tracing::info!(
            "🔥 预览图渲染预热完成: {}ms（{} 字节）",
            t_prewarm.elapsed().as_millis(),
            bytes
        ),
        Err(e) => tracing::warn!("⚠️ 预热失败，首个请求将重试加载: {}", e),
    }

    tracing::info!("✅ 启动检查完成");
}

fn check_font_source(assets: &AssetProvider) {
    match assets.source() {
        FontSource::File(path) if !path.exists() => {
            tracing::warn!("⚠️ 未找到字体文件: {:?}，预览图请求将返回 500", path);
        }
        FontSource::File(path) => tracing::info!("✅ 字体文件存在: {:?}", path),
        FontSource::Url(url) => tracing::info!("🌐 字体将从远程加载: {}", url),
        FontSource::Memory(bytes) => tracing::info!("✅ 使用内存字体（{} 字节）", bytes.len()),
    }
}

async fn prewarm(config: &AppConfig, assets: &AssetProvider) -> Result<usize, crate::error::OgError> {
    let font = assets.font().await?;
    let scene = compose(
        &sanitize(None),
        &font,
        assets.brand_mark(),
        assets.background(),
        &SceneStyle::default(),
    );
    let image = render_async(
        scene,
        font,
        RenderOptions {
            optimize_speed: config.image.optimize_speed,
        },
        Arc::new(tokio::sync::Semaphore::new(1)),
    )
    .await?;
    Ok(image.bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[tokio::test]
    async fn missing_font_only_warns() {
        let assets = AssetProvider::new(
            FontSource::File(PathBuf::from("./nope/Inter-Bold.ttf")),
            Duration::from_millis(200),
        );
        run_startup_checks(&AppConfig::default(), &assets).await;
        assert!(!assets.is_font_loaded());
    }

    #[tokio::test]
    async fn prewarm_loads_the_font() {
        let Some(bytes) = crate::test_support::system_font_bytes() else {
            eprintln!("skip: no system font available");
            return;
        };
        let assets = AssetProvider::new(FontSource::Memory(bytes), Duration::from_secs(1));
        run_startup_checks(&AppConfig::default(), &assets).await;
        assert!(assets.is_font_loaded());
    }
}
