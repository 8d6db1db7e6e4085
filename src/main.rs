use std::sync::Arc;

use og_preview::features::metrics::{self, MetricsSink, NoopSink};
use og_preview::features::og::AssetProvider;
use og_preview::features::seo::{DeploymentEnvironment, resolve_og_url};
use og_preview::openapi::OPENAPI_JSON_PATH;
use og_preview::startup::run_startup_checks;
use og_preview::{AppState, ShutdownManager, build_app, config::AppConfig};

#[tokio::main]
async fn main() {
    // Load config（先于日志初始化，以便读取默认日志级别）
    let config_result = AppConfig::init_global();
    let default_filter = match &config_result {
        Ok(()) => format!(
            "og_preview={},tower_http=info",
            AppConfig::global().logging.level
        ),
        Err(_) => "og_preview=info,tower_http=info".to_string(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    if let Err(e) = config_result {
        tracing::error!("Config init failed: {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::global();

    // 创建优雅退出管理器并启动信号处理器
    let shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.start_signal_handler().await {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    // 字体懒加载；启动检查中预热，失败只告警
    let assets = Arc::new(AssetProvider::from_config(config));
    run_startup_checks(config, &assets).await;

    // 初始化指标
    let metrics_handle = metrics::init_metrics(config);
    let sink: Arc<dyn MetricsSink> = match &metrics_handle {
        Some(h) => Arc::new(h.clone()),
        None => Arc::new(NoopSink),
    };

    let app_state = AppState::new(config, assets);
    let app = build_app(app_state, sink);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("OG image: http://{}/api/og?title=Hello", addr);
    tracing::info!("OpenAPI: http://{}{}", addr, OPENAPI_JSON_PATH);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!(
        "Public preview URL: {}",
        resolve_og_url("Hello", &DeploymentEnvironment::from_config(&config.deployment))
    );

    let shutdown_timeout = config.shutdown.timeout_duration();
    let shutdown_signal = async move {
        let reason = shutdown_manager.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅退出...", reason);
    };

    let graceful = axum::serve(listener, app).with_graceful_shutdown(async {
        shutdown_signal.await;
        tracing::info!("开始优雅关闭HTTP服务器...");
    });

    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    // HTTP 停止后刷新指标：处理剩余观测并做最后一次推送
    if let Some(handle) = metrics_handle {
        tracing::info!("优雅退出超时时间: {}秒", config.shutdown.timeout_secs);
        match handle.graceful_shutdown(shutdown_timeout).await {
            Ok(()) => tracing::info!("指标服务已优雅关闭"),
            Err(e) => tracing::warn!("指标服务关闭失败: {}", e),
        }
    }

    tracing::info!("服务器已优雅关闭");
}
