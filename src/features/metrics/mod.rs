pub mod middleware;
pub mod models;
pub mod push;
pub mod registry;

use std::{sync::Arc, time::Duration};

use tokio::sync::{mpsc, watch};
use tokio::time::{Interval, MissedTickBehavior};

use crate::{config::AppConfig, error::AppError};
use models::Observation;
use push::PushGateway;
use registry::MetricsRegistry;

pub use middleware::{Instrumentation, instrument};

/// 指标接收端。`record` 不得阻塞请求路径。
pub trait MetricsSink: Send + Sync + 'static {
    fn record(&self, obs: Observation);
}

/// 指标关闭时使用的空实现
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _obs: Observation) {}
}

/// 指标服务句柄：对外只暴露异步上报通道与优雅关闭
#[derive(Clone)]
pub struct MetricsHandle {
    tx: mpsc::Sender<Observation>,
    registry: Arc<MetricsRegistry>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    done_rx: watch::Receiver<bool>,
}

impl MetricsSink for MetricsHandle {
    fn record(&self, obs: Observation) {
        // 若队列已满则丢弃，不阻塞主流程
        if self.tx.try_send(obs).is_err() {
            tracing::debug!("指标队列已满或已关闭，丢弃一条观测");
        }
    }
}

impl MetricsHandle {
    /// 聚合后的注册表
    pub fn registry(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.registry)
    }

    /// 优雅关闭：处理队列剩余观测并做最后一次推送
    pub async fn graceful_shutdown(&self, timeout: Duration) -> Result<(), AppError> {
        tracing::info!("开始关闭指标服务，超时时间: {:?}", timeout);
        let _ = self.shutdown_tx.send(true);

        let mut rx = self.done_rx.clone();
        let wait = async {
            loop {
                if *rx.borrow() {
                    break;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(_) => {
                tracing::info!("指标服务已关闭");
                Ok(())
            }
            Err(_) => Err(AppError::Internal("指标服务关闭超时".into())),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 初始化指标服务：spawn 聚合/推送任务。未启用时返回 `None`。
pub fn init_metrics(config: &AppConfig) -> Option<MetricsHandle> {
    let cfg = &config.metrics;
    if !cfg.enabled {
        tracing::warn!("指标采集已禁用（config.metrics.enabled=false）");
        return None;
    }

    let gateway = cfg
        .push_gateway
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|base| PushGateway::new(base, &cfg.job, &push::hostname(), cfg.push_timeout()));
    match &gateway {
        Some(gw) => tracing::info!(
            "指标将推送至 {}（间隔: {:?}）",
            gw.url(),
            cfg.push_interval()
        ),
        None => tracing::info!("未配置 Pushgateway，指标仅在内存中聚合"),
    }

    let registry = Arc::new(MetricsRegistry::new());
    let (tx, rx) = mpsc::channel::<Observation>(cfg.queue_capacity.max(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (done_tx, done_rx) = watch::channel(false);

    tokio::spawn(run_worker(
        Arc::clone(&registry),
        gateway,
        cfg.push_interval(),
        rx,
        shutdown_rx,
        done_tx,
    ));

    Some(MetricsHandle {
        tx,
        registry,
        shutdown_tx: Arc::new(shutdown_tx),
        done_rx,
    })
}

async fn run_worker(
    registry: Arc<MetricsRegistry>,
    gateway: Option<PushGateway>,
    interval: Duration,
    mut rx: mpsc::Receiver<Observation>,
    mut shutdown_rx: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
) {
    // 间隔为 0 时每条观测后立即推送
    let mut ticker = (!interval.is_zero()).then(|| {
        // 首个 tick 延后一个周期，避免启动即推送
        let mut t = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        t.set_missed_tick_behavior(MissedTickBehavior::Delay);
        t
    });
    let per_observation = ticker.is_none();

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    while let Ok(obs) = rx.try_recv() {
                        registry.observe(&obs);
                    }
                    flush(&registry, gateway.as_ref()).await;
                    tracing::info!("指标观测处理完成");
                    let _ = done_tx.send(true);
                    break;
                }
            }
            result = rx.recv() => {
                match result {
                    Some(obs) => {
                        registry.observe(&obs);
                        if per_observation {
                            flush(&registry, gateway.as_ref()).await;
                        }
                    }
                    None => {
                        tracing::info!("指标通道关闭，处理剩余观测...");
                        flush(&registry, gateway.as_ref()).await;
                        let _ = done_tx.send(true);
                        break;
                    }
                }
            }
            _ = next_tick(&mut ticker) => {
                flush(&registry, gateway.as_ref()).await;
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// 有新数据时推送一次；失败只记日志，保留标记等待下次重试
async fn flush(registry: &MetricsRegistry, gateway: Option<&PushGateway>) {
    if !registry.take_dirty() {
        return;
    }
    let Some(gw) = gateway else {
        return;
    };
    if let Err(e) = gw.push(registry.render_exposition()).await {
        tracing::warn!("指标推送失败: {}", e);
        registry.mark_dirty();
    }
}
