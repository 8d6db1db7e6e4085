use std::time::Duration;

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    routing::put,
};
use og_preview::AppConfig;
use og_preview::features::metrics::{MetricsSink, init_metrics};
use og_preview::features::metrics::models::{Observation, Outcome};
use tokio::sync::mpsc;

#[derive(Debug)]
struct Pushed {
    job: String,
    content_type: String,
    body: String,
}

/// 本地假 Pushgateway：把收到的每次 PUT 转发到通道
async fn fake_gateway() -> (String, mpsc::UnboundedReceiver<Pushed>) {
    let (tx, rx) = mpsc::unbounded_channel::<Pushed>();

    async fn receive(
        State(tx): State<mpsc::UnboundedSender<Pushed>>,
        Path((job, _instance)): Path<(String, String)>,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        let _ = tx.send(Pushed {
            job,
            content_type: headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
        StatusCode::OK
    }

    let app = Router::new()
        .route("/metrics/job/:job/instance/:instance", put(receive))
        .with_state(tx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), rx)
}

fn observation(outcome: Outcome) -> Observation {
    Observation {
        function: "og_image",
        module: "og_preview::features::og::handler",
        outcome,
        status: if outcome == Outcome::Ok { 200 } else { 500 },
        duration: Duration::from_millis(12),
    }
}

#[tokio::test]
async fn zero_interval_pushes_after_every_observation() {
    let (gateway, mut rx) = fake_gateway().await;
    let mut cfg = AppConfig::default();
    cfg.metrics.push_gateway = Some(gateway);
    cfg.metrics.push_interval_ms = 0;
    let handle = init_metrics(&cfg).expect("metrics enabled");

    handle.record(observation(Outcome::Ok));
    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("first push")
        .expect("channel open");
    assert_eq!(first.job, "docs-og");
    assert!(first.content_type.starts_with("text/plain; version=0.0.4"));
    assert!(first.body.contains(
        "function_calls_total{function=\"og_image\",module=\"og_preview::features::og::handler\",result=\"ok\"} 1"
    ));

    handle.record(observation(Outcome::Error));
    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("second push")
        .expect("channel open");
    assert!(second.body.contains("result=\"error\"} 1"));
    assert!(second.body.contains("function_calls_duration_seconds_count{function=\"og_image\",module=\"og_preview::features::og::handler\"} 2"));

    handle
        .graceful_shutdown(Duration::from_secs(2))
        .await
        .expect("shutdown");
}

#[tokio::test]
async fn interval_mode_batches_until_tick_or_shutdown() {
    let (gateway, mut rx) = fake_gateway().await;
    let mut cfg = AppConfig::default();
    cfg.metrics.push_gateway = Some(gateway);
    cfg.metrics.push_interval_ms = 60_000;
    let handle = init_metrics(&cfg).expect("metrics enabled");

    for _ in 0..3 {
        handle.record(observation(Outcome::Ok));
    }
    // 长间隔内不推送
    assert!(
        tokio::time::timeout(Duration::from_millis(300), rx.recv())
            .await
            .is_err()
    );

    // 关闭时做最后一次推送
    handle
        .graceful_shutdown(Duration::from_secs(5))
        .await
        .expect("shutdown");
    let pushed = rx.recv().await.expect("final push");
    assert!(pushed.body.contains("result=\"ok\"} 3"));
}
