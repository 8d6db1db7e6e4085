use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::features::health::handler::health_check;
use crate::features::metrics::MetricsSink;
use crate::features::og::create_og_router;
use crate::openapi::{OPENAPI_JSON_PATH, openapi_json};
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 组装全部路由与全局中间件
///
/// 由外到内：TraceLayer → request_id → 路由（`/api/og` 自带指标采集）。
pub fn build_app(state: AppState, metrics: Arc<dyn MetricsSink>) -> Router {
    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route(OPENAPI_JSON_PATH, get(openapi_json))
        .merge(create_og_router(metrics))
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}
