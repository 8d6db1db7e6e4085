use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::{Next, from_fn_with_state},
    response::Response,
    routing::MethodRouter,
};

use super::MetricsSink;
use super::models::{Observation, Outcome};

/// 显式包装配置：被包装函数的名字、所属模块与指标接收端
#[derive(Clone)]
pub struct Instrumentation {
    pub function: &'static str,
    pub module: &'static str,
    pub sink: Arc<dyn MetricsSink>,
}

impl Instrumentation {
    pub fn new(function: &'static str, module: &'static str, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            function,
            module,
            sink,
        }
    }
}

/// 为单个路由挂上调用计数与耗时采集，不修改响应。
pub fn instrument<S>(route: MethodRouter<S>, inst: Instrumentation) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.layer(from_fn_with_state(inst, instrument_middleware))
}

/// 采集中间件：每次调用恰好记录一条观测
pub async fn instrument_middleware(
    State(inst): State<Instrumentation>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let res = next.run(req).await;
    let status = res.status().as_u16();

    inst.sink.record(Observation {
        function: inst.function,
        module: inst.module,
        outcome: Outcome::from_status(status),
        status,
        duration: started.elapsed(),
    });

    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::metrics::registry::MetricsRegistry;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    async fn ok() -> &'static str {
        "fine"
    }

    async fn boom() -> (StatusCode, &'static str) {
        (StatusCode::INTERNAL_SERVER_ERROR, "nope")
    }

    async fn missing() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    fn app(registry: Arc<MetricsRegistry>) -> Router {
        let inst = |name| Instrumentation::new(name, "tests", registry.clone());
        Router::new()
            .route("/ok", instrument(get(ok), inst("ok")))
            .route("/boom", instrument(get(boom), inst("boom")))
            .route("/missing", instrument(get(missing), inst("missing")))
            .route("/plain", get(ok))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, String) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn records_one_observation_per_call_without_touching_response() {
        let registry = Arc::new(MetricsRegistry::new());

        assert_eq!(
            call(app(registry.clone()), "/ok").await,
            (StatusCode::OK, "fine".to_string())
        );
        assert_eq!(
            call(app(registry.clone()), "/boom").await,
            (StatusCode::INTERNAL_SERVER_ERROR, "nope".to_string())
        );
        call(app(registry.clone()), "/missing").await;
        call(app(registry.clone()), "/plain").await;

        assert_eq!(registry.calls("ok", "tests", Outcome::Ok), 1);
        assert_eq!(registry.calls("boom", "tests", Outcome::Error), 1);
        assert_eq!(registry.calls("boom", "tests", Outcome::Ok), 0);
        // 4xx 不算失败
        assert_eq!(registry.calls("missing", "tests", Outcome::Ok), 1);
        assert_eq!(registry.total_calls(), 3);
    }
}
