use axum::response::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::og::handler::og_image,
        crate::features::health::handler::health_check,
    ),
    components(schemas(crate::features::health::handler::HealthResponse)),
    tags(
        (name = "OG", description = "社交预览图：按页面标题生成 og:image。"),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Docs OG Preview API",
        version = env!("CARGO_PKG_VERSION"),
        description = "文档站社交预览图服务（Axum + utoipa）。"
    )
)]
pub struct ApiDoc;

/// OpenAPI 文档地址
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn document_lists_og_and_health_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/og"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
