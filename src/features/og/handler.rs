use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use sha2::{Digest, Sha256};

use super::renderer::{self, RenderedImage};
use super::scene;
use super::title::{SanitizedTitle, sanitize, title_from_query};
use crate::error::OgError;
use crate::features::metrics::{Instrumentation, MetricsSink, instrument};
use crate::state::AppState;

/// 预览图路由
pub const OG_ROUTE: &str = "/api/og";

#[utoipa::path(
    get,
    path = "/api/og",
    summary = "生成页面社交预览图",
    description = "按页面标题生成 1200×630 的 PNG 预览图（og:image）。标题缺失或为空时使用站点默认标题，超过 100 个字符时截断。",
    params(
        ("title" = Option<String>, Query, description = "页面标题（URL 编码）；重复出现时取第一个")
    ),
    responses(
        (status = 200, description = "PNG bytes of the preview image (image/png)"),
        (status = 500, description = "Failed to generate image", body = String, content_type = "text/plain")
    ),
    tag = "OG"
)]
pub async fn og_image(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, OgError> {
    let t_total = Instant::now();
    let title = sanitize(title_from_query(&pairs));

    let image = tokio::time::timeout(state.render_timeout, generate(&state, &title))
        .await
        .map_err(|_| OgError::Timeout(state.render_timeout.as_millis() as u64))??;

    tracing::debug!(
        chars = title.as_str().chars().count(),
        bytes = image.bytes.len(),
        elapsed_ms = t_total.elapsed().as_millis() as u64,
        "预览图生成完成"
    );

    Ok(png_response(image, state.cache_control.clone()))
}

/// 字体获取 → 合成 → 栅格化
async fn generate(state: &AppState, title: &SanitizedTitle) -> Result<RenderedImage, OgError> {
    let font = state.assets.font().await?;
    let scene = scene::compose(
        title,
        &font,
        state.assets.brand_mark(),
        state.assets.background(),
        &state.scene_style,
    );
    renderer::render_async(
        scene,
        font,
        state.render_options,
        Arc::clone(&state.render_semaphore),
    )
    .await
}

fn png_response(image: RenderedImage, cache_control: HeaderValue) -> Response {
    let etag = etag_for(&image.bytes);
    let mut res = (StatusCode::OK, image.bytes).into_response();
    let headers = res.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(image.content_type),
    );
    headers.insert(header::CACHE_CONTROL, cache_control);
    if let Ok(v) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, v);
    }
    res
}

/// 强 ETag：PNG 字节 SHA-256 的前 16 字节（hex）
fn etag_for(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("\"{}\"", hex::encode(&digest[..16]))
}

/// 预览图路由，已挂上调用指标采集
pub fn create_og_router(metrics: Arc<dyn MetricsSink>) -> Router<AppState> {
    Router::new().route(
        OG_ROUTE,
        instrument(
            get(og_image),
            Instrumentation::new("og_image", module_path!(), metrics),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::etag_for;

    #[test]
    fn etag_is_quoted_truncated_sha256() {
        let tag = etag_for(b"");
        // SHA-256("") = e3b0c442 98fc1c14 9afbf4c8 996fb924 ...
        assert_eq!(tag, "\"e3b0c44298fc1c149afbf4c8996fb924\"");
        assert_ne!(etag_for(b"a"), tag);
    }
}
