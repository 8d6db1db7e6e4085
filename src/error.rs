use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// 返回给客户端的固定失败文案，不携带任何内部细节。
pub const GENERIC_FAILURE_BODY: &str = "Failed to generate image";

/// 应用统一错误类型（启动、配置与基础设施）
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 静态资源加载错误（字体获取/解析）
#[derive(Error, Debug)]
pub enum AssetLoadError {
    /// 读取本地字体文件失败
    #[error("读取字体文件失败 {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 获取字体超时
    #[error("获取字体超时: {0}")]
    Timeout(String),

    /// 远程拉取字体失败
    #[error("远程拉取字体失败: {0}")]
    Http(String),

    /// 字体数据无法解析
    #[error("字体数据无效: {0}")]
    InvalidFont(String),
}

/// 栅格化错误
#[derive(Error, Debug)]
pub enum RenderError {
    /// 字体不可用（数据库为空或无法排版）
    #[error("字体不可用: {0}")]
    Font(String),

    /// 场景 SVG 解析失败
    #[error("场景解析失败: {0}")]
    Parse(String),

    /// 画布尺寸异常或像素缓冲区创建失败
    #[error("画布尺寸异常: {0}")]
    Size(String),

    /// PNG 编码失败
    #[error("PNG 编码失败: {0}")]
    Encode(String),
}

/// 预览图请求错误，统一映射为 500
#[derive(Error, Debug)]
pub enum OgError {
    #[error(transparent)]
    AssetLoad(#[from] AssetLoadError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// 字体获取与渲染整体超时
    #[error("生成预览图超时（{0}ms）")]
    Timeout(u64),

    /// 阻塞任务调度失败等内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl OgError {
    /// 稳定的错误码，仅用于日志检索
    pub fn stable_code(&self) -> &'static str {
        match self {
            OgError::AssetLoad(_) => "ASSET_LOAD_FAILED",
            OgError::Render(_) => "RENDER_FAILED",
            OgError::Timeout(_) => "RENDER_TIMEOUT",
            OgError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for OgError {
    fn into_response(self) -> Response {
        tracing::error!(
            code = self.stable_code(),
            request_id = crate::request_id::current_request_id().as_deref().unwrap_or("-"),
            error = %self,
            "预览图生成失败"
        );

        let mut res = (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE_BODY).into_response();
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        res.headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn og_error_body_never_leaks_detail() {
        let err = OgError::AssetLoad(AssetLoadError::Io {
            path: "/srv/secret/public/resources/Inter-Bold.ttf".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], GENERIC_FAILURE_BODY.as_bytes());
    }

    #[test]
    fn render_error_converts_into_og_error() {
        let err: OgError = RenderError::Parse("unexpected element".into()).into();
        assert_eq!(err.stable_code(), "RENDER_FAILED");
        assert_eq!(err.to_string(), "场景解析失败: unexpected element");
    }

    #[test]
    fn timeout_has_its_own_code() {
        assert_eq!(OgError::Timeout(100).stable_code(), "RENDER_TIMEOUT");
    }
}
