//! 场景栅格化：SVG 解析（usvg）→ 像素绘制（resvg / tiny-skia）→ PNG 编码（png）。

use std::sync::Arc;

use axum::body::Bytes;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, Options as UsvgOptions};
use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;

use super::assets::FontResource;
use super::scene::SceneDescription;
use crate::error::{OgError, RenderError};

/// 输出格式
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// 渲染选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// 优先速度（OptimizeSpeed）而非画质
    pub optimize_speed: bool,
}

/// 渲染结果
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
}

/// 同步渲染，只使用场景里的字体，不读取任何系统字体。
///
/// 相同的场景、字体与选项总是产出逐字节相同的 PNG。
pub fn render(
    scene: &SceneDescription,
    font: &FontResource,
    opts: RenderOptions,
) -> Result<RenderedImage, RenderError> {
    let t0 = std::time::Instant::now();

    let fontdb = font.database();
    if fontdb.is_empty() {
        return Err(RenderError::Font("字体库为空".to_string()));
    }
    if scene.width == 0 || scene.height == 0 {
        return Err(RenderError::Size(format!(
            "{}x{}",
            scene.width, scene.height
        )));
    }

    let speed = opts.optimize_speed;
    let usvg_opts = UsvgOptions {
        fontdb,
        font_family: font.family().to_string(),
        shape_rendering: if speed {
            usvg::ShapeRendering::OptimizeSpeed
        } else {
            usvg::ShapeRendering::GeometricPrecision
        },
        text_rendering: if speed {
            usvg::TextRendering::OptimizeSpeed
        } else {
            usvg::TextRendering::OptimizeLegibility
        },
        ..Default::default()
    };

    let svg = scene.to_svg();
    let tree = usvg::Tree::from_data(svg.as_bytes(), &usvg_opts)
        .map_err(|e| RenderError::Parse(e.to_string()))?;
    let t_parse = t0.elapsed();

    let size = tree.size().to_int_size();
    if (size.width(), size.height()) != (scene.width, scene.height) {
        return Err(RenderError::Size(format!(
            "期望 {}x{}，实际 {}x{}",
            scene.width,
            scene.height,
            size.width(),
            size.height()
        )));
    }
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| RenderError::Size("无法创建像素缓冲区".to_string()))?;

    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());
    let t_raster = t0.elapsed();

    let bytes = encode_png(&pixmap, speed)?;
    let t_encode = t0.elapsed();

    tracing::debug!(
        "PNG渲染内部分段: 解析={:?}, 栅格化={:?}, 编码={:?}, 总计={:?}",
        t_parse,
        t_raster - t_parse,
        t_encode - t_raster,
        t_encode
    );

    Ok(RenderedImage {
        bytes: Bytes::from(bytes),
        width: size.width(),
        height: size.height(),
        content_type: PNG_CONTENT_TYPE,
    })
}

fn encode_png(pixmap: &Pixmap, speed: bool) -> Result<Vec<u8>, RenderError> {
    let (w, h) = (pixmap.width(), pixmap.height());
    let mut out = Vec::with_capacity((w * h) as usize);
    {
        let mut encoder = png::Encoder::new(&mut out, w, h);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if speed {
            encoder.set_compression(png::Compression::Fast);
            encoder.set_filter(png::FilterType::NoFilter);
        } else {
            encoder.set_compression(png::Compression::Default);
            encoder.set_filter(png::FilterType::Paeth);
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| RenderError::Encode(format!("write_header: {e}")))?;
        writer
            .write_image_data(pixmap.data())
            .map_err(|e| RenderError::Encode(format!("write_image_data: {e}")))?;
        writer
            .finish()
            .map_err(|e| RenderError::Encode(format!("finish: {e}")))?;
    }
    Ok(out)
}

/// 在阻塞线程池中渲染；并发数受信号量限制。
///
/// 许可随阻塞任务一起移动，调用方超时放弃等待后，许可仍占用到栅格化真正结束。
pub async fn render_async(
    scene: SceneDescription,
    font: Arc<FontResource>,
    opts: RenderOptions,
    permits: Arc<Semaphore>,
) -> Result<RenderedImage, OgError> {
    let permit = permits
        .acquire_owned()
        .await
        .map_err(|e| OgError::Internal(format!("渲染信号量已关闭: {e}")))?;

    let handle = spawn_blocking(move || {
        let _permit = permit;
        render(&scene, &font, opts)
    });
    let image = handle
        .await
        .map_err(|e| OgError::Internal(format!("阻塞渲染任务执行失败: {e}")))??;
    Ok(image)
}
