//! 预览图所需的静态资源：字体（运行期加载一次）与两张内嵌矢量图。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use resvg::usvg::fontdb;
use tokio::sync::OnceCell;
use unicode_width::UnicodeWidthChar;

use crate::config::AppConfig;
use crate::error::AssetLoadError;

/// 内嵌的矢量图片段（`<g>` 包裹，内部 id 已加前缀，可直接拼进场景 SVG）
#[derive(Debug, PartialEq, Eq)]
pub struct VectorAsset {
    pub name: &'static str,
    /// 固有宽度（用户单位）
    pub width: u32,
    /// 固有高度（用户单位）
    pub height: u32,
    pub markup: &'static str,
}

/// 品牌标识
pub static BRAND_MARK: VectorAsset = VectorAsset {
    name: "brand-mark",
    width: 120,
    height: 120,
    markup: include_str!("assets/brand-mark.svg"),
};

/// 背景点状路径
pub static DOTTED_PATH: VectorAsset = VectorAsset {
    name: "dotted-path",
    width: 1200,
    height: 624,
    markup: include_str!("assets/dotted-path.svg"),
};

/// 字体资源：原始字节 + 只含这一款字体的字体库。创建后只读。
pub struct FontResource {
    data: Arc<Vec<u8>>,
    family: String,
    units_per_em: u16,
    db: Arc<fontdb::Database>,
}

impl std::fmt::Debug for FontResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontResource")
            .field("family", &self.family)
            .field("units_per_em", &self.units_per_em)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl FontResource {
    /// 解析字体字节。不是合法的 TrueType/OpenType 数据时返回 `InvalidFont`。
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, AssetLoadError> {
        let units_per_em = {
            let face = ttf_parser::Face::parse(&data, 0)
                .map_err(|e| AssetLoadError::InvalidFont(e.to_string()))?;
            face.units_per_em()
        };
        if units_per_em == 0 {
            return Err(AssetLoadError::InvalidFont("units_per_em 为 0".into()));
        }

        let mut db = fontdb::Database::new();
        db.load_font_data(data.clone());
        // usvg 按 fontdb 识别出的家族名匹配 font-family，这里必须用同一个名字
        let family = db
            .faces()
            .next()
            .and_then(|face| face.families.first())
            .map(|(name, _)| name.clone())
            .ok_or_else(|| AssetLoadError::InvalidFont("字体库中没有可用字形".into()))?;

        Ok(Self {
            data: Arc::new(data),
            family,
            units_per_em,
            db: Arc::new(db),
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 渲染使用的字体库（共享，不可变）
    pub fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    /// 以给定字号测量文本的水平宽度
    pub fn metrics(&self, font_size: f32) -> FontMetrics<'_> {
        FontMetrics {
            face: ttf_parser::Face::parse(&self.data, 0).ok(),
            scale: font_size / f32::from(self.units_per_em),
            font_size,
        }
    }
}

/// 单次排版使用的字宽测量器
pub struct FontMetrics<'a> {
    face: Option<ttf_parser::Face<'a>>,
    scale: f32,
    font_size: f32,
}

impl FontMetrics<'_> {
    pub fn advance(&self, ch: char) -> f32 {
        self.face
            .as_ref()
            .and_then(|face| face.glyph_index(ch))
            .and_then(|gid| self.face.as_ref()?.glyph_hor_advance(gid))
            .map(|adv| f32::from(adv) * self.scale)
            // 缺字按显示宽度估算：半角半个字号，全角一个字号
            .unwrap_or_else(|| {
                UnicodeWidthChar::width(ch).unwrap_or(0) as f32 * self.font_size * 0.5
            })
    }

    pub fn width(&self, text: &str) -> f32 {
        text.chars().map(|ch| self.advance(ch)).sum()
    }
}

/// 字体来源
#[derive(Debug, Clone)]
pub enum FontSource {
    /// 本地文件（相对路径按工作目录解析）
    File(PathBuf),
    /// 远程地址
    Url(String),
    /// 已在内存中的字节
    Memory(Bytes),
}

/// 资源提供者：字体懒加载并在进程内缓存，矢量图为编译期常量。
///
/// 加载失败不会被缓存，下一次请求会重新尝试。
pub struct AssetProvider {
    source: FontSource,
    fetch_timeout: Duration,
    font: OnceCell<Arc<FontResource>>,
    brand_mark: &'static VectorAsset,
    background: &'static VectorAsset,
}

impl AssetProvider {
    pub fn new(source: FontSource, fetch_timeout: Duration) -> Self {
        Self {
            source,
            fetch_timeout,
            font: OnceCell::new(),
            brand_mark: &BRAND_MARK,
            background: &DOTTED_PATH,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let source = match config.resources.font_url.as_deref() {
            Some(url) if !url.trim().is_empty() => FontSource::Url(url.trim().to_string()),
            _ => FontSource::File(config.font_path()),
        };
        Self::new(source, config.font_fetch_timeout())
    }

    pub fn source(&self) -> &FontSource {
        &self.source
    }

    /// 获取字体；首次调用时加载
    pub async fn font(&self) -> Result<Arc<FontResource>, AssetLoadError> {
        self.font
            .get_or_try_init(|| async { self.load_font().await.map(Arc::new) })
            .await
            .cloned()
    }

    pub fn is_font_loaded(&self) -> bool {
        self.font.initialized()
    }

    pub fn brand_mark(&self) -> &'static VectorAsset {
        self.brand_mark
    }

    pub fn background(&self) -> &'static VectorAsset {
        self.background
    }

    async fn load_font(&self) -> Result<FontResource, AssetLoadError> {
        let t0 = std::time::Instant::now();
        let bytes = match &self.source {
            FontSource::Memory(bytes) => bytes.to_vec(),
            FontSource::File(path) => {
                let read = tokio::fs::read(path);
                tokio::time::timeout(self.fetch_timeout, read)
                    .await
                    .map_err(|_| AssetLoadError::Timeout(path.display().to_string()))?
                    .map_err(|source| AssetLoadError::Io {
                        path: path.display().to_string(),
                        source,
                    })?
            }
            FontSource::Url(url) => {
                tokio::time::timeout(self.fetch_timeout, fetch_font(url, self.fetch_timeout))
                    .await
                    .map_err(|_| AssetLoadError::Timeout(url.clone()))??
            }
        };

        let font = FontResource::from_bytes(bytes)?;
        tracing::info!(
            family = font.family(),
            bytes = font.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "字体加载完成"
        );
        Ok(font)
    }
}

async fn fetch_font(url: &str, timeout: Duration) -> Result<Vec<u8>, AssetLoadError> {
    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            AssetLoadError::Timeout(url.to_string())
        } else {
            AssetLoadError::Http(e.to_string())
        }
    };
    let client = crate::http::font_client(timeout).map_err(map_err)?;
    let resp = client.get(url).send().await.map_err(map_err)?;
    if !resp.status().is_success() {
        return Err(AssetLoadError::Http(format!("{url} 返回 {}", resp.status())));
    }
    let bytes = resp.bytes().await.map_err(map_err)?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_assets_are_well_formed_fragments() {
        for asset in [&BRAND_MARK, &DOTTED_PATH] {
            let markup = asset.markup.trim();
            assert!(markup.starts_with("<g id=\"og-"), "{}", asset.name);
            assert!(markup.ends_with("</g>"), "{}", asset.name);
            assert!(asset.width > 0 && asset.height > 0);
        }
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = FontResource::from_bytes(b"definitely not a font".to_vec()).unwrap_err();
        assert!(matches!(err, AssetLoadError::InvalidFont(_)));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error_and_not_cached() {
        let provider = AssetProvider::new(
            FontSource::File(PathBuf::from("./does-not-exist/Inter-Bold.ttf")),
            Duration::from_secs(1),
        );
        let err = provider.font().await.unwrap_err();
        assert!(matches!(err, AssetLoadError::Io { .. }));
        assert!(!provider.is_font_loaded());
        // 再次请求仍会重新尝试
        assert!(provider.font().await.is_err());
    }

    #[tokio::test]
    async fn corrupt_memory_font_fails_to_load() {
        let provider = AssetProvider::new(
            FontSource::Memory(Bytes::from_static(b"\x00\x01\x00\x00garbage")),
            Duration::from_secs(1),
        );
        assert!(matches!(
            provider.font().await,
            Err(AssetLoadError::InvalidFont(_))
        ));
    }

    #[test]
    fn from_config_prefers_url_when_set() {
        let mut cfg = AppConfig::default();
        assert!(matches!(
            AssetProvider::from_config(&cfg).source(),
            FontSource::File(_)
        ));
        cfg.resources.font_url = Some("https://cdn.example.com/Inter-Bold.ttf".into());
        assert!(matches!(
            AssetProvider::from_config(&cfg).source(),
            FontSource::Url(u) if u == "https://cdn.example.com/Inter-Bold.ttf"
        ));
    }

    #[tokio::test]
    async fn system_font_loads_and_measures() {
        let Some(bytes) = crate::test_support::system_font_bytes() else {
            eprintln!("skip: no system font available");
            return;
        };
        let provider = AssetProvider::new(FontSource::Memory(bytes), Duration::from_secs(1));
        let font = provider.font().await.expect("load font");
        assert!(provider.is_font_loaded());
        assert!(!font.family().is_empty());
        assert_eq!(font.database().len(), 1);

        let m = font.metrics(60.0);
        let one = m.width("W");
        assert!(one > 0.0);
        assert!((m.width("WW") - 2.0 * one).abs() < 0.01);
    }
}
