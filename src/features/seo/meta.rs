//! 页面 `<head>` 中的社交分享标签。

use std::fmt::Write;

use super::og_url::{DeploymentEnvironment, resolve_og_url};
use crate::features::og::scene::escape_xml;

/// 站点标题模板，`%s` 为页面标题
pub const TITLE_TEMPLATE: &str = "%s | Autometrics";

/// 预览图固定尺寸
pub const OG_IMAGE_WIDTH: u32 = 1200;
pub const OG_IMAGE_HEIGHT: u32 = 630;

/// 页面元信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub title: String,
    pub description: Option<String>,
}

impl PageMeta {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 套用站点模板后的完整标题
    pub fn full_title(&self) -> String {
        TITLE_TEMPLATE.replace("%s", &self.title)
    }
}

/// 生成 og/twitter `<meta>` 标签，每行一个，属性值已转义。
pub fn og_head_tags(page: &PageMeta, env: &DeploymentEnvironment) -> String {
    let image = resolve_og_url(&page.title, env);
    let mut out = String::new();
    let mut tag = |attr: &str, key: &str, value: &str| {
        let _ = writeln!(
            out,
            r#"<meta {attr}="{key}" content="{}" />"#,
            escape_xml(value)
        );
    };

    tag("property", "og:title", &page.full_title());
    if let Some(desc) = page.description.as_deref().filter(|d| !d.is_empty()) {
        tag("property", "og:description", desc);
    }
    tag("property", "og:image", &image);
    tag("property", "og:image:width", &OG_IMAGE_WIDTH.to_string());
    tag("property", "og:image:height", &OG_IMAGE_HEIGHT.to_string());
    tag("name", "twitter:card", "summary_large_image");
    tag("name", "twitter:image", &image);
    out
}
