//! 场景合成：把标题、品牌标识和背景路径排进固定画布，输出可序列化为 SVG 的场景描述。
//!
//! 这里是纯函数：相同输入永远得到相同的 [`SceneDescription`] 与逐字节相同的 SVG。

use std::fmt::Write;

use super::assets::{FontMetrics, FontResource, VectorAsset};
use super::title::SanitizedTitle;

/// 场景样式。所有布局常量集中在这里，由调用方注入。
#[derive(Debug, Clone, PartialEq)]
pub struct SceneStyle {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub font_size: f32,
    /// 标题左右留白
    pub margin: f32,
    pub text_color: String,
    pub background_color: String,
    /// 品牌标识中心所在高度占画布高度的比例
    pub brand_mark_offset_ratio: f32,
    /// 行高 = 字号 × 该比例
    pub line_height_ratio: f32,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            canvas_width: 1200,
            canvas_height: 630,
            font_size: 60.0,
            margin: 20.0,
            text_color: "#FFFFFF".to_string(),
            background_color: "#000000".to_string(),
            brand_mark_offset_ratio: 0.25,
            line_height_ratio: 1.2,
        }
    }
}

impl SceneStyle {
    /// 标题可用的最大行宽
    pub fn text_max_width(&self) -> f32 {
        (self.canvas_width as f32 - 2.0 * self.margin).max(self.font_size)
    }
}

/// 背景层的 z 序
pub const BACKGROUND_Z: i32 = -10;
/// 品牌标识层的 z 序
pub const BRAND_MARK_Z: i32 = 0;
/// 标题层的 z 序
pub const TITLE_Z: i32 = 1;

/// 一行已定位的标题文本（`x` 为居中锚点，`y` 为基线）
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub font_family: String,
    pub font_size: f32,
    pub color: String,
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// 各行拼接（以空格连接），便于断言渲染内容
    pub fn joined(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// 矢量图，按 `translate(x y) scale(scale)` 放置
    Vector {
        asset: &'static VectorAsset,
        x: f32,
        y: f32,
        scale: f32,
    },
    Text(TextBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub z_index: i32,
    pub kind: LayerKind,
}

/// 固定画布上的分层场景，图层按 z 序从后到前排列
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDescription {
    pub width: u32,
    pub height: u32,
    pub background_color: String,
    pub layers: Vec<Layer>,
}

impl SceneDescription {
    /// 标题图层
    pub fn title(&self) -> Option<&TextBlock> {
        self.layers.iter().find_map(|l| match &l.kind {
            LayerKind::Text(block) => Some(block),
            LayerKind::Vector { .. } => None,
        })
    }

    /// 序列化为 SVG。标题文本与字体名在这里做 XML 转义。
    pub fn to_svg(&self) -> String {
        let (w, h) = (self.width, self.height);
        let mut svg = String::with_capacity(4096);

        // 写入 String 不会失败
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><rect width="{w}" height="{h}" fill="{}"/>"#,
            escape_xml(&self.background_color)
        );

        for layer in &self.layers {
            match &layer.kind {
                LayerKind::Vector { asset, x, y, scale } => {
                    let _ = write!(
                        svg,
                        r#"<g transform="translate({x:.2} {y:.2}) scale({scale:.4})">{}</g>"#,
                        asset.markup.trim()
                    );
                }
                LayerKind::Text(block) => {
                    let family = block.font_family.replace('\'', "");
                    let _ = write!(
                        svg,
                        r#"<text font-family="'{}'" font-size="{:.1}" fill="{}" text-anchor="middle">"#,
                        escape_xml(&family),
                        block.font_size,
                        escape_xml(&block.color)
                    );
                    for line in &block.lines {
                        let _ = write!(
                            svg,
                            r#"<tspan x="{:.2}" y="{:.2}">{}</tspan>"#,
                            line.x,
                            line.y,
                            escape_xml(&line.text)
                        );
                    }
                    svg.push_str("</text>");
                }
            }
        }

        svg.push_str("</svg>");
        svg
    }
}

/// 合成场景。
///
/// 背景路径按画布宽度缩放后垂直居中；品牌标识水平居中，中心位于
/// `brand_mark_offset_ratio` 高度处；标题按字体真实字宽换行，整体居中。
pub fn compose(
    title: &SanitizedTitle,
    font: &FontResource,
    brand_mark: &'static VectorAsset,
    background: &'static VectorAsset,
    style: &SceneStyle,
) -> SceneDescription {
    let canvas_w = style.canvas_width as f32;
    let canvas_h = style.canvas_height as f32;

    let bg_scale = canvas_w / background.width as f32;
    let background_layer = Layer {
        z_index: BACKGROUND_Z,
        kind: LayerKind::Vector {
            asset: background,
            x: 0.0,
            y: (canvas_h - background.height as f32 * bg_scale) / 2.0,
            scale: bg_scale,
        },
    };

    let brand_layer = Layer {
        z_index: BRAND_MARK_Z,
        kind: LayerKind::Vector {
            asset: brand_mark,
            x: (canvas_w - brand_mark.width as f32) / 2.0,
            y: canvas_h * style.brand_mark_offset_ratio - brand_mark.height as f32 / 2.0,
            scale: 1.0,
        },
    };

    let metrics = font.metrics(style.font_size);
    let wrapped = wrap_title(title.as_str(), &metrics, style.text_max_width());
    let line_height = style.font_size * style.line_height_ratio;
    let block_top = (canvas_h - line_height * wrapped.len() as f32) / 2.0;
    // 基线落在行盒中线偏下约 0.35em 处，使字形视觉居中
    let lines = wrapped
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextLine {
            text,
            x: canvas_w / 2.0,
            y: block_top + line_height * (i as f32 + 0.5) + style.font_size * 0.35,
        })
        .collect();

    let title_layer = Layer {
        z_index: TITLE_Z,
        kind: LayerKind::Text(TextBlock {
            font_family: font.family().to_string(),
            font_size: style.font_size,
            color: style.text_color.clone(),
            lines,
        }),
    };

    let mut layers = vec![title_layer, brand_layer, background_layer];
    layers.sort_by_key(|l| l.z_index);

    SceneDescription {
        width: style.canvas_width,
        height: style.canvas_height,
        background_color: style.background_color.clone(),
        layers,
    }
}

/// 按像素宽度换行：优先在空格处断行，单词本身超宽时逐字符断开。
pub(crate) fn wrap_title(text: &str, metrics: &FontMetrics<'_>, max_width: f32) -> Vec<String> {
    let space_w = metrics.advance(' ');
    let mut out = Vec::<String>::new();
    let mut current = String::new();
    let mut current_w = 0.0f32;

    for word in text.split(' ').filter(|w| !w.is_empty()) {
        let word_w = metrics.width(word);
        let needed = if current.is_empty() {
            word_w
        } else {
            current_w + space_w + word_w
        };
        if needed <= max_width {
            if !current.is_empty() {
                current.push(' ');
                current_w += space_w;
            }
            current.push_str(word);
            current_w += word_w;
            continue;
        }

        if !current.is_empty() {
            out.push(std::mem::take(&mut current));
            current_w = 0.0;
        }
        if word_w <= max_width {
            current.push_str(word);
            current_w = word_w;
            continue;
        }

        for ch in word.chars() {
            let ch_w = metrics.advance(ch);
            if current_w + ch_w > max_width && !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_w = 0.0;
            }
            current.push(ch);
            current_w += ch_w;
        }
    }

    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }
    out
}

/// XML 转义；XML 1.0 不允许出现的字符（除制表/换行/回车外的 C0 控制符、
/// U+FFFE、U+FFFF）替换为 U+FFFD，保证任意标题都能被解析。
pub(crate) fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if is_xml_char(c) => out.push(c),
            _ => out.push(char::REPLACEMENT_CHARACTER),
        }
    }
    out
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}
