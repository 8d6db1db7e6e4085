//! 单元测试共用的辅助函数。

use axum::body::Bytes;
use resvg::usvg::fontdb;

/// 找一款可用的系统字体（优先无衬线粗体），返回其原始字节。
///
/// 设置了 `OG_TEST_FONT` 时直接读取该文件。没有任何可用字体时返回 `None`，
/// 依赖字体的测试据此跳过。
pub(crate) fn system_font_bytes() -> Option<Bytes> {
    if let Ok(path) = std::env::var("OG_TEST_FONT") {
        return std::fs::read(path).ok().map(Bytes::from);
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    // 只取集合中的第一款（index 0），FontResource 按 index 0 解析
    let preferred = db.query(&fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        weight: fontdb::Weight::BOLD,
        ..Default::default()
    });
    let id = preferred
        .filter(|id| db.face(*id).is_some_and(|f| f.index == 0))
        .or_else(|| db.faces().find(|f| f.index == 0).map(|f| f.id))?;

    db.with_face_data(id, |data, _| Bytes::copy_from_slice(data))
}
