use std::fmt;

/// 未携带 `title` 参数（或为空）时使用的标题
pub const FALLBACK_TITLE: &str = "Autometrics Docs";

/// 标题最大长度，按 Unicode 标量值（`char`）计数
pub const MAX_TITLE_CHARS: usize = 100;

/// 经过清洗的标题：非空，且不超过 [`MAX_TITLE_CHARS`] 个字符。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SanitizedTitle(String);

impl SanitizedTitle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SanitizedTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SanitizedTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 清洗原始标题。
///
/// - 缺失或空字符串：回退为 [`FALLBACK_TITLE`]
/// - 否则取前 [`MAX_TITLE_CHARS`] 个 `char`，不做其它变换（转义由场景合成负责）
///
/// 截断单位是 `char` 而不是字节，因此永远不会切开一个 UTF-8 序列。
pub fn sanitize(raw: Option<&str>) -> SanitizedTitle {
    match raw {
        None | Some("") => SanitizedTitle(FALLBACK_TITLE.to_string()),
        Some(s) => match s.char_indices().nth(MAX_TITLE_CHARS) {
            Some((cut, _)) => SanitizedTitle(s[..cut].to_string()),
            None => SanitizedTitle(s.to_string()),
        },
    }
}

/// 从已解码的 query 键值对中取第一个 `title`。
pub fn title_from_query(pairs: &[(String, String)]) -> Option<&str> {
    pairs
        .iter()
        .find(|(k, _)| k == "title")
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_title_falls_back() {
        assert_eq!(sanitize(None).as_str(), FALLBACK_TITLE);
    }

    #[test]
    fn empty_title_falls_back() {
        assert_eq!(sanitize(Some("")).as_str(), FALLBACK_TITLE);
    }

    #[test]
    fn short_titles_pass_through_unchanged() {
        for t in ["Hello World", "  padded  ", "<b>&amp;</b>", "a"] {
            assert_eq!(sanitize(Some(t)).as_str(), t);
        }
        let exactly = "x".repeat(MAX_TITLE_CHARS);
        assert_eq!(sanitize(Some(&exactly)).as_str(), exactly);
    }

    #[test]
    fn long_titles_keep_first_hundred_chars() {
        let raw: String = (0..500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let out = sanitize(Some(&raw));
        assert_eq!(out.as_str().chars().count(), MAX_TITLE_CHARS);
        assert_eq!(out.as_str(), &raw[..MAX_TITLE_CHARS]);
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        // 每个字符 3 字节（UTF-8），101 个字符
        let raw = "监".repeat(MAX_TITLE_CHARS + 1);
        let out = sanitize(Some(&raw));
        assert_eq!(out.as_str().chars().count(), MAX_TITLE_CHARS);
        assert_eq!(out.as_str().len(), MAX_TITLE_CHARS * 3);

        // 组合字符按标量值计数：e + U+0301 算 2 个
        let accented = "e\u{301}".repeat(60);
        let out = sanitize(Some(&accented));
        assert_eq!(out.as_str().chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn first_title_pair_wins() {
        let pairs = vec![
            ("theme".to_string(), "dark".to_string()),
            ("title".to_string(), "First".to_string()),
            ("title".to_string(), "Second".to_string()),
        ];
        assert_eq!(title_from_query(&pairs), Some("First"));
        assert_eq!(title_from_query(&[]), None);
    }
}
