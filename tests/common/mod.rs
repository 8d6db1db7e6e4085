#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use og_preview::AppConfig;
use og_preview::AppState;
use og_preview::features::og::{AssetProvider, FontSource};

// 与单元测试共用同一份系统字体查找逻辑
#[path = "../../src/test_support.rs"]
mod test_support;
pub(crate) use test_support::system_font_bytes;

pub fn state_with(source: FontSource) -> AppState {
    let assets = Arc::new(AssetProvider::new(source, Duration::from_secs(2)));
    AppState::new(&AppConfig::default(), assets)
}

pub fn missing_font_state() -> AppState {
    state_with(FontSource::File("./definitely-missing/Inter-Bold.ttf".into()))
}
