use once_cell::sync::OnceCell;
use reqwest::Client;
use std::time::Duration;

/// 全局复用的 HTTP Client（统一连接池/Keep-Alive），避免每次请求重复创建。
///
/// 按用途拆分：字体拉取与 Pushgateway 推送各自有独立的超时。
static FONT_CLIENT: OnceCell<Client> = OnceCell::new();
static PUSH_CLIENT: OnceCell<Client> = OnceCell::new();

/// 拉取远程字体使用的 Client。超时只在首次创建时生效。
pub fn font_client(timeout: Duration) -> Result<&'static Client, reqwest::Error> {
    FONT_CLIENT.get_or_try_init(|| Client::builder().timeout(timeout).build())
}

/// 推送指标使用的 Client。超时只在首次创建时生效。
pub fn push_client(timeout: Duration) -> Result<&'static Client, reqwest::Error> {
    PUSH_CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
    })
}
