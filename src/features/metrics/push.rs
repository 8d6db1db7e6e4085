//! Pushgateway 推送。

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;

/// 路径段中保留不编码的字符
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// 文本格式的 Content-Type
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Error, Debug)]
pub enum PushError {
    #[error("推送请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Pushgateway 返回 {0}")]
    Status(u16),
}

/// 一个 Pushgateway 分组（job + instance）的推送目标
#[derive(Debug, Clone)]
pub struct PushGateway {
    url: String,
    timeout: Duration,
}

impl PushGateway {
    pub fn new(base: &str, job: &str, instance: &str, timeout: Duration) -> Self {
        let url = format!(
            "{}/metrics/job/{}/instance/{}",
            base.trim_end_matches('/'),
            utf8_percent_encode(job, PATH_SEGMENT),
            utf8_percent_encode(instance, PATH_SEGMENT)
        );
        Self { url, timeout }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 以 PUT 覆盖整个分组
    pub async fn push(&self, body: String) -> Result<(), PushError> {
        let client = crate::http::push_client(self.timeout)?;
        let resp = client
            .put(&self.url)
            .header(reqwest::header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PushError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// 当前主机名，作为 `instance` 分组标签
pub fn hostname() -> String {
    gethostname::gethostname().to_string_lossy().to_string()
}
