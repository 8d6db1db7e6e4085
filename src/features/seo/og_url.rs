//! 预览图绝对地址解析。

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::DeploymentConfig;

/// 与 `encodeURIComponent` 一致：除 `A-Z a-z 0-9 - _ . ! ~ * ' ( )` 外全部编码
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// 非生产环境使用的本地地址
pub const LOCAL_ORIGIN: &str = "http://localhost:3000";

/// 预览图接口路径
pub const OG_PATH: &str = "/api/og";

/// 部署环境
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentEnvironment {
    pub is_production: bool,
    /// 生产域名（不含协议）
    pub host: Option<String>,
}

impl DeploymentEnvironment {
    pub fn new(is_production: bool, host: Option<String>) -> Self {
        Self {
            is_production,
            host,
        }
    }

    /// 从 `VERCEL_ENV` / `VERCEL_URL` 读取
    pub fn from_env() -> Self {
        let is_production = std::env::var("VERCEL_ENV").is_ok_and(|v| v == "production");
        let host = std::env::var("VERCEL_URL").ok().filter(|h| !h.is_empty());
        Self::new(is_production, host)
    }

    pub fn from_config(cfg: &DeploymentConfig) -> Self {
        Self::new(cfg.is_production, cfg.host.clone())
    }

    /// 生产且域名非空时返回去掉末尾 `/` 的域名
    fn production_host(&self) -> Option<&str> {
        if !self.is_production {
            return None;
        }
        self.host
            .as_deref()
            .map(|h| h.trim_end_matches('/'))
            .filter(|h| !h.is_empty())
    }
}

/// 按 `encodeURIComponent` 规则编码
pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// 计算页面标题对应的预览图绝对地址。标题原样编码，不做截断。
pub fn resolve_og_url(title: &str, env: &DeploymentEnvironment) -> String {
    let origin = match env.production_host() {
        Some(host) => format!("https://{host}"),
        None => LOCAL_ORIGIN.to_string(),
    };
    format!("{origin}{OG_PATH}?title={}", encode_uri_component(title))
}
