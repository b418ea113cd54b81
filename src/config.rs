use anyhow::Context;
use reqwest::Url;
use std::env;
use std::time::Duration;

use crate::results::Links;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// 后端服务地址（检测 / 评分 / 上链）
    pub backend_url: String,
    /// 区块浏览器的交易页前缀
    pub explorer_tx_url: String,
    /// 对外可访问的本站地址，用于拼分享链接
    pub public_origin: String,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backend_url: "http://127.0.0.1:8000".to_string(),
            explorer_tx_url: "https://sepolia.etherscan.io/tx".to_string(),
            public_origin: "http://localhost:8080".to_string(),
            request_timeout_secs: 120,
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意 key-value 来源读取配置；数字解析失败直接报错，不静默回落默认值
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let port: u16 = match lookup("PORT") {
            Some(v) => v.parse().with_context(|| format!("PORT must be a number, got {:?}", v))?,
            None => defaults.port,
        };
        let request_timeout_secs = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("REQUEST_TIMEOUT_SECS must be a number, got {:?}", v))?,
            None => defaults.request_timeout_secs,
        };
        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(v) => v
                .parse()
                .with_context(|| format!("MAX_UPLOAD_BYTES must be a number, got {:?}", v))?,
            None => defaults.max_upload_bytes,
        };

        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            backend_url: lookup("BACKEND_URL").unwrap_or(defaults.backend_url),
            explorer_tx_url: lookup("EXPLORER_TX_URL").unwrap_or(defaults.explorer_tx_url),
            public_origin: lookup("PUBLIC_ORIGIN").unwrap_or_else(|| format!("http://localhost:{}", port)),
            request_timeout_secs,
            max_upload_bytes,
        };
        // 提前校验，启动时就暴露错误
        config.public_origin_url()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn public_origin_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.public_origin)
            .with_context(|| format!("PUBLIC_ORIGIN is not a valid URL: {}", self.public_origin))
    }

    pub fn links(&self) -> anyhow::Result<Links> {
        Ok(Links::new(&self.explorer_tx_url, self.public_origin_url()?))
    }
}
