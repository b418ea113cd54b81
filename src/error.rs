//! 错误类型
//!
//! 后端调用失败统一落到 [`ClientError`]；页面层再按动作把它降级成一句用户可读的提示。

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::media::UnsupportedMediaType;

#[derive(Error, Debug)]
pub enum ClientError {
    /// 网络层失败（连接被拒、超时、TLS ...）
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// 后端返回了非 2xx 状态码
    #[error("Request failed with status code {}", status.as_u16())]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// 客户端白名单拦截，请求从未发出
    #[error(transparent)]
    UnsupportedMedia(#[from] UnsupportedMediaType),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// 后端结构化错误里的 `detail` 字段（如果有）
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// 降级成页面提示：优先使用后端 detail，否则用调用方给的兜底文案。
    pub fn user_message(&self, fallback: &str) -> String {
        match self.detail() {
            Some(detail) => detail.to_string(),
            None => fallback.to_string(),
        }
    }

    /// 由非 2xx 响应构造错误，尽量读出 body 里的 detail。
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let detail = match response.bytes().await {
            Ok(body) => serde_json::from_slice::<Value>(&body)
                .ok()
                .as_ref()
                .and_then(extract_detail),
            Err(_) => None,
        };
        ClientError::Status { status, detail }
    }
}

/// 从后端错误 body 中提取 `detail`。
///
/// 兼容两种形态：`{"detail": "Evidence not found"}`，以及表单校验失败时的
/// `{"detail": [{"loc": [...], "msg": "...", ...}, ...]}`（多条 msg 用 `; ` 拼接）。
pub fn extract_detail(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    }
}
