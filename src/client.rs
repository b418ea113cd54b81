//! 后端客户端
//!
//! 检测、责任评分、上链都在外部服务里完成，这里只负责四个 HTTP 接口的收发：
//! `POST /api/upload`、`GET /api/evidence/:id`、`POST /api/verify`、`GET /api/report/:id/pdf`。
//! 不做重试、不做去重，失败即本次动作终止。

use reqwest::multipart::{Form, Part};
use reqwest::{header, Response, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::evidence::EvidenceRecord;
use crate::fingerprint;
use crate::media::SelectedFile;
use crate::upload::{extract_evidence_id, UploadRequest};
use crate::verification::{VerificationOutcome, VerificationPayload};

/// 按文件校验的结果：三态结论 + 两端的哈希
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub outcome: VerificationOutcome,
    pub local_hash: String,
    pub backend_hash: Option<String>,
    pub case_id: Option<String>,
}

impl VerificationReport {
    /// 后端没有回显哈希时为 None
    pub fn hashes_agree(&self) -> Option<bool> {
        self.backend_hash
            .as_deref()
            .map(|remote| fingerprint::matches(&self.local_hash, remote))
    }
}

/// 后端透传的 PDF 报告
#[derive(Debug, Clone)]
pub struct ReportFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub content_disposition: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let base = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("trustchain-web/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { base, client })
    }

    /// 在 base 之后逐段追加路径，每段都会被正确转义
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn report_url(&self, id: &str) -> ClientResult<Url> {
        self.endpoint(&["api", "report", id, "pdf"])
    }

    /// 提交证据，返回后端分配的标识
    pub async fn upload(&self, request: &UploadRequest) -> ClientResult<String> {
        // 白名单之外的文件永远不发出去
        request.file.ensure_accepted()?;

        let url = self.endpoint(&["api", "upload"])?;
        let mut form = Form::new().part("file", file_part(&request.file)?);
        for (name, value) in &request.fields {
            form = form.text(*name, value.clone());
        }

        info!(
            "📤 提交证据: 文件={} ({:?}, {}), 字段数={}",
            request.file.file_name,
            request.file.kind(),
            request.file.display_size(),
            request.fields.len()
        );

        let response = self.client.post(url).multipart(form).send().await?;
        let body = success_body(response).await?;
        let id = extract_evidence_id(&body)?;

        info!("✅ 证据已受理: id={}", id);
        Ok(id)
    }

    /// 原始 JSON 形态的证据记录（按 ID 校验时用）
    pub async fn fetch_evidence_json(&self, id: &str) -> ClientResult<Value> {
        let url = self.endpoint(&["api", "evidence", id])?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        success_body(response).await
    }

    pub async fn fetch_evidence(&self, id: &str) -> ClientResult<EvidenceRecord> {
        let body = self.fetch_evidence_json(id).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// 按 ID 校验；404 是合法的“未找到”，不是错误
    pub async fn lookup(&self, id: &str) -> ClientResult<VerificationOutcome> {
        match self.fetch_evidence_json(id).await {
            Ok(body) => Ok(VerificationPayload::decode(&body).resolve()),
            Err(e) if e.is_not_found() => Ok(VerificationOutcome::NotFound),
            Err(e) => {
                warn!("🔍 按 ID 校验失败: id={}, err={}", id, e);
                Err(e)
            }
        }
    }

    /// 按文件校验；不过白名单
    pub async fn verify_file(&self, file: &SelectedFile) -> ClientResult<VerificationReport> {
        let local_hash = file.sha256();
        info!("🔍 按文件校验: 文件={}, 本地 SHA256={}", file.file_name, local_hash);

        let url = self.endpoint(&["api", "verify"])?;
        let form = Form::new().part("file", file_part(file)?);
        let response = self.client.post(url).multipart(form).send().await?;

        let payload = match success_body(response).await {
            Ok(body) => VerificationPayload::decode(&body),
            Err(e) if e.is_not_found() => {
                return Ok(VerificationReport {
                    outcome: VerificationOutcome::NotFound,
                    local_hash,
                    backend_hash: None,
                    case_id: None,
                })
            }
            Err(e) => return Err(e),
        };

        Ok(VerificationReport {
            outcome: payload.resolve(),
            backend_hash: payload.file_hash(),
            case_id: payload.case_id(),
            local_hash,
        })
    }

    /// 下载 PDF 报告，字节原样透传，不解析
    pub async fn fetch_report(&self, id: &str) -> ClientResult<ReportFile> {
        let url = self.report_url(id)?;
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        let header_str = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header_str(header::CONTENT_TYPE).unwrap_or_else(|| "application/pdf".to_string());
        let content_disposition = header_str(header::CONTENT_DISPOSITION);
        let bytes = response.bytes().await?.to_vec();
        Ok(ReportFile {
            bytes,
            content_type,
            content_disposition,
        })
    }
}

fn file_part(file: &SelectedFile) -> ClientResult<Part> {
    let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
    let mime = if file.mime.is_empty() {
        "application/octet-stream"
    } else {
        file.mime.as_str()
    };
    Ok(part.mime_str(mime)?)
}

/// 2xx 时返回 body；body 不是 JSON 就当作裸字符串
async fn success_body(response: Response) -> ClientResult<Value> {
    if !response.status().is_success() {
        return Err(ClientError::from_response(response).await);
    }
    let bytes = response.bytes().await?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::String(String::from_utf8_lossy(&bytes).trim().to_string())),
    }
}
