//! 上传流程 (Upload Form Controller)
//!
//! 状态机：`Idle → FileSelected → Submitting → (Navigated | Failed)`。
//! 文件选择先过 MIME 白名单；提交时按条件拼装上下文字段；
//! 后端返回的标识可能是 `id`、`event_id` 或一个裸值。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::media::{SelectedFile, UnsupportedMediaType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    YouTube,
    Instagram,
    WhatsApp,
    X,
    Telegram,
    Other,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::YouTube,
        Platform::Instagram,
        Platform::WhatsApp,
        Platform::X,
        Platform::Telegram,
        Platform::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::Instagram => "Instagram",
            Platform::WhatsApp => "WhatsApp",
            Platform::X => "X",
            Platform::Telegram => "Telegram",
            Platform::Other => "Other",
        }
    }

    /// 不认识的平台名一律归到 Other
    pub fn parse(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(Platform::Other)
    }
}

/// 内容的传播背景，决定后端怎么分摊责任
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextForm {
    pub disclosure_stripped: bool,
    pub content_distributed: bool,
    pub victim_impersonated: bool,
    pub repeat_offender: bool,
    pub platform: Platform,
    pub takedown_requested: bool,
    pub response_hours: String,
    pub content_removed: bool,
    pub estimated_reach: String,
    pub model_name: String,
}

fn checkbox(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "on" | "true" | "1" | "yes")
}

impl ContextForm {
    /// 从浏览器表单字段回填；未知字段忽略
    pub fn set_field(&mut self, name: &str, value: &str) {
        match name {
            "disclosure_stripped" => self.disclosure_stripped = checkbox(value),
            "content_distributed" => self.content_distributed = checkbox(value),
            "victim_impersonated" => self.victim_impersonated = checkbox(value),
            "repeat_offender" => self.repeat_offender = checkbox(value),
            "platform_name" => self.platform = Platform::parse(value),
            "takedown_requested" => self.takedown_requested = checkbox(value),
            "response_hours" => self.response_hours = value.trim().to_string(),
            "content_removed" => self.content_removed = checkbox(value),
            "estimated_reach" => self.estimated_reach = value.trim().to_string(),
            "model_name" => self.model_name = value.trim().to_string(),
            _ => {}
        }
    }

    /// 发给 `/api/upload` 的文本字段（`file` 之外），全部是字符串
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("disclosure_stripped", self.disclosure_stripped.to_string()),
            ("content_distributed", self.content_distributed.to_string()),
            ("victim_impersonated", self.victim_impersonated.to_string()),
            ("platform_name", self.platform.as_str().to_string()),
            ("takedown_requested", self.takedown_requested.to_string()),
        ];
        // 只有发起过下架请求，响应时长才有意义
        if self.takedown_requested && !self.response_hours.is_empty() {
            fields.push(("response_hours", self.response_hours.clone()));
        }
        fields.push(("content_removed", self.content_removed.to_string()));
        if !self.estimated_reach.is_empty() {
            fields.push(("estimated_reach", self.estimated_reach.clone()));
        }
        if !self.model_name.is_empty() {
            fields.push(("model_name", self.model_name.clone()));
        }
        if self.repeat_offender {
            fields.push(("repeat_offender", "true".to_string()));
        }
        fields
    }
}

/// 一次提交：文件 + 上下文字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: SelectedFile,
    pub fields: Vec<(&'static str, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    FileSelected,
    Submitting,
    /// 拿到标识，跳转到结果页
    Navigated(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct UploadFlow {
    state: UploadState,
    file: Option<SelectedFile>,
    form: ContextForm,
    selection_error: Option<String>,
}

impl Default for UploadFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadFlow {
    pub fn new() -> Self {
        Self {
            state: UploadState::Idle,
            file: None,
            form: ContextForm::default(),
            selection_error: None,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn form(&self) -> &ContextForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ContextForm {
        &mut self.form
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    /// 选择文件。被白名单拒绝时状态不变，只记下内联提示。
    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), UnsupportedMediaType> {
        if self.state == UploadState::Submitting {
            return Ok(());
        }
        if let Err(rejection) = file.ensure_accepted() {
            self.selection_error = Some(rejection.to_string());
            return Err(rejection);
        }
        self.selection_error = None;
        self.file = Some(file);
        self.state = UploadState::FileSelected;
        Ok(())
    }

    /// 进入 Submitting 并给出请求体；没有文件或已在提交中时返回 None
    pub fn begin_submit(&mut self) -> Option<UploadRequest> {
        if self.state == UploadState::Submitting {
            return None;
        }
        let file = self.file.clone()?;
        self.state = UploadState::Submitting;
        Some(UploadRequest {
            file,
            fields: self.form.fields(),
        })
    }

    /// 提交结束。失败时保留已选文件，用户可以直接重试。
    pub fn finish(&mut self, result: ClientResult<String>) -> &UploadState {
        self.state = match result {
            Ok(id) => UploadState::Navigated(id),
            Err(e) => {
                let fallback = e.to_string();
                UploadState::Failed(e.user_message(&fallback))
            }
        };
        &self.state
    }

    /// 当前要展示给用户的错误（白名单拒绝或提交失败）
    pub fn message(&self) -> Option<&str> {
        if let Some(msg) = &self.selection_error {
            return Some(msg.as_str());
        }
        match &self.state {
            UploadState::Failed(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

/// 从上传响应里取证据标识：`id`，其次 `event_id`，再其次整个 body 本身
pub fn extract_evidence_id(body: &Value) -> ClientResult<String> {
    let candidate = [body.get("id"), body.get("event_id")]
        .into_iter()
        .flatten()
        .find(|v| !v.is_null())
        .unwrap_or(body);

    match candidate {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ClientError::Decode(
            "upload response carried no evidence identifier".to_string(),
        )),
    }
}
