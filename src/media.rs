//! 媒体文件选择与白名单
//!
//! 上传前在本地按 MIME 类型做一次闸门：不在白名单里的文件直接给出提示，
//! 不会触发任何后端请求。

use serde::Serialize;
use thiserror::Error;

use crate::fingerprint;

pub const UNSUPPORTED_MESSAGE: &str = "Unsupported file type. Please upload a video (mp4, avi, mov, mkv) or audio (mp3, wav, flac, m4a, ogg) file.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedType {
    pub mime: &'static str,
    pub extension: &'static str,
    pub kind: MediaKind,
}

pub const ACCEPTED_TYPES: &[AcceptedType] = &[
    AcceptedType { mime: "video/mp4", extension: "mp4", kind: MediaKind::Video },
    AcceptedType { mime: "video/x-msvideo", extension: "avi", kind: MediaKind::Video },
    AcceptedType { mime: "video/quicktime", extension: "mov", kind: MediaKind::Video },
    AcceptedType { mime: "video/x-matroska", extension: "mkv", kind: MediaKind::Video },
    AcceptedType { mime: "audio/mpeg", extension: "mp3", kind: MediaKind::Audio },
    AcceptedType { mime: "audio/wav", extension: "wav", kind: MediaKind::Audio },
    AcceptedType { mime: "audio/flac", extension: "flac", kind: MediaKind::Audio },
    AcceptedType { mime: "audio/x-m4a", extension: "m4a", kind: MediaKind::Audio },
    AcceptedType { mime: "audio/ogg", extension: "ogg", kind: MediaKind::Audio },
];

/// 白名单拒绝；Display 即页面上的内联提示
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported file type. Please upload a video (mp4, avi, mov, mkv) or audio (mp3, wav, flac, m4a, ogg) file.")]
pub struct UnsupportedMediaType {
    pub mime: String,
}

/// 取 MIME 本体：去掉 `; codecs=...` 之类的参数并转小写
fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

pub fn lookup(mime: &str) -> Option<&'static AcceptedType> {
    let essence = essence(mime);
    ACCEPTED_TYPES.iter().find(|t| t.mime == essence)
}

pub fn is_accepted(mime: &str) -> bool {
    lookup(mime).is_some()
}

/// 用户选中的文件（整个读入内存）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// 不做白名单检查；校验流程（Verify）用这个
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// 上传流程的入口：白名单之外的类型直接拒绝
    pub fn accept(
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, UnsupportedMediaType> {
        let file = Self::new(file_name, mime, bytes);
        file.ensure_accepted()?;
        Ok(file)
    }

    pub fn ensure_accepted(&self) -> Result<(), UnsupportedMediaType> {
        if is_accepted(&self.mime) {
            Ok(())
        } else {
            Err(UnsupportedMediaType { mime: self.mime.clone() })
        }
    }

    pub fn kind(&self) -> Option<MediaKind> {
        lookup(&self.mime).map(|t| t.kind)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn display_size(&self) -> String {
        format_bytes(self.size())
    }

    pub fn sha256(&self) -> String {
        fingerprint::sha256_hex(&self.bytes)
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
