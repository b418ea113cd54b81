use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize}; // 引入序列化库，让结构体能和后端 JSON 互转

use crate::liability::LiabilityScores;

/// 置信度 >= 0.5 即判定为合成内容（含边界，无滞回）
pub const SYNTHETIC_THRESHOLD: f64 = 0.5;

// 证据记录：后端为每个上传文件保存的完整结果。
// 对前端来说它是只读的，这里只负责解码和展示。
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EvidenceRecord {
    // === 第一层：身份 (Identity) ===
    pub id: String,
    pub filename: Option<String>,
    // 后端计算的文件哈希，用于和本地指纹对照
    pub file_hash: Option<String>,
    // "video" / "audio" / "unknown"
    pub detection_type: Option<String>,

    // === 第二层：检测结论 (Detection) ===
    pub detection: Detection,

    // === 第三层：责任分摊 (Liability) ===
    pub liability_scores: Option<LiabilityScores>,

    // === 第四层：链上锚定 (Anchoring) ===
    pub blockchain: BlockchainProof,

    pub pdf_download_url: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Detection {
    // 置信度，0.0 到 1.0
    pub confidence: f64,
    pub label: String,
    pub explanation: String,
    pub is_synthetic: Option<bool>,
    // 视频检测中被标记的帧序号
    pub flagged_frames: Vec<u64>,
    // 音频检测的特征统计量
    pub features: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct BlockchainProof {
    pub tx_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Synthetic,
    Authentic,
}

impl Verdict {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= SYNTHETIC_THRESHOLD {
            Verdict::Synthetic
        } else {
            Verdict::Authentic
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Synthetic => "SYNTHETIC",
            Verdict::Authentic => "AUTHENTIC",
        }
    }
}

impl Detection {
    /// 展示用的判定只看置信度，不看后端的 label
    pub fn verdict(&self) -> Verdict {
        Verdict::from_confidence(self.confidence)
    }

    /// `0.8734` -> `"87.3"`
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}", self.confidence * 100.0)
    }
}

impl BlockchainProof {
    pub fn is_anchored(&self) -> bool {
        !self.tx_id.trim().is_empty()
    }
}

/// 时间戳展示：RFC 3339 / 纯日期 转成 UTC 可读格式，解析不了就原样返回
pub fn display_timestamp(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}
