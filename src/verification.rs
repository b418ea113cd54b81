//! 模块：校验结果解析 (Verification Resolver)
//!
//! 后端的校验接口形态并不统一：同一个语义可能出现在 `verified` / `match` / `status`，
//! “是否存在”可能出现在 `found` / `exists`。这里先把任意 JSON 解码成一个字段全可选的
//! [`VerificationPayload`]，再按固定优先级归结为三态之一 [`VerificationOutcome`]。
//!
//! 优先级（先命中者生效）：
//!
//! 1. `status == "not_found"` → `NotFound`
//! 2. `registered_on_chain`（`/api/verify` 的标准返回）：false → `NotFound`；
//!    true → `Verified`，时间取 `blockchain_timestamp`（Unix 秒，0 视为无）
//! 3. `found`，其次 `exists`：为假 → `NotFound`；两者都没有视为存在
//! 4. `verified`，其次 `match`，再其次 `status == "verified"`：为真 → `Verified`
//!    （时间取 `timestamp`，其次 `created_at`），为假 → `Mismatch`
//! 5. 其余 → `Mismatch`（只有上链记录、没有比对结论的证据记录也落在这里）
//!
//! 真值判定：布尔原值；数字非零为真；字符串非空为真；数组/对象为真；`null` 等同缺失。

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::evidence::display_timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified {
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Mismatch,
    NotFound,
}

impl VerificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationOutcome::Verified { .. } => "verified",
            VerificationOutcome::Mismatch => "mismatch",
            VerificationOutcome::NotFound => "not_found",
        }
    }

    pub fn banner(&self) -> String {
        match self {
            VerificationOutcome::Verified { timestamp } => {
                let since = timestamp
                    .as_deref()
                    .map(display_timestamp)
                    .unwrap_or_else(|| "recorded time".to_string());
                format!("Verified — unmodified since {}", since)
            }
            VerificationOutcome::Mismatch => "Hash mismatch — possible tampering detected".to_string(),
            VerificationOutcome::NotFound => "No record found on blockchain".to_string(),
        }
    }
}

// ==========================================
// 宽松字段类型：任意 JSON 值都能解码，不会让整个 payload 失败
// ==========================================

/// 按 JS 真值语义解读的布尔标志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag(pub bool);

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Flag(truthy(&value)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTag {
    Verified,
    NotFound,
    Other(String),
}

impl<'de> Deserialize<'de> for StatusTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) if s == "verified" => StatusTag::Verified,
            Value::String(s) if s == "not_found" => StatusTag::NotFound,
            Value::String(s) => StatusTag::Other(s),
            other => StatusTag::Other(other.to_string()),
        })
    }
}

/// 时间戳：字符串原样保留；数字视为 Unix 时间（大于 1e11 的按毫秒）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stamp {
    Text(String),
    Unix(i64),
}

impl<'de> Deserialize<'de> for Stamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) => Stamp::Text(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Stamp::Unix(i),
                None => Stamp::Text(n.to_string()),
            },
            other => Stamp::Text(other.to_string()),
        })
    }
}

impl Stamp {
    /// 空串与 0 视为“没有时间”
    pub fn render(&self) -> Option<String> {
        match self {
            Stamp::Text(s) if s.trim().is_empty() => None,
            Stamp::Text(s) => Some(s.clone()),
            Stamp::Unix(0) => None,
            Stamp::Unix(n) => {
                let secs = if n.unsigned_abs() > 100_000_000_000 { n / 1000 } else { *n };
                DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339())
            }
        }
    }
}

/// 校验接口的全部已知字段，全部可选
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerificationPayload {
    pub status: Option<StatusTag>,
    pub found: Option<Flag>,
    pub exists: Option<Flag>,
    pub verified: Option<Flag>,
    #[serde(rename = "match")]
    pub matched: Option<Flag>,
    pub timestamp: Option<Stamp>,
    pub created_at: Option<Stamp>,

    // `/api/verify` 的标准返回
    pub registered_on_chain: Option<Flag>,
    pub blockchain_timestamp: Option<Stamp>,
    pub file_hash: Option<Stamp>,
    pub case_id: Option<Stamp>,
}

impl VerificationPayload {
    /// 任意 JSON 都能得到一个 payload；非对象（数组、裸字符串……）按空 payload 处理
    pub fn decode(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn file_hash(&self) -> Option<String> {
        self.file_hash.as_ref().and_then(Stamp::render)
    }

    pub fn case_id(&self) -> Option<String> {
        self.case_id.as_ref().and_then(Stamp::render)
    }

    pub fn resolve(&self) -> VerificationOutcome {
        // 1. 显式 not_found
        if self.status == Some(StatusTag::NotFound) {
            return VerificationOutcome::NotFound;
        }

        // 2. 标准链上返回
        if let Some(Flag(on_chain)) = self.registered_on_chain {
            return if on_chain {
                VerificationOutcome::Verified {
                    timestamp: self.blockchain_timestamp.as_ref().and_then(Stamp::render),
                }
            } else {
                VerificationOutcome::NotFound
            };
        }

        // 3. 是否存在
        if let Some(Flag(false)) = self.found.or(self.exists) {
            return VerificationOutcome::NotFound;
        }

        // 4. 是否匹配
        let verdict = self
            .verified
            .or(self.matched)
            .map(|Flag(b)| b)
            .or_else(|| self.status.as_ref().map(|s| *s == StatusTag::Verified));
        match verdict {
            Some(true) => VerificationOutcome::Verified {
                timestamp: self.timestamp.as_ref().or(self.created_at.as_ref()).and_then(Stamp::render),
            },
            Some(false) => VerificationOutcome::Mismatch,
            // 5. 没有任何比对结论
            None => VerificationOutcome::Mismatch,
        }
    }
}

pub fn resolve(value: &Value) -> VerificationOutcome {
    VerificationPayload::decode(value).resolve()
}
