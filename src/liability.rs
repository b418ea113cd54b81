//! 模块：责任分摊展示 (Liability Normalizer)
//!
//! **职责**: 把后端算好的三方责任分（用户 / 平台 / 模型架构方）整理成可以直接渲染的形态。
//!
//! - 后端“理应”保证三方 percentage 之和为 100，但这里不信任它：
//!   展示份额一律按 `percentage / Σpercentage × 100` 重新归一；总和为 0（或三方都缺失）时均分 33.33。
//! - 每个因子的值可能是纯数字，也可能是 `{points, max, legal_basis}` 结构，其他形态原样转字符串。
//! - 因子名不做校验，只做人性化：下划线变空格、每个单词首字母大写。

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// 总和为 0 时每一方的展示份额
pub const EQUAL_SHARE: f64 = 33.33;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    User,
    Platform,
    Architect,
}

impl Party {
    /// 固定的渲染顺序
    pub const ALL: [Party; 3] = [Party::User, Party::Platform, Party::Architect];

    pub fn label(self) -> &'static str {
        match self {
            Party::User => "User",
            Party::Platform => "Platform",
            Party::Architect => "Architect",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Party::User => "#ef4444",
            Party::Platform => "#3b82f6",
            Party::Architect => "#8b5cf6",
        }
    }
}

/// 单方责任分
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyScore {
    #[serde(deserialize_with = "number_or_zero")]
    pub percentage: f64,
    #[serde(deserialize_with = "number_or_zero")]
    pub raw_score: f64,
    /// 因子名 -> 值，保持后端给出的顺序
    #[serde(deserialize_with = "object_or_empty")]
    pub factors: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// 三方责任分全集
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiabilityScores {
    pub user: Option<PartyScore>,
    pub platform: Option<PartyScore>,
    pub architect: Option<PartyScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_f64).unwrap_or(0.0))
}

fn object_or_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// 纯函数版本的归一：输入三方原始 percentage，输出展示份额
pub fn normalize_shares(percentages: [f64; 3]) -> [f64; 3] {
    let total: f64 = percentages.iter().sum();
    if total > 0.0 {
        percentages.map(|p| p * 100.0 / total)
    } else {
        [EQUAL_SHARE; 3]
    }
}

impl LiabilityScores {
    pub fn party(&self, party: Party) -> Option<&PartyScore> {
        match party {
            Party::User => self.user.as_ref(),
            Party::Platform => self.platform.as_ref(),
            Party::Architect => self.architect.as_ref(),
        }
    }

    /// 缺失的一方按 0 计
    pub fn percentage(&self, party: Party) -> f64 {
        self.party(party).map(|s| s.percentage).unwrap_or(0.0)
    }

    pub fn shares(&self) -> [f64; 3] {
        normalize_shares(Party::ALL.map(|p| self.percentage(p)))
    }

    pub fn display_share(&self, party: Party) -> f64 {
        let idx = Party::ALL.iter().position(|p| *p == party).unwrap_or_default();
        self.shares()[idx]
    }

    pub fn breakdown(&self) -> LiabilityBreakdown {
        let shares = self.shares();
        let parties = Party::ALL
            .iter()
            .zip(shares)
            .map(|(&party, share)| {
                let score = self.party(party);
                PartyView {
                    party,
                    label: party.label(),
                    color: party.color(),
                    share,
                    percentage: score.map(|s| s.percentage).unwrap_or(0.0),
                    raw_score: score.map(|s| s.raw_score).unwrap_or(0.0),
                    factors: score.map(|s| factor_rows(&s.factors)).unwrap_or_default(),
                    explanation: score.and_then(|s| s.explanation.clone()),
                    present: score.is_some(),
                }
            })
            .collect();

        LiabilityBreakdown {
            parties,
            explanation: self.explanation.clone().filter(|e| !e.is_empty()),
        }
    }
}

/// 因子值的三种形态
#[derive(Debug, Clone, PartialEq)]
pub enum FactorValue {
    Number(f64),
    Structured {
        points: f64,
        max: f64,
        legal_basis: Option<String>,
    },
    Other(Value),
}

impl FactorValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_f64() {
                Some(f) => FactorValue::Number(f),
                None => FactorValue::Other(value.clone()),
            },
            Value::Object(map) => {
                let points = map
                    .get("points")
                    .and_then(Value::as_f64)
                    .or_else(|| map.get("score").and_then(Value::as_f64))
                    .unwrap_or(0.0);
                let max = map.get("max").and_then(Value::as_f64).unwrap_or(1.0);
                let legal_basis = map
                    .get("legal_basis")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                FactorValue::Structured { points, max, legal_basis }
            }
            other => FactorValue::Other(other.clone()),
        }
    }

    pub fn display(&self) -> String {
        match self {
            FactorValue::Number(n) => format!("{:.2}", n),
            FactorValue::Structured { points, max, .. } => format!("{:.2} / {:.2}", points, max),
            FactorValue::Other(Value::String(s)) => s.clone(),
            FactorValue::Other(v) => v.to_string(),
        }
    }

    pub fn legal_basis(&self) -> Option<&str> {
        match self {
            FactorValue::Structured { legal_basis, .. } => legal_basis.as_deref(),
            _ => None,
        }
    }
}

/// `prior_offences` -> `Prior Offences`
pub fn humanize_factor_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_is_word = false;
    for c in key.chars() {
        let c = if c == '_' { ' ' } else { c };
        let is_word = c.is_alphanumeric();
        if is_word && !prev_is_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_is_word = is_word;
    }
    out
}

fn factor_rows(factors: &Map<String, Value>) -> Vec<FactorRow> {
    factors
        .iter()
        .map(|(key, raw)| {
            let value = FactorValue::from_json(raw);
            FactorRow {
                key: key.clone(),
                name: humanize_factor_name(key),
                value: value.display(),
                legal_basis: value.legal_basis().map(str::to_string),
            }
        })
        .collect()
}

// ==========================================
// 渲染用的视图模型
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorRow {
    pub key: String,
    pub name: String,
    pub value: String,
    pub legal_basis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartyView {
    pub party: Party,
    pub label: &'static str,
    pub color: &'static str,
    /// 归一后的展示份额（条形图宽度）
    pub share: f64,
    /// 后端原始 percentage
    pub percentage: f64,
    pub raw_score: f64,
    pub factors: Vec<FactorRow>,
    pub explanation: Option<String>,
    /// 后端是否给出了这一方；缺失时不渲染因子明细
    pub present: bool,
}

impl PartyView {
    pub fn percentage_label(&self) -> String {
        format!("{:.1}%", self.percentage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiabilityBreakdown {
    pub parties: Vec<PartyView>,
    pub explanation: Option<String>,
}

impl LiabilityBreakdown {
    pub fn total_share(&self) -> f64 {
        self.parties.iter().map(|p| p.share).sum()
    }
}
