//! 结果页 (Results Viewer)
//!
//! 每个标识只发一次请求；三种终态：加载中、失败、已加载。

use reqwest::Url;
use serde::Serialize;

use crate::error::ClientResult;
use crate::evidence::{display_timestamp, EvidenceRecord, Verdict};
use crate::liability::LiabilityBreakdown;

pub const LOAD_FALLBACK: &str = "Failed to load results.";

/// 结果页里的外链拼装
#[derive(Debug, Clone)]
pub struct Links {
    explorer_tx_url: String,
    public_origin: Url,
}

impl Links {
    pub fn new(explorer_tx_url: &str, public_origin: Url) -> Self {
        Self {
            explorer_tx_url: explorer_tx_url.trim_end_matches('/').to_string(),
            public_origin,
        }
    }

    pub fn explorer(&self, tx_id: &str) -> String {
        format!("{}/{}", self.explorer_tx_url, tx_id)
    }

    /// 可分享的校验链接：`{origin}/verify?id=...`
    pub fn verify(&self, id: &str) -> String {
        let mut url = self.public_origin.clone();
        url.set_path("/verify");
        url.set_query(None);
        url.query_pairs_mut().append_pair("id", id);
        url.to_string()
    }

    /// 结果页路由
    pub fn results(&self, id: &str) -> String {
        self.local_path(&["results", id])
    }

    /// 本站的报告下载路由（后端 PDF 透传）
    pub fn report(&self, id: &str) -> String {
        self.local_path(&["results", id, "report"])
    }

    /// 本站路径，每段都转义
    fn local_path(&self, segments: &[&str]) -> String {
        let mut url = self.public_origin.clone();
        match url.path_segments_mut() {
            Ok(mut path) => {
                path.clear().extend(segments);
            }
            Err(_) => return format!("/{}", segments.join("/")),
        }
        url.path().to_string()
    }
}

/// 已加载时的页面模型
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsPage {
    pub id: String,
    pub verdict: Verdict,
    pub confidence_percent: String,
    pub explanation: String,
    pub filename: Option<String>,
    pub file_hash: Option<String>,
    pub detection_type: Option<String>,
    pub flagged_frames: Vec<u64>,
    pub liability: Option<LiabilityBreakdown>,
    pub tx_id: String,
    pub explorer_url: Option<String>,
    pub anchored_at: Option<String>,
    pub report_path: String,
    pub verify_link: String,
}

impl ResultsPage {
    /// `requested_id` 兜底：后端记录里没带 id 时用路由里的
    pub fn build(requested_id: &str, record: EvidenceRecord, links: &Links) -> Self {
        let id = if record.id.trim().is_empty() {
            requested_id.to_string()
        } else {
            record.id.clone()
        };
        let anchored = record.blockchain.is_anchored();
        let anchored_at = Some(record.blockchain.timestamp.as_str())
            .filter(|ts| !ts.trim().is_empty())
            .map(display_timestamp);

        Self {
            verdict: record.detection.verdict(),
            confidence_percent: record.detection.confidence_percent(),
            explanation: record.detection.explanation,
            filename: record.filename.filter(|s| !s.is_empty()),
            file_hash: record.file_hash.filter(|s| !s.is_empty()),
            detection_type: record.detection_type.filter(|s| !s.is_empty()),
            flagged_frames: record.detection.flagged_frames,
            liability: record.liability_scores.as_ref().map(|s| s.breakdown()),
            explorer_url: anchored.then(|| links.explorer(&record.blockchain.tx_id)),
            tx_id: record.blockchain.tx_id,
            anchored_at,
            report_path: links.report(&id),
            verify_link: links.verify(&id),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsView {
    Loading,
    Failed(String),
    Loaded(Box<ResultsPage>),
}

impl ResultsView {
    /// 请求结束后的终态；失败优先展示后端 detail
    pub fn from_result(requested_id: &str, result: ClientResult<EvidenceRecord>, links: &Links) -> Self {
        match result {
            Ok(record) => ResultsView::Loaded(Box::new(ResultsPage::build(requested_id, record, links))),
            Err(e) => ResultsView::Failed(e.user_message(LOAD_FALLBACK)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use reqwest::StatusCode;
    use serde_json::json;

    fn links() -> Links {
        Links::new(
            "https://sepolia.etherscan.io/tx/",
            Url::parse("http://localhost:8080").unwrap(),
        )
    }

    fn record() -> EvidenceRecord {
        serde_json::from_value(json!({
            "id": "0f2c9a1e",
            "filename": "clip.mp4",
            "detection": { "confidence": 0.5, "explanation": "Blending artifacts" },
            "liability_scores": {
                "user": { "percentage": 0 },
                "platform": { "percentage": 0 },
                "architect": { "percentage": 0 }
            },
            "blockchain": { "tx_id": "0xabc", "timestamp": "2024-03-01T10:00:00+00:00" }
        }))
        .unwrap()
    }

    #[test]
    fn loaded_page_model() {
        let view = ResultsView::from_result("0f2c9a1e", Ok(record()), &links());
        let ResultsView::Loaded(page) = view else {
            panic!("expected loaded view");
        };
        assert_eq!(page.verdict, Verdict::Synthetic);
        assert_eq!(page.confidence_percent, "50.0");
        assert_eq!(page.explorer_url.as_deref(), Some("https://sepolia.etherscan.io/tx/0xabc"));
        assert_eq!(page.anchored_at.as_deref(), Some("2024-03-01 10:00:00 UTC"));
        assert_eq!(page.report_path, "/results/0f2c9a1e/report");
        assert_eq!(page.verify_link, "http://localhost:8080/verify?id=0f2c9a1e");
        let shares: Vec<f64> = page.liability.unwrap().parties.iter().map(|p| p.share).collect();
        assert_eq!(shares, [33.33, 33.33, 33.33]);
    }

    #[test]
    fn missing_record_id_falls_back_to_route_id() {
        let mut r = record();
        r.id.clear();
        r.blockchain.tx_id.clear();
        let ResultsView::Loaded(page) = ResultsView::from_result("route-id", Ok(r), &links()) else {
            panic!("expected loaded view");
        };
        assert_eq!(page.id, "route-id");
        assert!(page.explorer_url.is_none());
    }

    #[test]
    fn failure_message_prefers_detail() {
        let with_detail = ClientError::Status {
            status: StatusCode::NOT_FOUND,
            detail: Some("Evidence not found".into()),
        };
        assert_eq!(
            ResultsView::from_result("x", Err(with_detail), &links()),
            ResultsView::Failed("Evidence not found".into())
        );
        let bare = ClientError::Decode("garbage".into());
        assert_eq!(
            ResultsView::from_result("x", Err(bare), &links()),
            ResultsView::Failed(LOAD_FALLBACK.into())
        );
    }

    #[test]
    fn local_paths_escape_identifier() {
        assert_eq!(links().results("a/b"), "/results/a%2Fb");
        assert_eq!(links().report("evt 1"), "/results/evt%201/report");
    }

    #[test]
    fn verify_link_escapes_identifier() {
        assert_eq!(
            links().verify("a&b c"),
            "http://localhost:8080/verify?id=a%26b+c"
        );
    }
}
