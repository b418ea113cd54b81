//! 页面渲染：服务端直出的朴素 HTML，所有动态内容都经过 [`escape`]。

use std::fmt::Write;

use crate::client::VerificationReport;
use crate::evidence::Verdict;
use crate::liability::LiabilityBreakdown;
use crate::media::ACCEPTED_TYPES;
use crate::results::{ResultsPage, ResultsView};
use crate::upload::{ContextForm, Platform};
use crate::verification::VerificationOutcome;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>{title} · TrustChain</title></head>
<body>
<nav><a href="/">Upload</a> | <a href="/verify">Verify</a></nav>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        body = body
    )
}

fn checked(on: bool) -> &'static str {
    if on {
        " checked"
    } else {
        ""
    }
}

fn error_block(message: Option<&str>) -> String {
    match message {
        Some(msg) => format!(r#"<p class="error" role="alert">{}</p>"#, escape(msg)),
        None => String::new(),
    }
}

// ==========================================
// 上传页
// ==========================================

pub fn upload_page(form: &ContextForm, error: Option<&str>) -> String {
    let accept: Vec<&str> = ACCEPTED_TYPES.iter().map(|t| t.mime).collect();

    let mut platforms = String::new();
    for p in Platform::ALL {
        let selected = if p == form.platform { " selected" } else { "" };
        let _ = write!(platforms, r#"<option value="{0}"{1}>{0}</option>"#, p.as_str(), selected);
    }

    let body = format!(
        r#"<h1>Submit Evidence</h1>
<p>Upload a video or audio file for deepfake detection and blockchain-anchored integrity proof.</p>
{error}
<form method="post" action="/upload" enctype="multipart/form-data">
<fieldset><legend>File</legend>
<input type="file" name="file" accept="{accept}" required>
</fieldset>
<fieldset><legend>About the Content</legend>
<label><input type="checkbox" name="disclosure_stripped"{ds}> AI disclosure was stripped or hidden</label>
<label><input type="checkbox" name="content_distributed"{cd}> Content was widely distributed</label>
<label><input type="checkbox" name="victim_impersonated"{vi}> A real person is being impersonated</label>
<label><input type="checkbox" name="repeat_offender"{ro}> The uploader has prior offences</label>
</fieldset>
<fieldset><legend>About the Platform</legend>
<label>Platform <select name="platform_name">{platforms}</select></label>
<label><input type="checkbox" name="takedown_requested"{tr}> A takedown was requested</label>
<label>Response time (hours) <input type="number" min="0" name="response_hours" value="{rh}" placeholder="e.g. 48"></label>
<label><input type="checkbox" name="content_removed"{cr}> Content has been removed</label>
<label>Estimated reach <input type="number" min="0" name="estimated_reach" value="{er}" placeholder="e.g. 50000"></label>
</fieldset>
<fieldset><legend>AI Model (Optional)</legend>
<input type="text" name="model_name" value="{mn}" placeholder="e.g. Stable Diffusion, Midjourney, ElevenLabs…">
</fieldset>
<button type="submit">Submit for Analysis</button>
</form>"#,
        error = error_block(error),
        accept = accept.join(","),
        ds = checked(form.disclosure_stripped),
        cd = checked(form.content_distributed),
        vi = checked(form.victim_impersonated),
        ro = checked(form.repeat_offender),
        platforms = platforms,
        tr = checked(form.takedown_requested),
        rh = escape(&form.response_hours),
        cr = checked(form.content_removed),
        er = escape(&form.estimated_reach),
        mn = escape(&form.model_name),
    );
    layout("Upload", &body)
}

// ==========================================
// 结果页
// ==========================================

const COPY_SCRIPT: &str = r#"<script>
document.getElementById('copy-link').addEventListener('click', function (e) {
  var button = e.currentTarget;
  navigator.clipboard.writeText(button.dataset.link);
  button.textContent = '✅ Copied!';
  setTimeout(function () { button.textContent = '🔗 Copy Verification Link'; }, 2000);
});
</script>"#;

pub fn results_page(view: &ResultsView) -> String {
    match view {
        ResultsView::Loading => layout("Results", "<p>Loading results…</p>"),
        ResultsView::Failed(message) => layout(
            "Results",
            &format!(
                r#"<h1>Results</h1>{}<p><a href="/">Submit another file</a></p>"#,
                error_block(Some(message))
            ),
        ),
        ResultsView::Loaded(page) => layout("Results", &loaded_results(page)),
    }
}

fn loaded_results(page: &ResultsPage) -> String {
    let mut out = String::new();
    let _ = write!(out, "<h1>Analysis Results</h1><p>Event ID: <code>{}</code></p>", escape(&page.id));

    let mut meta = Vec::new();
    if let Some(name) = &page.filename {
        meta.push(format!("File: {}", escape(name)));
    }
    if let Some(kind) = &page.detection_type {
        meta.push(format!("Type: {}", escape(kind)));
    }
    if let Some(hash) = &page.file_hash {
        meta.push(format!("SHA-256: <code>{}</code>", escape(hash)));
    }
    if !meta.is_empty() {
        let _ = write!(out, "<p>{}</p>", meta.join(" · "));
    }

    // 检测结论
    let badge = match page.verdict {
        Verdict::Synthetic => "⚠ SYNTHETIC",
        Verdict::Authentic => "✓ AUTHENTIC",
    };
    let _ = write!(
        out,
        r#"<section><h2>Detection Result</h2>
<p class="verdict {cls}">{badge}</p>
<p>Synthetic confidence: {pct}%</p>
<progress max="100" value="{pct}"></progress>
<p>{explanation}</p>"#,
        cls = page.verdict.label().to_lowercase(),
        badge = badge,
        pct = page.confidence_percent,
        explanation = escape(&page.explanation),
    );
    if !page.flagged_frames.is_empty() {
        let frames: Vec<String> = page.flagged_frames.iter().map(u64::to_string).collect();
        let _ = write!(out, "<p>Flagged frames: {}</p>", frames.join(", "));
    }
    out.push_str("</section>");

    if let Some(liability) = &page.liability {
        out.push_str(&liability_card(liability));
    }

    // 链上凭证
    out.push_str("<section><h2>Blockchain Proof</h2>");
    match &page.explorer_url {
        Some(url) => {
            let _ = write!(
                out,
                r#"<p>Transaction: <a href="{}" target="_blank" rel="noopener noreferrer">{}</a></p>"#,
                escape(url),
                escape(&page.tx_id)
            );
        }
        None => out.push_str("<p>Not anchored yet.</p>"),
    }
    if let Some(ts) = &page.anchored_at {
        let _ = write!(out, "<p>Anchored at: {}</p>", escape(ts));
    }
    out.push_str("</section>");

    let _ = write!(
        out,
        r#"<section>
<a href="{report}" target="_blank" rel="noopener noreferrer">📄 Download PDF Report</a>
<button type="button" id="copy-link" data-link="{link}">🔗 Copy Verification Link</button>
</section>
{script}"#,
        report = escape(&page.report_path),
        link = escape(&page.verify_link),
        script = COPY_SCRIPT,
    );
    out
}

fn liability_card(liability: &LiabilityBreakdown) -> String {
    let mut out = String::from("<section><h2>Liability Distribution</h2><div class=\"bar\">");
    for party in &liability.parties {
        let _ = write!(
            out,
            r#"<span style="display:inline-block;width:{share:.2}%;background:{color}" title="{label}: {pct}">&nbsp;</span>"#,
            share = party.share,
            color = party.color,
            label = party.label,
            pct = party.percentage_label(),
        );
    }
    out.push_str("</div><ul class=\"legend\">");
    for party in &liability.parties {
        let _ = write!(out, "<li>{}: {}</li>", party.label, party.percentage_label());
    }
    out.push_str("</ul>");

    for party in liability.parties.iter().filter(|p| p.present) {
        let _ = write!(
            out,
            "<h3>{} <small>raw score {:.2}</small></h3><table>",
            party.label, party.raw_score
        );
        for factor in &party.factors {
            let basis = factor
                .legal_basis
                .as_deref()
                .map(|b| format!("<br><small>{}</small>", escape(b)))
                .unwrap_or_default();
            let _ = write!(
                out,
                "<tr><td>{}{}</td><td>{}</td></tr>",
                escape(&factor.name),
                basis,
                escape(&factor.value)
            );
        }
        out.push_str("</table>");
        if let Some(explanation) = &party.explanation {
            let _ = write!(out, "<p>{}</p>", escape(explanation));
        }
    }

    if let Some(explanation) = &liability.explanation {
        let _ = write!(out, "<p>{}</p>", escape(explanation));
    }
    out.push_str("</section>");
    out
}

// ==========================================
// 校验页
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyTab {
    #[default]
    ById,
    ByFile,
}

#[derive(Debug, Clone, Default)]
pub struct VerifyPage {
    pub tab: VerifyTab,
    pub event_id: String,
    pub id_result: Option<Result<VerificationOutcome, String>>,
    pub file_result: Option<Result<VerificationReport, String>>,
}

fn banner(outcome: &VerificationOutcome) -> String {
    let icon = match outcome {
        VerificationOutcome::Verified { .. } => "✅",
        VerificationOutcome::Mismatch => "❌",
        VerificationOutcome::NotFound => "⚠️",
    };
    format!(
        r#"<p class="status {}" role="status">{} {}</p>"#,
        outcome.as_str(),
        icon,
        escape(&outcome.banner())
    )
}

fn hash_comparison(report: &VerificationReport) -> String {
    let mut out = format!("<p>Local SHA-256: <code>{}</code></p>", escape(&report.local_hash));
    if let Some(remote) = &report.backend_hash {
        let verdict = match report.hashes_agree() {
            Some(true) => "matches",
            _ => "differs from",
        };
        let _ = write!(
            out,
            "<p>Backend SHA-256: <code>{}</code> ({} the local hash)</p>",
            escape(remote),
            verdict
        );
    }
    if let Some(case_id) = &report.case_id {
        let _ = write!(
            out,
            r#"<p>Case: <a href="/results/{0}">{0}</a></p>"#,
            escape(case_id)
        );
    }
    out
}

pub fn verify_page(page: &VerifyPage) -> String {
    let mut body = String::from("<h1>Verify Evidence</h1>");
    let open = |tab: VerifyTab| if page.tab == tab { " open" } else { "" };

    let _ = write!(
        body,
        r#"<details{open}><summary>By Event ID</summary>
<form method="post" action="/verify/id">
<input type="text" name="event_id" value="{id}" placeholder="Event ID">
<button type="submit">Look up</button>
</form>"#,
        open = open(VerifyTab::ById),
        id = escape(&page.event_id),
    );
    match &page.id_result {
        Some(Ok(outcome)) => body.push_str(&banner(outcome)),
        Some(Err(message)) => body.push_str(&error_block(Some(message))),
        None => {}
    }
    body.push_str("</details>");

    let _ = write!(
        body,
        r#"<details{open}><summary>By File</summary>
<form method="post" action="/verify/file" enctype="multipart/form-data">
<input type="file" name="file" required>
<button type="submit">Verify file</button>
</form>"#,
        open = open(VerifyTab::ByFile),
    );
    match &page.file_result {
        Some(Ok(report)) => {
            body.push_str(&banner(&report.outcome));
            body.push_str(&hash_comparison(report));
        }
        Some(Err(message)) => body.push_str(&error_block(Some(message))),
        None => {}
    }
    body.push_str("</details>");

    layout("Verify", &body)
}
