//! Server-side HTML rendering of the dashboard page.

use crate::record::Dataset;
use crate::report::{thousands, DashboardView};
use std::fmt::Write;

/// Page title
pub const TITLE: &str = "IIHR Research Performance Dashboard";

/// Result of the last update, shown above the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flash {
    Success(String),
    Error(String),
}

/// Escape text for HTML element content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn opt_u64(v: Option<u64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_f64(v: Option<f64>, precision: usize) -> String {
    v.map(|v| format!("{:.*}", precision, v)).unwrap_or_default()
}

fn tile(out: &mut String, label: &str, value: &str) {
    let _ = write!(
        out,
        r#"<div class="tile"><div class="label">{}</div><div class="value">{}</div></div>"#,
        escape(label),
        escape(value)
    );
}

/// Render the full dashboard page
pub fn render_page(
    view: &DashboardView,
    dataset: &Dataset,
    candidates: &[&str],
    flash: Option<&Flash>,
) -> String {
    let mut out = String::with_capacity(16 * 1024);

    let _ = write!(
        out,
        r#"<!DOCTYPE html>
<html lang="en"><head><meta charset="utf-8"><title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
.tiles {{ display: flex; gap: 1rem; flex-wrap: wrap; }}
.tile {{ border: 1px solid #ddd; border-radius: 6px; padding: .75rem 1rem; min-width: 10rem; }}
.tile .label {{ color: #666; font-size: .85rem; }}
.tile .value {{ font-size: 1.5rem; }}
table {{ border-collapse: collapse; margin-top: .5rem; }}
td, th {{ border: 1px solid #ddd; padding: .25rem .5rem; }}
.bar {{ background: #4a7bd0; height: 1rem; display: inline-block; }}
.flash-ok {{ color: #17692c; }}
.flash-error {{ color: #a11; }}
</style></head><body>
<h1>{title}</h1>
<p>Semi-automated bibliometric analysis using Google Scholar profile links</p>
"#,
        title = TITLE
    );

    // Summary tiles
    let s = &view.summary;
    out.push_str(r#"<section class="tiles">"#);
    tile(&mut out, "Scientists", &s.scientists.to_string());
    tile(&mut out, "Avg H-Index", &opt_f64(s.mean_hindex, 2));
    tile(&mut out, "Total Citations", &thousands(s.total_citations));
    tile(&mut out, "Profiles Fetched", &format!("{:.1}%", s.coverage_pct));
    tile(&mut out, "IIHR Score", &opt_f64(s.mean_score, 3));
    out.push_str("</section><hr>");

    // Leaderboard
    out.push_str(
        "<h2>Top 10 Scientists by Performance Score</h2>\
         <table><tr><th>#</th><th>Full Name of Scientist</th><th>Fetched H-index</th>\
         <th>Fetched Citations</th><th>Performance Score</th><th>Performance Category</th></tr>",
    );
    for e in &view.leaderboard {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            e.rank,
            escape(&e.name),
            opt_u64(e.fetched_hindex),
            opt_u64(e.fetched_citations),
            opt_f64(e.performance_score, 3),
            e.category.map(|c| c.as_str()).unwrap_or_default()
        );
    }
    out.push_str("</table><hr>");

    // Category distribution
    out.push_str("<h2>Performance Category Distribution</h2><table>");
    let max = view.categories.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);
    for (label, count) in &view.categories {
        let width = count * 300 / max;
        let _ = write!(
            out,
            r#"<tr><td>{}</td><td><span class="bar" style="width:{}px"></span> {}</td></tr>"#,
            label.as_str(),
            width,
            count
        );
    }
    out.push_str("</table><hr>");

    // Data quality
    out.push_str(r#"<h2>Data Quality &amp; Coverage Report</h2><section class="tiles">"#);
    tile(&mut out, "Missing Scholar Links", &view.quality.missing_links.to_string());
    tile(&mut out, "Profiles Without Metrics", &view.quality.missing_metrics.to_string());
    out.push_str("</section><hr>");

    // Manual update form
    out.push_str("<h2>Update Missing Google Scholar Profiles</h2>");
    match flash {
        Some(Flash::Success(msg)) => {
            let _ = write!(out, r#"<p class="flash-ok">{}</p>"#, escape(msg));
        }
        Some(Flash::Error(msg)) => {
            let _ = write!(out, r#"<p class="flash-error">{}</p>"#, escape(msg));
        }
        None => {}
    }
    if candidates.is_empty() {
        out.push_str("<p>All scientist profiles are complete.</p>");
    } else {
        out.push_str(r#"<form method="post" action="/update"><label>Select Scientist <select name="name">"#);
        for name in candidates {
            let name = escape(name);
            let _ = write!(out, r#"<option value="{0}">{0}</option>"#, name);
        }
        out.push_str(
            r#"</select></label> <label>Paste Google Scholar Profile Link <input type="text" name="link" size="60" placeholder="https://scholar.google.com/citations?user=XXXX"></label> <button type="submit">Fetch &amp; Update Metrics</button></form>"#,
        );
    }
    out.push_str("<hr>");

    // Full dataset
    out.push_str("<h2>Complete Scientist Dataset</h2><table><tr>");
    for header in &dataset.schema.headers {
        let _ = write!(out, "<th>{}</th>", escape(header));
    }
    out.push_str("<th>Performance Score</th><th>Performance Category</th></tr>");
    for record in &dataset.records {
        out.push_str("<tr>");
        for cell in dataset.schema.render_row(record) {
            let _ = write!(out, "<td>{}</td>", escape(&cell));
        }
        let _ = write!(
            out,
            "<td>{}</td><td>{}</td></tr>",
            opt_f64(record.scores.performance_score, 3),
            record.scores.category.map(|c| c.as_str()).unwrap_or_default()
        );
    }
    out.push_str("</table><hr>");

    let _ = write!(
        out,
        r#"<h2>Export Updated Data</h2><p><a href="/download">Download IIHR Performance Dataset</a></p>
<p><small>Last updated via Google Scholar semi-automated extraction, rendered {}</small></p>
</body></html>"#,
        view.generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    out
}
