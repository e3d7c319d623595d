//! # Dashboard
//!
//! Server-rendered HTML listing of every cached entry with per-file
//! download links. All user-controlled text is HTML-escaped.

use std::fmt::Write as _;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use simcache_store::EntrySummary;

use crate::error::AppError;
use crate::routes::blocking;
use crate::state::AppState;

const STYLE: &str = "\
body{font-family:Arial,sans-serif;margin:20px;background:#f5f5f5}\
h1{color:#333;border-bottom:2px solid #007bff;padding-bottom:10px}\
.stats,.entry{background:#fff;padding:15px;margin-bottom:15px;border-radius:5px;box-shadow:0 2px 4px rgba(0,0,0,.1)}\
.entry{border-left:4px solid #007bff}\
.entry-header{font-weight:bold;color:#007bff;margin-bottom:10px;word-break:break-all}\
.file-item{padding:6px 0 6px 20px;color:#555;display:flex;justify-content:space-between}\
.file-size{color:#999;font-size:12px;margin-left:10px}\
.download-btn{background:#28a745;color:#fff;padding:4px 12px;border-radius:3px;font-size:12px;text-decoration:none}\
.stats-item{display:inline-block;margin-right:30px}\
.stats-value{font-size:20px;color:#007bff}\
.empty{color:#999;font-style:italic}";

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/dashboard", get(dashboard))
}

/// GET /dashboard: Browse cached entries.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "HTML dashboard", content_type = "text/html")),
    tag = "dashboard"
)]
pub(crate) async fn dashboard(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let root = state.store.root().display().to_string();
    let entries = blocking(move || Ok(state.store.scan_entries())).await?;
    Ok(Html(render(&entries, &root)))
}

fn render(entries: &[EntrySummary], cache_root: &str) -> String {
    let total: u64 = entries.iter().map(|e| e.total_size).sum();
    let mut html = String::with_capacity(4096);
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Simulation Cache Dashboard</title>\
         <style>{STYLE}</style></head><body><h1>Simulation Cache Dashboard</h1>\
         <div class=\"stats\">\
         <div class=\"stats-item\"><div>Cached Entries:</div><div class=\"stats-value\">{}</div></div>\
         <div class=\"stats-item\"><div>Total Cache Size:</div><div class=\"stats-value\">{}</div></div>\
         </div>",
        entries.len(),
        format_size(total),
    );

    if entries.is_empty() {
        html.push_str("<p class=\"empty\">No cached entries yet.</p>");
    }
    for entry in entries {
        let _ = write!(
            html,
            "<div class=\"entry\"><div class=\"entry-header\">{}</div>\
             <div><strong>{} files</strong> ({})</div>",
            escape_html(&entry.identifier.to_string()),
            entry.files.len(),
            format_size(entry.total_size),
        );
        for file in &entry.files {
            let _ = write!(
                html,
                "<div class=\"file-item\"><div>{}<span class=\"file-size\">({})</span></div>\
                 <a class=\"download-btn\" href=\"/api/files/{}\" download>Download</a></div>",
                escape_html(&file.name),
                format_size(file.size),
                escape_html(file.handle.as_str()),
            );
        }
        html.push_str("</div>");
    }

    let _ = write!(
        html,
        "<hr><p style=\"color:#999;font-size:12px\">Cache root: {}<br>\
         <a href=\"/health\">/health</a> | <a href=\"/openapi.json\">OpenAPI</a></p></body></html>",
        escape_html(cache_root),
    );
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}
