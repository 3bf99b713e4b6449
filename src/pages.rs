//! Server-rendered HTML.

use html_escape::encode_text;

use crate::types::api::PasteView;

/// The paste submission form.
pub const INDEX_PAGE: &str = include_str!("../assets/index.html");

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:56rem;margin:2rem auto;\
padding:0 1rem;color:#0f172a;background:#f8fafc}\
.meta{color:#475569;font-size:.9rem;display:flex;gap:1rem}\
pre{white-space:pre-wrap;word-break:break-word;background:#fff;border:1px solid #cbd5e1;\
border-radius:.4rem;padding:1rem}";

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>{STYLE}</style></head>\n<body>{body}</body></html>\n",
        title = encode_text(title),
    )
}

pub fn paste(view: &PasteView) -> String {
    let mut meta = String::new();
    if let Some(remaining) = view.remaining_views {
        meta.push_str(&format!(
            "<span>Remaining views: <strong>{remaining}</strong></span>"
        ));
    }
    if let Some(expires_at) = view.expires_at {
        meta.push_str(&format!(
            "<span>Expires: <strong>{}</strong></span>",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    layout(
        "Paste View",
        &format!(
            "<h1>Paste View</h1><div class=\"meta\">{meta}</div><pre>{content}</pre>",
            content = encode_text(&view.content),
        ),
    )
}

pub fn not_found() -> String {
    layout(
        "Not found",
        "<h1>404</h1><p>Paste not found or has expired</p><p><a href=\"/\">Go Home</a></p>",
    )
}

pub fn bad_request() -> String {
    layout(
        "Bad request",
        "<h1>400</h1><p>That paste link is not valid</p><p><a href=\"/\">Go Home</a></p>",
    )
}

pub fn server_error() -> String {
    layout(
        "Error",
        "<h1>Something went wrong</h1><p>The paste could not be loaded. Please retry shortly.</p>",
    )
}
