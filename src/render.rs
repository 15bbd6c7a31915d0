//! Paste-ready HTML preview of a post.
//!
//! The output is meant to be selected and copied into a blog editor, so every
//! element carries inline styles instead of relying on a stylesheet. Only a
//! small subset of markdown is understood:
//!
//! - `## heading` and `### heading` at the start of a line
//! - `**bold**`
//! - `- item` at the start of a line
//! - blank line = paragraph break, single newline = line break
//! - `**[image: caption]**` (or `**[이미지: caption]**`) = the next image
//!
//! Rendering is a pure function of the post, the current time, and options.

use chrono::{DateTime, TimeDelta, Utc};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::sync::LazyLock;

use crate::post::Post;

static IMAGE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*\[(?:image|이미지):\s*([^\]]+)\]\*\*").unwrap());
static H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^## (.+)$").unwrap());
static H3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^### (.+)$").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^- (.+)$").unwrap());

const PARAGRAPH_OPEN: &str = r#"<p style="margin:12px 0;">"#;

/// Optional call-to-action block appended under the post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallToAction {
    pub url: String,
    pub label: String,
    #[serde(default)]
    pub tagline: Option<String>,
}

/// Rendering options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub cta: Option<CallToAction>,
}

/// A rendered preview page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    /// The copyable fragment (title, body, hashtags, call to action).
    pub content_html: String,
    /// The full standalone page.
    pub page_html: String,
    /// Whole days until deletion, rounded up.
    pub days_left: i64,
}

/// Renders `post` as seen at `now`.
pub fn render(post: &Post, now: DateTime<Utc>, options: &RenderOptions) -> Document {
    let days_left = days_left(post.expires_at, now);
    let content_html = render_content(post, options);
    let page_html = render_page(post, &content_html, days_left);

    Document {
        title: post.title.clone(),
        content_html,
        page_html,
        days_left,
    }
}

/// Converts the post body to inline-styled HTML, substituting images.
pub fn render_body(body: &str, images: &[String]) -> String {
    let body = escape_html(&body.replace("\r\n", "\n"));

    let mut next_image = images.iter();
    let body = IMAGE_PLACEHOLDER.replace_all(&body, |caps: &Captures<'_>| {
        next_image.next().map_or_else(String::new, |url| {
            format!(
                r#"<img src="{}" alt="{}" style="max-width:100%; height:auto; display:block; margin:20px auto;" />"#,
                escape_html(url),
                caps[1].trim()
            )
        })
    });

    let body = H2.replace_all(
        &body,
        r#"<h2 style="font-size:1.5em; font-weight:bold; margin:24px 0 12px;">$1</h2>"#,
    );
    let body = H3.replace_all(
        &body,
        r#"<h3 style="font-size:1.25em; font-weight:bold; margin:20px 0 10px;">$1</h3>"#,
    );
    let body = BOLD.replace_all(&body, "<strong>$1</strong>");
    let body = LIST_ITEM.replace_all(&body, r#"<li style="margin:4px 0;">$1</li>"#);

    let body = body
        .replace("\n\n", &format!("</p>{PARAGRAPH_OPEN}"))
        .replace('\n', "<br/>");

    format!("{PARAGRAPH_OPEN}{body}</p>")
}

fn render_content(post: &Post, options: &RenderOptions) -> String {
    let mut html = String::new();

    html.push_str(&format!(
        r#"<h1 style="font-size:2em; font-weight:bold; text-align:center; margin-bottom:30px;">{}</h1>"#,
        escape_html(&post.title)
    ));
    html.push_str(&format!("<div>{}</div>", render_body(&post.body, &post.images)));

    if !post.hashtags.is_empty() {
        let tags = post
            .hashtags
            .iter()
            .map(|tag| format!("#{}", escape_html(tag)))
            .collect::<Vec<_>>()
            .join(" ");
        html.push_str(&format!(
            r#"<div style="margin-top:30px; color:#1a73e8; font-weight:bold;">{tags}</div>"#
        ));
    }

    if let Some(cta) = &options.cta {
        html.push_str(r#"<div style="text-align:center; margin-top:30px;">"#);
        html.push_str(&format!(
            r#"<a href="{}" style="display:inline-block; background:#2563eb; color:white; padding:15px 30px; border-radius:8px; text-decoration:none; font-weight:bold; font-size:1.1em;">{}</a>"#,
            escape_html(&cta.url),
            escape_html(&cta.label)
        ));
        if let Some(tagline) = &cta.tagline {
            html.push_str(&format!(
                r#"<p style="color:#666; margin-top:10px; font-size:0.9em;">{}</p>"#,
                escape_html(tagline)
            ));
        }
        html.push_str("</div>");
    }

    html
}

fn render_page(post: &Post, content_html: &str, days_left: i64) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1" />
<meta name="robots" content="noindex" />
<title>{title}</title>
</head>
<body style="margin:0;">
<div style="max-width:800px; margin:0 auto; padding:20px; font-family:sans-serif;">
<div style="background:#fff3cd; border:1px solid #ffc107; padding:12px; border-radius:8px; margin-bottom:20px; text-align:center;">
<strong>Temporary page</strong> - deleted automatically in {days_left} day(s).<br />
<small>Select everything below (Ctrl+A), copy (Ctrl+C), and paste it into your blog editor.</small>
</div>
<div id="copy-content" style="border:2px dashed #ccc; padding:30px; background:#fff;">
{content_html}
</div>
<div style="text-align:center; margin-top:20px;">
<button id="copy-button" type="button" style="padding:12px 24px; font-size:1em; border-radius:8px; border:none; background:#16a34a; color:white; cursor:pointer;">Copy content</button>
</div>
</div>
<script>
document.getElementById('copy-button').addEventListener('click', function () {{
  var range = document.createRange();
  range.selectNodeContents(document.getElementById('copy-content'));
  var selection = window.getSelection();
  selection.removeAllRanges();
  selection.addRange(range);
  var ok = document.execCommand('copy');
  this.textContent = ok ? 'Copied!' : 'Press Ctrl+C to copy';
}});
</script>
</body>
</html>
"#,
        title = escape_html(&post.title),
    )
}

/// Page shown for an unknown or deleted post.
pub fn not_found_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8" /><title>Not found</title></head>
<body style="font-family:sans-serif; text-align:center; padding:40px;">
<h1>Post not found</h1>
<p>This page has expired or never existed.</p>
</body>
</html>
"#
    .to_string()
}

/// Whole days until `expires_at`, rounded up, never negative.
fn days_left(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = expires_at - now;
    if remaining <= TimeDelta::zero() {
        return 0;
    }
    let day_ms = TimeDelta::days(1).num_milliseconds();
    (remaining.num_milliseconds() + day_ms - 1) / day_ms
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
