//! Markdown metadata extractor.
//!
//! Pure, side-effect-free transformation: markdown text + path in,
//! `(metadata, body)` out. Frontmatter is split off with `gray_matter`;
//! title and description fall back through an explicit resolution chain;
//! every other frontmatter field passes through verbatim (dates normalized
//! to an ISO form).
//!
//! The plain-prose derivation for descriptions is an explicit, ordered list
//! of stripping rules rather than inline string replacement chains, so each
//! rule can be tested on its own.

use std::sync::LazyLock;

use gray_matter::{engine::YAML, Matter, ParsedEntity};
use regex::Regex;
use serde_json::Value;

use crate::errors::PipelineError;
use doc_sync_shared::DocumentMetadata;

/// Maximum length of a derived description, in characters.
const DESCRIPTION_CHARS: usize = 200;

/// Marker appended to derived descriptions.
const ELLIPSIS: &str = "...";

/// Result of extracting a markdown document.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Resolved metadata: title, description, and pass-through fields.
    pub metadata: DocumentMetadata,
    /// Document body with the frontmatter block stripped. Used for
    /// indexing, not for recomputing title/description downstream.
    pub body: String,
}

/// Whether a path carries a markdown/MDX suffix.
pub fn is_markdown(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".md") || lower.ends_with(".mdx")
}

/// Strip a `.md`/`.mdx` suffix from a path, if present.
pub fn strip_markdown_suffix(path: &str) -> &str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".mdx") {
        &path[..path.len() - 4]
    } else if lower.ends_with(".md") {
        &path[..path.len() - 3]
    } else {
        path
    }
}

/// Extract metadata and body from a markdown document.
///
/// # Arguments
///
/// * `markdown` - The raw document text, frontmatter included
/// * `path` - The repository-relative path (used for the title fallback)
///
/// # Returns
///
/// * `Ok(Extracted)` - Metadata and the frontmatter-stripped body
/// * `Err(PipelineError::ParseError)` - If the frontmatter block is present
///   but not a string-keyed map. A normal outcome for non-conforming input.
pub fn extract(markdown: &str, path: &str) -> Result<Extracted, PipelineError> {
    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<serde_json::Map<String, Value>> = matter
        .parse(markdown)
        .map_err(|e| PipelineError::parse(format!("Malformed frontmatter: {}", e)))?;
    let body = parsed.content;

    // No frontmatter block is fine: an empty pass-through map.
    let mut fields = parsed.data.unwrap_or_default();

    // title and description are interpreted here, not passed through.
    let fm_title = take_string(&mut fields, "title");
    let fm_description = take_string(&mut fields, "description");

    if let Some(date) = fields.get("date").and_then(Value::as_str) {
        let normalized = normalize_date(date);
        fields.insert("date".to_string(), Value::String(normalized));
    }

    let title = fm_title
        .or_else(|| first_heading(&body))
        .unwrap_or_else(|| filename_stem(path));

    let description = fm_description
        .or_else(|| derive_description(&body))
        .unwrap_or_default();

    Ok(Extracted {
        metadata: DocumentMetadata {
            title,
            description,
            extra: fields,
        },
        body,
    })
}

/// Remove a field and return it when it is a non-empty string.
fn take_string(fields: &mut serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Normalize a frontmatter date to `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates; anything else
/// is passed through unchanged.
fn normalize_date(raw: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"));
    }
    raw.to_string()
}

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+)$").expect("valid heading regex"));
static WIKILINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(?:[^\]|]*\|)?([^\]]+)\]\]").expect("valid wikilink regex"));
static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid inline link regex"));
static MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[_*~`>]").expect("valid marker regex"));

/// Resolve a title from the first first-level heading in the body.
///
/// Wikilink markers reduce to their text, inline links to their label, and
/// emphasis/code markers are stripped.
fn first_heading(body: &str) -> Option<String> {
    let raw = HEADING.captures(body)?.get(1)?.as_str();
    let text = WIKILINK.replace_all(raw, "$1");
    let text = INLINE_LINK.replace_all(&text, "$1");
    let text = MARKERS.replace_all(&text, "");
    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// The path's final segment with its markdown suffix removed.
fn filename_stem(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    strip_markdown_suffix(file).to_string()
}

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid code fence regex"));
static HTML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid html comment regex"));
static PERCENT_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)%%.*?%%").expect("valid percent comment regex"));
static YOUTUBE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*https?://(?:www\.)?(?:youtube\.com|youtu\.be)\S*[ \t]*$")
        .expect("valid youtube line regex")
});
static WIKILINK_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[\[(?:[^\]|]*\|)?([^\]]+)\]\]").expect("valid wikilink image regex")
});
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid image regex"));
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("valid html tag regex"));
static HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]*").expect("valid heading marker regex"));
static BLOCKQUOTE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*>[ \t]?").expect("valid blockquote regex"));
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*+]|\d+\.)[ \t]+").expect("valid list marker regex")
});
static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[*_~`]").expect("valid emphasis regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Derive a description from the body by reducing it to plain prose.
///
/// Applies the stripping rules in order: comments, bare YouTube URLs on
/// their own line, wikilink images and wikilinks, images, inline links,
/// code, embedded HTML, headings, blockquotes, lists, emphasis; then
/// collapses whitespace and truncates to [`DESCRIPTION_CHARS`] characters
/// with an ellipsis marker. Returns `None` when nothing is left.
fn derive_description(body: &str) -> Option<String> {
    let text = CODE_FENCE.replace_all(body, " ");
    let text = HTML_COMMENT.replace_all(&text, " ");
    let text = PERCENT_COMMENT.replace_all(&text, " ");
    let text = YOUTUBE_LINE.replace_all(&text, " ");
    let text = WIKILINK_IMAGE.replace_all(&text, "$1");
    let text = WIKILINK.replace_all(&text, "$1");
    let text = IMAGE.replace_all(&text, " ");
    let text = INLINE_LINK.replace_all(&text, "$1");
    let text = HTML_TAG.replace_all(&text, " ");
    let text = HEADING_MARKER.replace_all(&text, "");
    let text = BLOCKQUOTE_MARKER.replace_all(&text, "");
    let text = LIST_MARKER.replace_all(&text, "");
    let text = EMPHASIS.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = text.trim();

    if text.is_empty() {
        return None;
    }

    let summary: String = text.chars().take(DESCRIPTION_CHARS).collect();
    Some(format!("{}{}", summary, ELLIPSIS))
}
