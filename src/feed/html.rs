//! Text helpers for feed content: entity decoding, tag stripping, slugs.

use super::types::EXCERPT_LENGTH;

/// Maximum slug base length (before the uniqueness suffix).
pub const MAX_SLUG_BASE_LENGTH: usize = 60;

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Unwrap CDATA sections from raw element content.
///
/// Returns None when the content does not start with a CDATA section.
/// Every section is unwrapped; text between sections is kept as-is.
pub fn unwrap_cdata(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !trimmed.starts_with(CDATA_OPEN) {
        return None;
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut rest = trimmed;
    while let Some(start) = rest.find(CDATA_OPEN) {
        out.push_str(&rest[..start]);
        let body = &rest[start + CDATA_OPEN.len()..];
        match body.find(CDATA_CLOSE) {
            Some(end) => {
                out.push_str(&body[..end]);
                rest = &body[end + CDATA_CLOSE.len()..];
            }
            None => {
                // Unterminated section: keep what is there
                out.push_str(body);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    Some(out)
}

/// Decode numeric, hex, and the five standard named character references.
///
/// Decoding is a single pass, so `&amp;amp;` becomes `&amp;`.
/// Unknown or malformed references are kept verbatim.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        // References are short; don't scan the whole document for ';'
        let decoded = after
            .char_indices()
            .take(12)
            .find(|(_, c)| *c == ';')
            .and_then(|(semi, _)| decode_reference(&after[..semi]).map(|c| (c, semi)));

        match decoded {
            Some((ch, semi)) => {
                result.push(ch);
                rest = &after[semi + 1..];
            }
            None => {
                result.push('&');
                rest = after;
            }
        }
    }
    result.push_str(rest);

    result
}

fn decode_reference(entity: &str) -> Option<char> {
    match entity {
        "quot" => Some('"'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        _ => parse_numeric_entity(entity).and_then(char::from_u32),
    }
}

/// Parse a numeric reference body (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse().ok()
    } else {
        None
    }
}

/// Strip markup tags and collapse whitespace.
pub fn strip_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                result.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    result.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Build a plain-text excerpt of at most [`EXCERPT_LENGTH`] characters.
pub fn excerpt(html: &str) -> String {
    strip_tags(html).chars().take(EXCERPT_LENGTH).collect()
}

/// Find the `src` of the first `<img>` tag.
pub fn first_img_src(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let mut offset = 0;

    while let Some(pos) = lower[offset..].find("<img") {
        let tag_start = offset + pos;
        let tag_end = lower[tag_start..]
            .find('>')
            .map(|e| tag_start + e)
            .unwrap_or(lower.len());

        if let Some(src) = attribute_value(&html[tag_start..tag_end], &lower[tag_start..tag_end], "src")
        {
            if !src.is_empty() {
                return Some(decode_entities(&src));
            }
        }
        offset = tag_end;
    }

    None
}

/// Extract a quoted attribute value from a single tag.
///
/// `lower` must be the ASCII-lowercased copy of `tag` (same byte offsets).
fn attribute_value(tag: &str, lower: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=");
    let mut search = 0;

    while let Some(pos) = lower[search..].find(&needle) {
        let start = search + pos;
        // Must be a whole attribute name, e.g. not "data-src="
        let boundary = start == 0
            || lower[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_whitespace());
        let value_start = start + needle.len();

        if boundary {
            let value = &tag[value_start..];
            let quote = value.chars().next()?;
            if quote == '"' || quote == '\'' {
                let inner = &value[1..];
                return inner.find(quote).map(|end| inner[..end].to_string());
            }
            let end = value
                .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                .unwrap_or(value.len());
            return Some(value[..end].to_string());
        }
        search = value_start;
    }

    None
}

/// Kebab-case a title for use as a slug base.
///
/// Keeps ASCII alphanumerics, joins the rest with single hyphens, and falls
/// back to "post" when nothing is left.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            let hyphen = pending_hyphen && !slug.is_empty();
            if slug.len() + usize::from(hyphen) + 1 > MAX_SLUG_BASE_LENGTH {
                break;
            }
            if hyphen {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        "post".to_string()
    } else {
        slug
    }
}
