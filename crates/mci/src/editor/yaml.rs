//! Line-level splicing for YAML documents.
//!
//! Handles a top-level `toolsets` key holding a block sequence (indented or
//! at column 0), a single-line flow sequence, or nothing at all. Anything
//! else returns `None` and the caller re-serialises.

use serde_json::Value as JsonValue;

use super::{Entry, Placement};

const KEY_SPELLINGS: [&str; 3] = ["toolsets", "\"toolsets\"", "'toolsets'"];
const DEFAULT_INDENT: &str = "  ";

struct Line<'a> {
    start: usize,
    /// Content without the line terminator.
    text: &'a str,
    /// Offset just past the terminator.
    end: usize,
}

impl Line<'_> {
    fn is_blank_or_comment(&self) -> bool {
        let t = self.text.trim_start();
        t.is_empty() || t.starts_with('#')
    }

    fn has_newline(&self) -> bool {
        self.end > self.start + self.text.len()
    }
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    for piece in text.split_inclusive('\n') {
        let content = piece.trim_end_matches(['\n', '\r']);
        out.push(Line {
            start,
            text: content,
            end: start + piece.len(),
        });
        start += piece.len();
    }
    out
}

/// Value text after `toolsets:` and the prefix length, for a top-level key line.
/// Blanks are allowed between the key and the colon.
fn key_rest(line: &str) -> Option<(usize, &str)> {
    KEY_SPELLINGS.iter().find_map(|key| {
        let after_key = line.strip_prefix(key)?;
        let rest = after_key.trim_start_matches([' ', '\t']).strip_prefix(':')?;
        let prefix_len = line.len() - rest.len();
        (rest.is_empty() || rest.starts_with([' ', '\t'])).then_some((prefix_len, rest))
    })
}

/// Terminator of the first terminated line, `\n` when there is none.
fn line_ending(text: &str) -> &'static str {
    match text.find('\n') {
        Some(i) if text[..i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

fn strip_eol(s: &str) -> &str {
    s.trim_end_matches(['\n', '\r'])
}

/// A scalar as it would appear in block context.
fn block_scalar(s: &str) -> String {
    match serde_yaml::to_string(s) {
        Ok(out) => {
            let out = out.trim_end_matches('\n');
            if out.contains('\n') || out.is_empty() {
                JsonValue::String(s.to_string()).to_string()
            } else {
                out.to_string()
            }
        }
        Err(_) => JsonValue::String(s.to_string()).to_string(),
    }
}

/// A scalar safe inside `[...]` or `{...}`.
fn flow_scalar(s: &str) -> String {
    let plain_chars = !s.is_empty()
        && !s.starts_with('-')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || "_./".contains(c) || c == '-');
    if plain_chars && block_scalar(s) == s {
        s.to_string()
    } else {
        JsonValue::String(s.to_string()).to_string()
    }
}

fn render_block(entry: &Entry, indent: &str, eol: &str) -> String {
    match entry.fields() {
        None => format!("{}- {}{}", indent, block_scalar(&entry.name), eol),
        Some(fields) => fields
            .iter()
            .enumerate()
            .map(|(i, (k, v))| {
                let lead = if i == 0 { "- " } else { "  " };
                format!("{}{}{}: {}{}", indent, lead, k, block_scalar(v), eol)
            })
            .collect(),
    }
}

fn render_flow(entry: &Entry) -> String {
    match entry.fields() {
        None => flow_scalar(&entry.name),
        Some(fields) => {
            let body: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}: {}", k, flow_scalar(v)))
                .collect();
            format!("{{{}}}", body.join(", "))
        }
    }
}

fn splice_at(text: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..start]);
    out.push_str(replacement);
    out.push_str(&text[end..]);
    out
}

/// Apply `placement` of `entry` to the YAML `text`.
pub(super) fn splice(text: &str, placement: Placement, entry: &Entry) -> Option<String> {
    let lines = split_lines(text);
    let eol = line_ending(text);
    let Some((key_idx, prefix_len, rest)) = lines
        .iter()
        .enumerate()
        .find_map(|(i, l)| key_rest(l.text).map(|(n, rest)| (i, n, rest)))
    else {
        return match placement {
            Placement::Create => Some(append_key(text, entry, eol)),
            _ => None,
        };
    };

    let value = rest.trim();
    if value.starts_with('[') {
        let open = lines[key_idx].start + prefix_len + (rest.len() - rest.trim_start().len());
        let line_end = lines[key_idx].start + lines[key_idx].text.len();
        return splice_flow(text, open, line_end, placement, entry);
    }
    if value.is_empty() || value.starts_with('#') {
        return splice_block(text, &lines, key_idx, placement, entry, eol);
    }
    if matches!(value, "null" | "Null" | "NULL" | "~") && placement == Placement::Create {
        let key_line = &lines[key_idx];
        let value_start = key_line.start + prefix_len;
        let value_end = key_line.start + key_line.text.len();
        let items = render_block(entry, DEFAULT_INDENT, eol);
        return Some(splice_at(
            text,
            value_start,
            value_end,
            &format!("{}{}", eol, strip_eol(&items)),
        ));
    }
    None
}

fn append_key(text: &str, entry: &Entry, eol: &str) -> String {
    let mut out = text.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(eol);
    }
    out.push_str("toolsets:");
    out.push_str(eol);
    out.push_str(&render_block(entry, DEFAULT_INDENT, eol));
    out
}

fn splice_block(
    text: &str,
    lines: &[Line<'_>],
    key_idx: usize,
    placement: Placement,
    entry: &Entry,
    eol: &str,
) -> Option<String> {
    let mut items: Vec<usize> = Vec::new();
    let mut item_indent: Option<usize> = None;
    let mut block_end = key_idx + 1;
    for (j, line) in lines.iter().enumerate().skip(key_idx + 1) {
        if line.is_blank_or_comment() {
            continue;
        }
        let trimmed = line.text.trim_start();
        let indent = line.text.len() - trimmed.len();
        let is_dash = trimmed == "-" || trimmed.starts_with("- ");
        if indent == 0 && !is_dash {
            break;
        }
        match item_indent {
            None if is_dash => {
                item_indent = Some(indent);
                items.push(j);
            }
            None => return None,
            Some(ii) if indent == ii && is_dash => items.push(j),
            Some(ii) if indent <= ii => return None,
            Some(_) => {}
        }
        block_end = j + 1;
    }

    let indent = " ".repeat(item_indent.unwrap_or(DEFAULT_INDENT.len()));
    let rendered = render_block(entry, &indent, eol);

    // Byte span of item `k`, excluding trailing blank and comment lines.
    let item_span = |k: usize| -> (usize, usize, bool) {
        let first = items[k];
        let mut last = items.get(k + 1).copied().unwrap_or(block_end) - 1;
        while last > first && lines[last].is_blank_or_comment() {
            last -= 1;
        }
        (lines[first].start, lines[last].end, lines[last].has_newline())
    };

    match placement {
        Placement::Replace(i) if i < items.len() => {
            let (start, end, newline) = item_span(i);
            let replacement = if newline {
                rendered
            } else {
                strip_eol(&rendered).to_string()
            };
            Some(splice_at(text, start, end, &replacement))
        }
        Placement::Append if !items.is_empty() => {
            let (_, end, newline) = item_span(items.len() - 1);
            let insert = if newline {
                rendered
            } else {
                format!("{}{}", eol, strip_eol(&rendered))
            };
            Some(splice_at(text, end, end, &insert))
        }
        Placement::Create if items.is_empty() => {
            let key_line = &lines[key_idx];
            let insert = if key_line.has_newline() {
                rendered
            } else {
                format!("{}{}", eol, strip_eol(&rendered))
            };
            Some(splice_at(text, key_line.end, key_line.end, &insert))
        }
        _ => None,
    }
}

/// Items of a flow sequence that opens at `open` and closes on the same line.
fn flow_items(text: &str, open: usize, line_end: usize) -> Option<(Vec<(usize, usize)>, usize)> {
    let bytes = text.as_bytes();
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut item_start = open + 1;
    let mut pos = open + 1;
    let push_item = |items: &mut Vec<(usize, usize)>, start: usize, end: usize| {
        let raw = &text[start..end];
        let lead = raw.len() - raw.trim_start().len();
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            items.push((start + lead, start + lead + trimmed.len()));
        }
    };
    while pos < line_end {
        let b = bytes[pos];
        match quote {
            Some(b'"') if b == b'\\' => pos += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'[' | b'{' => depth += 1,
                b']' if depth == 0 => {
                    push_item(&mut items, item_start, pos);
                    let tail = text[pos + 1..line_end].trim_start();
                    return (tail.is_empty() || tail.starts_with('#')).then_some((items, pos));
                }
                b']' | b'}' => depth = depth.checked_sub(1)?,
                b',' if depth == 0 => {
                    push_item(&mut items, item_start, pos);
                    item_start = pos + 1;
                }
                b'#' => return None,
                _ => {}
            },
        }
        pos += 1;
    }
    None
}

fn splice_flow(
    text: &str,
    open: usize,
    line_end: usize,
    placement: Placement,
    entry: &Entry,
) -> Option<String> {
    let (items, close) = flow_items(text, open, line_end)?;
    let rendered = render_flow(entry);
    match placement {
        Placement::Replace(i) => {
            let (start, end) = *items.get(i)?;
            Some(splice_at(text, start, end, &rendered))
        }
        Placement::Append => match (items.first(), items.get(1), items.last()) {
            (Some(first), second, Some(last)) => {
                let sep = second.map_or(", ", |s| &text[first.1..s.0]);
                Some(splice_at(text, last.1, last.1, &format!("{}{}", sep, rendered)))
            }
            _ => Some(splice_at(text, open + 1, close, &rendered)),
        },
        Placement::Create => None,
    }
}
