//! Byte-span splicing for JSON documents.

use serde_json::Value as JsonValue;

use super::{Entry, Placement};

type Span = (usize, usize);

struct Member {
    key: String,
    key_start: usize,
    value: Span,
}

/// Top-level object members and the positions of its braces.
struct ObjectLayout {
    open: usize,
    close: usize,
    members: Vec<Member>,
}

/// Array elements and the positions of its brackets.
struct ArrayLayout {
    open: usize,
    close: usize,
    elements: Vec<Span>,
}

struct Scanner<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self {
            src: text.as_bytes(),
            text,
            pos,
        }
    }

    fn skip_ws(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.src.get(self.pos) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Option<usize> {
        self.skip_ws();
        (self.peek()? == byte).then(|| {
            self.pos += 1;
            self.pos - 1
        })
    }

    fn string(&mut self) -> Option<Span> {
        let start = self.pos;
        if self.peek()? != b'"' {
            return None;
        }
        self.pos += 1;
        loop {
            match self.peek()? {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return Some((start, self.pos));
                }
                _ => self.pos += 1,
            }
        }
    }

    fn value(&mut self) -> Option<Span> {
        self.skip_ws();
        let start = self.pos;
        match self.peek()? {
            b'"' => self.string(),
            b'{' | b'[' => {
                let mut depth = 0usize;
                loop {
                    match self.peek()? {
                        b'"' => {
                            self.string()?;
                            continue;
                        }
                        b'{' | b'[' => depth += 1,
                        b'}' | b']' => {
                            depth -= 1;
                            if depth == 0 {
                                self.pos += 1;
                                return Some((start, self.pos));
                            }
                        }
                        _ => {}
                    }
                    self.pos += 1;
                }
            }
            _ => {
                while let Some(b) = self.peek() {
                    if matches!(b, b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r') {
                        break;
                    }
                    self.pos += 1;
                }
                (self.pos > start).then_some((start, self.pos))
            }
        }
    }

    fn object(&mut self) -> Option<ObjectLayout> {
        let open = self.expect(b'{')?;
        let mut members = Vec::new();
        self.skip_ws();
        if self.peek()? == b'}' {
            self.pos += 1;
            return Some(ObjectLayout {
                open,
                close: self.pos - 1,
                members,
            });
        }
        loop {
            self.skip_ws();
            let key_span = self.string()?;
            let key: String = serde_json::from_str(&self.text[key_span.0..key_span.1]).ok()?;
            self.expect(b':')?;
            let value = self.value()?;
            members.push(Member {
                key,
                key_start: key_span.0,
                value,
            });
            self.skip_ws();
            match self.peek()? {
                b',' => self.pos += 1,
                b'}' => {
                    self.pos += 1;
                    return Some(ObjectLayout {
                        open,
                        close: self.pos - 1,
                        members,
                    });
                }
                _ => return None,
            }
        }
    }

    fn array(&mut self) -> Option<ArrayLayout> {
        let open = self.expect(b'[')?;
        let mut elements = Vec::new();
        self.skip_ws();
        if self.peek()? == b']' {
            self.pos += 1;
            return Some(ArrayLayout {
                open,
                close: self.pos - 1,
                elements,
            });
        }
        loop {
            elements.push(self.value()?);
            self.skip_ws();
            match self.peek()? {
                b',' => self.pos += 1,
                b']' => {
                    self.pos += 1;
                    return Some(ArrayLayout {
                        open,
                        close: self.pos - 1,
                        elements,
                    });
                }
                _ => return None,
            }
        }
    }
}

/// Render an entry on one line: `"name"` or `{"name": .., "filter": .., "filterValue": ..}`.
fn render(entry: &Entry) -> String {
    match entry.fields() {
        None => JsonValue::String(entry.name.clone()).to_string(),
        Some(fields) => {
            let body: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("\"{}\": {}", k, JsonValue::String(v.clone())))
                .collect();
            format!("{{{}}}", body.join(", "))
        }
    }
}

/// Separator to put before a new trailing item, copied from the existing
/// layout: the text between the first two items, or a newline plus the
/// first item's indent when the container is multi-line.
fn separator(text: &str, open: usize, first_start: usize, second_start: Option<usize>, first_end: usize) -> String {
    if let Some(second) = second_start {
        return text[first_end..second].to_string();
    }
    let leading = &text[open + 1..first_start];
    if leading.contains('\n') {
        let line_start = text[..first_start].rfind('\n').map_or(0, |i| i + 1);
        format!(",\n{}", &text[line_start..first_start])
    } else {
        ", ".to_string()
    }
}

fn splice_at(text: &str, span: Span, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..span.0]);
    out.push_str(replacement);
    out.push_str(&text[span.1..]);
    out
}

/// Apply `placement` of `entry` to the JSON `text`. `None` when the layout
/// could not be scanned.
pub(super) fn splice(text: &str, placement: Placement, entry: &Entry) -> Option<String> {
    let root = Scanner::new(text, 0).object()?;
    let rendered = render(entry);
    let toolsets = root.members.iter().rev().find(|m| m.key == "toolsets");

    match (placement, toolsets) {
        (Placement::Replace(i), Some(member)) => {
            let array = Scanner::new(text, member.value.0).array()?;
            let span = *array.elements.get(i)?;
            Some(splice_at(text, span, &rendered))
        }
        (Placement::Append, Some(member)) => {
            let array = Scanner::new(text, member.value.0).array()?;
            match (array.elements.first(), array.elements.last()) {
                (Some(first), Some(last)) => {
                    let sep = separator(
                        text,
                        array.open,
                        first.0,
                        array.elements.get(1).map(|s| s.0),
                        first.1,
                    );
                    Some(splice_at(text, (last.1, last.1), &format!("{}{}", sep, rendered)))
                }
                _ => Some(splice_at(text, (array.open + 1, array.close), &rendered)),
            }
        }
        (Placement::Create, Some(member)) => {
            Some(splice_at(text, member.value, &format!("[{}]", rendered)))
        }
        (Placement::Create, None) => {
            let new_member = format!("\"toolsets\": [{}]", rendered);
            match (root.members.first(), root.members.last()) {
                (Some(first), Some(last)) => {
                    let sep = separator(
                        text,
                        root.open,
                        first.key_start,
                        root.members.get(1).map(|m| m.key_start),
                        first.value.1,
                    );
                    Some(splice_at(
                        text,
                        (last.value.1, last.value.1),
                        &format!("{}{}", sep, new_member),
                    ))
                }
                _ => Some(splice_at(text, (root.open + 1, root.close), &new_member)),
            }
        }
        _ => None,
    }
}
