//! Text-level heuristics shared by rules
//!
//! Rules work on raw source text, so the primitives here do the heavy
//! lifting: SIMD substring search, 1-based line/column math, and
//! string-literal-aware delimiter matching for extracting call bodies.

use memchr::{memchr_iter, memmem, memrchr};

/// Count non-overlapping occurrences of `token` in `content`.
pub fn count_token(content: &str, token: &str) -> usize {
    memmem::find_iter(content.as_bytes(), token.as_bytes()).count()
}

/// Byte offsets of every occurrence of `token`.
pub fn token_offsets(content: &str, token: &str) -> Vec<usize> {
    memmem::find_iter(content.as_bytes(), token.as_bytes()).collect()
}

/// 1-based line numbers of every occurrence of `token`.
pub fn token_lines(content: &str, token: &str) -> Vec<u32> {
    token_offsets(content, token)
        .into_iter()
        .map(|off| line_col(content, off).0)
        .collect()
}

/// 1-based (line, column) of a byte offset.
pub fn line_col(content: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let prefix = &content.as_bytes()[..offset];
    let line = memchr_iter(b'\n', prefix).count() as u32 + 1;
    let line_start = memrchr(b'\n', prefix).map(|i| i + 1).unwrap_or(0);
    let col = (offset - line_start) as u32 + 1;
    (line, col)
}

/// 1-based line number of the first occurrence of `token`, if any.
pub fn first_token_line(content: &str, token: &str) -> Option<u32> {
    memmem::find(content.as_bytes(), token.as_bytes()).map(|off| line_col(content, off).0)
}

/// Find the byte offset of the delimiter matching the one at `open`.
///
/// Skips delimiters inside `'`, `"`, and backtick string literals, honoring
/// backslash escapes. Returns `None` when `open` does not sit on a supported
/// opening delimiter or the span never closes.
pub fn matching_delimiter(content: &str, open: usize) -> Option<usize> {
    let bytes = content.as_bytes();
    let (open_ch, close_ch) = match bytes.get(open)? {
        b'(' => (b'(', b')'),
        b'{' => (b'{', b'}'),
        b'[' => (b'[', b']'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut in_str: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(quote) = in_str {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == quote {
                in_str = None;
            }
        } else if matches!(b, b'"' | b'\'' | b'`') {
            in_str = Some(b);
        } else if b == open_ch {
            depth += 1;
        } else if b == close_ch {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Extract the argument span of a call whose name starts at `call_offset`.
///
/// `call_offset` points at the call token (e.g. the `s` of `subscribe(`);
/// the returned range covers everything strictly between the call's opening
/// parenthesis and its balanced closing one.
pub fn call_argument_span(content: &str, call_offset: usize) -> Option<std::ops::Range<usize>> {
    let open_rel = memchr::memchr(b'(', &content.as_bytes()[call_offset..])?;
    let open = call_offset + open_rel;
    let close = matching_delimiter(content, open)?;
    Some(open + 1..close)
}

/// Replace the interior of every string literal with spaces.
///
/// Length and line structure are preserved so offsets computed on the
/// blanked copy stay valid against the original.
pub fn blank_string_literals(content: &str) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(content.len());
    let bytes = content.as_bytes();
    let mut in_str: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match in_str {
            Some(quote) => {
                if b == b'\\' {
                    out.push(b' ');
                    if i + 1 < bytes.len() {
                        out.push(if bytes[i + 1] == b'\n' { b'\n' } else { b' ' });
                        i += 2;
                        continue;
                    }
                } else if b == quote {
                    in_str = None;
                    out.push(b);
                } else {
                    out.push(if b == b'\n' { b'\n' } else { b' ' });
                }
            }
            None => {
                if matches!(b, b'"' | b'\'' | b'`') {
                    in_str = Some(b);
                }
                out.push(b);
            }
        }
        i += 1;
    }
    // Sound because only ASCII bytes were substituted.
    String::from_utf8(out).unwrap_or_else(|_| content.to_string())
}

/// Count `import` statements at the top level of a TypeScript artifact.
pub fn import_count(content: &str) -> usize {
    content
        .lines()
        .filter(|line| {
            let t = line.trim_start();
            t.starts_with("import ") || t.starts_with("import{") || t.starts_with("import(")
        })
        .count()
}

/// True when the trimmed line is a `//` or `/*` comment.
pub fn is_comment_line(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("//") || t.starts_with("/*") || t.starts_with('*')
}
