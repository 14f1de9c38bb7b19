//! Strict markup parser
//!
//! A small recursive-descent parser that either produces a full node tree or
//! fails with a positioned error. It is deliberately strict: mismatched or
//! malformed tags abort the parse so the analyzer can fall back to its
//! regex-based recovery path instead of walking a half-correct tree.

use thiserror::Error;

/// Parse failure with the byte offset where parsing stopped.
#[derive(Debug, Clone, Error)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// One attribute on an element. `value_offset` is the byte offset of the
/// first character inside the quotes, for line/column derivation.
#[derive(Debug, Clone)]
pub struct Attr {
    pub name: String,
    pub value: Option<String>,
    pub name_offset: usize,
    pub value_offset: usize,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct Text {
    pub content: String,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(Text),
}

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Parse markup into a node forest, or fail on the first structural error.
pub fn parse(src: &str) -> Result<Vec<Node>, ParseError> {
    let mut parser = Parser {
        src,
        bytes: src.as_bytes(),
        pos: 0,
    };
    let nodes = parser.parse_nodes(None)?;
    if parser.pos < parser.bytes.len() {
        return Err(ParseError::new("unexpected closing tag", parser.pos));
    }
    Ok(nodes)
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_nodes(&mut self, closing: Option<&str>) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        loop {
            if self.pos >= self.bytes.len() {
                if let Some(tag) = closing {
                    return Err(ParseError::new(
                        format!("missing closing tag </{tag}>"),
                        self.pos,
                    ));
                }
                return Ok(nodes);
            }

            if self.starts_with("<!--") {
                self.skip_comment()?;
                continue;
            }
            if self.starts_with("<!") {
                // Doctype and friends: skip to the closing angle bracket.
                self.skip_until(b'>')?;
                continue;
            }
            if self.starts_with("</") {
                let close_start = self.pos;
                let name = self.parse_closing_tag()?;
                match closing {
                    Some(expected) if expected.eq_ignore_ascii_case(&name) => return Ok(nodes),
                    Some(expected) => {
                        return Err(ParseError::new(
                            format!("expected </{expected}>, found </{name}>"),
                            close_start,
                        ))
                    }
                    None => {
                        // Caller (the root) rejects trailing input.
                        self.pos = close_start;
                        return Ok(nodes);
                    }
                }
            }
            if self.starts_with("<") {
                nodes.push(self.parse_element()?);
                continue;
            }

            nodes.push(self.parse_text());
        }
    }

    fn parse_element(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        self.pos += 1; // consume '<'
        let name = self.parse_name().ok_or_else(|| ParseError::new("malformed tag name", self.pos))?;

        let mut attrs = Vec::new();
        let self_closed = loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::new("unterminated tag", self.pos)),
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'/') => {
                    if self.bytes.get(self.pos + 1) == Some(&b'>') {
                        self.pos += 2;
                        break true;
                    }
                    return Err(ParseError::new("stray '/' in tag", self.pos));
                }
                Some(_) => attrs.push(self.parse_attr()?),
            }
        };

        let lower = name.to_ascii_lowercase();
        let children = if self_closed || VOID_ELEMENTS.contains(&lower.as_str()) {
            Vec::new()
        } else {
            self.parse_nodes(Some(&name))?
        };

        Ok(Node::Element(Element {
            name,
            attrs,
            children,
            offset: start,
        }))
    }

    fn parse_attr(&mut self) -> Result<Attr, ParseError> {
        let name_offset = self.pos;
        let mut name = String::new();
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/') {
                break;
            }
            name.push(b as char);
            self.pos += 1;
        }
        if name.is_empty() {
            return Err(ParseError::new("malformed attribute", self.pos));
        }

        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            return Ok(Attr {
                name,
                value: None,
                name_offset,
                value_offset: name_offset,
            });
        }
        self.pos += 1;
        self.skip_whitespace();

        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(ParseError::new("attribute value must be quoted", self.pos)),
        };
        self.pos += 1;
        let value_offset = self.pos;
        let rel = memchr::memchr(quote, &self.bytes[self.pos..])
            .ok_or_else(|| ParseError::new("unterminated attribute value", self.pos))?;
        let value = self.src[self.pos..self.pos + rel].to_string();
        self.pos += rel + 1;

        Ok(Attr {
            name,
            value: Some(value),
            name_offset,
            value_offset,
        })
    }

    fn parse_closing_tag(&mut self) -> Result<String, ParseError> {
        self.pos += 2; // consume '</'
        let name = self
            .parse_name()
            .ok_or_else(|| ParseError::new("malformed closing tag", self.pos))?;
        self.skip_whitespace();
        if self.peek() != Some(b'>') {
            return Err(ParseError::new("malformed closing tag", self.pos));
        }
        self.pos += 1;
        Ok(name)
    }

    fn parse_text(&mut self) -> Node {
        let start = self.pos;
        let rel = memchr::memchr(b'<', &self.bytes[self.pos..]).unwrap_or(self.bytes.len() - self.pos);
        self.pos += rel;
        Node::Text(Text {
            content: self.src[start..self.pos].to_string(),
            offset: start,
        })
    }

    fn parse_name(&mut self) -> Option<String> {
        let first = self.peek()?;
        if !first.is_ascii_alphabetic() {
            return None;
        }
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Some(self.src[start..self.pos].to_string())
    }

    fn skip_comment(&mut self) -> Result<(), ParseError> {
        let rel = memchr::memmem::find(&self.bytes[self.pos..], b"-->")
            .ok_or_else(|| ParseError::new("unterminated comment", self.pos))?;
        self.pos += rel + 3;
        Ok(())
    }

    fn skip_until(&mut self, byte: u8) -> Result<(), ParseError> {
        let rel = memchr::memchr(byte, &self.bytes[self.pos..])
            .ok_or_else(|| ParseError::new("unterminated markup declaration", self.pos))?;
        self.pos += rel + 1;
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.bytes[self.pos..].starts_with(prefix.as_bytes())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }
}

/// Depth-first traversal over a node forest.
pub fn walk<'n>(nodes: &'n [Node], visit: &mut impl FnMut(&'n Node, usize)) {
    fn go<'n>(node: &'n Node, depth: usize, visit: &mut impl FnMut(&'n Node, usize)) {
        visit(node, depth);
        if let Node::Element(el) = node {
            for child in &el.children {
                go(child, depth + 1, visit);
            }
        }
    }
    for node in nodes {
        go(node, 0, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_with_attrs() {
        let nodes = parse(r#"<div class="row"><span [title]="name">{{ name }}</span></div>"#).unwrap();
        assert_eq!(nodes.len(), 1);
        let Node::Element(div) = &nodes[0] else {
            panic!("expected element")
        };
        assert_eq!(div.name, "div");
        assert_eq!(div.attrs[0].name, "class");
        assert_eq!(div.attrs[0].value.as_deref(), Some("row"));

        let Node::Element(span) = &div.children[0] else {
            panic!("expected span")
        };
        assert_eq!(span.attrs[0].name, "[title]");
        assert!(matches!(&span.children[0], Node::Text(t) if t.content.contains("{{ name }}")));
    }

    #[test]
    fn void_elements_need_no_close() {
        let nodes = parse(r#"<div><img src="x.png"><br></div>"#).unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn structural_attr_names_survive() {
        let nodes = parse(r#"<li *ngFor="let u of users">{{ u.name }}</li>"#).unwrap();
        let Node::Element(li) = &nodes[0] else {
            panic!()
        };
        assert_eq!(li.attrs[0].name, "*ngFor");
        assert_eq!(li.attrs[0].value.as_deref(), Some("let u of users"));
    }

    #[test]
    fn mismatched_close_is_an_error() {
        let err = parse("<div><span></div></span>").unwrap_err();
        assert!(err.message.contains("</span>"), "got: {}", err.message);
    }

    #[test]
    fn unterminated_tag_is_an_error() {
        assert!(parse("<div <span>").is_err());
        assert!(parse("<div").is_err());
    }

    #[test]
    fn unquoted_attr_value_is_an_error() {
        assert!(parse("<div class=row></div>").is_err());
    }

    #[test]
    fn comments_and_doctype_are_skipped() {
        let nodes = parse("<!DOCTYPE html><!-- note --><p>hi</p>").unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn walk_reports_depth() {
        let nodes = parse("<ul><li><b>x</b></li></ul>").unwrap();
        let mut max_depth = 0;
        walk(&nodes, &mut |_, d| max_depth = max_depth.max(d));
        assert_eq!(max_depth, 3); // ul > li > b > text
    }
}
