//! Template structural analyzer
//!
//! Turns raw markup into a normalized [`StructuralFacts`] record that all
//! template rules share. Resilience comes from three phases:
//!
//! 1. text-level signals that never need a parse (always run)
//! 2. a strict tree parse with a depth-first fact walk (best effort)
//! 3. a regex fallback re-deriving the phase-2 facts when the parse fails
//!
//! A malformed template downgrades from phase 2 to phase 3 with a warning;
//! it never fails the caller.

pub mod fallback;
pub mod parser;

use crate::rules::text::line_col;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::warn;

/// A `*`-prefixed directive attribute found on an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralDirective {
    /// Directive name without the sigil, e.g. `ngFor`.
    pub name: String,
    pub raw_value: String,
}

/// A function-call expression embedded in a binding or interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    pub expression: String,
    /// 1-based; 0 when the position could not be derived.
    pub line: u32,
    pub col: u32,
}

/// Normalized template facts, computed once per template artifact and
/// shared read-only by every template rule in the same pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StructuralFacts {
    pub has_track_by: bool,
    pub structural_directive_count: usize,
    pub structural_directives: Vec<StructuralDirective>,
    pub function_call_sites: Vec<CallSite>,
    pub unsafe_inner_html: bool,
    pub nested_anchor_tags: bool,
    pub dynamic_content_detected: bool,
}

/// Pipe-like names that look like calls inside expressions but are part of
/// the rendering machinery rather than work done per change-detection cycle.
const BUILTIN_CALL_ALLOWLIST: &[&str] = &[
    "async",
    "json",
    "date",
    "number",
    "currency",
    "percent",
    "uppercase",
    "lowercase",
    "titlecase",
    "slice",
    "keyvalue",
    "$any",
];

/// Value sources that render differently on every pass, a proxy for
/// hydration-unsafe content.
const DYNAMIC_VALUE_MARKERS: &[&str] = &["Math.random(", "Date.now(", "new Date("];

static ANCHOR_TAG: OnceLock<Regex> = OnceLock::new();
static INTER_TAG_WHITESPACE: OnceLock<Regex> = OnceLock::new();
static CALL_SYNTAX: OnceLock<Regex> = OnceLock::new();

fn anchor_tag() -> &'static Regex {
    ANCHOR_TAG.get_or_init(|| Regex::new(r"(?i)</a\s*>|<a(?:\s[^>]*)?>").unwrap())
}

fn inter_tag_whitespace() -> &'static Regex {
    INTER_TAG_WHITESPACE.get_or_init(|| Regex::new(r">\s+<").unwrap())
}

fn call_syntax() -> &'static Regex {
    CALL_SYNTAX.get_or_init(|| Regex::new(r"([A-Za-z_$][A-Za-z0-9_$]*)\s*\(").unwrap())
}

/// Scan one expression for call syntax, appending allowed findings.
///
/// `base_offset` is the expression's byte offset in the original markup, or
/// `None` when positions cannot be derived (call sites then carry 0/0).
pub(crate) fn collect_call_sites(
    markup: &str,
    expression: &str,
    base_offset: Option<usize>,
    out: &mut Vec<CallSite>,
) {
    for caps in call_syntax().captures_iter(expression) {
        let ident = caps.get(1).expect("capture 1 exists");
        if BUILTIN_CALL_ALLOWLIST.contains(&ident.as_str()) {
            continue;
        }
        let (line, col) = match base_offset {
            Some(base) => line_col(markup, base + ident.start()),
            None => (0, 0),
        };
        out.push(CallSite {
            expression: expression.trim().to_string(),
            line,
            col,
        });
    }
}

/// Three-phase template analyzer. Cheap to construct; hold one per pass.
#[derive(Debug, Default)]
pub struct TemplateAnalyzer {
    _private: (),
}

impl TemplateAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce structural facts for one template. Never fails: a strict
    /// parse error silently downgrades to the regex fallback.
    pub fn analyze(&self, markup: &str) -> StructuralFacts {
        let mut facts = self.text_level_facts(markup);

        match parser::parse(markup) {
            Ok(nodes) => self.walk_tree(markup, &nodes, &mut facts),
            Err(err) => {
                warn!("template parse failed, using regex fallback: {err}");
                fallback::derive_facts(markup, &mut facts);
            }
        }

        facts
    }

    /// Phase 1: signals that survive any malformed input.
    fn text_level_facts(&self, markup: &str) -> StructuralFacts {
        StructuralFacts {
            has_track_by: markup.contains("trackBy") || markup.contains("; track"),
            structural_directive_count: crate::rules::text::count_token(markup, "*ngFor"),
            structural_directives: Vec::new(),
            function_call_sites: Vec::new(),
            unsafe_inner_html: markup.contains("[innerHTML]"),
            nested_anchor_tags: self.has_nested_anchors(markup),
            dynamic_content_detected: DYNAMIC_VALUE_MARKERS.iter().any(|m| markup.contains(m)),
        }
    }

    /// Stack-based same-tag nesting scan for inline anchors.
    ///
    /// Whitespace between adjacent tags is normalized first so formatting
    /// cannot hide `<a><a>` pairs. Self-closing anchors do not push.
    fn has_nested_anchors(&self, markup: &str) -> bool {
        let normalized = inter_tag_whitespace().replace_all(markup, "><");
        let mut depth = 0usize;
        for m in anchor_tag().find_iter(&normalized) {
            let tag = m.as_str();
            if tag.starts_with("</") {
                depth = depth.saturating_sub(1);
            } else if !tag.ends_with("/>") {
                depth += 1;
                if depth > 1 {
                    return true;
                }
            }
        }
        false
    }

    /// Phase 2: depth-first fact collection over the strict parse tree.
    fn walk_tree(&self, markup: &str, nodes: &[parser::Node], facts: &mut StructuralFacts) {
        parser::walk(nodes, &mut |node, _depth| match node {
            parser::Node::Element(el) => {
                for attr in &el.attrs {
                    if let Some(name) = attr.name.strip_prefix('*') {
                        facts.structural_directives.push(StructuralDirective {
                            name: name.to_string(),
                            raw_value: attr.value.clone().unwrap_or_default(),
                        });
                    } else if attr.name.starts_with('[') || attr.name.starts_with('(') {
                        if let Some(value) = &attr.value {
                            collect_call_sites(
                                markup,
                                value,
                                Some(attr.value_offset),
                                &mut facts.function_call_sites,
                            );
                        }
                    }
                }
            }
            parser::Node::Text(text) => {
                for (expr, rel) in fallback::interpolations(&text.content) {
                    collect_call_sites(
                        markup,
                        expr,
                        Some(text.offset + rel),
                        &mut facts.function_call_sites,
                    );
                }
            }
        });
    }
}
