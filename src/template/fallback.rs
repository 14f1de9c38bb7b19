//! Regex fallback for unparseable templates
//!
//! When the strict parse fails, the same two tree-derived facts (structural
//! directives and call sites) are re-derived from interpolation and
//! directive-attribute syntax directly, with positions computed from raw
//! byte offsets. Lossier than the tree walk, but it never fails.

use super::{collect_call_sites, StructuralDirective, StructuralFacts};
use regex::Regex;
use std::sync::OnceLock;

static INTERPOLATION: OnceLock<Regex> = OnceLock::new();
static DIRECTIVE_ATTR: OnceLock<Regex> = OnceLock::new();

fn interpolation() -> &'static Regex {
    INTERPOLATION.get_or_init(|| Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap())
}

fn directive_attr() -> &'static Regex {
    DIRECTIVE_ATTR.get_or_init(|| {
        Regex::new(r#"\*([A-Za-z][A-Za-z0-9]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
    })
}

/// All `{{ ... }}` expressions in `text` with the byte offset of each
/// expression body relative to `text`.
pub(crate) fn interpolations(text: &str) -> Vec<(&str, usize)> {
    interpolation()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| (m.as_str(), m.start())))
        .collect()
}

/// Re-derive structural directives and call sites from raw markup.
pub(crate) fn derive_facts(markup: &str, facts: &mut StructuralFacts) {
    for caps in directive_attr().captures_iter(markup) {
        let name = caps.get(1).expect("capture 1 exists").as_str().to_string();
        let raw_value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        facts
            .structural_directives
            .push(StructuralDirective { name, raw_value });
    }

    for (expr, offset) in interpolations(markup) {
        collect_call_sites(markup, expr, Some(offset), &mut facts.function_call_sites);
    }
}
