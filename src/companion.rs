//! Companion lookup
//!
//! A narrow, failure-tolerant capability for reading a conventionally
//! related sibling file (e.g. the `.ts` source behind a `.html` template).
//! Rules receive it injected so they stay pure and never touch the file
//! system themselves; any failure is absence of evidence, not an error.

use dashmap::DashMap;
use std::path::{Path, PathBuf};

/// Read access to companion files. Implementations must never panic or
/// block indefinitely; `None` means "no evidence".
pub trait CompanionLookup: Send + Sync {
    fn try_read(&self, path: &Path) -> Option<String>;
}

/// Lookup that never finds anything. The default for embedders that scan
/// artifacts without a surrounding project tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompanions;

impl CompanionLookup for NoCompanions {
    fn try_read(&self, _path: &Path) -> Option<String> {
        None
    }
}

/// In-memory lookup over a fixed path → content map.
#[derive(Debug, Default)]
pub struct InMemoryCompanions {
    files: DashMap<PathBuf, String>,
}

impl InMemoryCompanions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

impl CompanionLookup for InMemoryCompanions {
    fn try_read(&self, path: &Path) -> Option<String> {
        self.files.get(path).map(|entry| entry.value().clone())
    }
}

/// Read-through cache over another lookup.
///
/// Both hits and misses are cached write-once, so one analysis pass reads
/// any companion at most once even when many rules consult it concurrently.
pub struct CachedLookup<L> {
    inner: L,
    cache: DashMap<PathBuf, Option<String>>,
}

impl<L: CompanionLookup> CachedLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }
}

impl<L: CompanionLookup> CompanionLookup for CachedLookup<L> {
    fn try_read(&self, path: &Path) -> Option<String> {
        if let Some(entry) = self.cache.get(path) {
            return entry.value().clone();
        }
        let value = self.inner.try_read(path);
        self.cache
            .entry(path.to_path_buf())
            .or_insert_with(|| value.clone());
        value
    }
}

/// Conventional source sibling for a template path:
/// `list.component.html` → `list.component.ts`.
pub fn template_source_sibling(template_path: &Path) -> Option<PathBuf> {
    let ext = template_path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case("html") && !ext.eq_ignore_ascii_case("htm") {
        return None;
    }
    Some(template_path.with_extension("ts"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn sibling_path_swaps_extension() {
        assert_eq!(
            template_source_sibling(Path::new("app/list.component.html")),
            Some(PathBuf::from("app/list.component.ts"))
        );
        assert_eq!(template_source_sibling(Path::new("app/list.component.ts")), None);
    }

    #[test]
    fn in_memory_lookup_round_trips() {
        let companions = InMemoryCompanions::new();
        companions.insert("a.ts", "export class A {}");
        assert_eq!(
            companions.try_read(Path::new("a.ts")).as_deref(),
            Some("export class A {}")
        );
        assert!(companions.try_read(Path::new("b.ts")).is_none());
    }

    #[test]
    fn cached_lookup_reads_through_once() {
        struct Counting(AtomicUsize);
        impl CompanionLookup for Counting {
            fn try_read(&self, _path: &Path) -> Option<String> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Some("content".into())
            }
        }

        let cached = CachedLookup::new(Counting(AtomicUsize::new(0)));
        assert_eq!(cached.try_read(Path::new("x.ts")).as_deref(), Some("content"));
        assert_eq!(cached.try_read(Path::new("x.ts")).as_deref(), Some("content"));
        assert_eq!(cached.inner.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn misses_are_cached_too() {
        let cached = CachedLookup::new(NoCompanions);
        assert!(cached.try_read(Path::new("missing.ts")).is_none());
        assert!(cached.cache.contains_key(Path::new("missing.ts")));
    }
}
