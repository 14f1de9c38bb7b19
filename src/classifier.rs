//! Source classifier
//!
//! Assigns an [`ArtifactKind`] to each scanned file from path and content
//! signatures. Precedence is first-match-wins to keep ambiguous files
//! deterministic:
//!
//! 1. extension (`.html`, known config filenames)
//! 2. file naming (test specs, routing modules)
//! 3. decorators (`@Component`, `@Injectable`, `@Directive`, `@Pipe`)
//! 4. store API signatures and store filename conventions
//! 5. fallback to `Other`
//!
//! Pure, no I/O; ambiguity degrades to `Other`, never an error.

use crate::models::{ArtifactKind, ScannedFile};
use std::path::Path;

const CONFIG_FILENAMES: &[&str] = &[
    "angular.json",
    "nx.json",
    "project.json",
    "package.json",
    "tsconfig.json",
    "tsconfig.app.json",
    "tsconfig.spec.json",
];

const STORE_API_MARKERS: &[&str] = &[
    "createReducer(",
    "createSelector(",
    "createFeatureSelector(",
    "createAction(",
    "createEffect(",
    "signalStore(",
    "ComponentStore",
    "@ngrx",
];

const STORE_NAME_SUFFIXES: &[&str] = &[
    ".reducer.ts",
    ".selectors.ts",
    ".actions.ts",
    ".effects.ts",
    ".store.ts",
];

/// Classify one artifact from its path and content.
pub fn classify(path: &Path, content: &str) -> ArtifactKind {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    // 1. Extension-based.
    if file_name.ends_with(".html") || file_name.ends_with(".htm") {
        return ArtifactKind::Template;
    }
    if CONFIG_FILENAMES.contains(&file_name.as_str()) {
        return ArtifactKind::Config;
    }

    // 2. Name-based.
    if file_name.ends_with(".spec.ts") || file_name.ends_with(".test.ts") {
        return ArtifactKind::Test;
    }
    if file_name.ends_with("-routing.module.ts")
        || file_name.ends_with(".routes.ts")
        || content.contains("RouterModule.forRoot(")
        || content.contains("RouterModule.forChild(")
    {
        return ArtifactKind::Routing;
    }

    // 3. Decorator-based. `@Pipe` classes are injectable stateless providers,
    // so they ride the service rule set.
    if content.contains("@Component(") {
        return ArtifactKind::Component;
    }
    if content.contains("@Injectable(") || content.contains("@Pipe(") {
        return ArtifactKind::Service;
    }
    if content.contains("@Directive(") {
        return ArtifactKind::Directive;
    }

    // 4. Store signatures.
    if STORE_API_MARKERS.iter().any(|m| content.contains(m))
        || STORE_NAME_SUFFIXES.iter().any(|s| file_name.ends_with(s))
    {
        return ArtifactKind::Store;
    }

    ArtifactKind::Other
}

/// Classify a scanned file, refining the scanner's coarse hint.
///
/// The classifier's answer is authoritative; the hint only breaks the tie
/// when content inspection yields `Other`.
pub fn classify_file(file: &ScannedFile) -> ArtifactKind {
    match classify(&file.path, &file.content) {
        ArtifactKind::Other => file.hint.unwrap_or(ArtifactKind::Other),
        kind => kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn kind_of(path: &str, content: &str) -> ArtifactKind {
        classify(&PathBuf::from(path), content)
    }

    #[test]
    fn html_extension_wins_over_content() {
        assert_eq!(
            kind_of("app/list.component.html", "@Component( nonsense"),
            ArtifactKind::Template
        );
    }

    #[test]
    fn config_filenames_are_config() {
        assert_eq!(kind_of("angular.json", "{}"), ArtifactKind::Config);
        assert_eq!(kind_of("sub/dir/tsconfig.json", "{}"), ArtifactKind::Config);
    }

    #[test]
    fn spec_naming_beats_decorators() {
        assert_eq!(
            kind_of("app/list.component.spec.ts", "@Component({}) class X {}"),
            ArtifactKind::Test
        );
    }

    #[test]
    fn routing_by_name_and_by_usage() {
        assert_eq!(
            kind_of("app/app-routing.module.ts", ""),
            ArtifactKind::Routing
        );
        assert_eq!(
            kind_of("app/shell.module.ts", "RouterModule.forChild(routes)"),
            ArtifactKind::Routing
        );
    }

    #[test]
    fn decorators_classify_components_and_services() {
        assert_eq!(
            kind_of("x.ts", "@Component({selector: 'x'}) export class X {}"),
            ArtifactKind::Component
        );
        assert_eq!(
            kind_of("x.ts", "@Injectable({providedIn: 'root'}) export class S {}"),
            ArtifactKind::Service
        );
        assert_eq!(
            kind_of("x.ts", "@Directive({selector: '[appX]'}) export class D {}"),
            ArtifactKind::Directive
        );
        assert_eq!(
            kind_of("x.ts", "@Pipe({name: 'shorten'}) export class P {}"),
            ArtifactKind::Service
        );
    }

    #[test]
    fn store_by_api_or_filename() {
        assert_eq!(
            kind_of("users.ts", "export const reducer = createReducer(initial);"),
            ArtifactKind::Store
        );
        assert_eq!(kind_of("users.reducer.ts", ""), ArtifactKind::Store);
    }

    #[test]
    fn unknown_falls_back_to_other() {
        assert_eq!(kind_of("util.ts", "export const x = 1;"), ArtifactKind::Other);
    }

    #[test]
    fn hint_only_applies_when_content_is_inconclusive() {
        let hinted = ScannedFile::new("helpers.ts", "export const x = 1;")
            .with_hint(ArtifactKind::Service);
        assert_eq!(classify_file(&hinted), ArtifactKind::Service);

        let decisive = ScannedFile::new("x.ts", "@Component({}) class X {}")
            .with_hint(ArtifactKind::Store);
        assert_eq!(classify_file(&decisive), ArtifactKind::Component);
    }
}
