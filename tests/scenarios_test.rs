//! End-to-end scenarios through the public API
//!
//! Each test drives the full pipeline (classify -> facts -> dispatch ->
//! aggregate) the way an embedding scanner would.

use nganalyzer::{
    AnalysisPipeline, InMemoryCompanions, NoCompanions, RuleConfig, ScannedFile, Severity,
};

fn pipeline() -> AnalysisPipeline {
    AnalysisPipeline::new(RuleConfig::default(), 2)
}

/// A component with the given number of imports and total lines.
fn component_source(imports: usize, lines: usize) -> String {
    let mut src = String::new();
    for i in 0..imports {
        src.push_str(&format!("import {{ Dep{i} }} from './dep{i}';\n"));
    }
    src.push_str("@Component({ selector: 'app-big', templateUrl: './big.component.html' })\n");
    src.push_str("export class BigComponent {\n");
    let mut line_count = src.lines().count() + 1;
    while line_count < lines {
        src.push_str("  // widget wiring\n");
        line_count += 1;
    }
    src.push_str("}\n");
    src
}

#[test]
fn god_component_above_first_bounds_is_high() {
    let files = vec![ScannedFile::new(
        "src/app/big.component.ts",
        component_source(22, 410),
    )];
    let result = pipeline().run("proj", files, &NoCompanions).unwrap();

    let god: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.rule.as_str() == "god-component")
        .collect();
    assert_eq!(god.len(), 1);
    assert_eq!(god[0].severity, Severity::High);
}

#[test]
fn god_component_past_critical_bound_escalates() {
    let files = vec![ScannedFile::new(
        "src/app/big.component.ts",
        component_source(35, 410),
    )];
    let result = pipeline().run("proj", files, &NoCompanions).unwrap();

    let god: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.rule.as_str() == "god-component")
        .collect();
    assert_eq!(god.len(), 1);
    assert_eq!(god[0].severity, Severity::Critical);
}

#[test]
fn nested_anchors_raise_a_critical_hydration_finding() {
    let files = vec![ScannedFile::new(
        "src/app/nav.component.html",
        "<a><a></a></a>",
    )];
    let result = pipeline().run("proj", files, &NoCompanions).unwrap();

    let nested: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.rule.as_str() == "nested-anchor-tags")
        .collect();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].severity, Severity::Critical);
    assert!(result.has_critical_issues());
}

#[test]
fn service_injecting_itself_is_critical() {
    let src = "@Injectable({ providedIn: 'root' })\n\
               export class FooService {\n\
               \x20 constructor(private peer: FooService) {}\n\
               }\n";
    let files = vec![ScannedFile::new("src/app/foo.service.ts", src)];
    let result = pipeline().run("proj", files, &NoCompanions).unwrap();

    let cycles: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.rule.as_str() == "self-injection-cycle")
        .collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].severity, Severity::Critical);
}

#[test]
fn missing_track_by_is_medium_without_companion_evidence() {
    let files = vec![ScannedFile::new(
        "src/app/list.component.html",
        r#"<li *ngFor="let item of items">{{ item.name }}</li>"#,
    )];
    let result = pipeline().run("proj", files, &NoCompanions).unwrap();

    let track: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.rule.as_str() == "missing-track-by")
        .collect();
    assert_eq!(track.len(), 1);
    assert_eq!(track[0].severity, Severity::Medium);
}

#[test]
fn missing_track_by_escalates_with_large_collection_signal() {
    let companions = InMemoryCompanions::new();
    companions.insert(
        "src/app/list.component.ts",
        "@Component({})\nexport class ListComponent {\n  items = this.api.loadAll();\n}\n",
    );
    let files = vec![ScannedFile::new(
        "src/app/list.component.html",
        r#"<li *ngFor="let item of items">{{ item.name }}</li>"#,
    )];
    let result = pipeline().run("proj", files, &companions).unwrap();

    let track: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.rule.as_str() == "missing-track-by")
        .collect();
    assert_eq!(track.len(), 1);
    assert_eq!(track[0].severity, Severity::High);
}

#[test]
fn empty_artifact_list_yields_empty_result() {
    let result = pipeline().run("proj", vec![], &NoCompanions).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.findings.len(), 0);
    assert!(result.severity_counts().is_empty());
}

#[test]
fn malformed_template_still_produces_findings() {
    // Broken markup: the strict parse fails, the fallback still derives
    // directives, and phase-1 signals survive untouched.
    let files = vec![ScannedFile::new(
        "src/app/broken.component.html",
        "<div [innerHTML]=\"raw\"\n<li *ngFor=\"let i of items\">{{ load() }}</li>",
    )];
    let result = pipeline().run("proj", files, &NoCompanions).unwrap();

    assert!(result
        .findings
        .iter()
        .any(|f| f.rule.as_str() == "unsafe-inner-html"));
    assert!(result
        .findings
        .iter()
        .any(|f| f.rule.as_str() == "missing-track-by"));
}
