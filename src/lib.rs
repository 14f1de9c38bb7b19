//! Rule-based anti-pattern detection engine for Angular-style web projects.
//!
//! The engine consumes in-memory source artifacts handed over by an external
//! scanner, classifies each one, derives structural facts for templates, and
//! runs every registered detection rule for the artifact's kind. Findings are
//! merged into an [`report::AnalysisResult`] that downstream reporters and CI
//! gates can query and filter.
//!
//! # Architecture
//!
//! ```text
//! ScannedFile ──▶ Classifier ──▶ TemplateAnalyzer (templates only)
//!                     │                  │
//!                     ▼                  ▼
//!                RuleEngine ◀── RuleRegistry (kind → rules)
//!                     │
//!                     ▼
//!             aggregate() ──▶ AnalysisResult
//! ```
//!
//! Directory traversal, CLI parsing, configuration loading, and report
//! rendering are intentionally left to the embedding application; the crate
//! exposes narrow seams ([`companion::CompanionLookup`], [`config::RuleConfig`],
//! [`models::ScannedFile`]) instead.
//!
//! # Usage
//!
//! ```ignore
//! use nganalyzer::{
//!     companion::NoCompanions,
//!     config::RuleConfig,
//!     models::ScannedFile,
//!     pipeline::AnalysisPipeline,
//! };
//!
//! let files = vec![ScannedFile::new("src/app/list.component.html", markup)];
//! let pipeline = AnalysisPipeline::new(RuleConfig::default(), 0);
//! let result = pipeline.run("my-project", files, &NoCompanions)?;
//! if result.has_critical_issues() {
//!     std::process::exit(1);
//! }
//! ```

pub mod classifier;
pub mod companion;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod template;

pub use companion::{CachedLookup, CompanionLookup, InMemoryCompanions, NoCompanions};
pub use config::RuleConfig;
pub use models::{ArtifactKind, Finding, Location, ScannedFile, Severity, SourceArtifact};
pub use pipeline::{AnalysisError, AnalysisPipeline};
pub use report::{aggregate, AnalysisResult, EngineWarning};
pub use rules::ids::{RuleCategory, RuleId};
pub use template::{StructuralFacts, TemplateAnalyzer};
