//! Analysis pipeline
//!
//! Drives one pass over a batch of scanned files: classify, derive template
//! facts, dispatch rules, aggregate. Artifacts have no data dependencies on
//! each other, so the per-artifact work runs on a bounded worker pool;
//! aggregation is the join point.

use crate::classifier::classify_file;
use crate::companion::CompanionLookup;
use crate::config::RuleConfig;
use crate::models::{ArtifactKind, ScannedFile, SourceArtifact};
use crate::report::{aggregate, AnalysisResult, ArtifactReport};
use crate::rules::engine::RuleEngine;
use crate::rules::registry::RuleRegistry;
use crate::template::TemplateAnalyzer;
use chrono::Utc;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Fatal pipeline errors. Everything recoverable (parse failures, rule
/// errors, missing companions) degrades to warnings instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// One configured analysis pass. Construct once, run over many batches.
pub struct AnalysisPipeline {
    engine: RuleEngine,
    workers: usize,
    cancel: Arc<AtomicBool>,
}

impl AnalysisPipeline {
    /// Build a pipeline with the default rule set.
    ///
    /// `workers` of 0 auto-detects, capped at 16.
    pub fn new(config: RuleConfig, workers: usize) -> Self {
        Self::with_registry(RuleRegistry::with_defaults(), config, workers)
    }

    /// Build with a custom registry (the composition root for embedders).
    pub fn with_registry(registry: RuleRegistry, config: RuleConfig, workers: usize) -> Self {
        let actual_workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
                .min(16)
        } else {
            workers
        };
        Self {
            engine: RuleEngine::new(registry, config),
            workers: actual_workers,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancellation handle; checked between artifacts, so a long run stops
    /// at the next artifact boundary.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Analyze one batch of scanned files.
    ///
    /// An empty batch is a valid (empty) result, not an error.
    pub fn run(
        &self,
        project_path: impl Into<PathBuf>,
        files: Vec<ScannedFile>,
        companions: &(dyn CompanionLookup),
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let timestamp = Utc::now();
        let project_path = project_path.into();

        info!(
            "analyzing {} artifacts with {} workers",
            files.len(),
            self.workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;

        let analyzer = TemplateAnalyzer::new();
        let cancel = Arc::clone(&self.cancel);

        let reports: Vec<ArtifactReport> = pool.install(|| {
            files
                .into_par_iter()
                .map(|file| {
                    if cancel.load(Ordering::Relaxed) {
                        return None;
                    }
                    Some(self.process_one(file, &analyzer, companions))
                })
                .while_some()
                .collect()
        });

        let cancelled = self.cancel.load(Ordering::Relaxed);
        let mut result = aggregate(project_path, reports, timestamp, started.elapsed());
        if cancelled {
            result.warnings.push(crate::report::EngineWarning {
                artifact: PathBuf::new(),
                rule: None,
                message: "analysis cancelled before all artifacts were processed".into(),
            });
        }

        info!(
            "analysis complete: {} findings, {} warnings in {:?}",
            result.findings.len(),
            result.warnings.len(),
            result.duration
        );
        Ok(result)
    }

    /// Classify, analyze, and dispatch a single artifact.
    fn process_one(
        &self,
        file: ScannedFile,
        analyzer: &TemplateAnalyzer,
        companions: &dyn CompanionLookup,
    ) -> ArtifactReport {
        let kind = classify_file(&file);
        let artifact = SourceArtifact::new(file.path, file.content, kind);
        debug!("{} classified as {kind}", artifact.path.display());

        let facts = (kind == ArtifactKind::Template)
            .then(|| analyzer.analyze(&artifact.content));

        self.engine.evaluate(&artifact, facts.as_ref(), companions)
    }
}
