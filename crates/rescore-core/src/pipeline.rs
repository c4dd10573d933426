use crate::config::PipelineConfig;
use crate::outcome::{ConversionOutcome, PipelineError};
use crate::paths::{is_same_file, sibling_path};
use crate::report::{ArtifactReport, BatchReport};
use rescore_domain_ingest::{decode, encode, read_payload, repair, SourceArtifact};
use rescore_ports::notation::NotationInterpreterPort;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

/// Per-artifact progress hooks for a batch run.
pub trait BatchProgress {
    fn on_artifact_start(&self, _index: usize, _total: usize, _path: &Path) {}
    fn on_artifact_done(
        &self,
        _index: usize,
        _total: usize,
        _path: &Path,
        _outcome: &ConversionOutcome,
    ) {
    }
}

/// Progress sink that ignores every event.
pub struct NoProgress;

impl BatchProgress for NoProgress {}

/// Reads, decodes, repairs and renders notation artifacts one at a time.
pub struct Pipeline<I: NotationInterpreterPort> {
    interpreter: I,
    config: PipelineConfig,
}

impl<I: NotationInterpreterPort> Pipeline<I> {
    pub fn new(interpreter: I, config: PipelineConfig) -> Self {
        Self {
            interpreter,
            config,
        }
    }

    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every path in order. A failing artifact never stops the batch.
    pub fn run_batch<P: AsRef<Path>>(
        &self,
        paths: &[P],
        progress: &dyn BatchProgress,
    ) -> BatchReport {
        let total = paths.len();
        let mut seen: HashSet<PathBuf> = HashSet::with_capacity(total);
        let mut report = BatchReport::default();

        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            progress.on_artifact_start(index, total, path);

            let outcome = if seen.insert(path.to_path_buf()) {
                self.convert(path)
            } else {
                ConversionOutcome::Skipped {
                    reason: "already processed in this batch".to_string(),
                }
            };

            progress.on_artifact_done(index, total, path, &outcome);
            report.artifacts.push(ArtifactReport {
                input: path.to_path_buf(),
                outcome,
            });
        }

        info!(
            converted = report.converted(),
            failed = report.failed(),
            skipped = report.skipped(),
            "batch finished"
        );
        report
    }

    /// Converts a single artifact, folding every failure into the outcome.
    pub fn convert(&self, path: &Path) -> ConversionOutcome {
        let _span = info_span!("artifact", path = %path.display()).entered();

        let artifact = match SourceArtifact::detect(path, &self.config.rules, self.config.encoding)
        {
            Ok(artifact) => artifact,
            Err(err) => return PipelineError::from(err).into(),
        };
        if path.is_dir() {
            return ConversionOutcome::Skipped {
                reason: "path is a directory".to_string(),
            };
        }

        match self.run(&artifact) {
            Ok(outputs) => ConversionOutcome::Converted { outputs },
            Err(err) => {
                warn!(kind = %err.kind(), error = %err, "conversion failed");
                err.into()
            }
        }
    }

    fn run(&self, artifact: &SourceArtifact) -> Result<Vec<PathBuf>, PipelineError> {
        let path = artifact.path();

        let bytes = read_payload(artifact, &self.config.rules)?;
        info!(kind = ?artifact.kind(), bytes = bytes.len(), "payload read");

        let raw = decode(&bytes, artifact.encoding())?;
        info!(encoding = %artifact.encoding(), chars = raw.len(), "payload decoded");

        let (repaired, stats) = repair(raw);
        info!(
            tag_prefixes = stats.tag_prefixes,
            attribute_prefixes = stats.attribute_prefixes,
            "namespaces repaired"
        );

        let mut outputs = Vec::with_capacity(2);
        if self.config.persist_repaired {
            let target = sibling_path(path, self.config.notation_format.extension());
            if is_same_file(&target, path) {
                info!(target = %target.display(), "repaired copy would overwrite the input, not written");
            } else {
                let data = encode(repaired.as_str(), artifact.encoding());
                std::fs::write(&target, data).map_err(|source| PipelineError::OutputWrite {
                    path: target.clone(),
                    source,
                })?;
                info!(target = %target.display(), "repaired document written");
                outputs.push(target);
            }
        }

        let score = self
            .interpreter
            .parse(repaired.as_str(), self.config.notation_format)?;
        let rendered = sibling_path(path, self.config.render_format.extension());
        self.interpreter
            .render(&score, self.config.render_format, &rendered)?;
        info!(output = %rendered.display(), "rendered");
        outputs.push(rendered);

        Ok(outputs)
    }
}
