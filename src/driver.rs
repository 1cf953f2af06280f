//! One run of the utility: gate, open the repository, validate, merge and
//! persist each target document type, then report.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::execution::{ExecutionMethod, check_execution};
use crate::memory::MemoryRepository;
use crate::merge::{MergeOutcome, merge};
use crate::model::RemovalSet;
use crate::repo::{DocumentTypeRepository, PropertyRepository};
use crate::stats::{Category, Stats, Stopwatch};
use crate::store::PgStore;
use crate::validate::validate;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Validating,
    Processing,
    Reporting,
    Done,
    Aborted,
}

impl Phase {
    pub fn can_advance_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Init, Phase::Validating)
                | (Phase::Validating, Phase::Processing)
                | (Phase::Validating, Phase::Aborted)
                | (Phase::Processing, Phase::Reporting)
                | (Phase::Reporting, Phase::Done)
        )
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed,
    /// Validation failed; no document type was touched.
    Aborted(Error),
}

#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stats: Stats,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed)
    }
}

struct Driver<'a, R> {
    cfg: &'a Config,
    repo: &'a R,
    phase: Phase,
    stats: Stats,
    timer: Stopwatch,
}

/// Gate on the execution method, open the configured repository and run.
///
/// The gate runs before any repository is opened, so a disallowed method is
/// always reported as [`Error::ExecutionMethod`].
pub async fn execute(cfg: &Config, method: ExecutionMethod) -> Result<RunReport> {
    check_execution(method, &cfg.execution_methods)?;

    if let Some(url) = &cfg.postgres_url {
        // Connection is released when `store` drops, on every path out of here
        let store = PgStore::connect(url).await?;
        return run(cfg, &store).await;
    }
    if let Some(path) = &cfg.snapshot {
        let repo = MemoryRepository::load(path)?;
        let report = run(cfg, &repo).await?;
        if !cfg.dry_run && report.stats.get(Category::Updated) > 0 {
            repo.save(path)?;
        }
        return Ok(report);
    }
    Err(Error::Msg("no repository configured: set postgres_url or snapshot".to_string()))
}

/// Validate and process every configured document type against `repo`.
///
/// Returns `Err` for a repository failure outside of per-item updates. An
/// unresolvable configured name ends the run with [`RunOutcome::Aborted`].
pub async fn run<R>(cfg: &Config, repo: &R) -> Result<RunReport>
where
    R: PropertyRepository + DocumentTypeRepository,
{
    let mut driver = Driver {
        cfg,
        repo,
        phase: Phase::Init,
        stats: Stats::new(),
        timer: Stopwatch::start(),
    };
    driver.run().await
}

impl<R> Driver<'_, R>
where
    R: PropertyRepository + DocumentTypeRepository,
{
    fn advance(&mut self, next: Phase) {
        debug_assert!(self.phase.can_advance_to(next), "{:?} -> {:?}", self.phase, next);
        tracing::debug!(from = ?self.phase, to = ?next, "phase transition");
        self.phase = next;
    }

    async fn run(&mut self) -> Result<RunReport> {
        if self.cfg.dry_run {
            tracing::warn!("DRY RUN: no write operations will occur");
        }
        tracing::info!(
            doc_types = ?self.cfg.doc_types,
            remove_props = ?self.cfg.remove_props,
            "beginning run"
        );

        self.advance(Phase::Validating);
        let removal: RemovalSet = self.cfg.remove_props.iter().cloned().collect();
        let resolved = match validate(self.repo, &removal, &self.cfg.doc_types).await {
            Ok(resolved) => resolved,
            Err(e @ Error::NotFound { .. }) => {
                self.advance(Phase::Aborted);
                tracing::error!(error = %e, "one or more inputs failed to validate");
                return Ok(self.report(RunOutcome::Aborted(e)));
            }
            Err(e) => return Err(e),
        };

        self.advance(Phase::Processing);
        for doc_type in &resolved.doc_types {
            tracing::debug!(doc_type = %doc_type.name, "processing document type");
            let kept = match merge(doc_type, &resolved.removal) {
                MergeOutcome::Unchanged => {
                    self.stats.inc(Category::NoChanges);
                    tracing::warn!(doc_type = %doc_type.name, "no properties need to be removed, skipping update");
                    continue;
                }
                MergeOutcome::Changed(kept) => kept,
            };

            if self.cfg.dry_run {
                self.stats.inc(Category::DryRunUpdated);
                tracing::info!(doc_type = %doc_type.name, kept = kept.len(), "DRY RUN: document type would have been updated");
                continue;
            }

            match self.repo.update_doc_type(&doc_type.with_props(kept)).await {
                Ok(()) => {
                    self.stats.inc(Category::Updated);
                    tracing::info!(doc_type = %doc_type.name, "document type updated");
                }
                Err(e) => {
                    self.stats.inc(Category::UpdateErrors);
                    tracing::error!(doc_type = %doc_type.name, error = %e, "unable to update document type");
                }
            }
        }

        self.advance(Phase::Reporting);
        let report = self.report(RunOutcome::Completed);
        tracing::info!(elapsed = ?report.elapsed, "results:\n{}", report.stats);
        self.advance(Phase::Done);
        Ok(report)
    }

    fn report(&self, outcome: RunOutcome) -> RunReport {
        RunReport {
            outcome,
            stats: self.stats.clone(),
            elapsed: self.timer.elapsed(),
        }
    }
}
