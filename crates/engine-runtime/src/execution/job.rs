use crate::execution::validation;
use chrono::{DateTime, Utc};
use engine_config::report::summary::{BatchProgress, RunResult, SweepSummary};
use engine_core::{
    connectors::{
        source::{EntityTransform, ExternalSource, SerdeTransform},
        target::TargetStore,
    },
    error::{ReconcileError, RunAborted, StateStoreError},
    reporter::{RunReporter, TracingReporter},
    state::{BatchStateStore, TrackingIndexStore},
    statistics::StatisticsRecorder,
};
use engine_processing::{
    batch_state::BatchStateManager,
    reconciler::EntityReconciler,
    tracking::{TrackingManager, sweep_unseen},
};
use model::{
    pagination::{
        cursor::{PageRequest, PaginationMode},
        state::BatchState,
    },
    policy::RunPolicy,
    records::entity::SyncEntity,
    statistics::ProcessStatistics,
    tracking::TrackingIndex,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const DRY_RUN_SUFFIX: &str = ":dry-run";

/// Per-invocation bookkeeping. Dropped when the run ends.
struct RunContext {
    /// Key the persisted state of this run lives under.
    state_key: String,
    run_id: String,
    policy: RunPolicy,
    statistics: StatisticsRecorder,
    started_at: DateTime<Utc>,
}

impl RunContext {
    fn new(state_key: impl Into<String>, policy: RunPolicy) -> Self {
        RunContext {
            state_key: state_key.into(),
            run_id: uuid::Uuid::new_v4().to_string(),
            policy,
            statistics: StatisticsRecorder::new(),
            started_at: Utc::now(),
        }
    }
}

/// One synchronization job: a source, the transform turning its records into entities, the
/// target they are reconciled into, and where progress is kept between invocations.
pub struct SyncJob {
    key: String,
    source: Arc<dyn ExternalSource>,
    transform: Arc<dyn EntityTransform>,
    target: Arc<dyn TargetStore>,
    batch_store: Option<Arc<dyn BatchStateStore>>,
    tracking_store: Option<Arc<dyn TrackingIndexStore>>,
    reporter: Arc<dyn RunReporter>,
}

impl SyncJob {
    pub fn builder(key: impl Into<String>) -> SyncJobBuilder {
        SyncJobBuilder::new(key)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Dry runs keep their progress apart from live runs of the same job.
    pub fn state_key(&self, policy: RunPolicy) -> String {
        state_key(&self.key, policy.dry_run)
    }

    pub fn batch_manager(&self, policy: RunPolicy) -> Option<BatchStateManager> {
        self.batch_store
            .clone()
            .map(|store| BatchStateManager::new(self.state_key(policy), store))
    }

    /// Drops every persisted record of the job.
    pub async fn clear_state(&self) -> Result<(), StateStoreError> {
        clear_job_state(
            &self.key,
            self.batch_store.as_deref(),
            self.tracking_store.as_deref(),
        )
        .await
    }

    /// Reconciles the whole stream in a single pass. No batch state is read or written.
    pub async fn run_full(
        &self,
        locator: &str,
        policy: RunPolicy,
    ) -> Result<RunResult, RunAborted> {
        let ctx = RunContext::new(self.state_key(policy), policy);
        info!(job = %self.key, run_id = %ctx.run_id, locator, "Starting synchronization");

        match self.execute_full(&ctx, locator).await {
            Ok(sweep) => Ok(self.finish(ctx, None, sweep)),
            Err(err) => Err(self.abort(&ctx, err)),
        }
    }

    /// Reconciles the next batch of the stream and persists progress once it succeeded.
    pub async fn run_batch(
        &self,
        locator: &str,
        policy: RunPolicy,
        batches: &BatchStateManager,
        batch_size: usize,
        max_entities: Option<usize>,
    ) -> Result<RunResult, RunAborted> {
        let ctx = RunContext::new(batches.key(), policy);
        info!(
            job = %self.key,
            run_id = %ctx.run_id,
            locator,
            batch_size,
            max_entities = ?max_entities,
            "Starting batched synchronization"
        );

        match self
            .execute_batch(&ctx, locator, batches, batch_size, max_entities)
            .await
        {
            Ok((progress, sweep)) => Ok(self.finish(ctx, Some(progress), sweep)),
            Err(err) => Err(self.abort(&ctx, err)),
        }
    }

    /// Aborts before anything was read, e.g. when a required collaborator is missing.
    pub fn reject(&self, policy: RunPolicy, err: ReconcileError) -> RunAborted {
        let ctx = RunContext::new(self.state_key(policy), policy);
        self.abort(&ctx, err)
    }

    async fn execute_full(
        &self,
        ctx: &RunContext,
        locator: &str,
    ) -> Result<Option<SweepSummary>, ReconcileError> {
        let page = self.source.read_batch(locator, &PageRequest::All).await?;
        validation::validate_full_page(&page)?;

        let entities = self.transform.transform(page.records)?;
        validation::validate_entities(&entities)?;

        self.reporter.info(&format!(
            "Synchronizing '{}' from {locator}: {} entities in a single pass{}",
            self.key,
            entities.len(),
            dry_run_marker(ctx.policy)
        ));
        ctx.statistics.record_incoming(entities.len() as u64);

        let tracking = TrackingManager::new(&ctx.state_key, self.tracking_store.clone());
        let mut index = if ctx.policy.delete_unprocessed {
            Some(tracking.prepare(self.target.as_ref(), true).await?)
        } else {
            None
        };

        self.reconcile_entities(ctx, entities, index.as_mut()).await?;

        match &index {
            Some(index) => Ok(Some(self.sweep(ctx, index).await?)),
            None => Ok(None),
        }
    }

    async fn execute_batch(
        &self,
        ctx: &RunContext,
        locator: &str,
        batches: &BatchStateManager,
        batch_size: usize,
        max_entities: Option<usize>,
    ) -> Result<(BatchProgress, Option<SweepSummary>), ReconcileError> {
        let tracking = TrackingManager::new(&ctx.state_key, self.tracking_store.clone());
        if ctx.policy.delete_unprocessed && !tracking.has_store() {
            return Err(ReconcileError::DependencyUnavailable(format!(
                "tracking index store for destructive job '{}'",
                self.key
            )));
        }

        let descriptor = self.source.describe(locator).await?;
        if descriptor.mode == PaginationMode::Counted && descriptor.length.is_none() {
            return Err(ReconcileError::StreamInvalid(format!(
                "counted source {locator} did not report its length"
            )));
        }

        let decision = batches
            .read_current(batch_size, &descriptor, max_entities)
            .await?;
        let state = decision.state;

        let request = state.page_request();
        debug!(job = %self.key, request = %request, "Reading batch");
        let page = self.source.read_batch(locator, &request).await?;
        validation::validate_batch_page(&state, &page)?;

        // Only persisted once the whole batch went through.
        let mut next = state.clone();
        next.advance(&page);

        let entities = self.transform.transform(page.records)?;
        validation::validate_entities(&entities)?;

        self.announce_batch(ctx, &state, entities.len());
        ctx.statistics.record_incoming(entities.len() as u64);

        let mut index = if ctx.policy.delete_unprocessed {
            Some(
                tracking
                    .prepare(self.target.as_ref(), state.is_first_batch())
                    .await?,
            )
        } else {
            None
        };

        self.reconcile_entities(ctx, entities, index.as_mut()).await?;

        let mut sweep = None;
        if next.is_complete
            && let Some(index) = &index
        {
            sweep = Some(self.sweep(ctx, index).await?);
        }

        // Written before the commit. The index must cover every committed batch, so a batch
        // reconciled without tracking drops it.
        if !next.is_complete {
            match &index {
                Some(index) => tracking.persist(index).await?,
                None => tracking.clear().await?,
            }
        }
        batches.commit(&next).await?;
        if next.is_complete {
            tracking.clear().await?;
        }

        info!(
            job = %self.key,
            batch = state.current_batch,
            entities_read = next.entities_read,
            complete = next.is_complete,
            "Batch committed"
        );

        let reset_reason = decision.reset.map(|reason| reason.to_string());
        Ok((
            BatchProgress::new(state.current_batch, &next, reset_reason),
            sweep,
        ))
    }

    /// Applies the per-entity decision in source order. Entity-level failures either end the run
    /// or are recorded as no-ops, depending on `stop_on_error`.
    async fn reconcile_entities(
        &self,
        ctx: &RunContext,
        entities: Vec<SyncEntity>,
        mut tracking: Option<&mut TrackingIndex>,
    ) -> Result<(), ReconcileError> {
        let reconciler =
            EntityReconciler::new(self.target.clone(), ctx.statistics.clone(), ctx.policy);

        for entity in entities {
            let unique_identifier = entity.unique_identifier.clone();
            match reconciler.reconcile(entity, tracking.as_deref_mut()).await {
                Ok(outcome) => {
                    debug!(
                        unique_identifier = %unique_identifier,
                        outcome = ?outcome,
                        "Reconciled"
                    );
                }
                Err(err) if err.is_entity_level() && !ctx.policy.stop_on_error => {
                    warn!(
                        job = %self.key,
                        unique_identifier = %unique_identifier,
                        error = %err,
                        "Entity failed, leaving it untouched"
                    );
                    self.reporter
                        .error(&format!("Entity '{unique_identifier}' failed: {err}"));
                    ctx.statistics.record_skipped();
                    ctx.statistics.record_failed();

                    // A failed lookup could hide a live entity from the sweep.
                    if matches!(err, ReconcileError::EntityReadFailure { .. })
                        && let Some(index) = tracking.as_deref_mut()
                    {
                        index.mark_unresolved(unique_identifier);
                    }
                }
                Err(err) => {
                    error!(
                        job = %self.key,
                        unique_identifier = %unique_identifier,
                        error = %err,
                        "Entity failed, stopping"
                    );
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn sweep(
        &self,
        ctx: &RunContext,
        index: &TrackingIndex,
    ) -> Result<SweepSummary, ReconcileError> {
        let report =
            sweep_unseen(self.target.as_ref(), index, ctx.policy, &ctx.statistics).await?;

        if report.blocked {
            self.reporter.error(&format!(
                "Skipped deleting unprocessed entities of '{}': {} target lookups failed",
                self.key,
                index.unresolved().len()
            ));
        } else {
            self.reporter.info(&format!(
                "Deleted {} entities of '{}' missing from the source{}",
                report.deleted.len(),
                self.key,
                dry_run_marker(ctx.policy)
            ));
        }

        Ok(SweepSummary {
            deleted: report.deleted.len(),
            failed: report.failed.len(),
            blocked: report.blocked,
        })
    }

    fn announce_batch(&self, ctx: &RunContext, state: &BatchState, entities: usize) {
        let total = state
            .total_batches
            .map_or_else(|| "?".to_string(), |total| total.to_string());
        self.reporter.info(&format!(
            "Synchronizing '{}': batch {} of {} ({} pagination), {} entities, {} read so far{}",
            self.key,
            state.current_batch,
            total,
            state.mode,
            entities,
            state.entities_read,
            dry_run_marker(ctx.policy)
        ));
    }

    fn report_statistics(&self, statistics: &ProcessStatistics) {
        let rows: Vec<Vec<String>> = statistics
            .rows()
            .into_iter()
            .map(|(name, value)| vec![name.to_string(), value.to_string()])
            .collect();
        self.reporter.table(&["Counter", "Value"], &rows);
    }

    fn finish(
        &self,
        ctx: RunContext,
        batch: Option<BatchProgress>,
        sweep: Option<SweepSummary>,
    ) -> RunResult {
        let statistics = ctx.statistics.snapshot();
        self.report_statistics(&statistics);
        info!(
            job = %self.key,
            run_id = %ctx.run_id,
            created = statistics.created,
            updated = statistics.updated,
            skipped = statistics.skipped,
            deleted = statistics.deleted,
            failed = statistics.failed,
            "Synchronization finished"
        );

        RunResult {
            job: self.key.clone(),
            run_id: ctx.run_id,
            policy: ctx.policy,
            statistics,
            batch,
            sweep,
            started_at: ctx.started_at,
            finished_at: Utc::now(),
        }
    }

    fn abort(&self, ctx: &RunContext, err: ReconcileError) -> RunAborted {
        let statistics = ctx.statistics.snapshot();
        error!(job = %self.key, run_id = %ctx.run_id, error = %err, "Synchronization aborted");
        self.reporter
            .error(&format!("Synchronization '{}' aborted: {err}", self.key));
        self.report_statistics(&statistics);
        RunAborted::new(self.key.as_str(), statistics, err)
    }
}

/// Key the persisted records of `job` live under.
pub fn state_key(job: &str, dry_run: bool) -> String {
    if dry_run {
        format!("{job}{DRY_RUN_SUFFIX}")
    } else {
        job.to_string()
    }
}

/// Removes the batch state and tracking index of `job`, for live and dry runs.
pub async fn clear_job_state(
    job: &str,
    batches: Option<&dyn BatchStateStore>,
    tracking: Option<&dyn TrackingIndexStore>,
) -> Result<(), StateStoreError> {
    for dry_run in [false, true] {
        let key = state_key(job, dry_run);
        if let Some(store) = batches {
            store.clear_batch_state(&key).await?;
        }
        if let Some(store) = tracking {
            store.clear_tracking_index(&key).await?;
        }
    }
    Ok(())
}

fn dry_run_marker(policy: RunPolicy) -> &'static str {
    if policy.dry_run { " [dry run]" } else { "" }
}

/// Assembles a [`SyncJob`]. A source and a target are required; records are read as
/// serialized entities unless a transform is given.
pub struct SyncJobBuilder {
    key: String,
    source: Option<Arc<dyn ExternalSource>>,
    transform: Option<Arc<dyn EntityTransform>>,
    target: Option<Arc<dyn TargetStore>>,
    batch_store: Option<Arc<dyn BatchStateStore>>,
    tracking_store: Option<Arc<dyn TrackingIndexStore>>,
    reporter: Option<Arc<dyn RunReporter>>,
}

impl SyncJobBuilder {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source: None,
            transform: None,
            target: None,
            batch_store: None,
            tracking_store: None,
            reporter: None,
        }
    }

    pub fn source(mut self, source: Arc<dyn ExternalSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn transform(mut self, transform: Arc<dyn EntityTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn target(mut self, target: Arc<dyn TargetStore>) -> Self {
        self.target = Some(target);
        self
    }

    pub fn batch_state_store(mut self, store: Arc<dyn BatchStateStore>) -> Self {
        self.batch_store = Some(store);
        self
    }

    pub fn tracking_index_store(mut self, store: Arc<dyn TrackingIndexStore>) -> Self {
        self.tracking_store = Some(store);
        self
    }

    /// Uses one store for both persisted records.
    pub fn state_store<S>(self, store: Arc<S>) -> Self
    where
        S: BatchStateStore + TrackingIndexStore + 'static,
    {
        let batches: Arc<dyn BatchStateStore> = store.clone();
        let tracking: Arc<dyn TrackingIndexStore> = store;
        self.batch_state_store(batches).tracking_index_store(tracking)
    }

    pub fn reporter(mut self, reporter: Arc<dyn RunReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn build(self) -> Result<SyncJob, ReconcileError> {
        let key = self.key.trim().to_string();
        if key.is_empty() {
            return Err(ReconcileError::DependencyUnavailable(
                "job key must not be empty".to_string(),
            ));
        }
        let source = self.source.ok_or_else(|| {
            ReconcileError::DependencyUnavailable(format!("external source for job '{key}'"))
        })?;
        let target = self.target.ok_or_else(|| {
            ReconcileError::DependencyUnavailable(format!("target store for job '{key}'"))
        })?;

        let transform: Arc<dyn EntityTransform> = match self.transform {
            Some(transform) => transform,
            None => Arc::new(SerdeTransform),
        };
        let reporter: Arc<dyn RunReporter> = match self.reporter {
            Some(reporter) => reporter,
            None => Arc::new(TracingReporter),
        };

        Ok(SyncJob {
            key,
            source,
            transform,
            target,
            batch_store: self.batch_store,
            tracking_store: self.tracking_store,
            reporter,
        })
    }
}
