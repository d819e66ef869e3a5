use async_trait::async_trait;
use connectors::memory::{source::MemorySource, target::MemoryTargetStore};
use engine_core::{
    error::{RunAborted, StateStoreError},
    state::{TrackingIndexStore, memory::MemoryStateStore},
};
use engine_runtime::{RunResult, SyncJob, SyncProcessor};
use model::{
    records::{batch::RawRecord, entity::SyncEntity},
    tracking::TrackingIndex,
};
use serde_json::json;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

pub const URI: &str = "mem://content";
pub const JOB: &str = "content";

/// Raw records in the shape the default transform reads.
pub fn records(entries: &[(&str, &str)]) -> Vec<RawRecord> {
    entries
        .iter()
        .map(|(uid, version)| {
            json!({
                "unique_identifier": uid,
                "version": version,
                "payload": { "title": format!("Title of {uid}") }
            })
        })
        .collect()
}

/// `count` records named `item-000`, `item-001`, ... all at `version`.
pub fn numbered(count: usize, version: &str) -> Vec<RawRecord> {
    let names: Vec<String> = (0..count).map(|i| format!("item-{i:03}")).collect();
    let entries: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), version)).collect();
    records(&entries)
}

/// Memory-backed job with every collaborator exposed for assertions.
pub struct Harness {
    pub source: Arc<MemorySource>,
    pub target: Arc<MemoryTargetStore>,
    pub state: Arc<MemoryStateStore>,
    pub processor: SyncProcessor,
}

impl Harness {
    pub fn counted(records: Vec<RawRecord>) -> Self {
        Self::with_source(MemorySource::counted(URI, records))
    }

    pub fn cursor(records: Vec<RawRecord>) -> Self {
        Self::with_source(MemorySource::cursor(URI, records))
    }

    /// Counted job whose tracking index store fails its `fail_on`-th save.
    pub fn counted_with_failing_tracking(records: Vec<RawRecord>, fail_on: usize) -> Self {
        let state = Arc::new(MemoryStateStore::new());
        let tracking = Arc::new(FailingTrackingStore::new(state.clone(), fail_on));
        Self::build(MemorySource::counted(URI, records), state, tracking)
    }

    fn with_source(source: MemorySource) -> Self {
        let state = Arc::new(MemoryStateStore::new());
        Self::build(source, state.clone(), state)
    }

    fn build(
        source: MemorySource,
        state: Arc<MemoryStateStore>,
        tracking: Arc<dyn TrackingIndexStore>,
    ) -> Self {
        let source = Arc::new(source);
        let target = Arc::new(MemoryTargetStore::new());
        let job = SyncJob::builder(JOB)
            .source(source.clone())
            .target(target.clone())
            .batch_state_store(state.clone())
            .tracking_index_store(tracking)
            .build()
            .expect("job");

        Harness {
            source,
            target,
            state,
            processor: SyncProcessor::new(job),
        }
    }

    pub async fn seed(&self, entries: &[(&str, &str)]) {
        for (uid, version) in entries {
            self.target.insert(SyncEntity::new(*uid, *version)).await;
        }
    }

    pub async fn batch(&mut self, batch_size: usize) -> Result<RunResult, RunAborted> {
        self.processor.process_batch(URI, batch_size, None).await
    }

    /// Runs batches until the stream completes; panics after `limit` runs.
    pub async fn run_to_completion(&mut self, batch_size: usize, limit: usize) -> Vec<RunResult> {
        let mut results = Vec::new();
        for _ in 0..limit {
            let result = self.batch(batch_size).await.expect("batch run");
            let complete = result.is_complete();
            results.push(result);
            if complete {
                return results;
            }
        }
        panic!("stream did not complete within {limit} batches");
    }
}

/// Delegates to a memory store, except for one save that fails.
pub struct FailingTrackingStore {
    inner: Arc<MemoryStateStore>,
    fail_on: usize,
    saves: AtomicUsize,
}

impl FailingTrackingStore {
    pub fn new(inner: Arc<MemoryStateStore>, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            saves: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TrackingIndexStore for FailingTrackingStore {
    async fn load_tracking_index(
        &self,
        key: &str,
    ) -> Result<Option<TrackingIndex>, StateStoreError> {
        self.inner.load_tracking_index(key).await
    }

    async fn save_tracking_index(
        &self,
        key: &str,
        index: &TrackingIndex,
    ) -> Result<(), StateStoreError> {
        if self.saves.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(StateStoreError::Save {
                key: key.to_string(),
                message: "disk full".to_string(),
            });
        }
        self.inner.save_tracking_index(key, index).await
    }

    async fn clear_tracking_index(&self, key: &str) -> Result<(), StateStoreError> {
        self.inner.clear_tracking_index(key).await
    }
}

/// Writes a CSV file with a `slug,title,revision` header.
pub fn write_csv(dir: &Path, name: &str, rows: &[(&str, &str, &str)]) -> PathBuf {
    let mut content = String::from("slug,title,revision\n");
    for (slug, title, revision) in rows {
        content.push_str(&format!("{slug},{title},{revision}\n"));
    }
    let path = dir.join(name);
    fs::write(&path, content).expect("write csv");
    path
}
