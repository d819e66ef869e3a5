#[cfg(test)]
mod tests {
    use crate::utils::write_csv;
    use connectors::{file::csv::source::CsvSource, kv::sled_target::SledTargetStore};
    use engine_config::settings::{SyncSettings, validator::SettingsValidator};
    use engine_core::{
        connectors::target::TargetStore,
        state::{BatchStateStore, TrackingIndexStore, sled_store::SledStateStore},
    };
    use engine_processing::transform::columns::ColumnTransform;
    use engine_runtime::{SyncJob, SyncProcessor};
    use model::policy::RunPolicy;
    use std::{path::Path, sync::Arc};
    use tempfile::tempdir;

    struct Stores {
        state: Arc<SledStateStore>,
        target: Arc<SledTargetStore>,
    }

    fn open_stores(dir: &Path) -> Stores {
        Stores {
            state: Arc::new(SledStateStore::open(dir.join("state")).unwrap()),
            target: Arc::new(SledTargetStore::open(dir.join("target")).unwrap()),
        }
    }

    fn processor(
        stores: &Stores,
        version_column: Option<&str>,
        policy: RunPolicy,
    ) -> SyncProcessor {
        let job = SyncJob::builder("posts")
            .source(Arc::new(CsvSource::default()))
            .transform(Arc::new(ColumnTransform::new(
                "slug",
                version_column.map(str::to_string),
            )))
            .target(stores.target.clone())
            .state_store(stores.state.clone())
            .build()
            .unwrap();
        SyncProcessor::new(job).with_policy(policy)
    }

    #[tokio::test]
    async fn csv_file_is_reconciled_into_sled_in_batches() {
        let dir = tempdir().unwrap();
        let stores = open_stores(dir.path());
        let csv = write_csv(
            dir.path(),
            "posts.csv",
            &[("hello", "Hello", "1"), ("world", "World", "1"), ("bye", "Bye", "1")],
        );
        let locator = csv.to_string_lossy().into_owned();
        let mut processor = processor(
            &stores,
            Some("revision"),
            RunPolicy::default().with_delete_unprocessed(true),
        );

        let first = processor.process_batch(&locator, 2, None).await.unwrap();
        assert_eq!(first.statistics.created, 2);
        assert!(!first.is_complete());
        let second = processor.process_batch(&locator, 2, None).await.unwrap();
        assert_eq!(second.statistics.created, 1);
        assert!(second.is_complete());

        write_csv(
            dir.path(),
            "posts.csv",
            &[("hello", "Hello again", "2"), ("world", "World", "1"), ("new", "New", "1")],
        );

        let first = processor.process_batch(&locator, 2, None).await.unwrap();
        assert_eq!(first.batch.as_ref().unwrap().batch, 1);
        assert_eq!((first.statistics.updated, first.statistics.skipped), (1, 1));
        let second = processor.process_batch(&locator, 2, None).await.unwrap();
        assert_eq!(second.statistics.created, 1);
        assert_eq!(second.statistics.deleted, 1);

        let target = stores.target.as_ref();
        assert!(target.read_by_unique_identifier("bye").await.unwrap().is_none());
        let hello = target.read_by_unique_identifier("hello").await.unwrap().unwrap();
        assert_eq!(hello.version, "2");
        assert_eq!(hello.payload["title"], "Hello again");
        assert_eq!(target.read_all_identifiers().await.unwrap().len(), 3);

        assert!(stores.state.load_batch_state("posts").await.unwrap().unwrap().is_complete);
        assert!(stores.state.load_tracking_index("posts").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn row_hash_versions_detect_any_field_change() {
        let dir = tempdir().unwrap();
        let stores = open_stores(dir.path());
        let csv = write_csv(
            dir.path(),
            "posts.csv",
            &[("hello", "Hello", "1"), ("world", "World", "1")],
        );
        let locator = csv.to_string_lossy().into_owned();
        let processor = processor(&stores, None, RunPolicy::default());

        assert_eq!(processor.process(&locator).await.unwrap().statistics.created, 2);
        assert_eq!(processor.process(&locator).await.unwrap().statistics.skipped, 2);

        // Same revision column, different title.
        write_csv(
            dir.path(),
            "posts.csv",
            &[("hello", "Hi", "1"), ("world", "World", "1")],
        );
        let changed = processor.process(&locator).await.unwrap();

        assert_eq!((changed.statistics.updated, changed.statistics.skipped), (1, 1));
    }

    #[tokio::test]
    async fn dry_run_leaves_sled_target_untouched() {
        let dir = tempdir().unwrap();
        let stores = open_stores(dir.path());
        let csv = write_csv(dir.path(), "posts.csv", &[("hello", "Hello", "1")]);
        let locator = csv.to_string_lossy().into_owned();
        let mut processor = processor(
            &stores,
            Some("revision"),
            RunPolicy::default().with_dry_run(true),
        );

        let result = processor.process_batch(&locator, 10, None).await.unwrap();

        assert_eq!(result.statistics.created, 1);
        assert!(stores.target.read_all_identifiers().await.unwrap().is_empty());
        assert!(stores.state.load_batch_state("posts").await.unwrap().is_none());
        assert!(stores.state.load_batch_state("posts:dry-run").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn validated_settings_drive_a_run() {
        let dir = tempdir().unwrap();
        let csv = write_csv(dir.path(), "posts.csv", &[("hello", "Hello", "1")]);
        let settings = SyncSettings {
            job_id: Some("posts".into()),
            source: Some(csv.clone()),
            target: Some(dir.path().join("target")),
            unique_column: Some("slug".into()),
            version_column: Some("revision".into()),
            batch_size: Some(5),
            stop_on_error: true,
            ..Default::default()
        };
        let validated = SettingsValidator::new(Some(dir.path().join("state")))
            .validate(&settings)
            .unwrap();
        let stores = open_stores(dir.path());
        let mut processor = processor(
            &stores,
            validated.version_column.as_deref(),
            validated.policy,
        );

        let result = processor
            .process_batch(
                &validated.source.to_string_lossy(),
                validated.batch_size.unwrap(),
                validated.max_entities,
            )
            .await
            .unwrap();

        assert!(result.policy.stop_on_error);
        assert_eq!(result.statistics.created, 1);
        assert!(result.is_complete());
    }
}
