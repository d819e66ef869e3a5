#[cfg(test)]
mod tests {
    use crate::utils::{Harness, JOB, URI, numbered, records};
    use engine_core::{
        error::{ReconcileError, StateStoreError, WriteOperation},
        state::{BatchStateStore, TrackingIndexStore},
    };
    use model::policy::RunPolicy;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn second_run_over_unchanged_source_skips_everything() {
        let h = Harness::counted(records(&[("a", "1"), ("b", "1"), ("c", "1")]));

        let first = h.processor.process(URI).await.unwrap();
        assert_eq!(first.statistics.created, 3);

        let second = h.processor.process(URI).await.unwrap();
        let stats = second.statistics;
        assert_eq!((stats.created, stats.updated, stats.deleted), (0, 0, 0));
        assert_eq!(stats.skipped, 3);
        assert_eq!(stats.processed_total(), 3);
        assert_eq!(h.target.calls().await.creates, 3);
        assert_eq!(h.target.calls().await.updates, 0);
    }

    #[tokio::test]
    async fn idempotence_holds_for_batched_runs() {
        let mut h = Harness::counted(numbered(7, "1"));

        h.run_to_completion(3, 5).await;
        let rerun = h.run_to_completion(3, 5).await;

        assert_eq!(rerun.len(), 3);
        let created: u64 = rerun.iter().map(|r| r.statistics.created).sum();
        let skipped: u64 = rerun.iter().map(|r| r.statistics.skipped).sum();
        assert_eq!((created, skipped), (0, 7));
    }

    #[tokio::test]
    async fn changed_version_updates_matching_entity() {
        let h = Harness::counted(records(&[("post-1", "v2")]));
        h.seed(&[("post-1", "v1")]).await;

        let result = h.processor.process(URI).await.unwrap();

        assert_eq!(result.statistics.updated, 1);
        assert_eq!(result.statistics.created, 0);
        let stored = h.target.get("post-1").await.unwrap();
        assert_eq!(stored.version, "v2");
        assert_eq!(stored.index_identifier, 1);
    }

    #[tokio::test]
    async fn version_comparison_is_equality_only() {
        // "v10" sorts before "v9", it must still count as a change.
        let h = Harness::counted(records(&[("a", "v9"), ("b", "same")]));
        h.seed(&[("a", "v10"), ("b", "same")]).await;

        let result = h.processor.process(URI).await.unwrap();

        assert_eq!(result.statistics.updated, 1);
        assert_eq!(result.statistics.skipped, 1);
    }

    #[tokio::test]
    async fn always_overwrite_updates_equal_versions() {
        let mut h = Harness::counted(records(&[("a", "1")]));
        h.seed(&[("a", "1")]).await;
        h.processor.change_overwrite_status(true);

        let result = h.processor.process(URI).await.unwrap();

        assert_eq!(result.statistics.updated, 1);
        assert_eq!(h.target.calls().await.updates, 1);
    }

    #[tokio::test]
    async fn dry_run_counts_like_a_live_run_without_writing() {
        let source = records(&[("a", "2"), ("b", "1"), ("c", "1")]);
        let seed = [("a", "1"), ("b", "1"), ("stale", "1")];
        let policy = RunPolicy::default().with_delete_unprocessed(true);

        let mut dry = Harness::counted(source.clone());
        dry.seed(&seed).await;
        dry.processor = dry.processor.with_policy(policy.with_dry_run(true));
        let dry_result = dry.processor.process(URI).await.unwrap();

        let mut live = Harness::counted(source);
        live.seed(&seed).await;
        live.processor = live.processor.with_policy(policy);
        let live_result = live.processor.process(URI).await.unwrap();

        assert_eq!(dry_result.statistics, live_result.statistics);
        assert_eq!(dry_result.statistics.deleted, 1);
        let calls = dry.target.calls().await;
        assert_eq!((calls.creates, calls.updates, calls.deletes), (0, 0, 0));
        assert!(dry.target.get("stale").await.is_some());
        assert!(live.target.get("stale").await.is_none());
    }

    #[tokio::test]
    async fn dry_run_batches_never_write() {
        let mut h = Harness::counted(numbered(5, "1"));
        h.seed(&[("orphan", "1")]).await;
        h.processor.enable_dry_run(true);
        h.processor.change_delete_status(true);

        let results = h.run_to_completion(2, 4).await;

        assert_eq!(results.len(), 3);
        let created: u64 = results.iter().map(|r| r.statistics.created).sum();
        assert_eq!(created, 5);
        assert_eq!(results[2].statistics.deleted, 1);
        let calls = h.target.calls().await;
        assert_eq!((calls.creates, calls.updates, calls.deletes), (0, 0, 0));
        assert_eq!(h.target.len().await, 1);
    }

    #[tokio::test]
    async fn sweep_waits_for_the_last_batch() {
        let mut h = Harness::counted(numbered(9, "1"));
        h.seed(&[("orphan", "1"), ("item-004", "1")]).await;
        h.processor.change_delete_status(true);

        let first = h.batch(3).await.unwrap();
        assert!(first.sweep.is_none());
        assert!(h.target.get("orphan").await.is_some());
        assert!(h.state.load_tracking_index(JOB).await.unwrap().is_some());

        let second = h.batch(3).await.unwrap();
        assert!(second.sweep.is_none());
        assert_eq!(second.statistics.skipped, 1);
        assert!(h.target.get("orphan").await.is_some());

        let third = h.batch(3).await.unwrap();
        assert!(third.is_complete());
        assert_eq!(third.statistics.deleted, 1);
        assert_eq!(third.sweep.unwrap().deleted, 1);
        assert!(h.target.get("orphan").await.is_none());
        assert!(h.target.get("item-004").await.is_some());
        assert_eq!(h.target.len().await, 9);

        // Cleared, not reset, so the next walk rebuilds it.
        assert!(h.state.load_tracking_index(JOB).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn batch_without_tracking_invalidates_the_index() {
        let mut h = Harness::counted(numbered(9, "1"));
        h.seed(&[("item-004", "1")]).await;

        h.processor.change_delete_status(true);
        h.batch(3).await.unwrap();
        assert!(h.state.load_tracking_index(JOB).await.unwrap().is_some());

        h.processor.change_delete_status(false);
        h.batch(3).await.unwrap();
        assert!(h.state.load_tracking_index(JOB).await.unwrap().is_none());

        h.processor.change_delete_status(true);
        let err = h.batch(3).await.unwrap_err();
        assert!(matches!(
            err.cause(),
            ReconcileError::State(StateStoreError::MissingTrackingIndex { .. })
        ));
        assert_eq!(err.statistics.deleted, 0);
        assert!(h.target.get("item-004").await.is_some());
        assert_eq!(h.processor.progress().await.unwrap().unwrap().current_batch, 3);

        h.processor.force_restart();
        let rerun = h.run_to_completion(3, 3).await;
        let deleted: u64 = rerun.iter().map(|r| r.statistics.deleted).sum();
        assert_eq!(deleted, 0);
        assert_eq!(h.target.len().await, 9);
    }

    #[tokio::test]
    async fn failed_tracking_save_keeps_the_batch_for_a_retry() {
        let mut h = Harness::counted_with_failing_tracking(numbered(9, "1"), 2);
        let existing: Vec<String> = (0..9).map(|i| format!("item-{i:03}")).collect();
        let seeds: Vec<(&str, &str)> = existing.iter().map(|uid| (uid.as_str(), "1")).collect();
        h.seed(&seeds).await;
        h.processor.change_delete_status(true);

        h.batch(3).await.unwrap();
        let err = h.batch(3).await.unwrap_err();
        assert!(matches!(
            err.cause(),
            ReconcileError::State(StateStoreError::Save { .. })
        ));
        assert_eq!(h.processor.progress().await.unwrap().unwrap().current_batch, 2);

        let retried = h.batch(3).await.unwrap();
        assert_eq!(retried.batch.unwrap().batch, 2);
        let last = h.batch(3).await.unwrap();

        assert!(last.is_complete());
        assert_eq!(last.statistics.deleted, 0);
        assert_eq!(h.target.len().await, 9);
    }

    #[tokio::test]
    async fn entities_created_in_earlier_batches_survive_the_sweep() {
        let mut h = Harness::counted(numbered(6, "1"));
        h.processor.change_delete_status(true);

        h.run_to_completion(2, 3).await;
        let rerun = h.run_to_completion(2, 3).await;

        let deleted: u64 = rerun.iter().map(|r| r.statistics.deleted).sum();
        assert_eq!(deleted, 0);
        assert_eq!(h.target.len().await, 6);
    }

    #[tokio::test]
    async fn fingerprint_change_restarts_at_the_first_batch() {
        let mut h = Harness::counted(numbered(50, "1"));
        h.batch(10).await.unwrap();

        let stored = h.processor.progress().await.unwrap().unwrap();
        assert_eq!((stored.current_batch, stored.total_batches), (2, Some(5)));

        h.source.replace(numbered(61, "1")).await;
        let result = h.batch(10).await.unwrap();

        let batch = result.batch.unwrap();
        assert_eq!(batch.batch, 1);
        assert_eq!(batch.total_batches, Some(7));
        assert_eq!(batch.reset_reason.as_deref(), Some("source fingerprint changed"));
        assert_eq!(result.statistics.skipped, 10);

        let stored = h.processor.progress().await.unwrap().unwrap();
        assert_eq!((stored.current_batch, stored.total_batches), (2, Some(7)));
    }

    #[tokio::test]
    async fn batch_size_change_restarts_the_walk() {
        let mut h = Harness::counted(numbered(10, "1"));
        h.batch(4).await.unwrap();

        let result = h.batch(5).await.unwrap();

        let batch = result.batch.unwrap();
        assert_eq!((batch.batch, batch.total_batches), (1, Some(2)));
        assert!(!batch.resumed);
    }

    #[tokio::test]
    #[traced_test]
    async fn stop_on_error_keeps_the_batch_for_a_retry() {
        let mut h = Harness::counted(records(&[("a", "1"), ("b", "1"), ("c", "1"), ("d", "1")]));
        h.target.fail_writes_for("b").await;
        h.processor.change_stop_on_error(true);

        let err = h.batch(2).await.unwrap_err();

        assert!(matches!(
            err.cause(),
            ReconcileError::EntityWriteFailure {
                operation: WriteOperation::Create,
                ..
            }
        ));
        assert_eq!(err.statistics.created, 1);
        assert!(h.processor.progress().await.unwrap().is_none());
        assert!(logs_contain("unique_identifier=b"));

        h.target.clear_failures().await;
        let retry = h.batch(2).await.unwrap();
        let batch = retry.batch.unwrap();
        assert_eq!(batch.batch, 1);
        assert_eq!(retry.statistics.skipped, 1);
        assert_eq!(retry.statistics.created, 1);
    }

    #[tokio::test]
    async fn stop_on_error_after_progress_leaves_state_unchanged() {
        let mut h = Harness::counted(numbered(4, "1"));
        h.batch(2).await.unwrap();
        let before = h.processor.progress().await.unwrap().unwrap();

        h.target.fail_writes_for("item-003").await;
        h.processor.change_stop_on_error(true);
        assert!(h.batch(2).await.is_err());

        let after = h.state.load_batch_state(JOB).await.unwrap().unwrap();
        assert_eq!(after, before);
        assert_eq!(after.current_batch, 2);
    }

    #[tokio::test]
    async fn continuing_past_a_failure_marks_the_batch_processed() {
        let mut h = Harness::counted(records(&[("a", "1"), ("b", "1"), ("c", "1")]));
        h.target.fail_writes_for("b").await;

        let result = h.batch(3).await.unwrap();

        let stats = result.statistics;
        assert_eq!((stats.created, stats.updated), (2, 0));
        assert_eq!((stats.skipped, stats.failed), (1, 1));
        assert!(result.is_complete());
        assert!(h.target.get("b").await.is_none());
        assert!(h.processor.progress().await.unwrap().unwrap().is_complete);
    }

    #[tokio::test]
    async fn cursor_pagination_follows_source_tokens() {
        let mut h = Harness::cursor(numbered(5, "1"));

        let results = h.run_to_completion(2, 5).await;

        assert_eq!(results.len(), 3);
        let last = results[2].batch.as_ref().unwrap();
        assert_eq!(last.total_batches, None);
        assert_eq!(last.entities_read, 5);
        assert_eq!(h.target.len().await, 5);

        let state = h.processor.progress().await.unwrap().unwrap();
        assert!(state.is_complete);
        assert_eq!(state.next_offset, None);
    }

    #[tokio::test]
    async fn cursor_sweep_runs_once_the_source_reports_completion() {
        let mut h = Harness::cursor(numbered(4, "1"));
        h.seed(&[("orphan", "1")]).await;
        h.processor.change_delete_status(true);

        let first = h.batch(2).await.unwrap();
        assert!(first.sweep.is_none());
        let second = h.batch(2).await.unwrap();

        assert!(second.is_complete());
        assert_eq!(second.statistics.deleted, 1);
        assert!(h.target.get("orphan").await.is_none());
    }

    #[tokio::test]
    async fn max_entities_caps_the_stream() {
        let mut h = Harness::counted(numbered(10, "1"));

        let first = h.processor.process_batch(URI, 3, Some(4)).await.unwrap();
        assert_eq!(first.batch.unwrap().total_batches, Some(2));
        let second = h.processor.process_batch(URI, 3, Some(4)).await.unwrap();

        assert!(second.is_complete());
        assert_eq!(second.statistics.incoming_total, 1);
        assert_eq!(h.target.len().await, 4);
    }

    #[tokio::test]
    async fn max_entities_completes_a_cursor_stream() {
        let mut h = Harness::cursor(numbered(10, "1"));

        let first = h.processor.process_batch(URI, 3, Some(5)).await.unwrap();
        assert!(!first.is_complete());
        let second = h.processor.process_batch(URI, 3, Some(5)).await.unwrap();

        assert!(second.is_complete());
        assert_eq!(second.statistics.incoming_total, 2);
        assert_eq!(h.target.len().await, 5);
    }

    #[tokio::test]
    async fn empty_source_aborts_without_deleting() {
        let mut h = Harness::counted(vec![]);
        h.seed(&[("a", "1")]).await;
        h.processor.change_delete_status(true);

        let full = h.processor.process(URI).await.unwrap_err();
        let batched = h.batch(10).await.unwrap_err();

        assert!(matches!(full.cause(), ReconcileError::StreamInvalid(_)));
        assert!(matches!(batched.cause(), ReconcileError::StreamInvalid(_)));
        assert_eq!(h.target.len().await, 1);
        assert_eq!(h.target.calls().await.deletes, 0);
    }

    #[tokio::test]
    async fn duplicate_identifiers_in_a_batch_are_rejected() {
        let h = Harness::counted(records(&[("a", "1"), ("a", "2")]));

        let err = h.processor.process(URI).await.unwrap_err();

        assert!(matches!(err.cause(), ReconcileError::StreamInvalid(_)));
        assert!(h.target.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_locator_is_a_source_error() {
        let h = Harness::counted(records(&[("a", "1")]));

        let err = h.processor.process("mem://elsewhere").await.unwrap_err();

        assert!(matches!(err.cause(), ReconcileError::Source(_)));
    }
}
