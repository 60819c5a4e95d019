//! Failure routing: every failed store call surfaces to the consumer, and
//! cleanup runs exactly once.

#[cfg(test)]
mod tests {
    use partstream_core::UploadError;
    use partstream_core::config::UploadConfig;
    use partstream_model::UploadEvent;

    use crate::{MIB, drain_events, payload, test_session};

    #[tokio::test]
    async fn test_should_abort_exactly_once_on_part_failure() {
        let (store, _destination, mut uploader, mut events) =
            test_session("part-failure", UploadConfig::default());
        store.fail_part(2);

        // Part 1 uploads; part 2 fails and kills the session.
        let write_result = uploader.write(payload(10 * MIB)).await;
        assert!(matches!(
            write_result,
            Err(UploadError::SessionFailed { .. })
        ));

        let finish_err = uploader.finish().await.expect_err("finish fails");
        assert!(matches!(
            finish_err,
            UploadError::PartUpload { part_number: 2, .. }
        ));

        let seen = drain_events(&mut events);
        let session_id = seen
            .iter()
            .find_map(|event| match event {
                UploadEvent::Ready { session_id } => Some(session_id.clone()),
                _ => None,
            })
            .expect("ready event");
        assert!(
            seen.iter()
                .any(|e| matches!(e, UploadEvent::Error { .. })),
            "error notification expected"
        );

        assert_eq!(store.abort_calls_for(&session_id), 1);
        assert_eq!(store.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_should_abort_on_completion_failure() {
        let (store, _destination, mut uploader, mut events) =
            test_session("completion-failure", UploadConfig::default());
        store.fail_complete();

        uploader.write(payload(MIB)).await.expect("write");
        let err = uploader.finish().await.expect_err("finish fails");
        assert!(matches!(err, UploadError::Completion { .. }));

        let seen = drain_events(&mut events);
        let session_id = seen
            .iter()
            .find_map(|event| match event {
                UploadEvent::Ready { session_id } => Some(session_id.clone()),
                _ => None,
            })
            .expect("ready event");
        assert_eq!(store.abort_calls_for(&session_id), 1);
        assert!(
            !seen
                .iter()
                .any(|e| matches!(e, UploadEvent::Uploaded { .. }))
        );
    }

    #[tokio::test]
    async fn test_should_report_both_errors_when_abort_also_fails() {
        let (store, _destination, mut uploader, _events) =
            test_session("compound-failure", UploadConfig::default());
        store.fail_complete();
        store.fail_abort();

        uploader.write(payload(MIB)).await.expect("write");
        let err = uploader.finish().await.expect_err("finish fails");

        assert!(matches!(err, UploadError::Abort { .. }));
        let message = err.to_string();
        assert!(message.contains("abort refused"), "{message}");
        assert!(message.contains("failed to complete"), "{message}");
    }

    #[tokio::test]
    async fn test_should_fail_without_abort_when_initiation_fails() {
        let (store, _destination, mut uploader, mut events) =
            test_session("initiation-failure", UploadConfig::default());
        store.fail_initiate();

        // The first full part triggers initiation, which is refused.
        let write_result = uploader.write(payload(5 * MIB)).await;
        assert!(matches!(
            write_result,
            Err(UploadError::SessionFailed { .. })
        ));

        let err = uploader.finish().await.expect_err("finish fails");
        assert!(matches!(err, UploadError::Initiation { .. }));

        assert_eq!(store.initiate_calls(), 1);
        assert_eq!(store.upload_calls(), 0);
        assert_eq!(store.complete_calls(), 0);
        assert_eq!(store.abort_calls_total(), 0, "nothing exists to abort");
        assert!(
            drain_events(&mut events)
                .iter()
                .any(|e| matches!(e, UploadEvent::Error { .. }))
        );
    }
}
