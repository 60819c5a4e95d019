//! Pause and resume semantics.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use partstream_core::config::UploadConfig;
    use partstream_model::UploadEvent;

    use crate::{MIB, events_until, payload, test_session};

    #[tokio::test]
    async fn test_should_defer_paused_until_all_inflight_settle() {
        let config = UploadConfig::builder().concurrent_parts(2).build();
        let (store, _destination, mut uploader, mut events) = test_session("pause-defer", config);
        store.set_part_delay(Duration::from_millis(40));

        // Two full parts go in flight together.
        uploader.write(payload(10 * MIB)).await.expect("write");
        assert!(uploader.pause().await);

        let seen = events_until(&mut events, |e| matches!(e, UploadEvent::Paused { .. })).await;

        let pausing_at = seen
            .iter()
            .position(|e| matches!(e, UploadEvent::Pausing { .. }))
            .expect("pausing event");
        let paused_at = seen
            .iter()
            .position(|e| matches!(e, UploadEvent::Paused { .. }))
            .expect("paused event");
        let part_positions: Vec<usize> = seen
            .iter()
            .enumerate()
            .filter_map(|(i, e)| matches!(e, UploadEvent::Part { .. }).then_some(i))
            .collect();

        assert!(matches!(
            seen[pausing_at],
            UploadEvent::Pausing { pending_parts: 2 }
        ));
        assert_eq!(part_positions.len(), 2);
        // Both in-flight parts settle between the pausing and paused
        // notifications.
        assert!(part_positions.iter().all(|&p| p > pausing_at && p < paused_at));

        if let UploadEvent::Paused { snapshot } = &seen[paused_at] {
            assert_eq!(snapshot.parts.len(), 2);
            assert_eq!(snapshot.uploaded_size, 10 * MIB as u64);
        }
    }

    #[tokio::test]
    async fn test_should_hold_writes_and_dispatches_while_paused() {
        let config = UploadConfig::builder().concurrent_parts(2).build();
        let input = payload(20 * MIB);
        let (store, destination, mut uploader, mut events) = test_session("pause-hold", config);
        store.set_part_delay(Duration::from_millis(20));

        uploader
            .write(input.slice(..10 * MIB))
            .await
            .expect("write");
        assert!(uploader.pause().await);
        let _ = events_until(&mut events, |e| matches!(e, UploadEvent::Paused { .. })).await;
        assert_eq!(store.upload_calls(), 2);

        // A write while paused is held, not rejected: the bytes are
        // absorbed but the acknowledgement does not come back.
        let held = tokio::time::timeout(
            Duration::from_millis(80),
            uploader.write(input.slice(10 * MIB..)),
        )
        .await;
        assert!(held.is_err(), "write should be held while paused");

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.upload_calls(), 2, "no dispatch between pause and resume");

        assert!(uploader.resume().await);
        uploader.finish().await.expect("finish").expect("result");

        assert_eq!(store.upload_calls(), 4);
        let (body, _) = store
            .object(&destination.bucket, &destination.key)
            .expect("assembled object");
        assert_eq!(body, input);
    }

    #[tokio::test]
    async fn test_should_pause_immediately_when_no_uploads_in_flight() {
        let (_store, _destination, mut uploader, mut events) =
            test_session("pause-idle", UploadConfig::default());

        uploader.write(payload(5 * MIB)).await.expect("write");
        let _ = events_until(&mut events, |e| matches!(e, UploadEvent::Part { .. })).await;

        assert!(uploader.pause().await);
        let seen = events_until(&mut events, |e| matches!(e, UploadEvent::Paused { .. })).await;
        assert!(matches!(
            seen.first(),
            Some(UploadEvent::Pausing { pending_parts: 0 })
        ));
        assert!(matches!(seen.get(1), Some(UploadEvent::Paused { .. })));
    }

    #[tokio::test]
    async fn test_should_reject_redundant_pause_and_resume() {
        let (_store, _destination, mut uploader, mut events) =
            test_session("pause-redundant", UploadConfig::default());

        uploader.write(payload(5 * MIB)).await.expect("write");
        let _ = events_until(&mut events, |e| matches!(e, UploadEvent::Part { .. })).await;

        assert!(uploader.pause().await);
        assert!(!uploader.pause().await, "second pause is a no-op");

        let _ = events_until(&mut events, |e| matches!(e, UploadEvent::Paused { .. })).await;
        assert!(uploader.resume().await);
        assert!(!uploader.resume().await, "second resume is a no-op");
    }
}
