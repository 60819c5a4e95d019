//! Round-trip tests: the assembled object must reproduce the input bytes
//! exactly, independent of how the producer chunked its writes.

#[cfg(test)]
mod tests {
    use partstream_core::config::UploadConfig;
    use partstream_model::UploadEvent;

    use crate::{MIB, drain_events, payload, test_session};

    #[tokio::test]
    async fn test_should_reassemble_input_across_arbitrary_write_boundaries() {
        let input = payload(12 * MIB + 123);
        let config = UploadConfig::builder().concurrent_parts(3).build();
        let (store, destination, mut uploader, _events) = test_session("roundtrip", config);

        // Write in deliberately awkward chunk sizes.
        let mut offset = 0;
        let chunk_sizes = [3 * MIB - 17, MIB + 1, 5 * MIB, 2 * MIB + 999, usize::MAX];
        for size in chunk_sizes {
            let end = offset + size.min(input.len() - offset);
            uploader
                .write(input.slice(offset..end))
                .await
                .expect("write");
            offset = end;
            if offset == input.len() {
                break;
            }
        }

        let result = uploader.finish().await.expect("finish").expect("result");

        let (body, etag) = store
            .object(&destination.bucket, &destination.key)
            .expect("assembled object");
        assert_eq!(body, input);
        assert_eq!(etag, result.etag);
        // 12 MiB + 123 bytes at a 5 MiB threshold: two full parts, one tail.
        assert_eq!(store.upload_calls(), 3);
    }

    #[tokio::test]
    async fn test_should_upload_three_sequential_writes_as_two_full_parts_and_a_tail() {
        // Threshold 5 MiB, concurrency 1, three 4 MiB writes.
        let input = payload(12 * MIB);
        let (store, destination, mut uploader, mut events) =
            test_session("scenario-a", UploadConfig::default());

        for chunk in 0..3 {
            uploader
                .write(input.slice(chunk * 4 * MIB..(chunk + 1) * 4 * MIB))
                .await
                .expect("write");
        }
        uploader.finish().await.expect("finish").expect("result");

        assert_eq!(store.upload_calls(), 3);
        assert_eq!(store.complete_calls(), 1);
        assert_eq!(store.peak_in_flight(), 1);

        let (body, _) = store
            .object(&destination.bucket, &destination.key)
            .expect("assembled object");
        assert_eq!(body, input);

        // With a single slot the parts settle sequentially, so the
        // uploaded-size progression is deterministic: 5, 10, then 12 MiB.
        let progress: Vec<(u32, u64)> = drain_events(&mut events)
            .into_iter()
            .filter_map(|event| match event {
                UploadEvent::Part {
                    part_number,
                    uploaded_size,
                    ..
                } => Some((part_number, uploaded_size)),
                _ => None,
            })
            .collect();
        assert_eq!(
            progress,
            vec![
                (1, 5 * MIB as u64),
                (2, 10 * MIB as u64),
                (3, 12 * MIB as u64),
            ]
        );
    }

    #[tokio::test]
    async fn test_should_emit_uploaded_event_with_completion_result() {
        let (_store, _destination, mut uploader, mut events) =
            test_session("uploaded-event", UploadConfig::default());

        uploader.write(payload(MIB)).await.expect("write");
        let result = uploader.finish().await.expect("finish").expect("result");

        let uploaded = drain_events(&mut events)
            .into_iter()
            .find_map(|event| match event {
                UploadEvent::Uploaded { result } => Some(result),
                _ => None,
            })
            .expect("uploaded event");
        assert_eq!(uploaded, result);
    }
}
