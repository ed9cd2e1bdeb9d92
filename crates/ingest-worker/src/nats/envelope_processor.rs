use std::sync::Arc;

use async_nats::jetstream::Message;
use common::nats::{BatchProcessor, ProcessingResult};
use tracing::{debug, warn};

use crate::domain::{IngestOutcome, IngestionService};

/// Create a [`BatchProcessor`] that feeds raw envelope bytes through the
/// ingestion gateway.
///
/// Acknowledgment policy: both `Accepted` and `Rejected` outcomes Ack,
/// since a rejection is terminal and redelivery cannot change it. Only transient
/// failures (store or sink unavailable) Nak, so the broker redelivers.
pub fn create_envelope_processor(service: Arc<IngestionService>) -> BatchProcessor {
    Box::new(move |messages: &[Message]| {
        let service = Arc::clone(&service);

        // Copy payloads and subjects out before the async block; Message
        // borrows from the slice
        let message_data: Vec<(usize, Vec<u8>, String)> = messages
            .iter()
            .enumerate()
            .map(|(idx, msg)| (idx, msg.payload.to_vec(), msg.subject.to_string()))
            .collect();

        Box::pin(async move {
            let mut ack = Vec::new();
            let mut nak = Vec::new();

            for (idx, payload, subject) in message_data {
                match service.process(&payload).await {
                    Ok(IngestOutcome::Accepted) => {
                        debug!(index = idx, subject = %subject, "envelope accepted");
                        ack.push(idx);
                    }
                    Ok(IngestOutcome::Rejected(reason)) => {
                        debug!(
                            index = idx,
                            subject = %subject,
                            reason = ?reason,
                            "envelope rejected"
                        );
                        ack.push(idx);
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            index = idx,
                            subject = %subject,
                            "transient ingest failure, requesting redelivery"
                        );
                        nak.push((idx, Some(e.to_string())));
                    }
                }
            }

            Ok(ProcessingResult { ack, nak })
        })
    })
}

// Note: unit tests for the processor would need real NATS Message objects,
// which cannot be constructed without a broker connection. The ack/nak
// mapping is covered through the IngestionService tests plus the pipeline
// integration tests in tests/.
