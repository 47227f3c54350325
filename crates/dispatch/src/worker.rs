//! Dispatch worker loop.
//!
//! One `flush` drains the queue to empty, handing each entry to the
//! processor. Failed entries go back through `requeue_if_failed`; dequeue
//! transport errors are logged and retried on the next iteration. The loop
//! sleeps for the throttle interval after every entry to bound the delivery
//! rate against the downstream gateway.

use std::time::Duration;

use herald_queue::{DeliveryQueue, RETRY_CAP};
use herald_queue::store::ListStore;

use crate::processor::ProcessDelivery;

/// Queue consumer driving the item processor.
pub struct DispatchWorker<S: ListStore, P: ProcessDelivery> {
    queue: DeliveryQueue<S>,
    processor: P,
    throttle: Duration,
}

impl<S: ListStore, P: ProcessDelivery> DispatchWorker<S, P> {
    pub fn new(queue: DeliveryQueue<S>, processor: P, throttle: Duration) -> Self {
        Self {
            queue,
            processor,
            throttle,
        }
    }

    /// Drain the queue until it reports empty.
    ///
    /// Returns the number of entries handed to the processor. An empty queue
    /// is the normal exit; the caller decides when to drain again.
    pub async fn flush(&mut self) -> usize {
        let mut processed = 0usize;

        loop {
            let entry = match self.queue.dequeue().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to dequeue delivery, retrying");
                    continue;
                }
            };

            processed += 1;

            if let Err(e) = self.processor.process(&entry).await {
                tracing::warn!(
                    payload_id = %entry.payload_id,
                    attempts = entry.attempts,
                    error = %e,
                    "Delivery processing failed"
                );

                // `requeue_if_failed` also returns false when the store
                // refuses the push, not only at the retry cap.
                if !self.queue.requeue_if_failed(&entry).await {
                    if entry.attempts >= RETRY_CAP {
                        tracing::warn!(
                            board_id = %entry.board_id,
                            webhook_id = %entry.webhook_id,
                            payload_id = %entry.payload_id,
                            "Retry budget exhausted, dropping delivery"
                        );
                    } else {
                        tracing::warn!(
                            board_id = %entry.board_id,
                            webhook_id = %entry.webhook_id,
                            payload_id = %entry.payload_id,
                            attempts = entry.attempts,
                            "Requeue push failed, delivery lost"
                        );
                    }
                }
            }

            tokio::time::sleep(self.throttle).await;
        }

        processed
    }

    /// Drain forever, pausing `poll_interval` between passes.
    pub async fn run(&mut self, poll_interval: Duration) {
        loop {
            let processed = self.flush().await;
            if processed > 0 {
                tracing::info!(processed, "Drained delivery queue");
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
