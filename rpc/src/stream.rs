//! Live delta fanout.
//!
//! Each survey address maps to a broadcast channel; WebSocket clients at
//! `/stream/{survey}` get every applied delta (never the full aggregate)
//! from the moment they connect. At-most-once, best-effort: nothing is
//! replayed, lagged receivers drop messages, reconnecting clients must
//! re-fetch the aggregate snapshot to resynchronize.

use std::collections::HashMap;
use std::sync::Mutex;
use tally_attest::AppliedDelta;
use tally_types::Address;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Per-survey broadcast channels.
pub struct StreamHub {
    channels: Mutex<HashMap<Address, broadcast::Sender<String>>>,
    capacity: usize,
}

impl StreamHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Subscribe to a survey's delta stream.
    pub fn subscribe(&self, survey: &Address) -> broadcast::Receiver<String> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(survey.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Push a delta to every current subscriber of its survey.
    pub fn broadcast(&self, delta: &AppliedDelta) {
        let channels = self.channels.lock().unwrap();
        let Some(sender) = channels.get(&delta.survey) else {
            return;
        };
        match serde_json::to_string(delta) {
            Ok(payload) => {
                // Send fails only when nobody is subscribed; that is fine.
                let delivered = sender.send(payload).unwrap_or(0);
                debug!(survey = %delta.survey, delivered, "delta broadcast");
            }
            Err(e) => warn!(survey = %delta.survey, error = %e, "delta serialization failed"),
        }
    }

    /// Current subscriber count for a survey.
    pub fn subscriber_count(&self, survey: &Address) -> usize {
        self.channels
            .lock()
            .unwrap()
            .get(survey)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_attest::RowDelta;

    fn addr(byte: u8) -> Address {
        Address::from_bytes(&[byte; 20])
    }

    fn delta(survey: Address) -> AppliedDelta {
        AppliedDelta {
            survey,
            new_person: true,
            rows: vec![RowDelta::new(None, None)],
        }
    }

    #[tokio::test]
    async fn subscribers_receive_their_surveys_deltas() {
        let hub = StreamHub::new();
        let mut rx = hub.subscribe(&addr(1));

        hub.broadcast(&delta(addr(1)));
        let payload = rx.recv().await.unwrap();
        assert!(payload.contains("\"new_person\":true"));
    }

    #[tokio::test]
    async fn deltas_are_scoped_per_survey() {
        let hub = StreamHub::new();
        let mut rx = hub.subscribe(&addr(1));

        hub.broadcast(&delta(addr(2)));
        hub.broadcast(&delta(addr(1)));

        let payload = rx.recv().await.unwrap();
        assert!(payload.contains(addr(1).as_str()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_noop() {
        let hub = StreamHub::new();
        hub.broadcast(&delta(addr(1)));
        assert_eq!(hub.subscriber_count(&addr(1)), 0);
    }

    #[tokio::test]
    async fn dropped_receiver_leaves_the_set() {
        let hub = StreamHub::new();
        let rx = hub.subscribe(&addr(1));
        assert_eq!(hub.subscriber_count(&addr(1)), 1);
        drop(rx);
        assert_eq!(hub.subscriber_count(&addr(1)), 0);
    }
}
