use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};

use crate::capture::domain::sample::SampleBundle;

/// Handle a capture device pushes bundles into.
///
/// Never blocks: when the consumer is behind, the bundle is discarded and
/// counted rather than queued.
#[derive(Clone)]
pub struct SampleSink {
    tx: Sender<SampleBundle>,
    discarded: Arc<AtomicU64>,
}

impl SampleSink {
    pub fn new(tx: Sender<SampleBundle>) -> Self {
        Self {
            tx,
            discarded: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns `false` if the bundle was discarded.
    pub fn push(&self, bundle: SampleBundle) -> bool {
        match self.tx.try_send(bundle) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::sample::{DepthSample, DropReason, VideoSample};
    use crate::shared::timestamp::Timestamp;

    fn empty_bundle(nanos: i64) -> SampleBundle {
        SampleBundle {
            timestamp: Timestamp::from_nanos(nanos),
            video: VideoSample::Dropped(DropReason::Missing),
            depth: DepthSample::Dropped(DropReason::Missing),
        }
    }

    #[test]
    fn test_push_when_full_discards_newest() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let sink = SampleSink::new(tx);

        assert!(sink.push(empty_bundle(1)));
        assert!(!sink.push(empty_bundle(2)));
        assert_eq!(sink.discarded(), 1);
        assert_eq!(rx.try_recv().unwrap().timestamp, Timestamp::from_nanos(1));
    }

    #[test]
    fn test_clones_share_discard_counter() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let sink = SampleSink::new(tx);
        let clone = sink.clone();
        drop(rx);

        assert!(!clone.push(empty_bundle(1)));
        assert_eq!(sink.discarded(), 1);
    }
}
