use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{select, Receiver, Sender};
use thiserror::Error;

use crate::capture::domain::sample::{
    DepthSample, DropReason, SampleBundle, SyncedPair, VideoSample,
};
use crate::capture::domain::sample_sink::SampleSink;
use crate::shared::pixel_buffer::BGRA_CHANNELS;
use crate::shared::timestamp::Timestamp;

const THREAD_NAME: &str = "depthcam-sync";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("failed to spawn synchronizer thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("synchronizer thread panicked")]
    Panicked,
}

/// Receives validated pairs, one at a time, on the synchronizer thread.
pub trait PairHandler: Send {
    fn on_pair(&mut self, pair: SyncedPair);
}

impl<F: FnMut(SyncedPair) + Send> PairHandler for F {
    fn on_pair(&mut self, pair: SyncedPair) {
        self(pair)
    }
}

/// Counters for everything the synchronizer saw.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub delivered: u64,
    pub dropped_incomplete: u64,
    pub dropped_malformed: u64,
    pub dropped_out_of_order: u64,
    /// Bundles still queued when delivery was halted.
    pub dropped_after_stop: u64,
    /// Bundles the sink discarded because the queue was full.
    pub dropped_queue_full: u64,
}

impl SyncStats {
    pub fn dropped(&self) -> u64 {
        self.dropped_incomplete
            + self.dropped_malformed
            + self.dropped_out_of_order
            + self.dropped_after_stop
            + self.dropped_queue_full
    }
}

#[derive(Debug, PartialEq)]
enum Rejection {
    Incomplete(DropReason),
    Malformed(&'static str),
    OutOfOrder,
}

/// Turns platform bundles into ordered, complete pairs on a dedicated thread.
///
/// Layout: `device → SampleSink (bounded) → sync thread → PairHandler`
///
/// The handler is owned by the thread for its whole life and handed back
/// by `join`, so per-frame state needs no locking.
pub struct StreamSynchronizer<H: PairHandler + 'static> {
    sink: SampleSink,
    accepting: Arc<AtomicBool>,
    shutdown_tx: Sender<()>,
    handle: JoinHandle<(H, SyncStats)>,
}

impl<H: PairHandler + 'static> StreamSynchronizer<H> {
    pub fn spawn(handler: H, queue_capacity: usize) -> Result<Self, SyncError> {
        let (sample_tx, sample_rx) = crossbeam_channel::bounded(queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let accepting = Arc::new(AtomicBool::new(true));

        let thread_accepting = accepting.clone();
        let handle = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run_sync_loop(handler, sample_rx, shutdown_rx, thread_accepting))
            .map_err(SyncError::Spawn)?;

        Ok(Self {
            sink: SampleSink::new(sample_tx),
            accepting,
            shutdown_tx,
            handle,
        })
    }

    pub fn sink(&self) -> SampleSink {
        self.sink.clone()
    }

    /// Halts delivery: bundles not yet handed to the handler are discarded.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    /// Stops the thread and returns the handler with final counters.
    pub fn join(self) -> Result<(H, SyncStats), SyncError> {
        self.stop_accepting();
        let _ = self.shutdown_tx.send(());
        let (handler, mut stats) = self.handle.join().map_err(|_| SyncError::Panicked)?;
        stats.dropped_queue_full = self.sink.discarded();
        Ok((handler, stats))
    }
}

fn run_sync_loop<H: PairHandler>(
    mut handler: H,
    sample_rx: Receiver<SampleBundle>,
    shutdown_rx: Receiver<()>,
    accepting: Arc<AtomicBool>,
) -> (H, SyncStats) {
    let mut stats = SyncStats::default();
    let mut last_delivered: Option<Timestamp> = None;

    loop {
        select! {
            recv(sample_rx) -> msg => {
                let Ok(bundle) = msg else { break };
                if !accepting.load(Ordering::SeqCst) {
                    stats.dropped_after_stop += 1;
                    continue;
                }
                match pair_from_bundle(bundle, last_delivered) {
                    Ok(pair) => {
                        last_delivered = Some(pair.timestamp);
                        stats.delivered += 1;
                        handler.on_pair(pair);
                    }
                    Err(rejection) => {
                        log::debug!("Dropping sample bundle: {rejection:?}");
                        match rejection {
                            Rejection::Incomplete(_) => stats.dropped_incomplete += 1,
                            Rejection::Malformed(_) => stats.dropped_malformed += 1,
                            Rejection::OutOfOrder => stats.dropped_out_of_order += 1,
                        }
                    }
                }
            }
            recv(shutdown_rx) -> _ => break,
        }
    }

    stats.dropped_after_stop += sample_rx.try_iter().count() as u64;
    (handler, stats)
}

fn pair_from_bundle(
    bundle: SampleBundle,
    last_delivered: Option<Timestamp>,
) -> Result<SyncedPair, Rejection> {
    let video = match bundle.video {
        VideoSample::Frame(buffer) => buffer,
        VideoSample::Dropped(reason) => return Err(Rejection::Incomplete(reason)),
    };
    let raw_depth = match bundle.depth {
        DepthSample::Data(raw) => raw,
        DepthSample::Dropped(reason) => return Err(Rejection::Incomplete(reason)),
    };

    if last_delivered.is_some_and(|last| bundle.timestamp <= last) {
        return Err(Rejection::OutOfOrder);
    }

    let expected_video_len =
        video.width() as usize * video.height() as usize * BGRA_CHANNELS;
    if video.data().len() != expected_video_len || video.is_empty() {
        return Err(Rejection::Malformed("video buffer size"));
    }
    if raw_depth.width() == 0 || raw_depth.height() == 0 {
        return Err(Rejection::Malformed("empty depth map"));
    }
    if raw_depth.height() != video.height() {
        return Err(Rejection::Malformed("video and depth heights differ"));
    }

    let depth = raw_depth.into_meters();
    if depth.data().len() != depth.width() as usize * depth.height() as usize {
        return Err(Rejection::Malformed("depth buffer size"));
    }

    Ok(SyncedPair {
        timestamp: bundle.timestamp,
        video,
        depth,
    })
}
