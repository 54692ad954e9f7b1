//! Bounded sample feed between a predictor thread and the frame loop.
//!
//! The predictor side offers ticks without blocking; when the queue is full
//! the tick is dropped and counted. The frame loop drains whatever arrived
//! into its conditioner before producing a frame.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use log::{debug, warn};

use crate::{
    conditioner::{FrameOutput, GazeConditioner, IngestOutcome},
    geometry::RawSample,
};

/// One predictor tick; `None` means no prediction
pub type Tick = Option<RawSample>;

/// Producer half of the feed
#[derive(Debug, Clone)]
pub struct SampleSender {
    tx: SyncSender<Tick>,
    dropped: Arc<AtomicU64>,
}

/// Consumer half of the feed
#[derive(Debug)]
pub struct SampleReceiver {
    rx: Receiver<Tick>,
    dropped: Arc<AtomicU64>,
}

/// Create a bounded feed holding at most `capacity` pending ticks
///
/// # Panics
///
/// Panics if `capacity` is zero
#[must_use]
pub fn channel(capacity: usize) -> (SampleSender, SampleReceiver) {
    assert!(capacity > 0, "Feed capacity must be greater than 0");
    let (tx, rx) = mpsc::sync_channel(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        SampleSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        SampleReceiver { rx, dropped },
    )
}

impl SampleSender {
    /// Offer a tick without blocking
    ///
    /// Returns `false` if the tick was dropped because the queue is full or
    /// the receiver is gone.
    pub fn offer(&self, tick: Tick) -> bool {
        match self.tx.try_send(tick) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Sample feed full, dropped tick ({} total)", total);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Ticks dropped so far because the queue was full
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl SampleReceiver {
    /// Move every pending tick into the conditioner
    ///
    /// Returns the number of ticks consumed.
    pub fn drain_into(&self, conditioner: &mut GazeConditioner) -> usize {
        let mut consumed = 0;
        loop {
            match self.rx.try_recv() {
                Ok(tick) => {
                    conditioner.ingest(tick);
                    consumed += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        consumed
    }

    /// Wait up to `timeout` for the next tick
    ///
    /// Returns `None` on timeout or when every sender is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Tick> {
        match self.rx.recv_timeout(timeout) {
            Ok(tick) => Some(tick),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Ticks dropped so far on the producer side
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Conditioner shared between a sample-arrival thread and a frame thread
#[derive(Clone)]
pub struct SharedConditioner(Arc<Mutex<GazeConditioner>>);

impl SharedConditioner {
    #[must_use]
    pub fn new(conditioner: GazeConditioner) -> Self {
        Self(Arc::new(Mutex::new(conditioner)))
    }

    /// Ingest under the lock
    pub fn ingest(&self, tick: Tick) -> IngestOutcome {
        self.0.lock().unwrap_or_else(Self::recover).ingest(tick)
    }

    /// Produce a frame under the lock
    pub fn frame(&self, now_ms: f64) -> FrameOutput {
        self.0.lock().unwrap_or_else(Self::recover).frame(now_ms)
    }

    /// Run `f` with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut GazeConditioner) -> R) -> R {
        f(&mut self.0.lock().unwrap_or_else(Self::recover))
    }

    fn recover<T>(poisoned: PoisonError<T>) -> T {
        warn!("Conditioner lock poisoned; continuing with existing state");
        poisoned.into_inner()
    }
}
