use tokio::sync::mpsc;
use vox_frames::FrameEnvelope;

use crate::direction::Direction;

/// Default bounded-queue capacity for async processors and pipeline edges
/// (spec §4.2).
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// A cloneable handle for delivering a frame to a processor's intake. Each
/// processor owns exactly one inlet regardless of direction; the direction
/// travels alongside the frame so a single inbound loop can dispatch on it.
#[derive(Clone)]
pub struct Inlet {
    tx: mpsc::Sender<(FrameEnvelope, Direction)>,
}

impl Inlet {
    pub fn new(tx: mpsc::Sender<(FrameEnvelope, Direction)>) -> Self {
        Self { tx }
    }

    /// Blocks (backpressure) until the intake has room or the receiver is
    /// gone, mirroring the Go channel-send semantics in spec §4.2.
    pub async fn send(&self, frame: FrameEnvelope, direction: Direction) -> Result<(), ()> {
        self.tx.send((frame, direction)).await.map_err(|_| ())
    }
}

pub fn channel(capacity: usize) -> (Inlet, mpsc::Receiver<(FrameEnvelope, Direction)>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Inlet::new(tx), rx)
}

/// What a processor's logic sees: handles to the two neighbors plus,
/// for async processors, its own outbound queue. `push_frame` always
/// delivers immediately; `queue_frame` defers to the local outbound queue
/// when one exists (spec §4.2), otherwise it behaves exactly like
/// `push_frame`.
#[derive(Clone)]
pub struct ProcessorContext {
    downstream: Option<Inlet>,
    upstream: Option<Inlet>,
    outbound: Option<Inlet>,
}

impl ProcessorContext {
    pub fn new(downstream: Option<Inlet>, upstream: Option<Inlet>, outbound: Option<Inlet>) -> Self {
        Self {
            downstream,
            upstream,
            outbound,
        }
    }

    /// Synchronous hand-off to the neighbor in `direction`; used for
    /// priority frames like `StartInterruption` that must preempt anything
    /// already queued (spec §4.2 ordering guarantee).
    pub async fn push_frame(&self, frame: FrameEnvelope, direction: Direction) {
        self.deliver_to_neighbor(frame, direction).await;
    }

    /// Defers to the processor's own outbound queue when worker-backed,
    /// otherwise behaves like `push_frame` (spec §4.2).
    pub async fn queue_frame(&self, frame: FrameEnvelope, direction: Direction) {
        match &self.outbound {
            Some(outbound) => {
                let _ = outbound.send(frame, direction).await;
            }
            None => self.deliver_to_neighbor(frame, direction).await,
        }
    }

    async fn deliver_to_neighbor(&self, frame: FrameEnvelope, direction: Direction) {
        let neighbor = match direction {
            Direction::Downstream => &self.downstream,
            Direction::Upstream => &self.upstream,
        };
        if let Some(neighbor) = neighbor {
            if neighbor.send(frame, direction).await.is_err() {
                tracing::debug!(?direction, "neighbor inlet closed, dropping frame");
            }
        } else {
            tracing::trace!(?direction, frame = frame.name, "no neighbor, frame leaves the chain");
        }
    }
}
