use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vox_foundation::error::{PipelineError, VoxError};
use vox_foundation::shutdown::{GRACEFUL_SHUTDOWN_DEADLINE, PROCESSOR_DRAIN_DEADLINE};
use vox_frames::{ControlFrame, Frame, FrameEnvelope};

use crate::context::{channel, Inlet, ProcessorContext, DEFAULT_QUEUE_CAPACITY};
use crate::direction::Direction;
use crate::processor::Processor;

/// How a stage's business logic is executed. `Sync` runs the processor
/// inline on a single task with no local outbound queue — the zero-task
/// fast path for cheap, non-blocking processors (spec §4.2/§9 REDESIGN
/// FLAGS). `Async` gives the processor its own bounded outbound queue and
/// a dedicated draining task, for stages that may block or burst (VAD,
/// LLM turn orchestration, audio output).
pub enum StageKind {
    Sync,
    Async { capacity: usize },
}

enum StageHandles {
    Sync(JoinHandle<()>),
    Async {
        inbound: JoinHandle<()>,
        outbound: JoinHandle<()>,
    },
}

/// A linear chain of processors wired downstream-to-downstream and
/// upstream-to-upstream (spec §2, §4). Data frames generally travel
/// downstream from the first stage to the last; control and signal
/// frames often travel back upstream to the first stage and out.
pub struct Pipeline {
    names: Vec<String>,
    downstream_in: Inlet,
    downstream_out: mpsc::Receiver<(FrameEnvelope, Direction)>,
    upstream_out: mpsc::Receiver<(FrameEnvelope, Direction)>,
    handles: Vec<StageHandles>,
}

impl Pipeline {
    /// Builds and spawns every stage. `stages` is given in downstream
    /// order: `stages[0]` sees data first, `stages[last]` last.
    pub fn new(stages: Vec<(Box<dyn Processor>, StageKind)>, queue_capacity: usize) -> Self {
        let n = stages.len();
        assert!(n > 0, "pipeline needs at least one stage");
        let queue_capacity = if queue_capacity == 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            queue_capacity
        };

        let mut inlets = Vec::with_capacity(n);
        let mut rxs = Vec::with_capacity(n);
        for _ in 0..n {
            let (inlet, rx) = channel(queue_capacity);
            inlets.push(inlet);
            rxs.push(Some(rx));
        }

        let (downstream_out_inlet, downstream_out) = channel(queue_capacity);
        let (upstream_out_inlet, upstream_out) = channel(queue_capacity);

        let mut names = Vec::with_capacity(n);
        let mut handles = Vec::with_capacity(n);

        for (i, (processor, kind)) in stages.into_iter().enumerate() {
            names.push(processor.name().to_string());
            let downstream_neighbor = if i + 1 < n {
                inlets[i + 1].clone()
            } else {
                downstream_out_inlet.clone()
            };
            let upstream_neighbor = if i > 0 {
                inlets[i - 1].clone()
            } else {
                upstream_out_inlet.clone()
            };
            let rx = rxs[i].take().expect("receiver taken once");

            match kind {
                StageKind::Sync => {
                    let ctx = ProcessorContext::new(Some(downstream_neighbor), Some(upstream_neighbor), None);
                    let handle = tokio::spawn(run_stage(processor, rx, ctx));
                    handles.push(StageHandles::Sync(handle));
                }
                StageKind::Async { capacity } => {
                    let capacity = if capacity == 0 { queue_capacity } else { capacity };
                    let (outbound_inlet, outbound_rx) = channel(capacity);
                    let outbound_handle = tokio::spawn(run_outbound(
                        outbound_rx,
                        Some(downstream_neighbor.clone()),
                        Some(upstream_neighbor.clone()),
                    ));
                    let abort_handle = outbound_handle.abort_handle();
                    // Neighbors are wired in here too, not just into
                    // `run_outbound`: `push_frame` goes straight to the
                    // neighbor (priority, bypasses the outbound queue) while
                    // `queue_frame` still prefers `outbound`.
                    let ctx = ProcessorContext::new(Some(downstream_neighbor), Some(upstream_neighbor), Some(outbound_inlet));
                    let inbound_handle = tokio::spawn(run_stage_async(processor, rx, ctx, abort_handle));
                    handles.push(StageHandles::Async {
                        inbound: inbound_handle,
                        outbound: outbound_handle,
                    });
                }
            }
        }

        Self {
            names,
            downstream_in: inlets.into_iter().next().expect("at least one stage"),
            downstream_out,
            upstream_out,
            handles,
        }
    }

    /// Sends `Start` into the first stage (spec §4.2 initialization).
    pub async fn start(&self) -> Result<(), VoxError> {
        self.inject(ControlFrame::Start).await
    }

    /// A cloneable handle to the head stage's intake, for external producers
    /// (the transport read loop) that need to feed frames in directly rather
    /// than going through `push_downstream`.
    pub fn downstream_inlet(&self) -> Inlet {
        self.downstream_in.clone()
    }

    /// Injects a data or control frame at the head of the chain, travelling
    /// downstream.
    pub async fn push_downstream(&self, frame: Frame) -> Result<(), VoxError> {
        self.downstream_in
            .send(FrameEnvelope::new(frame), Direction::Downstream)
            .await
            .map_err(|_| {
                VoxError::Pipeline(PipelineError::QueueClosed {
                    processor: self.names[0].clone(),
                })
            })
    }

    /// Polls the frame stream exiting the last stage.
    pub async fn recv_downstream_out(&mut self) -> Option<(FrameEnvelope, Direction)> {
        self.downstream_out.recv().await
    }

    /// Polls the frame stream exiting the first stage upstream.
    pub async fn recv_upstream_out(&mut self) -> Option<(FrameEnvelope, Direction)> {
        self.upstream_out.recv().await
    }

    /// Polls whichever out-queue has a frame first. Callers that need to
    /// drain both ends from a single task (rather than tracking two
    /// `&mut self` borrows in one `select!`) should use this instead of
    /// combining `recv_downstream_out`/`recv_upstream_out` directly.
    pub async fn recv_any_out(&mut self) -> Option<(FrameEnvelope, Direction)> {
        tokio::select! {
            frame = self.downstream_out.recv() => frame,
            frame = self.upstream_out.recv() => frame,
        }
    }

    async fn inject(&self, control: ControlFrame) -> Result<(), VoxError> {
        self.downstream_in
            .send(FrameEnvelope::new(Frame::Control(control)), Direction::Downstream)
            .await
            .map_err(|_| {
                VoxError::Pipeline(PipelineError::QueueClosed {
                    processor: self.names[0].clone(),
                })
            })
    }

    /// Sends `End`, then waits for every stage to drain within the
    /// per-processor and overall deadlines (spec §4.2 shutdown contract).
    pub async fn end_and_drain(mut self) -> Result<(), VoxError> {
        self.inject(ControlFrame::End).await.ok();
        self.drain_all().await
    }

    /// Sends `Cancel`, an immediate non-draining teardown: outbound queues
    /// are aborted rather than drained (spec §4.2).
    pub async fn cancel(mut self) -> Result<(), VoxError> {
        self.inject(ControlFrame::Cancel).await.ok();
        self.drain_all().await
    }

    async fn drain_all(&mut self) -> Result<(), VoxError> {
        let overall = tokio::time::timeout(GRACEFUL_SHUTDOWN_DEADLINE, async {
            for (name, handle) in self.names.iter().zip(self.handles.drain(..)) {
                match handle {
                    StageHandles::Sync(h) => {
                        if tokio::time::timeout(PROCESSOR_DRAIN_DEADLINE, h).await.is_err() {
                            tracing::warn!(processor = name.as_str(), "stage drain timed out");
                        }
                    }
                    StageHandles::Async { inbound, outbound } => {
                        if tokio::time::timeout(PROCESSOR_DRAIN_DEADLINE, inbound).await.is_err() {
                            tracing::warn!(processor = name.as_str(), "stage inbound drain timed out");
                        }
                        if tokio::time::timeout(PROCESSOR_DRAIN_DEADLINE, outbound).await.is_err() {
                            tracing::warn!(processor = name.as_str(), "stage outbound drain timed out");
                        }
                    }
                }
            }
        })
        .await;

        match overall {
            Ok(()) => Ok(()),
            Err(_) => Err(VoxError::Pipeline(PipelineError::DrainTimeout(GRACEFUL_SHUTDOWN_DEADLINE))),
        }
    }
}

async fn run_stage(
    mut processor: Box<dyn Processor>,
    mut rx: mpsc::Receiver<(FrameEnvelope, Direction)>,
    ctx: ProcessorContext,
) {
    let mut started = false;
    while let Some((frame, direction)) = rx.recv().await {
        let control = frame.payload.as_control();
        if matches!(control, Some(ControlFrame::Start)) && !started {
            processor.on_start(&ctx).await;
            started = true;
        }
        let terminal = matches!(control, Some(ControlFrame::End) | Some(ControlFrame::Cancel));
        if matches!(control, Some(ControlFrame::Cancel)) {
            processor.on_cancel().await;
        } else if matches!(control, Some(ControlFrame::End)) {
            processor.on_end(&ctx).await;
        }
        processor.process_frame(frame, direction, &ctx).await;
        if terminal {
            break;
        }
    }
}

async fn run_stage_async(
    mut processor: Box<dyn Processor>,
    mut rx: mpsc::Receiver<(FrameEnvelope, Direction)>,
    ctx: ProcessorContext,
    outbound_abort: tokio::task::AbortHandle,
) {
    let mut started = false;
    while let Some((frame, direction)) = rx.recv().await {
        let control = frame.payload.as_control();
        if matches!(control, Some(ControlFrame::Start)) && !started {
            processor.on_start(&ctx).await;
            started = true;
        }
        let is_cancel = matches!(control, Some(ControlFrame::Cancel));
        let is_end = matches!(control, Some(ControlFrame::End));
        if is_cancel {
            processor.on_cancel().await;
        } else if is_end {
            processor.on_end(&ctx).await;
        }
        processor.process_frame(frame, direction, &ctx).await;
        if is_cancel {
            // Cancel tears down immediately: nothing queued downstream is
            // worth delivering once the processor itself has cancelled.
            outbound_abort.abort();
            break;
        }
        if is_end {
            // Dropping `ctx` (and with it our outbound sender clone) lets
            // the outbound task drain whatever is already queued and then
            // exit on its own once the channel closes.
            break;
        }
    }
}

async fn run_outbound(
    mut rx: mpsc::Receiver<(FrameEnvelope, Direction)>,
    downstream: Option<Inlet>,
    upstream: Option<Inlet>,
) {
    while let Some((frame, direction)) = rx.recv().await {
        let neighbor = match direction {
            Direction::Downstream => &downstream,
            Direction::Upstream => &upstream,
        };
        if let Some(neighbor) = neighbor {
            if neighbor.send(frame, direction).await.is_err() {
                tracing::debug!(?direction, "neighbor inlet closed while draining outbound queue");
            }
        }
    }
}
