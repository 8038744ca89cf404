//! Order-preserving publish pipeline.
//!
//! The room enqueues [`Outbound`] items synchronously, inside the same
//! actor turn as the mutation that produced them. A single consumer task
//! drains the queue into an [`EventSink`], so sink latency never stalls
//! the game loop and delivery order equals enqueue order.

use roomball_protocol::{Outbound, RoomEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::SinkError;

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// The downstream consumer of published items.
///
/// Called from the pipeline's consumer task only, one item at a time. An
/// error is logged and the item dropped; delivery continues with the next.
pub trait EventSink: Send + 'static {
    fn deliver(&mut self, item: Outbound) -> Result<(), SinkError>;
}

/// Discards everything. Used before a real sink is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn deliver(&mut self, _item: Outbound) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Forwards every item to a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    /// A sink plus the receiving end of its channel.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&mut self, item: Outbound) -> Result<(), SinkError> {
        self.tx.send(item).map_err(|_| SinkError::Closed)
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Producer side of the pipeline. Cheap to clone; enqueueing never blocks.
#[derive(Debug, Clone)]
pub struct Publisher {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Publisher {
    /// A publisher and the raw queue behind it, for callers that drain
    /// the queue themselves.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// A publisher whose queue is drained into `sink` by a new task.
    ///
    /// The task ends once every `Publisher` clone has been dropped and the
    /// queue is empty. A room holds clones in its actor and in the
    /// bandwidth registry shared by every [`RoomHandle`](crate::RoomHandle),
    /// so for a room this means: the actor has exited and every handle to
    /// it is gone. Handles that outlive a shutdown keep the task parked.
    pub fn spawn<S: EventSink>(sink: S) -> (Self, JoinHandle<()>) {
        let (publisher, rx) = Self::channel();
        let task = tokio::spawn(run_consumer(rx, sink));
        (publisher, task)
    }

    /// Appends an item to the queue. Returns `false` if the consumer is gone.
    pub fn enqueue(&self, item: Outbound) -> bool {
        match self.tx.send(item) {
            Ok(()) => true,
            Err(_) => {
                debug!("publish queue closed, dropping item");
                false
            }
        }
    }

    pub fn event(&self, event: RoomEvent) -> bool {
        trace!(key = %event.key, command = %event.command, snapshot = event.snapshot, "enqueue event");
        self.enqueue(Outbound::Event(event))
    }

    pub fn end_of_snapshot(&self) -> bool {
        self.enqueue(Outbound::EndOfSnapshot)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn run_consumer<S: EventSink>(mut rx: mpsc::UnboundedReceiver<Outbound>, mut sink: S) {
    debug!("publish consumer started");
    let mut delivered = 0u64;
    while let Some(item) = rx.recv().await {
        match sink.deliver(item) {
            Ok(()) => delivered += 1,
            Err(SinkError::Closed) => {
                warn!(delivered, "sink closed, stopping publish consumer");
                return;
            }
            Err(e) => warn!(error = %e, "sink failed to deliver item"),
        }
    }
    debug!(delivered, "publish consumer stopped");
}
