use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use axum::extract::ws::Message;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Frames queued for a client that its writer has not sent yet
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Unique identity of one accepted socket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Active,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

#[derive(Debug)]
pub enum SendError {
    /// The connection already left the Active state or its writer is gone
    Closed,
    /// The outbound queue is full, the client is not keeping up
    QueueFull,
    Timeout(Duration),
    Transport(axum::Error),
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Closed => write!(f, "connection is closed"),
            SendError::QueueFull => write!(f, "outbound queue is full"),
            SendError::Timeout(after) => write!(f, "send timed out after {:?}", after),
            SendError::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

impl std::error::Error for SendError {}

/// One connected client.
///
/// The registry owns membership, the handler owns the socket lifecycle.
/// Notifications are queued here and written by the single writer task the
/// handler runs for this client, so frames leave in the order they were
/// queued and a slow socket only ever holds up its own queue.
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::Sender<Message>,
    state: AtomicU8,
    closing: AtomicBool,
    shutdown: CancellationToken,
    opened_at: Instant,
    last_seen_ms: AtomicU64,
}

impl Connection {
    /// New connection plus the receiving end of its outbound queue, which
    /// belongs to the writer.
    pub fn new(queue_capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (outbound, queue) = mpsc::channel(queue_capacity);
        let conn = Self {
            id: ConnectionId::new(),
            outbound,
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            closing: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            opened_at: Instant::now(),
            last_seen_ms: AtomicU64::new(0),
        };
        (conn, queue)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Moves Connecting to Active; later states are left alone
    pub(crate) fn activate(&self) {
        let _ = self.state.compare_exchange(
            ConnectionState::Connecting as u8,
            ConnectionState::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Record inbound activity from the peer
    pub fn touch(&self) {
        let elapsed = self.opened_at.elapsed().as_millis() as u64;
        self.last_seen_ms.store(elapsed, Ordering::Relaxed);
    }

    /// Last time the peer sent anything (the open time if it never did)
    pub fn last_seen(&self) -> Instant {
        self.opened_at + Duration::from_millis(self.last_seen_ms.load(Ordering::Relaxed))
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Flip into Closing. Only the first caller gets `true`.
    pub(crate) fn begin_close(&self) -> bool {
        if self.closing.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.set_state(ConnectionState::Closing);
        self.shutdown.cancel();
        true
    }

    /// Resolves once the connection starts closing, from any path
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }

    /// Queue a text frame without waiting on the socket
    pub fn enqueue_text(&self, payload: &str) -> Result<(), SendError> {
        if self.is_closing() {
            return Err(SendError::Closed);
        }
        match self.outbound.try_send(Message::Text(payload.to_string())) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SendError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(SendError::Closed),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
