use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::connection::{Connection, ConnectionState, SendError, DEFAULT_QUEUE_CAPACITY};
use super::registry::ConnectionRegistry;
use crate::AppState;

/// Timing and buffering knobs for one client connection
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    pub send_timeout: Duration,
    /// Notifications a client may fall behind by before it is dropped
    pub queue_capacity: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(5),
            send_timeout: Duration::from_secs(5),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// WebSocket upgrade endpoint
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    let registry = state.registry.clone();
    let settings = state.connection_settings;
    ws.max_message_size(state.ws_max_message_size)
        .on_failed_upgrade(|e: axum::Error| warn!("WebSocket upgrade failed: {}", e))
        .on_upgrade(move |socket| handle_socket(socket, registry, settings))
}

async fn handle_socket(
    socket: WebSocket,
    registry: ConnectionRegistry,
    settings: ConnectionSettings,
) {
    let (sender, receiver) = socket.split();
    serve_connection(sender, receiver, registry, settings).await;
}

/// Drive one client from registration to release.
///
/// Two tasks run while the client is active: a read loop that only watches
/// for hang-ups (inbound data is ignored) and the writer, which owns the
/// socket's output and sends queued notifications and liveness pings. The
/// first of read failure, write failure or an external close (for instance
/// an overflowing queue) ends the connection.
pub async fn serve_connection<S, R>(
    sender: S,
    receiver: R,
    registry: ConnectionRegistry,
    settings: ConnectionSettings,
) where
    S: Sink<Message, Error = axum::Error> + Send + Unpin + 'static,
    R: Stream<Item = Result<Message, axum::Error>> + Send + Unpin + 'static,
{
    let (conn, queue) = Connection::new(settings.queue_capacity);
    let conn = Arc::new(conn);
    registry.add(conn.clone());
    info!(
        "WebSocket connection {} established ({} active)",
        conn.id(),
        registry.len()
    );

    let mut read_task = tokio::spawn(read_loop(conn.clone(), receiver));
    let mut write_task = tokio::spawn(write_loop(conn.clone(), sender, queue, settings));

    let finished_writer = tokio::select! {
        _ = &mut read_task => {
            debug!("Read loop finished for {}", conn.id());
            None
        }
        sink = &mut write_task => {
            debug!("Writer finished for {}", conn.id());
            Some(sink)
        }
        _ = conn.closed() => {
            debug!("Connection {} closed externally", conn.id());
            None
        }
    };
    read_task.abort();
    registry.close(&conn);

    // the writer stops once it sees the close and hands the sink back
    let sink = match finished_writer {
        Some(sink) => sink,
        None => write_task.await,
    };
    match sink {
        Ok(mut sink) => {
            // best effort, the peer may already be gone
            let close = async {
                let _ = sink.send(Message::Close(None)).await;
                let _ = sink.close().await;
            };
            let _ = tokio::time::timeout(settings.send_timeout, close).await;
        }
        Err(e) => warn!("Writer for {} panicked: {}", conn.id(), e),
    }
    conn.set_state(ConnectionState::Closed);
    info!(
        "WebSocket connection {} terminated ({} active)",
        conn.id(),
        registry.len()
    );
}

async fn read_loop<R>(conn: Arc<Connection>, mut receiver: R)
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Close(_)) => {
                debug!("Client {} sent close", conn.id());
                return;
            }
            Ok(_) => conn.touch(),
            Err(e) => {
                debug!("Read error on {}: {}", conn.id(), e);
                return;
            }
        }
    }
}

/// Sole writer of a client socket. Queued notifications go out in order,
/// a ping goes out every `ping_interval`; each write has its own deadline.
/// Returns the sink once the connection closes or a write fails.
async fn write_loop<S>(
    conn: Arc<Connection>,
    mut sink: S,
    mut queue: mpsc::Receiver<Message>,
    settings: ConnectionSettings,
) -> S
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let start = tokio::time::Instant::now() + settings.ping_interval;
    let mut ticker = tokio::time::interval_at(start, settings.ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        let (frame, deadline) = tokio::select! {
            biased;
            _ = conn.closed() => break,
            queued = queue.recv() => match queued {
                Some(frame) => (frame, settings.send_timeout),
                None => break,
            },
            _ = ticker.tick() => (Message::Ping(Vec::new()), settings.ping_timeout),
        };
        let is_ping = matches!(frame, Message::Ping(_));
        if let Err(e) = write_frame(&mut sink, frame, deadline).await {
            if is_ping {
                warn!("Ping to {} failed: {}", conn.id(), e);
            } else {
                warn!("Dropping client {} after failed delivery: {}", conn.id(), e);
            }
            break;
        }
    }
    sink
}

async fn write_frame<S>(sink: &mut S, frame: Message, deadline: Duration) -> Result<(), SendError>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    match tokio::time::timeout(deadline, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SendError::Transport(e)),
        Err(_) => Err(SendError::Timeout(deadline)),
    }
}
