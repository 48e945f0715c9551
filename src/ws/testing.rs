//! In-process stand-ins for client sockets.

use axum::extract::ws::Message;
use futures_util::{sink, stream, Sink, Stream};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use super::connection::{Connection, DEFAULT_QUEUE_CAPACITY};

pub type BoxSink = Pin<Box<dyn Sink<Message, Error = axum::Error> + Send>>;

/// Sink that forwards every frame to the returned receiver
pub fn channel_sink() -> (BoxSink, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel::<Message>();
    let sink = sink::unfold(tx, |tx: mpsc::UnboundedSender<Message>, msg: Message| async move {
        tx.send(msg).map_err(axum::Error::new)?;
        Ok::<_, axum::Error>(tx)
    });
    (Box::pin(sink), rx)
}

fn broken_pipe() -> axum::Error {
    axum::Error::new(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "peer went away",
    ))
}

/// Sink whose every operation fails, like a peer that vanished
pub struct FailingSink;

impl Sink<Message> for FailingSink {
    type Error = axum::Error;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Err(broken_pipe()))
    }

    fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), Self::Error> {
        Err(broken_pipe())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Err(broken_pipe()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Err(broken_pipe()))
    }
}

pub fn failing_sink() -> FailingSink {
    FailingSink
}

/// Sink that never becomes ready, like a peer that stopped reading
pub struct StalledSink;

impl Sink<Message> for StalledSink {
    type Error = axum::Error;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }

    fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), Self::Error> {
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }
}

pub fn stalled_sink() -> StalledSink {
    StalledSink
}

/// Inbound frame stream fed from the returned sender. Dropping the sender
/// ends the stream, which looks like the peer hanging up.
pub fn inbound_stream() -> (
    mpsc::UnboundedSender<Result<Message, axum::Error>>,
    impl Stream<Item = Result<Message, axum::Error>> + Send + Unpin + 'static,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|msg| (msg, rx))
    }));
    (tx, stream)
}

/// Connection without a writer; its queue is handed to the test directly
pub fn channel_connection() -> (Arc<Connection>, mpsc::Receiver<Message>) {
    let (conn, queue) = Connection::new(DEFAULT_QUEUE_CAPACITY);
    (Arc::new(conn), queue)
}

/// Connection whose writer is already gone
pub fn failing_connection() -> Arc<Connection> {
    let (conn, _queue) = Connection::new(DEFAULT_QUEUE_CAPACITY);
    Arc::new(conn)
}

/// Next text frame, skipping pings and other control frames
pub async fn next_text(rx: &mut mpsc::Receiver<Message>) -> Option<String> {
    while let Some(msg) = rx.recv().await {
        if let Message::Text(text) = msg {
            return Some(text);
        }
    }
    None
}
