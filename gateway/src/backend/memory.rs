//! In-memory connection transport
//!
//! A listener/dialer pair that hands out `tokio::io::duplex` streams instead
//! of sockets. Each dial yields a fresh ordered, reliable byte stream whose
//! other half is queued on the listener for the server to accept.

use std::io;
use std::sync::Arc;

use tokio::io::DuplexStream;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

/// Per-direction buffer of one in-memory connection (1 MiB)
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Connections that may wait to be accepted
const ACCEPT_BACKLOG: usize = 64;

/// Create an in-memory listener.
///
/// Returns the dialing side and the accepting side.
pub fn listen(buffer_size: usize) -> (InMemoryConnector, InMemoryIncoming) {
    let (sender, receiver) = mpsc::channel(ACCEPT_BACKLOG);
    let connector = InMemoryConnector {
        sender: Arc::new(Mutex::new(Some(sender))),
        buffer_size,
    };
    (connector, InMemoryIncoming { receiver })
}

/// Dialing side of an in-memory listener.
#[derive(Debug, Clone)]
pub struct InMemoryConnector {
    sender: Arc<Mutex<Option<mpsc::Sender<DuplexStream>>>>,
    buffer_size: usize,
}

impl InMemoryConnector {
    /// Open a new connection to the listener.
    pub async fn dial(&self) -> io::Result<DuplexStream> {
        // Clone out of the lock so a full backlog cannot block close()
        let sender = self.sender.lock().await.clone().ok_or_else(closed)?;

        let (client, server) = tokio::io::duplex(self.buffer_size);
        sender.send(server).await.map_err(|_| closed())?;
        Ok(client)
    }

    /// Close the listener.
    ///
    /// Pending and future dials fail, and the accept stream ends once the
    /// queued connections are drained. Returns `false` if it was already
    /// closed.
    pub async fn close(&self) -> bool {
        self.sender.lock().await.take().is_some()
    }

    #[cfg(test)]
    pub(crate) async fn is_closed(&self) -> bool {
        self.sender.lock().await.is_none()
    }
}

/// Accepting side of an in-memory listener.
#[derive(Debug)]
pub struct InMemoryIncoming {
    receiver: mpsc::Receiver<DuplexStream>,
}

impl InMemoryIncoming {
    /// Accepted connections, in the shape tonic's `serve_with_incoming` takes.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<DuplexStream>> {
        ReceiverStream::new(self.receiver).map(Ok::<_, io::Error>)
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionRefused, "in-memory listener is closed")
}
