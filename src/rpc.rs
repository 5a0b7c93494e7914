//! Multiplexed binary RPC client for the greet protocol.
//!
//! One `GreetClient` owns one TCP connection. Concurrent callers are
//! multiplexed over it by request id: a writer task serializes outgoing
//! frames, and a reader task routes each response frame to the waiting
//! caller. This is what lets many outstanding request slots share a single
//! connection without application-level locking.

use crate::pipeline::RequestError;
use crate::wire::{self, Decode, GreetRequest, GreetResponse, STATUS_OK};
use bytes::BytesMut;
use dashmap::DashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Initial receive buffer allocation per connection (8KB)
const INITIAL_BUFFER_SIZE: usize = 8192;

/// Maximum receive buffer size per connection (1MB)
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

type Waiter = oneshot::Sender<Result<String, RequestError>>;

struct Shared {
    pending: DashMap<u64, Waiter>,
    closed: AtomicBool,
}

/// Fail every pending call and refuse new ones.
fn fail_all(shared: &Shared, reason: &str) {
    shared.closed.store(true, Ordering::SeqCst);
    let ids: Vec<u64> = shared.pending.iter().map(|entry| *entry.key()).collect();
    for id in ids {
        if let Some((_, tx)) = shared.pending.remove(&id) {
            let _ = tx.send(Err(RequestError::ConnectionClosed(reason.to_string())));
        }
    }
}

/// A persistent, multiplexed connection to a greet server.
///
/// Cloning is cheap; clones share the underlying connection.
#[derive(Clone)]
pub struct GreetClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    next_id: AtomicU64,
    frames: mpsc::UnboundedSender<Vec<u8>>,
    shared: Arc<Shared>,
}

impl GreetClient {
    /// Connect to `address` (`host:port`) and spawn the connection's reader
    /// and writer tasks.
    pub async fn connect(address: &str) -> Result<Self, std::io::Error> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        let shared = Arc::new(Shared {
            pending: DashMap::new(),
            closed: AtomicBool::new(false),
        });
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();

        tokio::spawn(write_loop(write_half, frames_rx, Arc::clone(&shared)));
        tokio::spawn(read_loop(read_half, Arc::clone(&shared)));

        debug!("connected to {}", address);

        Ok(Self {
            inner: Arc::new(ClientInner {
                next_id: AtomicU64::new(1),
                frames: frames_tx,
                shared,
            }),
        })
    }

    /// Issue one unary greet call and wait for its reply.
    ///
    /// A non-success response status aborts the call with
    /// [`RequestError::Rejected`]; the caller decides what that means for
    /// its pipeline (the benchmark worker treats it as fatal).
    pub async fn greet(&self, name: &str) -> Result<String, RequestError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = wire::encode_frame(&GreetRequest {
            id,
            name: name.to_string(),
        })?;

        let (tx, rx) = oneshot::channel();
        self.inner.shared.pending.insert(id, tx);

        // Insert-before-check: either fail_all sees the entry, or this load
        // sees the closed flag
        if self.inner.shared.closed.load(Ordering::SeqCst) {
            self.inner.shared.pending.remove(&id);
            return Err(RequestError::ConnectionClosed(
                "connection is closed".to_string(),
            ));
        }

        if self.inner.frames.send(frame).is_err() {
            self.inner.shared.pending.remove(&id);
            return Err(RequestError::ConnectionClosed(
                "writer task has exited".to_string(),
            ));
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(RequestError::ConnectionClosed(
                "connection lost before reply".to_string(),
            )),
        }
    }
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut frames: mpsc::UnboundedReceiver<Vec<u8>>,
    shared: Arc<Shared>,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = write_half.write_all(&frame).await {
            fail_all(&shared, &format!("write failed: {}", e));
            return;
        }
    }
    // All senders dropped: the client is gone, nothing left to fail
}

async fn read_loop(read_half: OwnedReadHalf, shared: Arc<Shared>) {
    let reason = match pump_responses(read_half, &shared).await {
        Ok(()) => "connection closed by server".to_string(),
        Err(e) => e.to_string(),
    };
    debug!("reader exiting: {}", reason);
    fail_all(&shared, &reason);
}

async fn pump_responses(mut read_half: OwnedReadHalf, shared: &Shared) -> Result<(), RequestError> {
    let mut buffer = BytesMut::with_capacity(INITIAL_BUFFER_SIZE);

    loop {
        // Drain every complete frame already in the buffer before blocking
        // on the next read; TCP segments routinely coalesce several replies
        while buffer.len() >= 4 {
            match wire::decode_frame(&buffer) {
                Ok((size, payload)) => {
                    let mut cursor = Cursor::new(payload);
                    match GreetResponse::decode(&mut cursor) {
                        Ok(response) => dispatch(shared, response),
                        Err(e) => warn!("failed to decode response payload: {}", e),
                    }
                    let _ = buffer.split_to(4 + size as usize);
                }
                Err(e) if e.is_incomplete() => break,
                Err(e) => return Err(e.into()),
            }
        }

        if buffer.len() > MAX_BUFFER_SIZE {
            return Err(RequestError::ConnectionClosed(
                "receive buffer overflow".to_string(),
            ));
        }

        let n = read_half.read_buf(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }
    }
}

fn dispatch(shared: &Shared, response: GreetResponse) {
    match shared.pending.remove(&response.id) {
        Some((_, tx)) => {
            let result = if response.status == STATUS_OK {
                Ok(response.message)
            } else {
                Err(RequestError::Rejected(response.message))
            };
            let _ = tx.send(result);
        }
        None => warn!("response for unknown request id {}", response.id),
    }
}
