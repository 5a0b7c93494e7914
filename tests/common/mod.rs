use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use bytes::BytesMut;
use greet_bench::wire::{self, Decode, GreetRequest, GreetResponse, STATUS_ERROR, STATUS_OK};
use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// How a stub greet target answers requests.
#[derive(Clone, Copy, Debug)]
pub enum StubBehavior {
    /// Reply successfully after a fixed delay.
    Reply { delay: Duration },
    /// Reject every request.
    Fail,
}

/// Spawn an in-process greet server speaking the binary wire protocol.
///
/// Requests are handled concurrently per connection, so many outstanding
/// slots multiplexed over one connection see independent delays.
#[allow(dead_code)]
pub async fn spawn_rpc_stub(behavior: StubBehavior) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(handle_rpc_connection(stream, behavior));
        }
    });

    addr
}

#[allow(dead_code)]
async fn handle_rpc_connection(stream: TcpStream, behavior: StubBehavior) {
    stream.set_nodelay(true).ok();
    let (mut read_half, mut write_half) = stream.into_split();

    // Replies funnel through one writer task so concurrent handlers never
    // interleave partial frames
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        while let Some(frame) = reply_rx.recv().await {
            if write_half.write_all(&frame).await.is_err() {
                break;
            }
        }
    });

    let mut buffer = BytesMut::with_capacity(8192);
    loop {
        while buffer.len() >= 4 {
            match wire::decode_frame(&buffer) {
                Ok((size, payload)) => {
                    let mut cursor = Cursor::new(payload);
                    if let Ok(request) = GreetRequest::decode(&mut cursor) {
                        let reply_tx = reply_tx.clone();
                        tokio::spawn(async move {
                            let response = respond(request, behavior).await;
                            let _ = reply_tx.send(wire::encode_frame(&response).unwrap());
                        });
                    }
                    let _ = buffer.split_to(4 + size as usize);
                }
                Err(e) if e.is_incomplete() => break,
                Err(_) => return,
            }
        }

        match read_half.read_buf(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

#[allow(dead_code)]
async fn respond(request: GreetRequest, behavior: StubBehavior) -> GreetResponse {
    match behavior {
        StubBehavior::Reply { delay } => {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            GreetResponse {
                id: request.id,
                status: STATUS_OK,
                message: format!("Hello, {}!", request.name),
            }
        }
        StubBehavior::Fail => GreetResponse {
            id: request.id,
            status: STATUS_ERROR,
            message: "injected failure".to_string(),
        },
    }
}

/// Spawn an in-process HTTP greet server on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_http_stub(behavior: StubBehavior) -> SocketAddr {
    let app = Router::new().route(
        "/hello/greeting",
        get(
            move |Query(params): Query<HashMap<String, String>>| async move {
                match behavior {
                    StubBehavior::Reply { delay } => {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        let name = params.get("name").cloned().unwrap_or_default();
                        (StatusCode::OK, format!("Hello, {}!", name))
                    }
                    StubBehavior::Fail => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "injected failure".to_string(),
                    ),
                }
            },
        ),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}
