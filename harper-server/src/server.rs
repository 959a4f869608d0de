use crate::{router, AppState};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use harper_core::ipc::{HarperRequest, HarperResponse};
use std::path::Path;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

/// Frames are a 4-byte little-endian length prefix followed by a MessagePack payload.
pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder().little_endian().new_codec()
}

pub async fn run_unix_server(
    socket_path: &str,
    state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    let listener = UnixListener::bind(socket_path)?;
    tracing::info!("IPC server listening on {}", socket_path);

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, _) = res?;
                let state = state.clone();
                tokio::spawn(handle_connection(stream, state));
            }
            _ = shutdown.recv() => {
                tracing::info!("Shutting down IPC server...");
                break;
            }
        }
    }

    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    Ok(())
}

async fn handle_connection(stream: UnixStream, state: AppState) {
    let (read, write) = stream.into_split();
    let mut framed_read = FramedRead::new(read, frame_codec());
    let mut framed_write = FramedWrite::new(write, frame_codec());

    while let Some(frame) = framed_read.next().await {
        let bytes_mut = match frame {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("Frame error: {}", e);
                break;
            }
        };

        let response = match rmp_serde::from_slice::<HarperRequest>(&bytes_mut) {
            Ok(request) => router::handle_request(request, &state).await,
            Err(e) => HarperResponse::err(format!("Deserialization error: {}", e)),
        };

        match rmp_serde::to_vec_named(&response) {
            Ok(resp_bytes) => {
                if let Err(e) = framed_write.send(Bytes::from(resp_bytes)).await {
                    tracing::error!("Failed to send response: {}", e);
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                break;
            }
        }
    }
}
