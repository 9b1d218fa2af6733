//! Streaming response bodies for downloads.
//!
//! The pipeline writes plaintext into a [`BodySink`]; the bytes flow through a
//! bounded channel into the response body. Headers go out only once the first
//! chunk exists, so every failure before that point is a clean `500`. A failure
//! after it injects an error into the body stream, which makes hyper abort the
//! chunked response instead of finishing it.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::PollSender;
use tracing::Instrument;

use super::error::ApiError;
use crate::pipeline::{PipelineOrchestrator, PipelineReport, Result as PipelineResult};

/// Body chunks buffered between the pipeline and the client.
pub const BODY_CHANNEL_CAPACITY: usize = 16;

type BodyItem = Result<Bytes, io::Error>;

/// `AsyncWrite` end of a response body channel.
///
/// Writes wait for channel capacity, so a slow client slows the pipeline.
/// Once the receiving side is gone every write fails with `BrokenPipe`.
pub struct BodySink {
    sender: PollSender<BodyItem>,
}

impl BodySink {
    pub fn new(sender: mpsc::Sender<BodyItem>) -> Self {
        Self { sender: PollSender::new(sender) }
    }
}

fn response_closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "response body closed by client")
}

impl AsyncWrite for BodySink {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        ready!(self.sender.poll_reserve(cx)).map_err(|_| response_closed())?;
        self.sender.send_item(Ok(Bytes::copy_from_slice(buf))).map_err(|_| response_closed())?;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.sender.close();
        Poll::Ready(Ok(()))
    }
}

fn settle(joined: Result<PipelineResult<PipelineReport>, JoinError>) -> Result<PipelineReport, ApiError> {
    match joined {
        Ok(Ok(report)) => Ok(report),
        Ok(Err(err)) => Err(ApiError::Pipeline(err)),
        Err(err) => Err(ApiError::Internal(format!("Download task failed: {}", err))),
    }
}

fn streaming_response<S>(body: S) -> Result<Response, ApiError>
where
    S: futures::Stream<Item = BodyItem> + Send + 'static,
{
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from_stream(body))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

/// Run one pipeline and turn it into a response.
pub async fn stream_download(orchestrator: Arc<PipelineOrchestrator>) -> Result<Response, ApiError> {
    let (tx, mut rx) = mpsc::channel::<BodyItem>(BODY_CHANNEL_CAPACITY);
    let mut sink = BodySink::new(tx.clone());

    let mut run = tokio::spawn(
        async move {
            let result = orchestrator.run(&mut sink).await;
            drop(sink);
            result
        }
        .in_current_span(),
    );

    let first = tokio::select! {
        biased;
        item = rx.recv() => item,
        joined = &mut run => {
            settle(joined)?;
            drop(tx);
            return streaming_response(ReceiverStream::new(rx));
        }
    };

    // Headers are committed from here on; a late failure can only cut the body.
    tokio::spawn(
        async move {
            if let Err(err) = settle(run.await) {
                let _ = tx.send(Err(io::Error::other(err.message()))).await;
            }
        }
        .in_current_span(),
    );

    streaming_response(stream::iter(first).chain(ReceiverStream::new(rx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_sink_forwards_bytes_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut sink = BodySink::new(tx);
        sink.write_all(b"hello ").await.unwrap();
        sink.write_all(b"world").await.unwrap();
        sink.shutdown().await.unwrap();

        let mut received = Vec::new();
        while let Some(item) = rx.recv().await {
            received.extend_from_slice(&item.unwrap());
        }
        assert_eq!(received, b"hello world");
    }

    #[tokio::test]
    async fn test_sink_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut sink = BodySink::new(tx);
        let err = sink.write_all(b"data").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
