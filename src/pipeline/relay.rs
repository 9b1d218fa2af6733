//! Bounded-chunk byte relay between one source and one sink.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::{Direction, PipelineError, Result};

/// Default relay chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

/// Copy `source` into `sink` in chunks of at most `chunk_size` bytes.
///
/// Each chunk is fully written and flushed before the next read, so the
/// faster side is paced by the slower one. A chunk shorter than `chunk_size`
/// marks end of stream; the sink is then shut down. Returns the number of
/// bytes relayed.
pub async fn relay<R, W>(source: &mut R, sink: &mut W, chunk_size: usize, direction: Direction) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let chunk = chunk_size.max(1) as u64;
    let mut total = 0u64;

    loop {
        let mut limited = (&mut *source).take(chunk);
        let copied = tokio::io::copy(&mut limited, &mut *sink)
            .await
            .map_err(|e| PipelineError::transfer(direction, e))?;
        total += copied;

        if copied < chunk {
            break;
        }
    }

    sink.shutdown().await.map_err(|e| PipelineError::transfer(direction, e))?;
    tracing::trace!(direction = direction.as_str(), bytes = total, "Relay finished");
    Ok(total)
}
