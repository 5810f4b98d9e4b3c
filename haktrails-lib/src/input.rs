//! Input streaming.
//!
//! Reads newline-delimited items and feeds the shared work channel. The
//! streamer owns the only sender, so the channel closes exactly once: when
//! this function returns.

use crate::error::TrailsError;
use crate::types::WorkItem;
use std::borrow::Cow;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// What the streamer did before the channel closed.
#[derive(Debug, Default)]
pub struct StreamStats {
    /// Items published to the channel
    pub published: usize,
    /// Blank lines skipped
    pub skipped: usize,
    /// Read error that ended the stream early, if any
    pub error: Option<TrailsError>,
}

/// Publish every non-blank line of `reader` to `sender`, then close it.
///
/// Lines that are not valid UTF-8 are decoded lossily and still published.
/// Only a read error ends the stream early; everything published before it
/// is still processed. Stops quietly if every receiver has gone away.
pub async fn stream_lines<R>(reader: R, sender: mpsc::Sender<WorkItem>) -> StreamStats
where
    R: AsyncRead + Unpin,
{
    let mut stats = StreamStats::default();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let item = line.trim();
                if item.is_empty() {
                    stats.skipped += 1;
                    continue;
                }
                if let Cow::Owned(_) = line {
                    tracing::warn!("input line {:?} is not valid UTF-8, decoded lossily", item);
                }
                if sender.send(item.to_string()).await.is_err() {
                    tracing::debug!("all workers gone, stopping input");
                    break;
                }
                stats.published += 1;
            }
            Err(e) => {
                let err = TrailsError::input(format!("failed to read input: {}", e));
                tracing::warn!("{}; processing {} items read so far", err, stats.published);
                stats.error = Some(err);
                break;
            }
        }
    }

    tracing::debug!(
        "input exhausted: {} items, {} blank lines",
        stats.published,
        stats.skipped
    );
    stats
}
