//! JSON-lines transport for the bridge
//!
//! The daemon speaks the panel protocol over a byte stream: one JSON object
//! per line in each direction. Lines that do not decode into a known request
//! are dropped here, before they ever reach the controller.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use iconbridge_shared::bridge::{Inbox, Outbox};
use iconbridge_shared::protocol::decode_request;
use iconbridge_shared::{PanelMessage, UiRequest};

/// Forward every decodable request line from `reader` into `outbox`.
///
/// Returns once the reader reaches end of input; dropping `outbox` at that
/// point tells the controller the panel went away.
pub async fn pump_requests<R>(reader: R, outbox: Outbox<UiRequest>) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut forwarded = 0;

    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read request line")?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match decode_request(line) {
            UiRequest::Ignored => warn!("Dropping unrecognized request line"),
            request => {
                debug!("Received {}", request.type_name());
                outbox.post(request);
                forwarded += 1;
            }
        }
    }

    info!("Request stream closed after {} requests", forwarded);
    Ok(forwarded)
}

/// Write every message from `inbox` to `writer`, one line each, until all
/// outboxes are dropped.
pub async fn pump_messages<W>(mut inbox: Inbox<PanelMessage>, mut writer: W) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;

    while let Some(message) = inbox.recv().await {
        let line = message
            .encode()
            .with_context(|| format!("Failed to encode {}", message.type_name()))?;
        writer
            .write_all(line.as_bytes())
            .await
            .context("Failed to write message")?;
        writer
            .write_all(b"\n")
            .await
            .context("Failed to write newline")?;
        writer.flush().await.context("Failed to flush message")?;
        written += 1;
    }

    debug!("Message stream closed after {} messages", written);
    Ok(written)
}
