//! Native messaging host.
//!
//! Reads triggers from the extension on stdin, runs a dispatch for each
//! "get music" trigger, and writes notifications and badge updates back on
//! stdout. The host exits when the browser closes stdin, after in-flight
//! dispatches have finished and their messages have been written.

pub mod codec;
pub mod messages;
pub mod outbox;

pub use codec::{MAX_MESSAGE_SIZE, MessageReader, MessageWriter};
pub use messages::{GET_MUSIC, HostMessage, TriggerMessage};
pub use outbox::HostOutbox;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::dispatch::{DispatchOutcome, TokenGatedDispatcher};

/// Counters reported when the host stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostSummary {
    pub received: usize,
    pub dispatched: usize,
    pub ignored: usize,
}

/// Serve one browser connection until `reader` reaches EOF.
///
/// `outbox` is the receiving half of the [`HostOutbox`] registered with the
/// dispatcher's notification and badge sinks.
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    dispatcher: Arc<TokenGatedDispatcher>,
    outbox: mpsc::UnboundedReceiver<HostMessage>,
) -> Result<HostSummary>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let cancel = CancellationToken::new();
    let writer_task = tokio::spawn(write_loop(
        MessageWriter::new(writer),
        outbox,
        cancel.clone(),
    ));

    let mut reader = MessageReader::new(reader);
    let mut summary = HostSummary::default();
    let mut in_flight: Vec<JoinHandle<DispatchOutcome>> = Vec::new();

    info!(gate_policy = ?dispatcher.policy(), "Native messaging host started");

    let read_result = loop {
        let frame = match reader.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };
        summary.received += 1;
        in_flight.retain(|handle| !handle.is_finished());

        let trigger: TriggerMessage = match serde_json::from_slice(&frame) {
            Ok(trigger) => trigger,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed message");
                summary.ignored += 1;
                continue;
            }
        };

        match trigger.target_url() {
            Some(url) => {
                debug!(%url, "Received trigger");
                in_flight.push(dispatcher.spawn_dispatch(url.to_string()));
                summary.dispatched += 1;
            }
            None => {
                debug!(message = %trigger.message, "Ignoring message");
                summary.ignored += 1;
            }
        }
    };

    if !in_flight.is_empty() {
        debug!(count = in_flight.len(), "Waiting for in-flight dispatches");
    }
    for handle in in_flight {
        if let Err(e) = handle.await {
            error!(error = %e, "Dispatch task failed");
        }
    }

    cancel.cancel();
    match writer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Failed to write to the extension"),
        Err(e) => error!(error = %e, "Writer task failed"),
    }

    info!(
        received = summary.received,
        dispatched = summary.dispatched,
        ignored = summary.ignored,
        "Native messaging host stopped"
    );

    read_result.map(|()| summary)
}

async fn write_loop<W>(
    mut writer: MessageWriter<W>,
    mut outbox: mpsc::UnboundedReceiver<HostMessage>,
    cancel: CancellationToken,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            message = outbox.recv() => match message {
                Some(message) => writer.send(&message).await?,
                None => return Ok(()),
            },
            _ = cancel.cancelled() => {
                while let Ok(message) = outbox.try_recv() {
                    writer.send(&message).await?;
                }
                return Ok(());
            }
        }
    }
}
