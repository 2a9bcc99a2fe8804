//! Native messaging framing.
//!
//! Every message is a 32-bit length in native byte order followed by that
//! many bytes of UTF-8 JSON.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::{Error, Result};

/// Largest message accepted in either direction (the browser's limit for
/// messages sent to the extension).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

pub fn native_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .native_endian()
        .max_frame_length(MAX_MESSAGE_SIZE)
        .new_codec()
}

pub struct MessageReader<R> {
    frames: FramedRead<R, LengthDelimitedCodec>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            frames: FramedRead::new(reader, native_codec()),
        }
    }

    /// Next raw message, or `None` once the browser closed the pipe.
    ///
    /// Oversized or truncated frames are protocol errors; the stream cannot
    /// be resynchronized after one.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        match self.frames.next().await {
            Some(Ok(frame)) => Ok(Some(frame.freeze())),
            Some(Err(e)) => Err(Error::protocol(format!("Failed to read message: {}", e))),
            None => Ok(None),
        }
    }
}

pub struct MessageWriter<W> {
    frames: FramedWrite<W, LengthDelimitedCodec>,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            frames: FramedWrite::new(writer, native_codec()),
        }
    }

    /// Serialize and send one message, flushing it immediately.
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let payload = serde_json::to_vec(message)?;
        self.frames
            .send(Bytes::from(payload))
            .await
            .map_err(|e| Error::protocol(format!("Failed to write message: {}", e)))
    }
}
