//! The sending end of the multipart framing.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LenType, MORE};

/// The sending end handle of the communication.
pub struct OnoSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    /// Creates a new `OnoSender` instance.
    ///
    /// # Arguments
    /// * `tx` - The underlying writer.
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            buf: Vec::new(),
        }
    }

    /// Announces the local identity to the peer as a single frame message.
    ///
    /// # Arguments
    /// * `identity` - The stable identity of this end.
    pub async fn greet(&mut self, identity: &[u8]) -> io::Result<()> {
        self.send_frames(&[identity]).await
    }

    /// Sends `payload` behind an empty delimiter frame.
    ///
    /// # Arguments
    /// * `payload` - The content frame.
    pub async fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        let delimiter: &[u8] = &[];
        self.send_frames(&[delimiter, payload]).await
    }

    /// Sends every frame in `frames` as one multipart message.
    ///
    /// # Arguments
    /// * `frames` - The frames in order, at least one.
    ///
    /// # Returns
    /// A result object that returns `io::Error` on failure.
    pub async fn send_frames(&mut self, frames: &[&[u8]]) -> io::Result<()> {
        let Self { tx, buf } = self;

        if frames.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "a message needs at least one frame",
            ));
        }

        buf.clear();
        let last = frames.len() - 1;

        for (i, frame) in frames.iter().enumerate() {
            let flags = if i < last { MORE } else { 0 };
            buf.push(flags);
            buf.extend_from_slice(&(frame.len() as LenType).to_be_bytes());
            buf.extend_from_slice(frame);
        }

        tx.write_all(buf).await?;
        tx.flush().await
    }

    /// Shuts down the write half, the peer observes end of stream.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.tx.shutdown().await
    }
}
