use std::{io, mem::take};

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{LEN_TYPE_SIZE, LenType, MAX_FRAME_LEN, MORE};

/// A message handed over by the transport: who sent it and its content frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub identity: Vec<u8>,
    pub payload: Vec<u8>,
}

/// The receiving end handle of the communication.
pub struct OnoReceiver<R: AsyncRead + Unpin> {
    rx: R,
}

impl<R: AsyncRead + Unpin> OnoReceiver<R> {
    /// Creates a new `OnoReceiver` instance.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    pub(super) fn new(rx: R) -> Self {
        Self { rx }
    }

    /// Waits for the next enveloped message.
    ///
    /// Accepts `[identity, delimiter, payload]` and `[delimiter, payload]`, in the latter
    /// case the identity is empty.
    ///
    /// # Returns
    /// The delivery, an `InvalidData` error if the message shape is wrong (the stream stays
    /// aligned on the next message) or any other `io::Error` from the reader.
    pub async fn recv(&mut self) -> io::Result<Delivery> {
        let mut frames = self.recv_frames().await?;

        let (identity, delimiter, payload) = match frames.as_mut_slice() {
            [identity, delimiter, payload] => (take(identity), take(delimiter), take(payload)),
            [delimiter, payload] => (Vec::new(), take(delimiter), take(payload)),
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected 2 or 3 frames, got {}", other.len()),
                ));
            }
        };

        if !delimiter.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected an empty delimiter frame, got {} bytes", delimiter.len()),
            ));
        }

        Ok(Delivery { identity, payload })
    }

    /// Waits for every frame of the next multipart message.
    ///
    /// # Returns
    /// The frames in order or an `io::Error`. Oversized frames are drained and reported as
    /// `InvalidData` once the whole message has been consumed.
    pub async fn recv_frames(&mut self) -> io::Result<Vec<Vec<u8>>> {
        let mut frames = Vec::new();
        let mut oversized = None;

        loop {
            let flags = self.rx.read_u8().await?;

            let mut size_buf = [0; LEN_TYPE_SIZE];
            self.rx.read_exact(&mut size_buf).await?;
            let len = LenType::from_be_bytes(size_buf);

            if len > MAX_FRAME_LEN {
                let drained = tokio::io::copy(&mut (&mut self.rx).take(len), &mut tokio::io::sink()).await?;
                if drained < len {
                    return Err(io::ErrorKind::UnexpectedEof.into());
                }
                oversized = Some(len);
            } else {
                let mut frame = vec![0; len as usize];
                self.rx.read_exact(&mut frame).await?;
                frames.push(frame);
            }

            if flags & MORE == 0 {
                break;
            }
        }

        if let Some(len) = oversized {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN} bytes limit"),
            ));
        }

        Ok(frames)
    }
}
