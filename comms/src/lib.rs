pub mod envelope;
pub mod msg;
mod receiver;
mod sender;
pub mod specs;

use tokio::io::{AsyncRead, AsyncWrite};

pub use receiver::{Delivery, OnoReceiver};
pub use sender::OnoSender;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// Flag bit set on every frame that is followed by another frame of the same message.
const MORE: u8 = 0b0000_0001;

/// Frames larger than this are discarded without being buffered.
const MAX_FRAME_LEN: LenType = 256 * 1024 * 1024;

/// Creates both `OnoReceiver` and `OnoSender` ends of a multipart channel.
///
/// Given a writer and reader creates and returns both ends of the communication.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// A communication stream in the form of an ono receiver and sender.
pub fn channel<R, W>(rx: R, tx: W) -> (OnoReceiver<R>, OnoSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (OnoReceiver::new(rx), OnoSender::new(tx))
}
