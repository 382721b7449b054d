use std::{io, str};

use comms::{
    OnoReceiver, OnoSender,
    envelope::{self, RESERVED_ID},
    msg::{CommandMsg, Response},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        UnixStream,
        unix::{OwnedReadHalf, OwnedWriteHalf},
    },
    task,
};

use crate::{
    config::ServerConfig,
    dispatcher::Dispatcher,
    error::{Result, ServerErr},
    interrupt::ShutdownFlag,
};

/// The receive, dispatch and reply loop over a single manager connection.
pub struct ModelServer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
    /// Lent to the blocking pool while a command runs.
    dispatcher: Option<Dispatcher>,
}

impl ModelServer<OwnedReadHalf, OwnedWriteHalf> {
    /// Connects to the manager's socket and performs the handshake.
    ///
    /// # Args
    /// * `config` - The endpoint and identity.
    /// * `dispatcher` - The command dispatcher, owning every handler.
    pub async fn connect(config: &ServerConfig, dispatcher: Dispatcher) -> Result<Self> {
        debug!("trying to connect to manager at {}", config.endpoint().display());
        let stream = UnixStream::connect(config.endpoint()).await?;
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);

        let server = Self::handshake(rx, tx, config.identity(), dispatcher).await?;
        info!("connected at {}", config.endpoint().display());
        Ok(server)
    }
}

impl<R, W> ModelServer<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Announces `identity` and tells the manager the server is ready.
    ///
    /// # Args
    /// * `rx` - Receiving end of the manager channel.
    /// * `tx` - Sending end of the manager channel.
    /// * `identity` - The stable transport identity.
    /// * `dispatcher` - The command dispatcher.
    pub async fn handshake(
        rx: OnoReceiver<R>,
        mut tx: OnoSender<W>,
        identity: &str,
        dispatcher: Dispatcher,
    ) -> Result<Self> {
        tx.greet(identity.as_bytes()).await?;
        tx.send(&envelope::encode(0, RESERVED_ID, &Response::connected()))
            .await?;

        Ok(Self {
            rx,
            tx,
            dispatcher: Some(dispatcher),
        })
    }

    /// Serves commands until QUIT or until the manager goes away.
    ///
    /// # Args
    /// * `shutdown` - The interrupt state, checked before every receive.
    ///
    /// # Errors
    /// Returns `ServerErr` on transport failures. The transport is released on every path.
    pub async fn run(mut self, shutdown: &ShutdownFlag) -> Result<()> {
        let outcome = self.serve(shutdown).await;

        if let Err(e) = self.tx.shutdown().await {
            debug!("failed to release the transport: {e}");
        }

        outcome
    }

    async fn serve(&mut self, shutdown: &ShutdownFlag) -> Result<()> {
        let mut closing_announced = false;

        loop {
            if shutdown.closing_requested() && !closing_announced {
                info!("closing requested, serving until QUIT");
                closing_announced = true;
            }

            let delivery = match self.rx.recv().await {
                Ok(delivery) => delivery,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    info!("manager closed the connection");
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    warn!("dropping malformed message: {e}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let Ok(payload) = str::from_utf8(&delivery.payload) else {
                warn!("failed to decode payload as utf-8");
                continue;
            };

            let (send_id, recv_id, Some(msg)) = envelope::decode(payload) else {
                continue;
            };

            let cmd = msg.cmd;
            let (response, keep_running) = self.execute(msg).await?;

            let reply = envelope::encode(recv_id, send_id, &response);
            self.tx.send(&reply).await?;
            debug!(cmd = cmd.as_str(), success = response.success(); "replied");

            if !keep_running {
                info!("received QUIT, shutting down");
                return Ok(());
            }
        }
    }

    /// Runs a command on the blocking pool so that the interrupt listener stays live.
    async fn execute(&mut self, msg: CommandMsg) -> Result<(Response, bool)> {
        let mut dispatcher = self
            .dispatcher
            .take()
            .ok_or_else(|| ServerErr::Io(io::Error::other("dispatcher lost by a failed command")))?;

        let (dispatcher, response, keep_running) = task::spawn_blocking(move || {
            let (response, keep_running) = dispatcher.execute(msg);
            (dispatcher, response, keep_running)
        })
        .await
        .map_err(|e| ServerErr::Io(io::Error::other(format!("dispatch join error: {e}"))))?;

        self.dispatcher = Some(dispatcher);
        Ok((response, keep_running))
    }
}
