//! WebSocket client for the uplift event stream

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use uplift_api::events::WsEvent;

use crate::error::{ClientError, Result};

/// Reconnect delays, doubling up to a ceiling
#[derive(Debug, Clone)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay before the next attempt
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

/// How one connection ended
enum Session {
    /// The consumer dropped its receiver
    ConsumerGone,
    /// The server went away after at least one event arrived
    Lost(ClientError),
}

/// Streams upgrade events from the daemon, reconnecting when the socket drops
///
/// Events emitted while disconnected are not replayed; poll the history
/// endpoint to catch up.
#[derive(Debug)]
pub struct WsClient {
    events: mpsc::Receiver<WsEvent>,
    task: JoinHandle<()>,
}

impl WsClient {
    /// Start streaming from `url`
    ///
    /// The first connection attempt happens in the background, so an
    /// unreachable daemon shows up as retries in the log rather than an error.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid.
    #[allow(clippy::unused_async)]
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        Self::with_backoff(url, Backoff::default())
    }

    fn with_backoff(url: impl AsRef<str>, backoff: Backoff) -> Result<Self> {
        let url = Url::parse(url.as_ref())?;
        let (tx, events) = mpsc::channel(100);
        let task = tokio::spawn(run(url, tx, backoff));
        Ok(Self { events, task })
    }

    /// Next event, or `None` once the stream has stopped
    pub async fn recv(&mut self) -> Option<WsEvent> {
        self.events.recv().await
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(url: Url, tx: mpsc::Sender<WsEvent>, mut backoff: Backoff) {
    loop {
        let err = match session(&url, &tx).await {
            Ok(Session::ConsumerGone) => {
                tracing::debug!(%url, "event consumer gone, closing websocket");
                return;
            }
            Ok(Session::Lost(err)) => {
                backoff.reset();
                err
            }
            Err(err) => err,
        };

        let delay = backoff.next_delay();
        tracing::warn!(%url, error = %err, retry_in = ?delay, "event stream interrupted");
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = tx.closed() => return,
        }
    }
}

/// One connection; `Err` means nothing was received on it
async fn session(url: &Url, tx: &mpsc::Sender<WsEvent>) -> Result<Session> {
    let (stream, _) = connect_async(url.as_str())
        .await
        .map_err(|e| ClientError::WebSocket(e.to_string()))?;
    tracing::info!(%url, "event stream connected");

    let (_sink, mut read) = stream.split();
    let mut received = false;

    let ended = loop {
        let msg = tokio::select! {
            msg = read.next() => msg,
            () = tx.closed() => return Ok(Session::ConsumerGone),
        };
        let text = match msg {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(frame))) => {
                let reason = frame.map_or_else(
                    || "server closed stream".to_string(),
                    |f| format!("server closed stream: {}", f.reason.as_str()),
                );
                break ClientError::ConnectionClosed(reason);
            }
            // tungstenite answers pings itself
            Some(Ok(_)) => continue,
            Some(Err(e)) => break ClientError::WebSocket(e.to_string()),
            None => break ClientError::ConnectionClosed("stream ended".into()),
        };

        match parse_event(&text) {
            Ok(event) => {
                received = true;
                if tx.send(event).await.is_err() {
                    return Ok(Session::ConsumerGone);
                }
            }
            Err(e) => tracing::warn!(error = %e, "skipping unreadable event"),
        }
    };

    if received {
        Ok(Session::Lost(ended))
    } else {
        Err(ended)
    }
}

fn parse_event(text: &str) -> Result<WsEvent> {
    Ok(serde_json::from_str(text)?)
}
