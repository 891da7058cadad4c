use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};
use url::Url;

use parlor_types::events::Envelope;

use crate::error::ClientError;

/// Ping every 15 seconds; two missed pongs in a row drop the connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const MAX_MISSED_PONGS: u8 = 2;

/// Ends of a live event channel. Dropping `outbound` closes the socket;
/// `inbound` yields `None` once the socket is gone.
#[derive(Debug)]
pub struct Channel {
    pub outbound: mpsc::UnboundedSender<Envelope>,
    pub inbound: mpsc::UnboundedReceiver<Envelope>,
    pub task: JoinHandle<()>,
}

/// Open the websocket at `url` and pump envelopes both ways on a background
/// task.
pub async fn connect(url: &Url) -> Result<Channel, ClientError> {
    let (socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
    info!("event channel connected to {}", url);

    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound) = mpsc::unbounded_channel();
    let (sink, stream) = socket.split();
    let task = tokio::spawn(run_channel_loop(
        sink,
        stream,
        outbound_rx,
        inbound_tx,
        HEARTBEAT_INTERVAL,
    ));

    Ok(Channel {
        outbound,
        inbound,
        task,
    })
}

async fn run_channel_loop<S, R, E>(
    mut sink: S,
    mut stream: R,
    mut outbound: mpsc::UnboundedReceiver<Envelope>,
    inbound: mpsc::UnboundedSender<Envelope>,
    heartbeat_every: Duration,
) where
    S: Sink<Message, Error = E> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut heartbeat = tokio::time::interval(heartbeat_every);
    heartbeat.tick().await;
    let mut pong_received = true;
    let mut missed_pongs: u8 = 0;

    loop {
        tokio::select! {
            envelope = outbound.recv() => {
                let Some(envelope) = envelope else {
                    debug!("session gone, closing event channel");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                let text = match serde_json::to_string(&envelope) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("could not encode {}: {}", envelope.event.name(), e);
                        continue;
                    }
                };
                trace!("-> {}", text);
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    warn!("event channel send failed: {}", e);
                    break;
                }
            }
            frame = stream.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("event channel read failed: {}", e);
                        break;
                    }
                    None => break,
                };
                match msg {
                    Message::Text(text) => {
                        trace!("<- {}", text.as_str());
                        match serde_json::from_str::<Envelope>(text.as_str()) {
                            Ok(envelope) => {
                                if inbound.send(envelope).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                let preview: String = text.as_str().chars().take(200).collect();
                                warn!("skipping malformed frame: {} -- {}", e, preview);
                            }
                        }
                    }
                    Message::Pong(_) => pong_received = true,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            _ = heartbeat.tick() => {
                if std::mem::replace(&mut pong_received, false) {
                    missed_pongs = 0;
                } else {
                    missed_pongs += 1;
                    if missed_pongs >= MAX_MISSED_PONGS {
                        warn!("heartbeat timeout (missed {} pongs), dropping event channel", missed_pongs);
                        break;
                    }
                }
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!("event channel closed");
}
