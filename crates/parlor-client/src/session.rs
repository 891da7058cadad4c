use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use parlor_core::{Ack, Effects, Intent, Notice, RoomCore, RoomSnapshot, Write};
use parlor_types::events::Envelope;

use crate::error::ClientError;
use crate::rest::{Persistence, execute};

type Settlement = (Write, Result<Ack, ClientError>);

/// The caller's side of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    intents: mpsc::UnboundedSender<Intent>,
    pub snapshots: watch::Receiver<RoomSnapshot>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
}

impl SessionHandle {
    pub fn send(&self, intent: Intent) -> Result<(), ClientError> {
        self.intents.send(intent).map_err(|_| ClientError::Closed)
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        self.snapshots.borrow().clone()
    }
}

enum Event {
    Intent(Option<Intent>),
    Frame(Option<Envelope>),
    Settled(Settlement),
    Tick,
}

/// Drives a `RoomCore` on one task: user intents, inbound frames, finished
/// writes and timers are handled strictly one at a time.
pub struct Session<P: Persistence> {
    core: RoomCore,
    store: P,
    outbound: mpsc::UnboundedSender<Envelope>,
    inbound: mpsc::UnboundedReceiver<Envelope>,
    inbound_open: bool,
    intents: mpsc::UnboundedReceiver<Intent>,
    snapshots: watch::Sender<RoomSnapshot>,
    notices: mpsc::UnboundedSender<Notice>,
    writes: JoinSet<Settlement>,
}

impl<P: Persistence> Session<P> {
    pub fn new(
        core: RoomCore,
        store: P,
        outbound: mpsc::UnboundedSender<Envelope>,
        inbound: mpsc::UnboundedReceiver<Envelope>,
    ) -> (Self, SessionHandle) {
        let (intents_tx, intents) = mpsc::unbounded_channel();
        let (notices_tx, notices) = mpsc::unbounded_channel();
        let (snapshots, snapshots_rx) = watch::channel(core.snapshot());

        let session = Self {
            core,
            store,
            outbound,
            inbound,
            inbound_open: true,
            intents,
            snapshots,
            notices: notices_tx,
            writes: JoinSet::new(),
        };
        let handle = SessionHandle {
            intents: intents_tx,
            snapshots: snapshots_rx,
            notices,
        };
        (session, handle)
    }

    /// Load messages and players, then announce ourselves.
    pub async fn bootstrap(&mut self) -> Result<(), ClientError> {
        let room = self.core.room();
        let (messages, players) =
            tokio::try_join!(self.store.fetch_messages(room), self.store.list_players())?;
        let effects = self.core.bootstrap(messages, players);
        self.perform(effects);
        self.publish();
        Ok(())
    }

    /// Run until every `SessionHandle` is dropped, then announce we left and
    /// wait for outstanding writes.
    pub async fn run(mut self) {
        loop {
            match self.next_event().await {
                Event::Intent(Some(intent)) => {
                    let effects = self.core.handle(intent, Instant::now());
                    self.perform(effects);
                }
                Event::Intent(None) => break,
                Event::Frame(Some(envelope)) => {
                    let effects = self.core.receive(envelope, Instant::now());
                    self.perform(effects);
                }
                Event::Frame(None) => {
                    warn!("event channel closed; continuing without live updates");
                    self.inbound_open = false;
                }
                Event::Settled((write, result)) => {
                    let effects = self.core.settle(write, result);
                    self.perform(effects);
                }
                Event::Tick => {
                    let effects = self.core.tick(Instant::now());
                    self.perform(effects);
                }
            }
            self.publish();
        }

        info!("leaving room {}", self.core.room());
        let effects = self.core.leave();
        self.perform(effects);
        while let Some(joined) = self.writes.join_next().await {
            match joined {
                Ok((write, result)) => {
                    let effects = self.core.settle(write, result);
                    self.perform(effects);
                }
                Err(e) => warn!("write task failed: {}", e),
            }
        }
        self.publish();
    }

    async fn next_event(&mut self) -> Event {
        loop {
            let deadline = self.core.next_deadline();
            let idle = Instant::now() + Duration::from_secs(3600);

            tokio::select! {
                intent = self.intents.recv() => return Event::Intent(intent),
                frame = self.inbound.recv(), if self.inbound_open => return Event::Frame(frame),
                Some(joined) = self.writes.join_next(), if !self.writes.is_empty() => match joined {
                    Ok(settlement) => return Event::Settled(settlement),
                    Err(e) => warn!("write task failed: {}", e),
                },
                _ = sleep_until(deadline.unwrap_or(idle)), if deadline.is_some() => return Event::Tick,
            }
        }
    }

    fn perform(&mut self, effects: Effects) {
        for write in effects.writes {
            debug!("write: {}", write.op.name());
            let store = self.store.clone();
            self.writes.spawn(async move {
                let result = execute(&store, &write.op).await;
                (write, result)
            });
        }
        for envelope in effects.emits {
            let name = envelope.event.name();
            if self.outbound.send(envelope).is_err() {
                warn!("event channel closed; dropping {}", name);
            }
        }
        for notice in effects.notices {
            info!("{}", notice);
            let _ = self.notices.send(notice);
        }
    }

    /// Push a fresh snapshot to watchers, unless nothing they can see moved.
    fn publish(&self) {
        let next = self.core.snapshot();
        self.snapshots.send_if_modified(|current| {
            if current.same_as(&next) {
                return false;
            }
            *current = next;
            true
        });
    }
}
