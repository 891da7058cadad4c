use std::collections::HashSet;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use uuid::Uuid;

use parlor_client::{Config, RestClient, Session, channel};
use parlor_core::{Intent, RoomCore, RoomSnapshot};
use parlor_types::api::Membership;
use parlor_types::models::UserId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlor=debug,parlor_core=debug,parlor_client=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let rest = RestClient::new(config.api_url.clone())?;

    match rest.fetch_room(config.room_id).await {
        Ok(room) => info!("room: {} ({})", room.name, room.id),
        Err(e) => warn!("could not load room {}: {}", config.room_id, e),
    }

    let registered = rest
        .register(&config.username, &config.registration())
        .await?;
    match registered.is {
        Membership::New => info!(
            "registered @{} as player {}",
            registered.user.username, registered.user.id
        ),
        Membership::Old => info!("welcome back @{}", registered.user.username),
    }

    let channel = channel::connect(&config.channel_url).await?;
    let core = RoomCore::new(registered.user, config.room_id, config.core.clone());
    let (mut session, mut handle) = Session::new(core, rest, channel.outbound, channel.inbound);
    session.bootstrap().await?;
    let session_task = tokio::spawn(session.run());

    let snapshot = handle.snapshot();
    for message in snapshot.messages.iter() {
        info!("{} {}", sender_name(&snapshot, message.sender_id), message.text);
    }
    info!("{} online; type a line to send it, ctrl-c to leave", snapshot.online);

    let mut printed: HashSet<Uuid> = snapshot.messages.iter().map(|m| m.id).collect();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                handle.send(Intent::Input)?;
                handle.send(Intent::Send { text: line })?;
            }
            Some(notice) = handle.notices.recv() => {
                warn!("{}", notice);
            }
            changed = handle.snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = handle.snapshots.borrow_and_update().clone();
                for message in snapshot.messages.iter() {
                    if !message.pending && printed.insert(message.id) {
                        info!("{} {}", sender_name(&snapshot, message.sender_id), message.text);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(handle);
    session_task.await?;
    let _ = channel.task.await;
    info!("bye");
    Ok(())
}

fn sender_name(snapshot: &RoomSnapshot, sender_id: UserId) -> String {
    snapshot
        .roster
        .iter()
        .find(|entry| entry.user.id == sender_id)
        .map(|entry| format!("@{}:", entry.user.username))
        .unwrap_or_else(|| format!("#{}:", sender_id))
}
