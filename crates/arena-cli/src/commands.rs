use std::collections::HashSet;

use arena_common::{ArenaError, Event, Toast};
use arena_sync::{RoomCoordinator, RoomPhase, SyncSession};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, warn};

use crate::render::{self, Printer};

/// Next event, skipping over lag. `None` once the bus is gone.
async fn next_event(rx: &mut Receiver<Event>) -> Option<Event> {
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(n)) => warn!(skipped = n, "event receiver lagged"),
            Err(RecvError::Closed) => return None,
        }
    }
}

pub async fn watch(session: &mut SyncSession) -> Result<(), ArenaError> {
    let mut rx = session.subscribe();
    let mut printer = Printer::new();
    println!("signed in as {}. Ctrl-C to quit.", session.identity().user_id);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = next_event(&mut rx) => match event {
                Some(event) => printer.handle(event),
                None => break,
            },
        }
    }
    debug!(visible = printer.visible_toasts(), "watch finished");
    Ok(())
}

pub async fn community(session: &SyncSession) -> Result<(), ArenaError> {
    let total = session.presence().refresh_roster().await?;
    let mut members = session.presence().roster().await;
    members.retain(|m| m.id != session.identity().user_id);
    members.sort_by(|a, b| b.online.cmp(&a.online).then_with(|| a.name.cmp(&b.name)));
    for member in &members {
        println!("{}", render::roster_line(member));
    }
    println!(
        "{} online, {total} members",
        session.presence().online_count().await
    );
    Ok(())
}

/// Follow room events until the match starts or the room disappears.
/// With `can_start`, each stdin line asks the backend to start.
async fn follow_room(
    lobby: &RoomCoordinator,
    rx: &mut Receiver<Event>,
    printer: &mut Printer,
    can_start: bool,
) -> Result<(), ArenaError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = can_start;
    loop {
        if lobby.phase().await == RoomPhase::Playing {
            println!("{}", render::room_summary(&lobby.room_state().await));
            println!("match started");
            return Ok(());
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            line = lines.next_line(), if stdin_open => match line? {
                Some(_) => match lobby.start_match().await {
                    Ok(()) => println!("starting..."),
                    Err(e) => printer.handle(Event::Toast(Toast::action_failed(
                        "Start failed",
                        e.to_string(),
                    ))),
                },
                None => stdin_open = false,
            },
            event = next_event(rx) => match event {
                Some(Event::RoomLost { room_id }) => {
                    return Err(ArenaError::Sync(format!("room {room_id} no longer exists")));
                }
                Some(event) => printer.handle(event),
                None => return Ok(()),
            },
        }
    }
}

pub async fn host(session: &SyncSession) -> Result<(), ArenaError> {
    let mut rx = session.subscribe();
    let mut printer = Printer::new();
    let mut lobby = session.room_coordinator();

    let state = lobby.create_room().await?;
    println!("{}", render::room_summary(&state));
    println!("share the code, press Enter to start");

    let result = follow_room(&lobby, &mut rx, &mut printer, true).await;
    lobby.leave();
    result
}

pub async fn join(session: &SyncSession, code: &str) -> Result<(), ArenaError> {
    let mut rx = session.subscribe();
    let mut printer = Printer::new();
    let mut lobby = session.room_coordinator();

    let state = lobby.join_room(code).await?;
    println!("{}", render::room_summary(&state));
    println!("waiting for the host to start");

    let result = follow_room(&lobby, &mut rx, &mut printer, false).await;
    lobby.leave();
    result
}

pub async fn chat(session: &mut SyncSession, friend_id: &str) -> Result<(), ArenaError> {
    let self_id = session.identity().user_id.clone();
    let mut rx = session.subscribe();
    let conversations = session.conversations();
    conversations.open(friend_id).await;
    println!("chatting with {friend_id}. Type a line to send, Ctrl-C to quit.");

    let mut shown: HashSet<String> = HashSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = conversations.send(&line).await {
                    let toast = Toast::action_failed("Send failed", e.to_string());
                    println!("{}", render::toast_line(&toast));
                }
            }
            event = next_event(&mut rx) => match event {
                Some(Event::ConversationUpdated { .. }) => {}
                Some(_) => continue,
                None => break,
            },
        }
        for msg in conversations.messages().await {
            if shown.insert(msg.id.clone()) {
                println!("{}", render::message_line(&msg, &self_id));
            }
        }
    }
    conversations.close().await;
    Ok(())
}
