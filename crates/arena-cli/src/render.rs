//! Plain-text rendering of session events.

use arena_common::{Event, Toast, ToastKind, ToastQueue};
use arena_sync::presence::RosterMember;
use arena_sync::{DirectMessage, RoomState};

pub fn toast_line(toast: &Toast) -> String {
    let tag = match toast.kind {
        ToastKind::NewNotification => "new",
        ToastKind::UnreadSummary => "inbox",
        ToastKind::ActionFailed => "error",
    };
    format!("[{tag}] {}: {}", toast.title, toast.body)
}

/// One line for an event, or `None` for events the terminal ignores.
pub fn event_line(event: &Event) -> Option<String> {
    match event {
        Event::Toast(toast) => Some(toast_line(toast)),
        Event::InboxUpdated { total, unread } => Some(format!("inbox: {unread}/{total} unread")),
        Event::PresenceChanged { user_id, online } => Some(format!(
            "{user_id} is {}",
            if *online { "online" } else { "offline" }
        )),
        Event::RosterRefreshed { members, online } => {
            Some(format!("community: {online} of {members} online"))
        }
        Event::RoomPhaseChanged { room_id, phase } => Some(format!("room {room_id}: {phase}")),
        Event::RoomParticipants { room_id, count } => {
            Some(format!("room {room_id}: {count} player(s)"))
        }
        Event::RoomLost { room_id } => Some(format!("room {room_id} no longer exists")),
        Event::SessionStarted { .. }
        | Event::SessionStopped
        | Event::ConversationUpdated { .. }
        | Event::Unknown => None,
    }
}

pub fn roster_line(member: &RosterMember) -> String {
    let mark = if member.online { "*" } else { " " };
    let seen = member
        .last_seen
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".into());
    format!("{mark} {:<24} {:<36} last seen {seen}", member.name, member.id)
}

pub fn message_line(msg: &DirectMessage, self_id: &str) -> String {
    let who = if msg.sender_id == self_id {
        "you"
    } else {
        msg.sender_id.as_str()
    };
    format!("{} {who}: {}", msg.created_at.format("%H:%M"), msg.content)
}

pub fn room_summary(state: &RoomState) -> String {
    let code = state.code().unwrap_or("-");
    let names: Vec<&str> = state.participants.iter().map(|p| p.name.as_str()).collect();
    format!(
        "room {code} ({}) players: {}",
        state.phase,
        if names.is_empty() {
            "-".to_string()
        } else {
            names.join(", ")
        }
    )
}

/// Prints events as they arrive and keeps the visible toast stack.
pub struct Printer {
    toasts: ToastQueue,
}

impl Printer {
    pub fn new() -> Self {
        Self {
            toasts: ToastQueue::default(),
        }
    }

    pub fn handle(&mut self, event: Event) {
        if let Some(line) = event_line(&event) {
            println!("{line}");
        }
        if let Event::Toast(toast) = event {
            self.toasts.push(toast);
        }
    }

    pub fn visible_toasts(&mut self) -> usize {
        self.toasts.visible().len()
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn toast_lines_are_tagged() {
        let line = toast_line(&Toast::action_failed("Join failed", "room not found"));
        assert_eq!(line, "[error] Join failed: room not found");
        assert!(toast_line(&Toast::unread_summary(3)).starts_with("[inbox]"));
    }

    #[test]
    fn lifecycle_events_are_silent() {
        assert!(event_line(&Event::SessionStopped).is_none());
        assert!(event_line(&Event::Unknown).is_none());
        let line = event_line(&Event::PresenceChanged {
            user_id: "a".into(),
            online: true,
        })
        .unwrap();
        assert_eq!(line, "a is online");
    }

    #[test]
    fn message_line_marks_own_messages() {
        let msg = DirectMessage {
            id: "dm1".into(),
            sender_id: "me".into(),
            receiver_id: "f1".into(),
            content: "hello".into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        };
        assert_eq!(message_line(&msg, "me"), "09:30 you: hello");
        assert_eq!(message_line(&msg, "f1"), "09:30 me: hello");
    }

    #[test]
    fn roster_line_flags_online() {
        let member = RosterMember {
            id: "a".into(),
            name: "Alice".into(),
            avatar_url: None,
            last_seen: None,
            online: true,
        };
        let line = roster_line(&member);
        assert!(line.starts_with("* Alice"));
        assert!(line.ends_with("last seen never"));
    }

    #[test]
    fn printer_keeps_toasts() {
        let mut printer = Printer::new();
        printer.handle(Event::Toast(Toast::unread_summary(2)));
        printer.handle(Event::InboxUpdated {
            total: 2,
            unread: 2,
        });
        assert_eq!(printer.visible_toasts(), 1);
    }
}
