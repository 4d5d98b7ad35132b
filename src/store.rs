use chrono::{DateTime, Local, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
}

/// Reply shape. The payload rides in the variant: slot menus carry their
/// instants, confirmations carry nothing beyond the text summary.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    Plain,
    SlotOptions(Vec<DateTime<Utc>>),
    Confirmation,
}

/// One conversational turn. Immutable once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub kind: MessageKind,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            kind: MessageKind::Plain,
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            text: text.into(),
            kind: MessageKind::Plain,
        }
    }
}

/// Append-only log of turns — the single thing the renderer reads. Entries
/// are never edited, reordered or removed.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn append(&mut self, message: Message) -> &[Message] {
        self.messages.push(message);
        &self.messages
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// Short local-time label for a slot, e.g. "02:30 PM".
pub fn slot_label(slot: DateTime<Utc>) -> String {
    slot_label_in(slot, &Local)
}

pub fn slot_label_in<Tz: TimeZone>(slot: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    slot.with_timezone(tz).format("%I:%M %p").to_string()
}

/// The submission a slot pick stands for.
pub fn slot_command(slot: DateTime<Utc>) -> String {
    format!("Book {}", slot_label(slot))
}
