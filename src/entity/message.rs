//! System and user messages published by a provider

use chrono::{DateTime, Utc};

/// Scheduled maintenance window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maintenance {
    pub date: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Free-text notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub date: DateTime<Utc>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Maintenance(Maintenance),
    Notification(Notification),
}

impl Message {
    /// Publication date of the message
    pub fn date(&self) -> DateTime<Utc> {
        match self {
            Message::Maintenance(m) => m.date,
            Message::Notification(n) => n.date,
        }
    }

    /// Wire tag of the variant
    pub fn type_tag(&self) -> &'static str {
        match self {
            Message::Maintenance(_) => "maintenance",
            Message::Notification(_) => "notification",
        }
    }

    /// Whether a maintenance window covers `now`. Notifications never do.
    pub fn is_ongoing_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Message::Maintenance(m) => m.start <= now && now <= m.end,
            Message::Notification(_) => false,
        }
    }
}
