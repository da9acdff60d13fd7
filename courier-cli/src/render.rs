//! Terminal rendering of messages and client updates.

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use courier_client::Update;
use courier_core::{Conversation, HistoryStatus};
use courier_types::Message;

/// Relative label for `day` as seen from `today`.
pub fn day_label(day: NaiveDate, today: NaiveDate) -> String {
    match (day - today).num_days() {
        0 => "today".to_string(),
        -1 => "yesterday".to_string(),
        1 => "tomorrow".to_string(),
        _ => day.format("%B %-d").to_string(),
    }
}

/// One message as a single line, in the timezone of `now`.
pub fn message_line<Tz: TimeZone>(message: &Message, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let local = message.sent_at.with_timezone(&now.timezone());
    let mut line = format!(
        "[{} {}] {}:",
        day_label(local.date_naive(), now.date_naive()),
        local.format("%H:%M"),
        message.sender
    );
    if let Some(body) = &message.body {
        line.push(' ');
        line.push_str(body);
    }
    if let Some(photo) = &message.attachment {
        line.push_str(&format!(" [photo: {}]", photo.as_str()));
    }
    if message.is_pending() {
        line.push_str(" (sending)");
    }
    line
}

/// Print a whole timeline.
pub fn print_conversation(conversation: &Conversation) {
    let now = Local::now();
    if let HistoryStatus::Failed { reason, .. } = conversation.status() {
        println!("! Could not load messages: {}", reason);
        return;
    }
    if conversation.is_empty() {
        println!("(no messages yet)");
        return;
    }
    for message in conversation.entries() {
        println!("{}", message_line(message, &now));
    }
}

/// Text to show for an update, if any.
pub fn update_line(update: &Update) -> Option<String> {
    let now = Local::now();
    match update {
        Update::HistoryLoaded { .. } | Update::StaleHistory { .. } | Update::Duplicate => None,
        Update::HistoryFailed { reason, .. } => {
            Some(format!("! Could not load messages: {}", reason))
        }
        Update::Appended(message) => Some(message_line(message, &now)),
        Update::Confirmed(_) => None,
        Update::Notification(text) => Some(format!("* {}", text)),
        Update::ElsewhereMessage(live) => Some(format!("* New message from {}", live.sender)),
        Update::FrameError(reason) => Some(format!("! {}", reason)),
        Update::ChannelClosed { reason } => Some(format!(
            "! Connection closed ({}). Type /reconnect to resume.",
            reason
        )),
    }
}
