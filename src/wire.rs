//! Wire framing for streamed notifications.
//!
//! One notification per frame: UTF-8 JSON on a single line behind a fixed
//! `data: ` prefix, terminated by a blank line. Each frame is independently
//! parseable.

use crate::error::Result;
use crate::types::Notification;

/// Prefix in front of every framed notification.
pub const DATA_PREFIX: &str = "data: ";

/// Encode a notification as one wire frame.
pub fn frame(notification: &Notification) -> Result<String> {
    let json = serde_json::to_string(notification)?;
    Ok(format!("{DATA_PREFIX}{json}\n\n"))
}
