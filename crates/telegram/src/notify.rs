use teloxide::prelude::*;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use common::CoreEvent;

use crate::format;

/// Send a proactive message to all configured chat IDs.
pub async fn send_alert(bot: &Bot, chat_ids: &[ChatId], message: &str) {
    for &chat_id in chat_ids {
        if let Err(e) = bot.send_message(chat_id, message).await {
            warn!(chat_id = ?chat_id, error = %e, "Failed to send Telegram alert");
        }
    }
}

/// Relay core events to Telegram until the event bus closes.
/// Call from `tokio::spawn` with a receiver from `EventBus::subscribe_stream`.
pub async fn forward_events(bot: Bot, chat_ids: Vec<ChatId>, mut events: broadcast::Receiver<CoreEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => send_alert(&bot, &chat_ids, &format::event(&event)).await,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Telegram forwarder lagged, events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    info!("Telegram event forwarder stopped");
}
