mod commands;
mod format;
mod notify;

pub use commands::{start_bot, BotDeps, Command};
pub use notify::{forward_events, send_alert};
