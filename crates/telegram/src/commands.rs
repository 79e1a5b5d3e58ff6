use std::sync::Arc;
use std::time::Duration;

use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    utils::command::BotCommands,
};
use tracing::{info, warn};

use common::SchedulerState;
use engine::{Scheduler, TradingCore};

use crate::format;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

const TRADES_SHOWN: usize = 10;

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub core: Arc<TradingCore>,
    pub scheduler: Arc<Scheduler>,
    /// Interval used when `/start` starts the scheduler.
    pub tick_interval: Duration,
    pub allowed_user_ids: Arc<Vec<i64>>,
}

/// Telegram bot commands exposed to the operator.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "CoinPilot commands:")]
pub enum Command {
    #[command(description = "Start the trading scheduler")]
    Start,
    #[command(description = "Stop the trading scheduler")]
    Stop,
    #[command(description = "Show scheduler state and latest prices")]
    Status,
    #[command(description = "List price alerts")]
    Alerts,
    #[command(description = "List strategies")]
    Strategies,
    #[command(description = "Enable a strategy by id")]
    Enable(String),
    #[command(description = "Disable a strategy by id")]
    Disable(String),
    #[command(description = "Show recent trades")]
    Trades,
}

/// Start the Telegram bot in long-polling mode.
pub async fn start_bot(bot: Bot, deps: BotDeps) {
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(handle_start))
        .branch(case![Command::Stop].endpoint(handle_stop))
        .branch(case![Command::Status].endpoint(handle_status))
        .branch(case![Command::Alerts].endpoint(handle_alerts))
        .branch(case![Command::Strategies].endpoint(handle_strategies))
        .branch(case![Command::Enable(id)].endpoint(handle_enable))
        .branch(case![Command::Disable(id)].endpoint(handle_disable))
        .branch(case![Command::Trades].endpoint(handle_trades));

    Update::filter_message()
        .filter_map(|msg: Message| msg.from().map(|u| u.id))
        .filter_async(auth_filter)
        .branch(command_handler)
}

/// Silently drop messages from users not in the allowed list.
async fn auth_filter(user_id: UserId, deps: Arc<BotDeps>) -> bool {
    let uid = user_id.0 as i64;
    let allowed = deps.allowed_user_ids.contains(&uid);
    if !allowed {
        warn!(user_id = uid, "Unauthorized Telegram access attempt");
    }
    allowed
}

async fn handle_start(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let text = if deps.scheduler.start(deps.tick_interval).await {
        "Scheduler started."
    } else {
        "Scheduler is already running."
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_stop(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let text = if deps.scheduler.stop().await {
        "Scheduler stopped."
    } else {
        "Scheduler is already stopped."
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_status(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let state: SchedulerState = deps.scheduler.state().await;
    let mut snapshots: Vec<_> = deps.core.store().snapshot_all().await.into_values().collect();
    snapshots.sort_by(|a, b| a.instrument.cmp(&b.instrument));
    let trades = deps.core.trade_history().await.len();

    bot.send_message(msg.chat.id, format::status(state, &snapshots, trades))
        .await?;
    Ok(())
}

async fn handle_alerts(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let alerts = deps.core.list_alerts().await;
    bot.send_message(msg.chat.id, format::alerts(&alerts)).await?;
    Ok(())
}

async fn handle_strategies(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let strategies = deps.core.list_strategies().await;
    bot.send_message(msg.chat.id, format::strategies(&strategies))
        .await?;
    Ok(())
}

async fn handle_enable(bot: Bot, msg: Message, deps: Arc<BotDeps>, id: String) -> HandlerResult {
    let text = if deps.core.enable_strategy(id.trim()).await {
        format!("Strategy {} enabled.", id.trim())
    } else {
        format!("No strategy with id {}.", id.trim())
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_disable(bot: Bot, msg: Message, deps: Arc<BotDeps>, id: String) -> HandlerResult {
    let text = if deps.core.disable_strategy(id.trim()).await {
        format!("Strategy {} disabled.", id.trim())
    } else {
        format!("No strategy with id {}.", id.trim())
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_trades(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let history = deps.core.trade_history().await;
    bot.send_message(msg.chat.id, format::trades(&history, TRADES_SHOWN))
        .await?;
    Ok(())
}
