use std::sync::Arc;

use anyhow::Context;
use teloxide::{types::ChatId, Bot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, CoreEvent, EventKind, PriceSource, PriceSourceKind};
use engine::{BinanceTickerSource, Scheduler, TradingCore};
use paper::{PaperAccountProvider, PaperClient, SimulatedPriceSource};
use strategy::StrategyFileConfig;
use telegram_ctrl::{forward_events, start_bot, BotDeps};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("Invalid configuration")?;
    info!(
        price_source = %cfg.price_source,
        tick_ms = cfg.tick_interval.as_millis() as u64,
        watchlist = ?cfg.watchlist,
        "CoinPilot starting"
    );

    // ── Price source (injected based on PRICE_SOURCE) ─────────────────────────
    let price_source: Arc<dyn PriceSource> = match cfg.price_source {
        PriceSourceKind::Paper => {
            info!(
                seed = ?cfg.paper_seed,
                volatility_bps = cfg.paper_volatility_bps,
                "Simulated prices"
            );
            Arc::new(SimulatedPriceSource::new(cfg.paper_seed, cfg.paper_volatility_bps))
        }
        PriceSourceKind::Binance => {
            info!("Binance 24h ticker prices");
            Arc::new(BinanceTickerSource::new().context("Failed to build Binance client")?)
        }
    };

    // ── Core ──────────────────────────────────────────────────────────────────
    // Orders are always simulated.
    let core = Arc::new(TradingCore::new(
        price_source,
        Arc::new(PaperClient::new()),
        cfg.watchlist.clone(),
    ));
    core.initialize(&PaperAccountProvider::default())
        .await
        .context("Failed to create trading account")?;

    if let Some(path) = &cfg.strategy_config_path {
        let file = StrategyFileConfig::load(path)?;
        core.load_file_config(&file)
            .await
            .with_context(|| format!("Invalid entry in {path}"))?;
    }

    // ── Console event log ─────────────────────────────────────────────────────
    core.events()
        .subscribe(EventKind::AlertTriggered, |event| {
            if let CoreEvent::AlertTriggered(a) = event {
                info!(
                    alert_id = %a.alert_id,
                    pair = %a.instrument,
                    price = a.current_price,
                    target = a.target_price,
                    condition = %a.condition,
                    "Price alert triggered"
                );
            }
        })
        .await;

    let scheduler = Arc::new(Scheduler::new(core.clone()));

    // ── Telegram C2 ───────────────────────────────────────────────────────────
    match cfg.telegram_token.clone() {
        Some(token) => {
            let bot = Bot::new(token);
            let chat_ids: Vec<ChatId> = cfg
                .telegram_allowed_user_ids
                .iter()
                .map(|&id| ChatId(id))
                .collect();
            tokio::spawn(forward_events(
                bot.clone(),
                chat_ids,
                core.events().subscribe_stream(),
            ));
            tokio::spawn(start_bot(
                bot,
                BotDeps {
                    core: core.clone(),
                    scheduler: scheduler.clone(),
                    tick_interval: cfg.tick_interval,
                    allowed_user_ids: Arc::new(cfg.telegram_allowed_user_ids.clone()),
                },
            ));
        }
        None => warn!("TELEGRAM_TOKEN not set, Telegram control disabled"),
    }

    // ── Run ───────────────────────────────────────────────────────────────────
    scheduler.start(cfg.tick_interval).await;

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received.");

    scheduler.stop_and_wait().await;
    info!(trades = core.trade_history().await.len(), "Shutdown complete");
    Ok(())
}
