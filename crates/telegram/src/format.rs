use alerts::PriceAlert;
use common::{CoreEvent, MarketSnapshot, SchedulerState, TradeRecord};
use strategy::Strategy;

pub(crate) fn event(event: &CoreEvent) -> String {
    match event {
        CoreEvent::AlertTriggered(a) => format!(
            "\u{1F514} Alert: {} is {} {} (now {})",
            a.instrument, a.condition, a.target_price, a.current_price
        ),
        CoreEvent::TradeExecuted(t) => format!("\u{2705} {}", trade(t)),
    }
}

pub(crate) fn trade(t: &TradeRecord) -> String {
    format!(
        "{} {} {} {} @ {} ({})",
        t.side, t.amount, t.product_id, t.order_type, t.executed_price, t.status
    )
}

pub(crate) fn status(state: SchedulerState, snapshots: &[MarketSnapshot], trades: usize) -> String {
    let mut text = format!("CoinPilot Status\nScheduler: {state}\nTrades: {trades}");
    for s in snapshots {
        text.push_str(&format!(
            "\n{}: {} ({:+.2}%)",
            s.instrument, s.price, s.price_change_24h
        ));
    }
    text
}

pub(crate) fn alerts(alerts: &[PriceAlert]) -> String {
    if alerts.is_empty() {
        return "No alerts.".to_string();
    }
    alerts
        .iter()
        .map(|a| {
            let state = if a.active { "active" } else { "triggered" };
            format!("{} {} {} {} [{state}]", a.id, a.instrument, a.condition, a.target_price)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn strategies(strategies: &[Strategy]) -> String {
    if strategies.is_empty() {
        return "No strategies.".to_string();
    }
    strategies
        .iter()
        .map(|s| {
            let state = if s.enabled { "on" } else { "off" };
            format!("{} {} ({}, {}) [{state}]", s.id, s.name, s.kind(), s.instrument)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Most recent `limit` trades, newest first.
pub(crate) fn trades(history: &[TradeRecord], limit: usize) -> String {
    if history.is_empty() {
        return "No trades yet.".to_string();
    }
    history
        .iter()
        .rev()
        .take(limit)
        .map(trade)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{AlertCondition, AlertTriggered, OrderSide, OrderStatus, OrderType};

    fn record(amount: &str) -> TradeRecord {
        TradeRecord {
            id: "t1".into(),
            product_id: "BTC-USD".into(),
            order_type: OrderType::Market,
            side: OrderSide::Buy,
            amount: amount.into(),
            limit_price: None,
            status: OrderStatus::Filled,
            submitted_at: Utc::now(),
            executed_price: 50_000.12,
        }
    }

    #[test]
    fn formats_trades() {
        assert_eq!(
            trade(&record("0.001")),
            "BUY 0.001 BTC-USD MARKET @ 50000.12 (filled)"
        );
    }

    #[test]
    fn trade_list_is_newest_first_and_capped() {
        let history = vec![record("1"), record("2"), record("3")];
        let text = trades(&history, 2);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("BUY 3 "));
        assert!(lines[1].starts_with("BUY 2 "));
        assert_eq!(trades(&[], 10), "No trades yet.");
    }

    #[test]
    fn formats_alert_events() {
        let text = event(&CoreEvent::AlertTriggered(AlertTriggered {
            alert_id: "a1".into(),
            instrument: "BTC-USD".into(),
            current_price: 45_500.0,
            target_price: 45_000.0,
            condition: AlertCondition::Above,
            triggered_at: Utc::now(),
        }));
        assert!(text.contains("BTC-USD is above 45000 (now 45500)"));
    }

    #[test]
    fn status_lists_prices() {
        let mut snap = MarketSnapshot::new("ETH-USD", 3_000.0);
        snap.price_change_24h = -1.5;
        let text = status(SchedulerState::Running, &[snap], 4);
        assert!(text.contains("Scheduler: running"));
        assert!(text.contains("Trades: 4"));
        assert!(text.contains("ETH-USD: 3000 (-1.50%)"));
    }
}
