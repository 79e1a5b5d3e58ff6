pub mod config;
pub mod error;
pub mod events;
pub mod exchange;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use events::{AlertTriggered, CoreEvent, EventBus, EventKind};
pub use exchange::{AccountProvider, ExchangeClient, OrderGateway, PriceSource};
pub use types::*;
