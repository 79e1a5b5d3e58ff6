use async_trait::async_trait;
use rand::Rng;
use tracing::info;

use common::{Account, AccountProvider, Result};

/// Hands out simulated accounts with a random wallet-style address.
pub struct PaperAccountProvider {
    network: String,
}

impl PaperAccountProvider {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
        }
    }
}

impl Default for PaperAccountProvider {
    fn default() -> Self {
        Self::new("paper")
    }
}

#[async_trait]
impl AccountProvider for PaperAccountProvider {
    async fn create_account(&self) -> Result<Account> {
        let bytes: [u8; 20] = rand::thread_rng().gen();
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            address: format!("0x{hex}"),
            network: self.network.clone(),
        };
        info!(address = %account.address, network = %account.network, "Paper account created");
        Ok(account)
    }
}
