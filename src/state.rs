use std::sync::Arc;

use tracing::info;

use crate::accounts::{
    mail::{Mailer, SmtpMailer},
    repo::{DynamoUserStore, UserStore},
    tokens::ConfirmationTokens,
};
use crate::config::AppConfig;
use crate::dynamo;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
    pub tokens: ConfirmationTokens,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        info!(target_db = %config.aws.target_display(), "connecting to table store");
        let client = dynamo::create_client(&config.aws).await;
        let users = Arc::new(DynamoUserStore::new(client, config.tables.clone())) as Arc<dyn UserStore>;

        let mailer = Arc::new(SmtpMailer::new(&config.mail)?) as Arc<dyn Mailer>;

        Ok(Self::from_parts(config, users, mailer))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let tokens = ConfirmationTokens::new(&config.tokens);
        Self {
            config,
            users,
            mailer,
            tokens,
        }
    }
}
