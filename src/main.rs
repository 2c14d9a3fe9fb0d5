use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;

use cafebot::access::{AccessGate, AdminVars};
use cafebot::bot;
use cafebot::client::{HttpTransport, ServiceClient};
use cafebot::config::BotConfig;
use cafebot::controller::FrontController;
use cafebot::localization::init_localization;
use cafebot::session::SessionStore;
use cafebot::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    init_tracing();

    info!("Starting café Telegram bot");

    init_localization().context("Failed to load bundled locales")?;

    let config = BotConfig::from_env()?;
    let admin_vars = AdminVars::load(&config.admin_vars_file)?;

    for (service, url) in &config.service_urls {
        info!(%service, url, "Backend service configured");
    }

    let transport = HttpTransport::new(config.service_urls.clone(), config.rpc_timeout)
        .context("Failed to build HTTP client")?;
    let client = ServiceClient::new(Arc::new(transport));
    let gate = AccessGate::new(admin_vars, client.clone());
    let controller = Arc::new(FrontController::new(client, gate, SessionStore::new()));

    let bot = Bot::new(config.telegram_token);

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(bot::message_handler))
        .branch(Update::filter_callback_query().endpoint(bot::callback_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![controller])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
