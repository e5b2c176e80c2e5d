use std::sync::Arc;

use pokerbot::advice::create_provider;
use pokerbot::bot::Bot;
use pokerbot::channels::{ChannelManager, CliChannel, TelegramChannel};
use pokerbot::config::BotConfig;
use pokerbot::hand::RuleSet;
use pokerbot::pipeline::HandPipeline;
use pokerbot::store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("🃏 Poker bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Advice backend: {:?}", config.advice.backend());

    let advisor = create_provider(&config.advice)?;
    let pipeline = HandPipeline::new(advisor, RuleSet::default());

    // Set up channels
    let mut channels = ChannelManager::new();
    let mut active_channels = vec!["cli"];

    // Always add CLI
    channels.add(Box::new(CliChannel::new()));

    // Conditionally add Telegram if bot token is set
    if let Some(telegram) = config.telegram {
        eprintln!(
            "   Telegram: enabled ({} group chats, {} admins)",
            telegram.allowed_chats.len(),
            telegram.admin_users.len()
        );
        channels.add(Box::new(TelegramChannel::new(telegram)));
        active_channels.push("telegram");
    }

    eprintln!("   Channels: {}", active_channels.join(", "));
    eprintln!("   Paste a hand history and finish it with a blank line.\n");

    let store = Arc::new(MemoryStore::new());
    let bot = Bot::new(channels, pipeline).with_stores(store.clone(), store);
    bot.run().await?;

    Ok(())
}
