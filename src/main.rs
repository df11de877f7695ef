//! Tombala Bot
//!
//! Authoritative Tombala bot for IRC.
//! Configuration comes from the environment; see `IrcConfig` and `GameConfig`.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tombala::{
    VERSION,
    network::{GameConfig, IrcConfig, SessionManager, TokioScheduler, TombalaBot},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Tombala Bot v{}", VERSION);

    let irc = IrcConfig::from_env().context("invalid IRC configuration")?;
    let game = GameConfig::from_env()
        .context("invalid game configuration")?
        .with_channels(irc.channels.clone());

    info!(
        host = %irc.host,
        port = irc.port,
        nick = %irc.nick,
        channels = ?irc.channels,
        draw_interval_ms = game.draw_interval.as_millis() as u64,
        single_winner = game.single_winner_per_stage,
        "Configuration loaded"
    );

    let (scheduler, ticks) = TokioScheduler::new();
    let bot = TombalaBot::new(irc, SessionManager::new(game, scheduler));
    bot.run(ticks).await?;

    info!("Bot stopped");
    Ok(())
}
