//! Labbebot - a Discord music bot playing through a Lavalink node
//!
//! Chat commands drive a per-guild queue; Lavalink streams the audio and
//! songbird holds the voice connection.
use std::{env, sync::Arc};

use anyhow::{bail, Context};
use serenity::{
    async_trait,
    client::{Client, Context as DiscordContext, EventHandler},
    framework::standard::{Configuration, StandardFramework},
    gateway::ActivityData,
    http::Http,
    model::{
        gateway::{GatewayIntents, Ready},
        id::GuildId,
        voice::VoiceState,
    },
};
use songbird::SerenityInit;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;
mod format;
mod lavalink;
mod player;
mod query;
mod queue;

use commands::{
    info::INFO_GROUP, playback::PLAYBACK_GROUP, queue::QUEUE_GROUP, utility::UTILITY_GROUP,
    voice::VOICE_GROUP, ConfigKey, HttpKey,
};
use config::Config;
use lavalink::LavalinkKey;

const DEFAULT_CONFIG: &str = "labbebot.toml";

struct Handler {
    status: String,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: DiscordContext, ready: Ready) {
        tracing::info!("{} is connected!", ready.user.name);
        ctx.set_activity(Some(ActivityData::listening(&self.status)));

        for guild in &ready.guilds {
            tracing::info!("Serving guild {}", guild.id);
        }
    }

    async fn voice_state_update(&self, ctx: DiscordContext, _: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };

        if alone_in_voice(&ctx, guild_id) {
            leave(&ctx, guild_id).await;
        }
    }
}

/// True when the bot is no longer in voice, or nobody but bots is left in its
/// channel.
fn alone_in_voice(ctx: &DiscordContext, guild_id: GuildId) -> bool {
    let bot_id = ctx.cache.current_user().id;
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return false;
    };

    let Some(channel_id) = guild
        .voice_states
        .get(&bot_id)
        .and_then(|state| state.channel_id)
    else {
        return true;
    };

    !guild.voice_states.values().any(|state| {
        state.channel_id == Some(channel_id)
            && state.user_id != bot_id
            && !guild
                .members
                .get(&state.user_id)
                .is_some_and(|member| member.user.bot)
    })
}

async fn leave(ctx: &DiscordContext, guild_id: GuildId) {
    let Ok(lavalink) = commands::lavalink(ctx).await else {
        return;
    };
    if lavalink.get_player_context(guild_id).is_none() {
        return;
    }

    tracing::info!(guild = guild_id.get(), "Voice channel emptied, leaving");
    if let Err(why) = commands::teardown(ctx, guild_id).await {
        tracing::error!("Failed to leave voice: {:?}", why);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,labbebot=debug")),
        )
        .init();

    let config_path = env::var("LABBEBOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let mut config = Config::from_file(&config_path)
        .await
        .with_context(|| format!("Failed to read config from {config_path}"))?;
    config.apply_env();

    if config.discord.token.is_empty() {
        bail!("No Discord token configured, set DISCORD_TOKEN or [discord] token");
    }
    let config = Arc::new(config);

    let http = Http::new(&config.discord.token);
    let bot_id = http
        .get_current_user()
        .await
        .context("Could not access application info")?
        .id;

    let lavalink = lavalink::connect(&config.lavalink, bot_id).await;
    let http_client = reqwest::Client::new();

    let framework = StandardFramework::new()
        .after(commands::after)
        .on_dispatch_error(commands::dispatch_error)
        .help(&commands::HELP)
        .group(&VOICE_GROUP)
        .group(&PLAYBACK_GROUP)
        .group(&QUEUE_GROUP)
        .group(&INFO_GROUP)
        .group(&UTILITY_GROUP);
    framework.configure(
        Configuration::new()
            .prefix(config.discord.prefix.as_str())
            .on_mention(Some(bot_id))
            .case_insensitivity(true),
    );

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;

    let mut client = Client::builder(&config.discord.token, intents)
        .event_handler(Handler {
            status: config.discord.status.clone(),
        })
        .framework(framework)
        .register_songbird()
        .type_map_insert::<LavalinkKey>(lavalink)
        .type_map_insert::<ConfigKey>(config.clone())
        .type_map_insert::<HttpKey>(http_client)
        .await
        .context("Client builder error")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl-C, shutting down");
                shard_manager.shutdown_all().await;
            }
            Err(why) => tracing::error!("Could not listen for Ctrl-C: {:?}", why),
        }
    });

    client
        .start()
        .await
        .context("An error occurred in client loop")?;

    Ok(())
}
