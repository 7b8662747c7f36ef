//! Chat commands, grouped the way `-help` lists them.
//!
//! Every command answers with a short-lived reply and deletes the message that
//! triggered it. Failures are returned as errors and answered in one place,
//! the [`after`] hook.
use std::{collections::HashSet, sync::Arc, time::Duration};

use lavalink_rs::{
    model::{player::ConnectionInfo, track::TrackData},
    player_context::PlayerContext,
    prelude::LavalinkClient,
};
use serenity::{
    builder::{CreateEmbed, CreateEmbedFooter, CreateMessage},
    client::Context,
    framework::standard::{
        help_commands, macros::help, macros::hook, Args, CommandError, CommandGroup,
        CommandResult, DispatchError, HelpOptions,
    },
    http::Http,
    model::{
        channel::{Message, MessageFlags},
        id::{ChannelId, GuildId, UserId},
        Colour, Timestamp,
    },
    prelude::TypeMapKey,
    Result as SerenityResult,
};
use tokio::sync::Mutex;

use crate::{
    config::Config,
    error::{reply_for, MusicError, UNEXPECTED_ERROR},
    lavalink::{guild_data, GuildData, LavalinkKey},
    player::{GuildPlayer, DEFAULT_VOLUME},
};

pub mod info;
pub mod playback;
pub mod queue;
pub mod utility;
pub mod voice;

pub const EMBED_COLOUR: Colour = Colour::from_rgb(209, 112, 2);
/// Lifetime of ordinary replies.
pub const REPLY_TTL: Duration = Duration::from_secs(60);
/// Lifetime of listings such as the queue.
pub const LISTING_TTL: Duration = Duration::from_secs(600);
/// Lifetime of error replies.
const ERROR_TTL: Duration = Duration::from_secs(60);

pub struct ConfigKey;

impl TypeMapKey for ConfigKey {
    type Value = Arc<Config>;
}

/// Client used for lyrics lookups.
pub struct HttpKey;

impl TypeMapKey for HttpKey {
    type Value = reqwest::Client;
}

/// Everything a command needs to drive one guild's playback.
pub struct Session {
    pub lavalink: LavalinkClient,
    pub player: PlayerContext,
    pub data: Arc<GuildData>,
}

pub async fn config(ctx: &Context) -> Result<Arc<Config>, CommandError> {
    let data = ctx.data.read().await;
    let config = data
        .get::<ConfigKey>()
        .cloned()
        .ok_or("Config placed in at initialisation.")?;
    Ok(config)
}

pub async fn lavalink(ctx: &Context) -> Result<LavalinkClient, CommandError> {
    let data = ctx.data.read().await;
    let client = data
        .get::<LavalinkKey>()
        .cloned()
        .ok_or("Lavalink client placed in at initialisation.")?;
    Ok(client)
}

pub fn guild_id(msg: &Message) -> Result<GuildId, CommandError> {
    Ok(msg.guild_id.ok_or("Command can only be used in guilds")?)
}

/// The voice channel the author of `msg` is sitting in.
pub fn author_voice_channel(ctx: &Context, msg: &Message) -> Result<ChannelId, MusicError> {
    msg.guild(&ctx.cache)
        .and_then(|guild| {
            guild
                .voice_states
                .get(&msg.author.id)
                .and_then(|voice_state| voice_state.channel_id)
        })
        .ok_or(MusicError::NoVoiceChannel)
}

/// Looks up the player of a guild the bot is already connected in.
pub async fn session(ctx: &Context, guild_id: GuildId) -> Result<Session, CommandError> {
    let lavalink = lavalink(ctx).await?;
    let player = lavalink
        .get_player_context(guild_id)
        .ok_or(MusicError::NoPlayerFound)?;
    let data = guild_data(&player).ok_or(MusicError::NoPlayerFound)?;

    Ok(Session {
        lavalink,
        player,
        data,
    })
}

/// Joins the author's voice channel and creates a fresh player for it.
pub async fn connect(
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
) -> Result<(Session, ChannelId), CommandError> {
    let channel_id = author_voice_channel(ctx, msg)?;
    let lavalink = lavalink(ctx).await?;

    if lavalink.get_player_context(guild_id).is_some() {
        return Err(MusicError::AlreadyConnectedToChannel.into());
    }

    let manager = songbird::get(ctx)
        .await
        .ok_or("Songbird Voice client placed in at initialisation.")?;

    let (connection_info, _call) = manager.join_gateway(guild_id, channel_id).await?;

    let data = Arc::new(GuildData {
        player: Mutex::new(GuildPlayer::new(msg.channel_id)),
        http: ctx.http.clone(),
    });

    let player = lavalink
        .create_player_context_with_data::<GuildData>(
            guild_id,
            ConnectionInfo {
                endpoint: connection_info.endpoint,
                token: connection_info.token,
                session_id: connection_info.session_id,
            },
            data.clone(),
        )
        .await?;
    player.set_volume(DEFAULT_VOLUME).await?;

    tracing::info!(guild = guild_id.get(), "Joined voice channel {}", channel_id);

    Ok((
        Session {
            lavalink,
            player,
            data,
        },
        channel_id,
    ))
}

/// Returns the guild's player, joining the author's channel first if needed.
pub async fn ensure_connected(
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
) -> Result<Session, CommandError> {
    let lavalink = lavalink(ctx).await?;
    if lavalink.get_player_context(guild_id).is_some() {
        return session(ctx, guild_id).await;
    }

    let (session, _) = connect(ctx, msg, guild_id).await?;
    Ok(session)
}

/// Drops the guild's player and leaves voice.
pub async fn teardown(ctx: &Context, guild_id: GuildId) -> Result<(), CommandError> {
    let lavalink = lavalink(ctx).await?;
    lavalink.delete_player(guild_id).await?;

    let manager = songbird::get(ctx)
        .await
        .ok_or("Songbird Voice client placed in at initialisation.")?;
    if manager.get(guild_id).is_some() {
        manager.remove(guild_id).await?;
    }

    tracing::info!(guild = guild_id.get(), "Left voice");
    Ok(())
}

pub fn base_embed() -> CreateEmbed {
    CreateEmbed::new()
        .colour(EMBED_COLOUR)
        .timestamp(Timestamp::now())
}

pub async fn display_name(ctx: &Context, msg: &Message) -> String {
    msg.author_nick(ctx)
        .await
        .unwrap_or_else(|| msg.author.name.clone())
}

/// `"{verb} by {name}"` footer with the author's avatar.
pub async fn footer(ctx: &Context, msg: &Message, verb: &str) -> CreateEmbedFooter {
    CreateEmbedFooter::new(format!("{verb} by {}", display_name(ctx, msg).await))
        .icon_url(msg.author.face())
}

/// Deletes `msg` after `after` has passed.
pub fn expire(http: Arc<Http>, msg: Message, after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        if let Err(why) = msg.delete(&*http).await {
            tracing::debug!("Could not delete expired message: {:?}", why);
        }
    });
}

pub async fn delete_trigger(ctx: &Context, msg: &Message) {
    if let Err(why) = msg.delete(ctx).await {
        tracing::warn!("Could not delete command message: {:?}", why);
    }
}

/// Replies to `msg` with `embed`, schedules the reply for deletion and removes
/// the command message.
pub async fn respond(ctx: &Context, msg: &Message, embed: CreateEmbed, ttl: Duration) {
    let builder = CreateMessage::new()
        .embed(embed)
        .reference_message(msg)
        .flags(MessageFlags::SUPPRESS_NOTIFICATIONS);

    if let Some(reply) = check_msg(msg.channel_id.send_message(ctx, builder).await) {
        expire(ctx.http.clone(), reply, ttl);
    }
    delete_trigger(ctx, msg).await;
}

pub async fn respond_title(ctx: &Context, msg: &Message, title: impl Into<String>) {
    respond(ctx, msg, base_embed().title(title), REPLY_TTL).await;
}

/// Logs every track a user queues.
pub fn log_queued(msg: &Message, track: &TrackData) {
    tracing::info!(
        guild = msg.guild_id.map(|id| id.get()),
        "{} queued {} by {}",
        msg.author.name,
        track.info.title,
        track.info.author
    );
}

/// Checks that a message successfully sent; if not, then logs why using tracing.
pub fn check_msg(result: SerenityResult<Message>) -> Option<Message> {
    match result {
        Ok(msg) => Some(msg),
        Err(why) => {
            tracing::error!("Error sending message: {:?}", why);
            None
        }
    }
}

#[hook]
pub async fn after(ctx: &Context, msg: &Message, command_name: &str, command_result: CommandResult) {
    let Err(why) = command_result else {
        return;
    };

    let reply = match reply_for(&*why) {
        Some(reply) => {
            tracing::info!(
                "{} tried {:?} and failed with: {}",
                msg.author.name,
                msg.content,
                reply
            );
            reply
        }
        None => {
            tracing::error!("Command '{}' returned error {:?}", command_name, why);
            UNEXPECTED_ERROR.to_string()
        }
    };

    respond(ctx, msg, base_embed().title(reply), ERROR_TTL).await;
}

/// Reply for a command the framework refused to run, if it deserves one.
fn dispatch_reply(error: &DispatchError, command_name: &str) -> Option<String> {
    let reply = match error {
        DispatchError::CheckFailed(..) | DispatchError::LackingRole => {
            MusicError::MissingRole.to_string()
        }
        DispatchError::OnlyForGuilds => "Music commands are not available in DMs.".to_string(),
        DispatchError::NotEnoughArguments { .. } => {
            format!("Missing arguments, see `help {command_name}`.")
        }
        DispatchError::TooManyArguments { .. } => {
            format!("Too many arguments, see `help {command_name}`.")
        }
        _ => return None,
    };
    Some(reply)
}

#[hook]
pub async fn dispatch_error(ctx: &Context, msg: &Message, error: DispatchError, command_name: &str) {
    let Some(reply) = dispatch_reply(&error, command_name) else {
        tracing::warn!("Dispatch of '{}' failed: {:?}", command_name, error);
        return;
    };

    respond(ctx, msg, base_embed().title(reply), ERROR_TTL).await;
}

#[help]
#[individual_command_tip = "Prefix a command with `-` or mention me.\nUse `help <command>` for details on one command."]
#[lacking_role = "Hide"]
pub async fn help(
    ctx: &Context,
    msg: &Message,
    args: Args,
    help_options: &'static HelpOptions,
    groups: &[&'static CommandGroup],
    owners: HashSet<UserId>,
) -> CommandResult {
    let _ = help_commands::with_embeds(ctx, msg, args, help_options, groups, owners).await;
    Ok(())
}
