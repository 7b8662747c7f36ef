//! Lavalink node setup and the events that keep playback moving.
use std::{collections::HashSet, sync::Arc, time::Duration};

use lavalink_rs::{
    hook,
    model::{
        events::{self, TrackEndReason},
        track::{TrackData, TrackLoadData},
        GuildId as LavalinkGuildId,
    },
    player_context::PlayerContext,
    prelude::*,
};
use serenity::{
    builder::{CreateEmbed, CreateEmbedAuthor, CreateMessage},
    http::Http,
    model::{
        id::{ChannelId, UserId},
        Timestamp,
    },
    prelude::TypeMapKey,
};
use tokio::sync::Mutex;
use tracing_futures::Instrument;

use crate::{
    commands::{expire, EMBED_COLOUR, REPLY_TTL},
    config::LavalinkConfig,
    format::{format_length, time_left, track_title},
    player::GuildPlayer,
    query::youtube_mix_url,
};

/// How long the "queue is empty" notice stays up.
const EMPTY_NOTICE_TTL: Duration = Duration::from_secs(180);

pub struct LavalinkKey;

impl TypeMapKey for LavalinkKey {
    type Value = LavalinkClient;
}

/// User data attached to every Lavalink player context.
pub struct GuildData {
    pub player: Mutex<GuildPlayer>,
    pub http: Arc<Http>,
}

pub async fn connect(config: &LavalinkConfig, user_id: UserId) -> LavalinkClient {
    let events = events::Events {
        ready: Some(ready_event),
        track_end: Some(track_end),
        track_exception: Some(track_exception),
        track_stuck: Some(track_stuck),
        ..Default::default()
    };

    let node = NodeBuilder {
        hostname: config.host.clone(),
        is_ssl: config.ssl,
        events: events::Events::default(),
        password: config.password.clone(),
        user_id: user_id.into(),
        session_id: None,
    };

    LavalinkClient::new(events, vec![node], NodeDistributionStrategy::round_robin()).await
}

/// Fetches the guild data stored on a player context.
pub fn guild_data(player: &PlayerContext) -> Option<Arc<GuildData>> {
    match player.data::<GuildData>() {
        Ok(data) => Some(data),
        Err(why) => {
            tracing::error!("Player context without guild data: {:?}", why);
            None
        }
    }
}

#[hook]
async fn ready_event(client: LavalinkClient, session_id: String, event: &events::Ready) {
    // Players from a previous session point at dead voice connections.
    if let Err(why) = client.delete_all_player_contexts().await {
        tracing::warn!("Failed to drop stale players: {:?}", why);
    }
    tracing::info!(
        "Lavalink node ready (session {}, resumed: {})",
        session_id,
        event.resumed
    );
}

#[hook]
async fn track_end(client: LavalinkClient, _session_id: String, event: &events::TrackEnd) {
    // Stopped and replaced tracks were ended by a command that already chose
    // what comes next.
    if !matches!(
        event.reason,
        TrackEndReason::Finished | TrackEndReason::LoadFailed
    ) {
        return;
    }

    let guild_id = event.guild_id;
    advance(client, guild_id)
        .instrument(tracing::info_span!("track_end", guild = guild_id.0))
        .await;
}

#[hook]
async fn track_exception(
    _client: LavalinkClient,
    _session_id: String,
    event: &events::TrackException,
) {
    tracing::warn!(
        guild = event.guild_id.0,
        "Exception while playing {}: {:?}",
        event.track.info.title,
        event.exception
    );
}

#[hook]
async fn track_stuck(client: LavalinkClient, _session_id: String, event: &events::TrackStuck) {
    tracing::warn!(
        guild = event.guild_id.0,
        "{} got stuck after {} ms, moving on",
        event.track.info.title,
        event.threshold_ms
    );

    let guild_id = event.guild_id;
    advance(client, guild_id)
        .instrument(tracing::info_span!("track_stuck", guild = guild_id.0))
        .await;
}

/// Picks the follow-up to a track that ended on its own and starts it.
async fn advance(client: LavalinkClient, guild_id: LavalinkGuildId) {
    let Some(player_ctx) = client.get_player_context(guild_id) else {
        return;
    };
    let Some(data) = guild_data(&player_ctx) else {
        return;
    };

    let next = data.player.lock().await.track_finished();
    let next = match next {
        Some(track) => Some(track),
        None => recommend(&client, guild_id, &data).await,
    };

    let text_channel = data.player.lock().await.text_channel;

    let Some(track) = next else {
        tracing::debug!("Queue ran dry");
        notify_empty(&data, text_channel).await;
        return;
    };

    if let Err(why) = player_ctx.play_now(&track).await {
        tracing::error!("Failed to start {}: {:?}", track.info.title, why);
        data.player.lock().await.halt();
        notify_empty(&data, text_channel).await;
        return;
    }
    tracing::info!("Now playing {}", track.info.title);

    let embed = CreateEmbed::new()
        .author(CreateEmbedAuthor::new("Now playing"))
        .description(format!(
            ":notes: {} ({})",
            track_title(&track.info),
            format_length(&track.info)
        ))
        .colour(EMBED_COLOUR)
        .timestamp(Timestamp::now());
    match text_channel
        .send_message(&*data.http, CreateMessage::new().embed(embed))
        .await
    {
        Ok(msg) => expire(
            data.http.clone(),
            msg,
            time_left(&track.info, 0).max(REPLY_TTL),
        ),
        Err(why) => tracing::error!("Error sending message: {:?}", why),
    }
}

async fn notify_empty(data: &GuildData, text_channel: ChannelId) {
    let embed = CreateEmbed::new()
        .title("The queue is empty, play something new :rage:")
        .colour(EMBED_COLOUR)
        .timestamp(Timestamp::now());
    match text_channel
        .send_message(&*data.http, CreateMessage::new().embed(embed))
        .await
    {
        Ok(msg) => expire(data.http.clone(), msg, EMPTY_NOTICE_TTL),
        Err(why) => tracing::error!("Error sending message: {:?}", why),
    }
}

/// When autoplay is on, queues a track from the YouTube mix of the last
/// played track that has not been played yet.
async fn recommend(
    client: &LavalinkClient,
    guild_id: LavalinkGuildId,
    data: &GuildData,
) -> Option<TrackData> {
    let (seed, played) = {
        let player = data.player.lock().await;
        if !player.autoplay {
            return None;
        }
        let last = player.queue().tracks().last()?;
        if last.info.source_name != "youtube" {
            return None;
        }
        let played: HashSet<String> = player
            .queue()
            .tracks()
            .iter()
            .map(|t| t.info.identifier.clone())
            .collect();
        (last.info.identifier.clone(), played)
    };

    let loaded = match client.load_tracks(guild_id, &youtube_mix_url(&seed)).await {
        Ok(loaded) => loaded,
        Err(why) => {
            tracing::warn!("Failed to load recommendations: {:?}", why);
            return None;
        }
    };

    let candidate = match loaded.data {
        Some(TrackLoadData::Playlist(playlist)) => playlist
            .tracks
            .into_iter()
            .find(|t| !played.contains(&t.info.identifier)),
        _ => None,
    }?;

    tracing::info!("Autoplay picked {}", candidate.info.title);
    data.player.lock().await.enqueue([candidate])
}
