use std::time::Duration;

use lavalink_rs::model::{
    player::{Filters, Timescale},
    track::{Track, TrackData, TrackLoadData},
};
use serenity::{
    builder::{CreateEmbedAuthor, CreateMessage},
    client::Context,
    framework::standard::{
        macros::{command, group},
        Args, CommandResult,
    },
    model::channel::{Message, ReactionType},
};

use super::{
    base_embed, config, delete_trigger, ensure_connected, footer, guild_id, log_queued, respond,
    respond_title, session, Session, LISTING_TTL, REPLY_TTL,
};
use crate::{
    error::{MusicError, MusicResult},
    format::{
        format_duration, format_length, numbered_line, paginate, playable_length, total_length,
        track_title, FIELD_LIMIT,
    },
    player::{parse_seek, parse_volume, Transition},
    query::build_query,
};

/// Reactions offered by the search prompt, in result order.
const OPTIONS: [&str; 5] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣"];
const SEARCH_TIMEOUT: Duration = Duration::from_secs(60);

#[group]
#[commands(
    play, search, pause, resume, next, previous, stop, restart, seek, volume, alvin, autoplay
)]
pub struct Playback;

/// Unwraps what the node answered for `query`. A failed request, an empty
/// result and a load error all mean nothing was found.
fn loaded<E: std::fmt::Debug>(
    query: &str,
    result: Result<Track, E>,
) -> MusicResult<TrackLoadData> {
    match result {
        Ok(Track {
            data: Some(TrackLoadData::Error(why)),
            ..
        }) => {
            tracing::warn!("Node could not load {:?}: {:?}", query, why);
            Err(MusicError::NoSongFound)
        }
        Ok(Track { data: Some(data), .. }) => Ok(data),
        Ok(_) => Err(MusicError::NoSongFound),
        Err(why) => {
            tracing::warn!("Loading {:?} failed: {:?}", query, why);
            Err(MusicError::NoSongFound)
        }
    }
}

/// Resolves `query` on the node into the tracks to queue and, for playlists,
/// the playlist name.
async fn load(
    session: &Session,
    msg: &Message,
    query: &str,
) -> Result<(Vec<TrackData>, Option<String>), MusicError> {
    let guild_id = session.player.guild_id;
    let result = session.lavalink.load_tracks(guild_id, query).await;

    let (tracks, playlist) = match loaded(query, result)? {
        TrackLoadData::Track(track) => (vec![track], None),
        TrackLoadData::Search(results) => (results.into_iter().take(1).collect(), None),
        TrackLoadData::Playlist(playlist) => (playlist.tracks, Some(playlist.info.name)),
        TrackLoadData::Error(_) => (Vec::new(), None),
    };

    if tracks.is_empty() {
        return Err(MusicError::NoSongFound);
    }
    for track in &tracks {
        log_queued(msg, track);
    }

    Ok((tracks, playlist))
}

/// Queues `tracks`, starts playback if the player was idle and returns whether
/// it did, plus how long until the queue runs dry.
async fn enqueue(
    session: &Session,
    tracks: Vec<TrackData>,
    query: &str,
) -> CommandResult<(bool, u64)> {
    let (start, remaining) = {
        let mut player = session.data.player.lock().await;
        player.latest_query = query.to_string();
        let start = player.enqueue(tracks);
        let queue = player.queue();
        let remaining = total_length(
            queue
                .current()
                .into_iter()
                .chain(queue.upcoming())
                .map(|t| &t.info),
        );
        (start, remaining)
    };

    if let Some(track) = &start {
        session.player.play_now(track).await?;
        tracing::info!("Now playing {}", track.info.title);
    }

    Ok((start.is_some(), remaining))
}

async fn announce_track(
    ctx: &Context,
    msg: &Message,
    track: &TrackData,
    started: bool,
    remaining_ms: u64,
) {
    let heading = if started { "Now playing" } else { "Added to queue" };
    let mut embed = base_embed()
        .author(CreateEmbedAuthor::new(heading))
        .description(format!(
            ":notes: {} ({})",
            track_title(&track.info),
            format_length(&track.info)
        ))
        .footer(footer(ctx, msg, "Queued").await);
    if let Some(artwork) = &track.info.artwork_url {
        embed = embed.thumbnail(artwork);
    }

    let ttl = Duration::from_millis(remaining_ms).max(REPLY_TTL);
    respond(ctx, msg, embed, ttl).await;
}

async fn announce_playlist(ctx: &Context, msg: &Message, name: &str, tracks: &[TrackData]) {
    let total = total_length(tracks.iter().map(|t| &t.info));
    let lines = tracks
        .iter()
        .enumerate()
        .map(|(i, t)| numbered_line(i + 1, &t.info));
    let mut pages = paginate(lines, FIELD_LIMIT).into_iter();

    let mut embed = base_embed()
        .title(format!(
            "Queueing a playlist - {} - {}",
            tracks.len(),
            format_duration(total)
        ))
        .description(name)
        .footer(footer(ctx, msg, "Requested").await);
    if let Some(first) = pages.next() {
        embed = embed.field("Queued songs", first, false);
    }
    if pages.next().is_some() {
        embed = embed.field("And more", "\u{200b}", false);
    }

    respond(ctx, msg, embed, LISTING_TTL).await;
}

#[command]
#[aliases("p")]
#[description = "Play a song, or resume a paused player when given nothing."]
#[usage = "<song name | link>"]
#[only_in(guilds)]
async fn play(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let guild_id = guild_id(msg)?;

    let Some(raw) = args.remains() else {
        let session = session(ctx, guild_id)
            .await
            .map_err(|_| MusicError::NoSongProvided)?;
        let was_paused = {
            let mut player = session.data.player.lock().await;
            player.is_paused() && player.resume().is_ok()
        };
        if !was_paused {
            return Err(MusicError::NoSongProvided.into());
        }
        session.player.set_pause(false).await?;
        respond_title(ctx, msg, "▶ Resumed the player.").await;
        return Ok(());
    };

    let config = config(ctx).await?;
    let query = build_query(raw, &config.lavalink.search_prefix);

    let session = ensure_connected(ctx, msg, guild_id).await?;
    session.data.player.lock().await.text_channel = msg.channel_id;

    let (tracks, playlist) = load(&session, msg, &query).await?;
    let first = tracks[0].clone();
    let listing = playlist.map(|name| (name, tracks.clone()));

    let (started, remaining) = enqueue(&session, tracks, &query).await?;

    match listing {
        Some((name, tracks)) => announce_playlist(ctx, msg, &name, &tracks).await,
        None => announce_track(ctx, msg, &first, started, remaining).await,
    }

    Ok(())
}

#[command]
#[aliases("ps")]
#[description = "Search and pick one of up to 5 results by reacting."]
#[usage = "<song name>"]
#[min_args(1)]
#[only_in(guilds)]
async fn search(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let guild_id = guild_id(msg)?;
    let raw = args.remains().ok_or(MusicError::NoSongProvided)?;

    let config = config(ctx).await?;
    let query = format!("{}:{}", config.lavalink.search_prefix, raw.trim());
    let lavalink = super::lavalink(ctx).await?;

    let result = lavalink.load_tracks(guild_id, &query).await;
    let results = match loaded(&query, result)? {
        TrackLoadData::Search(results) => results,
        TrackLoadData::Track(track) => vec![track],
        TrackLoadData::Playlist(_) => return Err(MusicError::NoSongPlaylistInstead.into()),
        TrackLoadData::Error(_) => Vec::new(),
    };
    let results: Vec<TrackData> = results.into_iter().take(OPTIONS.len()).collect();
    if results.is_empty() {
        return Err(MusicError::NoSongFound.into());
    }

    let listing = results
        .iter()
        .enumerate()
        .map(|(i, t)| numbered_line(i + 1, &t.info))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt_embed = base_embed()
        .title("Choose a song")
        .description(listing)
        .author(CreateEmbedAuthor::new("Query Results"))
        .footer(footer(ctx, msg, "Queried").await);
    let prompt = msg
        .channel_id
        .send_message(
            ctx,
            CreateMessage::new()
                .embed(prompt_embed)
                .reference_message(msg),
        )
        .await?;

    for option in &OPTIONS[..results.len()] {
        prompt
            .react(ctx, ReactionType::Unicode(option.to_string()))
            .await?;
    }

    let offered = results.len();
    let reaction = prompt
        .await_reaction(&ctx.shard)
        .author_id(msg.author.id)
        .timeout(SEARCH_TIMEOUT)
        .filter(move |reaction| choice(&reaction.emoji, offered).is_some())
        .await;

    if let Err(why) = prompt.delete(ctx).await {
        tracing::warn!("Could not delete search prompt: {:?}", why);
    }

    let Some(index) = reaction.and_then(|r| choice(&r.emoji, offered)) else {
        tracing::debug!("Search prompt timed out");
        delete_trigger(ctx, msg).await;
        return Ok(());
    };
    let track = results[index].clone();
    log_queued(msg, &track);

    let session = ensure_connected(ctx, msg, guild_id).await?;
    session.data.player.lock().await.text_channel = msg.channel_id;

    let (started, remaining) = enqueue(&session, vec![track.clone()], &query).await?;
    announce_track(ctx, msg, &track, started, remaining).await;

    Ok(())
}

/// Maps a reaction to the result it picks, if it is one of the offered ones.
fn choice(emoji: &ReactionType, offered: usize) -> Option<usize> {
    let ReactionType::Unicode(emoji) = emoji else {
        return None;
    };
    OPTIONS[..offered.min(OPTIONS.len())]
        .iter()
        .position(|option| *option == emoji.as_str())
}

async fn toggle_pause(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let paused = session.data.player.lock().await.toggle_pause()?;
    session.player.set_pause(paused).await?;

    let title = if paused {
        "⏸ Paused the player."
    } else {
        "▶ Resumed the player."
    };
    respond_title(ctx, msg, title).await;
    Ok(())
}

#[command]
#[description = "Pause or unpause the current song."]
#[only_in(guilds)]
async fn pause(ctx: &Context, msg: &Message) -> CommandResult {
    toggle_pause(ctx, msg).await
}

#[command]
#[description = "Resume or pause the current song."]
#[only_in(guilds)]
async fn resume(ctx: &Context, msg: &Message) -> CommandResult {
    toggle_pause(ctx, msg).await
}

/// Brings the node in line with a queue move made by a command.
async fn apply(session: &Session, transition: Transition<TrackData>) -> CommandResult {
    match &transition.track {
        Some(track) => {
            session.player.play_now(track).await?;
        }
        None => {
            session.player.stop_now().await?;
        }
    }
    if transition.unpause {
        session.player.set_pause(false).await?;
    }
    Ok(())
}

#[command]
#[aliases("skip", "n", "s")]
#[description = "Advance to the next song."]
#[only_in(guilds)]
async fn next(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let transition = session.data.player.lock().await.skip()?;
    apply(&session, transition).await?;

    respond_title(ctx, msg, "⏭ Skipped song.").await;
    Ok(())
}

#[command]
#[aliases("back")]
#[description = "Go back to the previous song."]
#[only_in(guilds)]
async fn previous(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let transition = session.data.player.lock().await.previous()?;
    apply(&session, transition).await?;

    respond_title(ctx, msg, "⏮ Playing previous track.").await;
    Ok(())
}

#[command]
#[description = "Clear the queue and stop the player."]
#[only_in(guilds)]
async fn stop(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let transition = session.data.player.lock().await.stop()?;
    apply(&session, transition).await?;

    respond_title(ctx, msg, "Stopped the player and cleared the queue.").await;
    Ok(())
}

#[command]
#[aliases("replay")]
#[description = "Restart the currently playing song."]
#[only_in(guilds)]
async fn restart(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    session.data.player.lock().await.current()?;
    session.player.set_position(Duration::ZERO).await?;

    respond_title(ctx, msg, "⏪ Restarting track.").await;
    Ok(())
}

#[command]
#[description = "Seek to a place in the current song, in seconds."]
#[usage = "<seconds>"]
#[num_args(1)]
#[only_in(guilds)]
async fn seek(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let length = playable_length(&session.data.player.lock().await.current()?.info);
    let target = parse_seek(args.rest(), length)?;
    session.player.set_position(target).await?;

    respond_title(
        ctx,
        msg,
        format!("Seeked {} seconds into the song.", target.as_secs()),
    )
    .await;
    Ok(())
}

#[command]
#[aliases("vol")]
#[description = "Show the volume, or set it between 1 and 200."]
#[usage = "[volume]"]
#[max_args(1)]
#[only_in(guilds)]
async fn volume(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let title = match args.current() {
        None => {
            let player = session.data.player.lock().await;
            player.current()?;
            format!("Current volume is set to {}%.", player.volume())
        }
        Some(arg) => {
            session.data.player.lock().await.current()?;
            let volume = parse_volume(arg)?;
            session.player.set_volume(volume).await?;
            session.data.player.lock().await.set_volume(volume);
            format!("Set the volume to {volume}%.")
        }
    };

    respond_title(ctx, msg, title).await;
    Ok(())
}

#[command]
#[aliases("f")]
#[description = "Toggle the Alvin and the Chipmunks filter."]
#[only_in(guilds)]
async fn alvin(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let enabled = {
        let mut player = session.data.player.lock().await;
        player.current()?;
        player.chipmunk = !player.chipmunk;
        player.chipmunk
    };

    let filters = session.player.get_player().await?.filters.unwrap_or_default();
    let timescale = enabled.then(|| Timescale {
        speed: Some(1.0),
        pitch: Some(2.0),
        rate: Some(1.0),
    });
    session
        .player
        .set_filters(Filters {
            timescale,
            ..filters
        })
        .await?;

    let title = if enabled {
        "Alvin and the chipmunks filter has been applied."
    } else {
        "Alvin and the chipmunks filter has been removed."
    };
    respond_title(ctx, msg, title).await;
    Ok(())
}

#[command]
#[aliases("ap")]
#[description = "Keep playing recommended songs once the queue runs out."]
#[only_in(guilds)]
async fn autoplay(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let enabled = {
        let mut player = session.data.player.lock().await;
        player.autoplay = !player.autoplay;
        player.autoplay
    };

    let state = if enabled { "on" } else { "off" };
    respond_title(ctx, msg, format!("Recommendations has been turned {state}.")).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use lavalink_rs::model::track::TrackLoadType;

    use super::*;

    #[test]
    fn reactions_map_to_offered_results() {
        let pick = |s: &str| choice(&ReactionType::Unicode(s.to_string()), 3);

        assert_eq!(pick("1️⃣"), Some(0));
        assert_eq!(pick("3️⃣"), Some(2));
        assert_eq!(pick("4️⃣"), None);
        assert_eq!(pick("👍"), None);
    }

    #[test]
    fn failed_loads_mean_nothing_found() {
        let failed: Result<Track, &str> = Err("node unreachable");
        assert_eq!(
            loaded("ytsearch:song", failed).err(),
            Some(MusicError::NoSongFound)
        );

        let empty: Result<Track, &str> = Ok(Track {
            load_type: TrackLoadType::Empty,
            data: None,
        });
        assert_eq!(
            loaded("ytsearch:song", empty).err(),
            Some(MusicError::NoSongFound)
        );
    }
}
