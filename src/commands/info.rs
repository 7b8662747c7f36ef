use std::time::Duration;

use serde::Deserialize;
use serenity::{
    builder::{CreateEmbed, CreateEmbedAuthor},
    client::Context,
    framework::standard::{
        macros::{command, group},
        Args, CommandResult,
    },
    model::channel::Message,
};

use super::{
    base_embed, config, footer, guild_id, respond, session, HttpKey, LISTING_TTL, REPLY_TTL,
};
use crate::{
    error::MusicError,
    format::{
        format_duration, format_length, numbered_line, paginate, playable_length, time_left,
        total_length, track_title, FIELD_LIMIT,
    },
    player::parse_show_count,
};

/// Stop adding fields once an embed carries this many characters.
const EMBED_BUDGET: usize = 5000;
/// Longer lyrics are linked instead of posted.
const LYRICS_LIMIT: usize = 2000;
const LYRICS_TTL: Duration = Duration::from_secs(180);

#[group]
#[commands(nowplaying, queue, history, lyrics)]
pub struct Info;

/// Adds `pages` as fields, the first named `first` and the rest "More",
/// until the embed would grow past [`EMBED_BUDGET`].
fn add_pages(mut embed: CreateEmbed, mut used: usize, first: &str, pages: Vec<String>) -> CreateEmbed {
    for (i, page) in pages.into_iter().enumerate() {
        let name = if i == 0 { first } else { "More" };
        used += name.len() + page.len();
        if used > EMBED_BUDGET {
            break;
        }
        embed = embed.field(name, page, false);
    }
    embed
}

#[command]
#[aliases("np", "playing", "current")]
#[description = "Show the song that is playing right now."]
#[only_in(guilds)]
async fn nowplaying(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let track = session.data.player.lock().await.current()?.clone();
    let position = session.player.get_player().await?.state.position;

    let mut embed = base_embed()
        .title("Now playing")
        .field("Track title", track_title(&track.info), false)
        .field("Artist", &track.info.author, false)
        .field(
            "Position",
            format!(
                "{}/{}",
                format_duration(position),
                format_length(&track.info)
            ),
            false,
        )
        .footer(footer(ctx, msg, "Requested").await);
    if let Some(artwork) = &track.info.artwork_url {
        embed = embed.thumbnail(artwork);
    }

    let ttl = time_left(&track.info, position).max(REPLY_TTL);
    respond(ctx, msg, embed, ttl).await;
    Ok(())
}

#[command]
#[aliases("q")]
#[description = "List the upcoming songs, 10 unless told otherwise."]
#[usage = "[count]"]
#[max_args(1)]
#[only_in(guilds)]
async fn queue(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let (current, upcoming, mode) = {
        let player = session.data.player.lock().await;
        let current = player
            .current()
            .map_err(|_| MusicError::QueueIsEmpty)?
            .clone();
        let upcoming = player.queue().upcoming().to_vec();
        (current, upcoming, player.queue().repeat_mode())
    };
    let show = parse_show_count(args.current())?;
    let position = session.player.get_player().await?.state.position;

    let remaining = playable_length(&current.info)
        .saturating_sub(position)
        .saturating_add(total_length(upcoming.iter().map(|t| &t.info)));
    let mut title = vec!["Queue".to_string()];
    title.extend(mode.label().map(str::to_string));
    if !upcoming.is_empty() {
        title.push(upcoming.len().to_string());
        title.push(format_duration(remaining));
    }
    let title = title.join(" - ");

    let playing = format!(
        "**1.** {} - {}/{}",
        track_title(&current.info),
        format_duration(position),
        format_length(&current.info)
    );
    let used = title.len() + playing.len();
    let mut embed = base_embed()
        .title(title)
        .field("Currently playing", playing, false)
        .footer(footer(ctx, msg, "Requested").await);

    if upcoming.is_empty() {
        embed = embed.field("Next up", "The queue is empty", false);
    } else {
        embed = embed.description(format!("Showing up to the next {show} tracks"));
        let lines = upcoming
            .iter()
            .take(show - 1)
            .enumerate()
            .map(|(i, t)| numbered_line(i + 2, &t.info));
        embed = add_pages(embed, used, "Next up", paginate(lines, FIELD_LIMIT));
    }

    respond(ctx, msg, embed, LISTING_TTL).await;
    Ok(())
}

#[command]
#[aliases("h")]
#[description = "Show the songs played so far."]
#[only_in(guilds)]
async fn history(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let played = session.data.player.lock().await.queue().history().to_vec();
    if played.is_empty() {
        return Err(MusicError::NoPreviousTracks.into());
    }

    let title = format!("History - {}", played.len());
    let used = title.len();
    let lines = played
        .iter()
        .enumerate()
        .map(|(i, t)| numbered_line(i + 1, &t.info));
    let embed = base_embed()
        .title(title)
        .description("Showing previously played tracks")
        .footer(footer(ctx, msg, "Requested").await);
    let embed = add_pages(embed, used, "Previously played", paginate(lines, FIELD_LIMIT));

    respond(ctx, msg, embed, LISTING_TTL).await;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Lyrics {
    title: String,
    author: String,
    lyrics: String,
    thumbnail: GeniusLink,
    links: GeniusLink,
}

#[derive(Debug, Deserialize)]
struct GeniusLink {
    genius: String,
}

impl Lyrics {
    fn into_embed(self) -> CreateEmbed {
        let description = if self.lyrics.chars().count() > LYRICS_LIMIT {
            format!("<{}>", self.links.genius)
        } else {
            self.lyrics
        };

        base_embed()
            .title(self.title)
            .author(CreateEmbedAuthor::new(self.author))
            .description(description)
            .thumbnail(self.thumbnail.genius)
    }
}

#[command]
#[description = "Find the lyrics of the current song, or of the one named."]
#[usage = "[song name]"]
#[only_in(guilds)]
async fn lyrics(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let guild_id = guild_id(msg)?;

    let (name, ttl) = match args.remains() {
        Some(name) => (name.to_string(), LYRICS_TTL),
        None => {
            let session = session(ctx, guild_id).await?;
            let track = session.data.player.lock().await.current()?.clone();
            let position = session.player.get_player().await?.state.position;
            let ttl = time_left(&track.info, position).max(REPLY_TTL);
            (track.info.title, ttl)
        }
    };

    let config = config(ctx).await?;
    let client = {
        let data = ctx.data.read().await;
        data.get::<HttpKey>()
            .cloned()
            .ok_or("HTTP client placed in at initialisation.")?
    };

    let typing = msg.channel_id.start_typing(&ctx.http);
    let response = client
        .get(&config.lyrics.url)
        .query(&[("title", name.as_str())])
        .send()
        .await?;
    if !response.status().is_success() {
        tracing::debug!("No lyrics for {:?}: {}", name, response.status());
        typing.stop();
        return Err(MusicError::NoLyricsFound.into());
    }
    let found = response.json::<Lyrics>().await;
    typing.stop();

    let found = found.map_err(|why| {
        tracing::warn!("Malformed lyrics response for {:?}: {:?}", name, why);
        MusicError::NoLyricsFound
    })?;

    respond(ctx, msg, found.into_embed(), ttl).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lyrics_response_parses() {
        let body = r#"{
            "title": "Song",
            "author": "Band",
            "lyrics": "la la la",
            "thumbnail": { "genius": "https://images.genius.com/x.jpg" },
            "links": { "genius": "https://genius.com/band-song-lyrics" }
        }"#;

        let lyrics: Lyrics = serde_json::from_str(body).unwrap();

        assert_eq!(lyrics.title, "Song");
        assert_eq!(lyrics.links.genius, "https://genius.com/band-song-lyrics");
    }
}
