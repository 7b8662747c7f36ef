use serenity::{
    client::Context,
    framework::standard::{
        macros::{command, group},
        Args, CommandResult,
    },
    model::channel::Message,
};

use super::{guild_id, respond_title, session};
use crate::{
    error::MusicError,
    format::track_title,
    player::parse_slot,
    queue::RepeatMode,
};

#[group]
#[commands(repeat, shuffle, clear, move_track, cut, remove)]
pub struct Queue;

#[command("loop")]
#[aliases("repeat")]
#[description = "Cycle the repeat mode, or set it to song, queue or off."]
#[usage = "[song | queue | off]"]
#[max_args(1)]
#[only_in(guilds)]
async fn repeat(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let mode = {
        let mut player = session.data.player.lock().await;
        let queue = player.queue_mut();
        match args.current() {
            Some(arg) => {
                let mode = RepeatMode::from_arg(arg);
                queue.set_repeat_mode(mode);
                mode
            }
            None => queue.cycle_repeat_mode(),
        }
    };

    tracing::debug!("Repeat mode is now {:?}", mode);

    let title = match mode {
        RepeatMode::None => "⏹ Stopped loop.",
        RepeatMode::Song => "🔁 Looping the song.",
        RepeatMode::Queue => "🔁 Looping the queue.",
    };
    respond_title(ctx, msg, title).await;
    Ok(())
}

#[command]
#[description = "Shuffle the upcoming songs."]
#[only_in(guilds)]
async fn shuffle(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    session
        .data
        .player
        .lock()
        .await
        .queue_mut()
        .shuffle(&mut rand::thread_rng())?;
    tracing::debug!("Shuffled the upcoming tracks");

    respond_title(ctx, msg, "🔀 Shuffled the queue.").await;
    Ok(())
}

#[command]
#[description = "Clear the queue, keeping the current song."]
#[only_in(guilds)]
async fn clear(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    session.data.player.lock().await.clear()?;
    tracing::debug!("Cleared the queue");

    respond_title(ctx, msg, "Cleared the queue.").await;
    Ok(())
}

#[command("move")]
#[aliases("m")]
#[description = "Move a song to another place in the queue."]
#[usage = "<from> <to>"]
#[num_args(2)]
#[only_in(guilds)]
async fn move_track(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let from = args.single::<String>()?;
    let to = args.single::<String>()?;

    let title = {
        let mut player = session.data.player.lock().await;
        let queue = player.queue_mut();
        if queue.upcoming().is_empty() {
            return Err(MusicError::QueueIsEmpty.into());
        }

        let (track, slot) = queue.move_track(parse_slot(&from)?, parse_slot(&to)?)?;
        tracing::debug!("Moved {} from slot {} to {}", track.info.title, from, slot);
        format!("Moved {} to {}.", track_title(&track.info), slot)
    };

    respond_title(ctx, msg, title).await;
    Ok(())
}

#[command]
#[aliases("c")]
#[description = "Move the last song in the queue to the next spot."]
#[only_in(guilds)]
async fn cut(ctx: &Context, msg: &Message) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let title = {
        let mut player = session.data.player.lock().await;
        let queue = player.queue_mut();
        if queue.upcoming().is_empty() {
            return Err(MusicError::QueueIsEmpty.into());
        }

        let track = queue.cut()?;
        format!(
            "Moved the last song ({}) to the next spot in the queue.",
            track.info.title
        )
    };

    respond_title(ctx, msg, title).await;
    Ok(())
}

#[command]
#[aliases("rm")]
#[description = "Remove a song from the queue."]
#[usage = "<position>"]
#[num_args(1)]
#[only_in(guilds)]
async fn remove(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let session = session(ctx, guild_id(msg)?).await?;

    let track = {
        let mut player = session.data.player.lock().await;
        let queue = player.queue_mut();
        if queue.upcoming().is_empty() {
            return Err(MusicError::QueueIsEmpty.into());
        }

        queue.remove(parse_slot(args.rest())?)?
    };
    tracing::info!("{} removed {} from the queue", msg.author.name, track.info.title);

    respond_title(ctx, msg, format!("Removed {} from the queue.", track.info.title)).await;
    Ok(())
}
