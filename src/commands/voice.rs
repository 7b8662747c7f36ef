use serenity::{
    client::Context,
    framework::standard::{
        macros::{command, group},
        CommandResult,
    },
    model::{channel::Message, mention::Mentionable},
};

use super::{
    base_embed, connect as join_author, guild_id, respond, respond_title, session, teardown,
    REPLY_TTL,
};

#[group]
#[commands(connect, disconnect)]
pub struct Voice;

#[command]
#[aliases("join")]
#[description = "Make the bot connect to your voice channel."]
#[only_in(guilds)]
async fn connect(ctx: &Context, msg: &Message) -> CommandResult {
    let guild_id = guild_id(msg)?;

    let (_, channel_id) = join_author(ctx, msg, guild_id).await?;

    let embed = base_embed().description(format!("Connected to {}.", channel_id.mention()));
    respond(ctx, msg, embed, REPLY_TTL).await;
    Ok(())
}

#[command]
#[aliases("dc", "leave")]
#[description = "Make the bot disconnect from current voice channel."]
#[only_in(guilds)]
async fn disconnect(ctx: &Context, msg: &Message) -> CommandResult {
    let guild_id = guild_id(msg)?;

    // Fails with a canned reply when there is nothing to leave.
    session(ctx, guild_id).await?;
    teardown(ctx, guild_id).await?;

    respond_title(ctx, msg, "Disconnected.").await;
    Ok(())
}
