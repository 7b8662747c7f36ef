use serenity::{
    builder::GetMessages,
    client::Context,
    framework::standard::{
        macros::{check, command, group},
        Args, CommandOptions, CommandResult, Reason,
    },
    model::channel::Message,
};

use super::{base_embed, config, respond, REPLY_TTL};

#[group]
#[commands(purge, icon)]
pub struct Utility;

// Only members holding one of the configured purge roles pass.
#[check]
#[name = "Purger"]
async fn purger_check(
    ctx: &Context,
    msg: &Message,
    _: &mut Args,
    _: &CommandOptions,
) -> Result<(), Reason> {
    let config = config(ctx)
        .await
        .map_err(|why| Reason::Log(why.to_string()))?;
    let member = msg
        .member(ctx)
        .await
        .map_err(|why| Reason::Log(format!("Could not fetch member: {why:?}")))?;

    let allowed = msg.guild(&ctx.cache).is_some_and(|guild| {
        member.roles.iter().any(|role_id| {
            guild
                .roles
                .get(role_id)
                .is_some_and(|role| config.permissions.purge_roles.contains(&role.name))
        })
    });

    if allowed {
        Ok(())
    } else {
        Err(Reason::User("Lacked a purge role".to_string()))
    }
}

/// How many messages a purge argument asks for, or the reply explaining why
/// it cannot be used.
fn purge_count(arg: Option<&str>) -> Result<u8, &'static str> {
    let arg = arg.map(str::trim).unwrap_or_default();
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return Err("You must declare a value. :slight_smile:");
    }
    match arg.parse::<u64>() {
        Ok(0) => Err("Value must be over 0."),
        Ok(n) if n < 100 => Ok(n as u8),
        _ => Err("Value must be under 100."),
    }
}

#[command]
#[description = "Delete the given number of recent messages in this channel."]
#[usage = "<count>"]
#[checks(Purger)]
#[only_in(guilds)]
async fn purge(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let count = match purge_count(args.current()) {
        Ok(count) => count,
        Err(reply) => {
            respond(ctx, msg, base_embed().title(reply), REPLY_TTL).await;
            return Ok(());
        }
    };

    // One more to take the command message along.
    let messages = msg
        .channel_id
        .messages(ctx, GetMessages::new().limit(count + 1))
        .await?;
    let ids: Vec<_> = messages.iter().map(|m| m.id).collect();

    match ids.len() {
        0 => {}
        1 => msg.channel_id.delete_message(ctx, ids[0]).await?,
        _ => msg.channel_id.delete_messages(ctx, ids).await?,
    }

    tracing::info!(
        channel = msg.channel_id.get(),
        "{} purged {} messages",
        msg.author.name,
        count
    );
    Ok(())
}

#[command]
#[description = "Link your avatar."]
async fn icon(ctx: &Context, msg: &Message) -> CommandResult {
    let face = msg.author.face();
    let embed = base_embed().title("Your icon").url(&face).image(face);
    respond(ctx, msg, embed, REPLY_TTL).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purge_count_bounds() {
        assert_eq!(purge_count(Some("5")), Ok(5));
        assert_eq!(purge_count(Some("99")), Ok(99));
        assert_eq!(purge_count(Some("100")), Err("Value must be under 100."));
        assert_eq!(purge_count(Some("0")), Err("Value must be over 0."));
        assert_eq!(
            purge_count(Some("many")),
            Err("You must declare a value. :slight_smile:")
        );
        assert_eq!(
            purge_count(None),
            Err("You must declare a value. :slight_smile:")
        );
    }
}
