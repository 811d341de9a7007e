use poise::serenity_prelude as serenity;
use tracing::{instrument, trace};
use uuid::Uuid;

use crate::{moderation, Context, Error};

/// Ban a user and add them to the server's blacklist
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS",
    category = "Moderation"
)]
#[instrument(skip(ctx, member), fields(request_id = %Uuid::new_v4(), target = %member.user.id))]
pub async fn smite(
    ctx: Context<'_>,
    #[description = "The member to ban"] member: serenity::Member,
) -> Result<(), Error> {
    let guild_id = super::guild_id(ctx)?;
    let issuer = ctx.author().tag();

    let response = {
        let mut blacklist = ctx.data().blacklist.lock().await;
        moderation::smite(&mut blacklist, ctx.http(), guild_id, member.user.id, &issuer).await?
    };
    trace!("smite response: {response:?}");

    ctx.say(response.to_string()).await?;

    Ok(())
}

/// Unban a user and remove them from the server's blacklist
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS",
    category = "Moderation"
)]
#[instrument(skip(ctx), fields(request_id = %Uuid::new_v4()))]
pub async fn revive(
    ctx: Context<'_>,
    #[description = "ID of the user to unban"] member_id: String,
) -> Result<(), Error> {
    let guild_id = super::guild_id(ctx)?;
    let strategy = ctx.data().settings.application.unban_strategy;

    let response = {
        let mut blacklist = ctx.data().blacklist.lock().await;
        moderation::revive(&mut blacklist, ctx.http(), guild_id, &member_id, strategy).await?
    };
    trace!("revive response: {response:?}");

    ctx.say(response.to_string()).await?;

    Ok(())
}
