use poise::serenity_prelude::GuildId;

use crate::{Context, Error};

pub mod misc;
pub mod moderation;

/// Commands are registered with `guild_only`, so this only fails if poise lets a DM through.
fn guild_id(ctx: Context<'_>) -> Result<GuildId, Error> {
    ctx.guild_id()
        .ok_or_else(|| format!("/{} used outside of a server", ctx.command().name).into())
}
