use std::time::Instant;

use poise::CreateReply;
use tracing::{instrument, trace};
use uuid::Uuid;

use crate::{Context, Error};

/// Show information about this bot.
#[instrument(skip(ctx), fields(request_id = %Uuid::new_v4() ))]
#[poise::command(slash_command, category = "Miscellaneous")]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    let elapsed = Instant::now().duration_since(ctx.data().bot_start_time);

    let mut content = format!(
        "**smitebot** v{}\nTime since last start (h\\:m\\:s): {h:0>2}:{m:0>2}:{s:0>2}",
        env!("CARGO_PKG_VERSION"),
        h = (elapsed.as_secs() / 60) / 60,
        m = (elapsed.as_secs() / 60) % 60,
        s = elapsed.as_secs() % 60
    );

    if let Some(guild_id) = ctx.guild_id() {
        let blacklisted = ctx.data().blacklist.lock().await.users(guild_id).len();
        content.push_str(&format!("\nBlacklisted in this server: {blacklisted}"));
    }

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}

/// Show this menu
#[poise::command(slash_command, category = "Miscellaneous")]
#[instrument(skip(ctx))]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> Result<(), Error> {
    let extra_text_at_bottom = "\
Type `/help <command>` for more info on a command.";

    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom,
            ephemeral: true,
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}

/// Register slash commands in this guild or globally
///
/// Run with no arguments to register in guild, run with argument "global" to register globally.
#[poise::command(owners_only, prefix_command, hide_in_help, category = "Miscellaneous")]
pub async fn register(ctx: Context<'_>, #[flag] global: bool) -> Result<(), Error> {
    trace!("register called, global: {global}");
    poise::builtins::register_application_commands(ctx, global).await?;

    Ok(())
}
