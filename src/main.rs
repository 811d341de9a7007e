pub mod blacklist;
pub mod commands;
pub mod config;
pub mod moderation;
pub mod platform;

use crate::{
    blacklist::Blacklist,
    config::{get_configuration, Config},
};
use commands::{misc, moderation as moderation_commands};
use poise::{
    serenity_prelude::{self as serenity, ClientBuilder, UserId},
    CreateReply,
};
use secrecy::ExposeSecret;
use std::{collections::HashSet, time::Duration};
use tokio::sync::Mutex;
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemBuilder, SubsystemHandle, Toplevel};
use tracing::{debug, error, info, instrument, warn, Level};
use tracing_subscriber::{
    fmt::{self, writer::MakeWriterExt},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

#[tokio::main(worker_threads = 1)]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    log_setup()?;

    let config = get_configuration()?;
    if let Err(e) = config.token() {
        error!("refusing to start: {e}");

        return Err(e.into());
    }

    let bot = Bot {
        client: app(config).await?,
    };

    Toplevel::new(async |s: &mut SubsystemHandle| {
        s.start(SubsystemBuilder::new("bot", bot.into_subsystem()));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(30))
    .await?;

    Ok(())
}

struct Bot {
    client: serenity::Client,
}

impl IntoSubsystem<Box<dyn std::error::Error + Send + Sync>> for Bot {
    async fn run(
        self,
        subsys: &mut SubsystemHandle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut client = self.client;
        let shard_manager = client.shard_manager.clone();

        tokio::select! {
            res = client.start() => {
                if let Err(e) = res {
                    error!("{e:?}");
                    return Err(e.into());
                }
            },
            _ = subsys.on_shutdown_requested() => {
                info!("shutting down shards");
                shard_manager.shutdown_all().await;
            }
        }

        Ok(())
    }
}

#[instrument(skip(config), err)]
async fn app(config: Config) -> Result<serenity::Client, Error> {
    let owners = config.owners()?.into_iter().collect::<HashSet<UserId>>();
    debug!("owners: {owners:?}");

    let blacklist = Blacklist::load(
        &config.application.blacklist_path,
        config.application.pretty_json,
    );
    info!(
        "blacklist at {} holds {} users",
        blacklist.path().display(),
        blacklist.len()
    );

    let options = poise::FrameworkOptions {
        commands: vec![
            moderation_commands::smite(),
            moderation_commands::revive(),
            misc::help(),
            misc::info(),
            misc::register(),
        ],
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some("!".into()),
            ..Default::default()
        },
        pre_command: |ctx| {
            Box::pin(async move {
                tracing::info!(user = ?ctx.author().tag(), guild = ?ctx.guild_id(), invocation_string = ?ctx.invocation_string())
            })
        },
        on_error: |error| Box::pin(on_error(error)),
        owners,

        ..Default::default()
    };

    info!("starting client");

    let token = config.token()?.clone();
    let register_guild = config.register_guild();

    let framework = poise::Framework::builder()
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);

                let commands = &framework.options().commands;
                match register_guild {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                        debug!("registered {} commands in {guild_id}", commands.len());
                    }
                    None => {
                        poise::builtins::register_globally(ctx, commands).await?;
                        debug!("registered {} commands globally", commands.len());
                    }
                }

                Ok(Data {
                    bot_start_time: std::time::Instant::now(),
                    settings: config,
                    blacklist: Mutex::new(blacklist),
                })
            })
        })
        .options(options)
        .build();

    let client = ClientBuilder::new(
        token.expose_secret(),
        serenity::GatewayIntents::non_privileged()
            | serenity::GatewayIntents::GUILD_MEMBERS
            | serenity::GatewayIntents::MESSAGE_CONTENT,
    )
    .framework(framework)
    .await?;

    Ok(client)
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    info!("Encountered error: {:?}", error);

    match error {
        poise::FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let s = match missing_permissions {
                Some(permissions) => format!(
                    "You're missing the following permissions to use this command: {permissions}"
                ),
                None => "I couldn't check your permissions, try again later.".to_owned(),
            };
            if let Err(e) = ctx.send(CreateReply::default().content(s).ephemeral(true)).await {
                warn!("{}", e)
            }
        }
        poise::FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let s = format!(
                "I'm missing the following permissions to run this command: {missing_permissions}"
            );
            if let Err(e) = ctx.send(CreateReply::default().content(s).ephemeral(true)).await {
                warn!("{}", e)
            }
        }
        poise::FrameworkError::GuildOnly { ctx, .. } => {
            if let Err(e) = ctx
                .send(
                    CreateReply::default()
                        .content("This command only works in a server.")
                        .ephemeral(true),
                )
                .await
            {
                warn!("{}", e)
            }
        }
        poise::FrameworkError::Command { ctx, error, .. } => {
            error!(
                "command {} used by {} failed: {error}",
                ctx.invoked_command_name(),
                ctx.author().name,
            );
            if let Err(e) = ctx
                .send(
                    CreateReply::default()
                        .content("Something went wrong while running this command.")
                        .ephemeral(true),
                )
                .await
            {
                error!("{}", e)
            }
        }
        poise::FrameworkError::ArgumentParse { input, ctx, .. } => {
            let s = format!(
                "The argument you provided ({}) was incorrect. Press arrow up \u{2191} to change the arguments and press Enter when you're done.",
                input.unwrap_or_default()
            );
            if let Err(e) = ctx.say(s).await {
                warn!("{}", e)
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("error while handling error: {}", e)
            }
        }
    }
}

#[derive(Debug)]
pub struct Data {
    bot_start_time: std::time::Instant,
    settings: Config,
    blacklist: Mutex<Blacklist>,
}

fn log_setup() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let file_appender = tracing_appender::rolling::hourly("./logs", "error");

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::Layer::default().with_file(true).with_line_number(true))
        .with(
            fmt::Layer::new()
                .json()
                .with_ansi(false)
                .with_writer(file_appender.with_max_level(Level::ERROR)),
        )
        .try_init()?;

    Ok(())
}
