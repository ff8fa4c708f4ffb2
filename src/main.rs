// This is the entry point of the Wonderland Explorer bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic): lookup, image relay, rendering, routing
// - `infra/` = Implementations of core traits (upstream API, SQLite, HTTP, log files)
// - `discord/` = Discord-specific adapters (commands, CDN uploads, error hook)
//
// This file's job is to:
// 1. Load configuration and set up logging
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Run until the gateway closes or Ctrl-C arrives

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;
mod settings;

use crate::core::changelogs::ChangelogService;
use crate::core::commands::{CommandRouter, RouterSettings};
use crate::core::embeds::RenderOptions;
use crate::core::images::ImageRelay;
use crate::core::levels::LevelService;
use crate::discord::commands::presence;
use crate::discord::uploads::DiscordCdnUploader;
use crate::discord::Data;
use crate::infra::images::cache_janitor::spawn_cache_janitor;
use crate::infra::images::{HttpImageFetcher, SqliteImageStore};
use crate::infra::levels::{PayloadTemplate, WonderlandApiClient};
use crate::infra::logging::DailyFileWriter;
use crate::settings::BotSettings;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Stray temp images are swept this often, and removed once this old.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Console plus one file per day under `LOG_DIR`.
fn init_tracing(settings: &BotSettings) -> anyhow::Result<()> {
    let default_level = if settings.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},serenity=warn,h2=warn,hyper=warn,sqlx=warn",
            default_level
        ))
    });

    let file_writer = DailyFileWriter::new(
        &settings.log_dir,
        "bot",
        settings.log_timezone,
        settings.log_retention_days,
    )
    .with_context(|| format!("Failed to create log directory {}", settings.log_dir.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = BotSettings::from_env()?;
    init_tracing(&settings)?;
    tracing::info!("🤖 Wonderland Explorer is starting up...");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let timeout = settings.upstream_timeout;

    let template = PayloadTemplate::from_file(&settings.payload_file).with_context(|| {
        format!(
            "Failed to load level API payload template from {}",
            settings.payload_file.display()
        )
    })?;
    let level_client = WonderlandApiClient::new(template, timeout)?;
    let level_service = LevelService::new(level_client, timeout);

    // The uploader gets its own HTTP handle; the gateway client isn't built yet.
    let http = Arc::new(serenity::Http::new(&settings.discord_token));
    let uploader = DiscordCdnUploader::new(
        http,
        serenity::ChannelId::new(settings.image_channel_id),
        timeout,
    );
    let fetcher = HttpImageFetcher::new(timeout)?;
    let image_store = SqliteImageStore::new(&settings.database_url)
        .await
        .context("Failed to initialize SQLite image cache")?;
    let image_relay = ImageRelay::new(fetcher, uploader, image_store, &settings.image_cache_dir);

    let changelogs = ChangelogService::new(&settings.changelogs_file);
    tracing::info!("Changelogs are read from {}", changelogs.path().display());

    let router = Arc::new(CommandRouter::new(
        level_service,
        image_relay,
        changelogs,
        RouterSettings {
            render: RenderOptions {
                share_url_template: settings.share_url_template.clone(),
            },
            project_url: settings.project_url.clone(),
        },
    ));

    // Create the data structure that will be shared across all commands
    let data = Data {
        router,
        bot_status: settings.bot_status.clone(),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    // MESSAGE_CONTENT is only needed for the owner `register` prefix command.
    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let owners: HashSet<serenity::UserId> =
        settings.owner_id.map(serenity::UserId::new).into_iter().collect();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::wonderland::wonderland(),
                discord::commands::about::about(),
                discord::commands::changelogs::changelogs(),
                discord::commands::owner::register(),
            ],
            owners,
            prefix_options: poise::PrefixFrameworkOptions {
                mention_as_prefix: true,
                ..Default::default()
            },
            on_error: |error| Box::pin(discord::errors::on_error(error)),
            pre_command: |ctx| {
                Box::pin(async move {
                    tracing::info!(
                        command = %ctx.command().qualified_name,
                        user = ctx.author().id.get(),
                        guild = ctx.guild_id().map(|g| g.get()),
                        "Command invoked"
                    );
                })
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!("✅ Bot connected as {}", ready.user.name);

                // Global registration can take a while to propagate; the owner
                // `register` command covers per-guild syncs during development.
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!(
                    "✅ Synced {} slash command(s)",
                    framework
                        .options()
                        .commands
                        .iter()
                        .filter(|c| c.slash_action.is_some())
                        .count()
                );

                presence::on_ready(ctx, &data).await;

                spawn_cache_janitor(
                    data.router.images().cache_dir().to_path_buf(),
                    CACHE_SWEEP_INTERVAL,
                    CACHE_SWEEP_INTERVAL,
                );

                tracing::info!("🚀 Bot is ready!");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&settings.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("⚠️ Bot interrupted by user");
            shard_manager.shutdown_all().await;
        }
    });

    let result = client.start().await;
    tracing::info!("🔌 Shutting down bot...");
    result.context("Error running bot")?;

    Ok(())
}
