// Discord commands module.
// Each command gets its own file; they all funnel into the core CommandRouter.

pub mod about;

pub mod changelogs;

pub mod owner;

// Bot presence management
pub mod presence;

// Embed/reply conversion shared by every command
pub mod replies;

pub mod wonderland;

use crate::core::commands::CommandRouter;
use crate::core::images::ImageRelay;
use crate::discord::uploads::DiscordCdnUploader;
use crate::infra::images::{HttpImageFetcher, SqliteImageStore};
use crate::infra::levels::WonderlandApiClient;
use std::sync::Arc;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub type BotRouter = CommandRouter<
    WonderlandApiClient,
    ImageRelay<HttpImageFetcher, DiscordCdnUploader, SqliteImageStore>,
>;

/// Data that's shared across all commands.
pub struct Data {
    pub router: Arc<BotRouter>,
    /// Suffix of the custom status, e.g. "Online".
    pub bot_status: String,
}
