// Command router - the single entry point for every user command.
//
// The Discord layer turns an interaction into a CommandInvocation, hands it to
// `dispatch`, and sends back whatever Reply comes out. Dispatch never fails:
// every error is logged once and turned into an error embed here, so nothing
// escapes to the gateway.

use crate::core::changelogs::{render_changelog_page, ChangelogService};
use crate::core::embeds::{
    fit_to_limits, render_level, EmbedPayload, LinkButton, RenderOptions, ABOUT_COLOR, ERROR_COLOR,
};
use crate::core::images::{CoverImageRequest, CoverImageResolver};
use crate::core::levels::{LevelError, LevelService, LevelSource, ServerRegion};
use thiserror::Error;

// ============================================================================
// INVOCATIONS & REPLIES
// ============================================================================

/// Where a command was invoked from. Only ever used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelContext {
    Guild { guild_id: u64, channel_id: u64 },
    DirectMessage { channel_id: u64 },
}

impl ChannelContext {
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelContext::Guild { .. } => "guild",
            ChannelContext::DirectMessage { .. } => "dm",
        }
    }
}

/// One user request. Lives only as long as its handling.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub name: String,
    pub args: Vec<(String, String)>,
    pub channel: ChannelContext,
}

impl CommandInvocation {
    pub fn new(name: impl Into<String>, channel: ChannelContext) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            channel,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((key.into(), value.into()));
        self
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Embed {
        embed: EmbedPayload,
        links: Vec<LinkButton>,
        ephemeral: bool,
    },
    /// Several embeds shown one at a time with previous/next buttons.
    Pages {
        pages: Vec<EmbedPayload>,
        ephemeral: bool,
    },
}

/// The reply users see whenever something went wrong.
pub fn error_reply(message: impl Into<String>) -> Reply {
    Reply::Embed {
        embed: fit_to_limits(EmbedPayload::new("An error occurred", ERROR_COLOR).description(message))
            .embed,
        links: Vec::new(),
        ephemeral: true,
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Unknown server region: {0}")]
    InvalidRegion(String),

    #[error(transparent)]
    Level(#[from] LevelError),

    #[error("No changelogs found")]
    NoChangelogs,
}

impl CommandError {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::UnknownCommand(_) => "UnknownCommandError",
            CommandError::MissingArgument(_) => "MissingArgumentError",
            CommandError::InvalidRegion(_) => "InvalidRegionError",
            CommandError::Level(e) => e.kind(),
            CommandError::NoChangelogs => "ChangelogsUnavailableError",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            CommandError::UnknownCommand(_) => {
                "This command is not available. Please try again later.".to_string()
            }
            CommandError::MissingArgument(name) => format!("Missing required option `{}`.", name),
            CommandError::InvalidRegion(_) => "Unknown server region.".to_string(),
            CommandError::Level(LevelError::InvalidGuid(_)) => "Invalid GUID".to_string(),
            CommandError::Level(LevelError::NotFound(message)) => message.clone(),
            CommandError::Level(LevelError::UpstreamUnavailable(_)) => {
                "The server returned an error.".to_string()
            }
            CommandError::Level(LevelError::Rejected(message)) => message.clone(),
            CommandError::Level(LevelError::Decode(_)) => {
                "Could not decode the response from the server.".to_string()
            }
            CommandError::Level(LevelError::MissingLevelInfo) => {
                "Could not find level information in the response.".to_string()
            }
            CommandError::NoChangelogs => "❌ No changelogs found.".to_string(),
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RouterSettings {
    pub render: RenderOptions,
    /// Repository link shown in `/about`.
    pub project_url: Option<String>,
}

pub struct CommandRouter<S: LevelSource, R: CoverImageResolver> {
    levels: LevelService<S>,
    images: R,
    changelogs: ChangelogService,
    settings: RouterSettings,
}

impl<S: LevelSource, R: CoverImageResolver> CommandRouter<S, R> {
    pub fn new(
        levels: LevelService<S>,
        images: R,
        changelogs: ChangelogService,
        settings: RouterSettings,
    ) -> Self {
        Self {
            levels,
            images,
            changelogs,
            settings,
        }
    }

    pub fn changelogs(&self) -> &ChangelogService {
        &self.changelogs
    }

    pub fn images(&self) -> &R {
        &self.images
    }

    pub async fn dispatch(&self, invocation: CommandInvocation) -> Reply {
        tracing::debug!(
            command = %invocation.name,
            channel = invocation.channel.kind(),
            "Dispatching command"
        );

        let result = match invocation.name.as_str() {
            "about" => Ok(self.about()),
            "wonderland" => self.wonderland(&invocation).await,
            "changelogs" => self.changelog_pages().await,
            other => Err(CommandError::UnknownCommand(other.to_string())),
        };

        result.unwrap_or_else(|err| {
            tracing::error!(
                command = %invocation.name,
                guid = invocation.arg("guid").unwrap_or("-"),
                channel = invocation.channel.kind(),
                kind = err.kind(),
                "Command failed: {}",
                err
            );
            error_reply(err.user_message())
        })
    }

    async fn wonderland(&self, invocation: &CommandInvocation) -> Result<Reply, CommandError> {
        let guid = invocation
            .arg("guid")
            .ok_or(CommandError::MissingArgument("guid"))?;
        let code = invocation
            .arg("server")
            .ok_or(CommandError::MissingArgument("server"))?;
        let region =
            ServerRegion::from_code(code).ok_or_else(|| CommandError::InvalidRegion(code.to_string()))?;

        let record = self.levels.lookup(guid, region).await?;

        // A missing cover is not worth failing the whole reply over.
        let image_url = match &record.cover_image {
            Some(source_url) => {
                let request = CoverImageRequest {
                    guid: record.guid.clone(),
                    region,
                    source_url: source_url.clone(),
                };
                match self.images.resolve(&request).await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::warn!(
                            guid = %record.guid,
                            kind = e.kind(),
                            "Sending level without cover image: {}",
                            e
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let (rendered, links) = render_level(&record, image_url.as_deref(), &self.settings.render);
        if !rendered.truncated.is_empty() {
            tracing::info!(
                guid = %record.guid,
                kind = "RenderTruncationNotice",
                parts = ?rendered.truncated,
                "Level embed truncated to fit display limits"
            );
        }

        Ok(Reply::Embed {
            embed: rendered.embed,
            links,
            ephemeral: false,
        })
    }

    fn about(&self) -> Reply {
        let mut description = String::from(
            "Wonderland Explorer looks up Wonderland levels by GUID and shows their name, \
             description and cover image. It works in servers and in direct messages.",
        );
        if let Some(url) = &self.settings.project_url {
            description.push_str(&format!(
                "\n\nThe bot is open-source on [GitHub](<{}>). For questions or issues, open an issue there.",
                url
            ));
        }

        let embed = EmbedPayload::new("Wonderland Explorer", ABOUT_COLOR)
            .description(description)
            .field("/wonderland", "Show a level's details by GUID and server.", false)
            .field("/changelogs", "Browse what changed in each version.", false)
            .field("/about", "You are here.", false);

        Reply::Embed {
            embed: fit_to_limits(embed).embed,
            links: Vec::new(),
            ephemeral: false,
        }
    }

    async fn changelog_pages(&self) -> Result<Reply, CommandError> {
        let changelogs = self.changelogs.load().await;
        if changelogs.is_empty() {
            return Err(CommandError::NoChangelogs);
        }

        let total = changelogs.len();
        let pages = changelogs
            .iter()
            .enumerate()
            .map(|(i, changelog)| fit_to_limits(render_changelog_page(changelog, i, total)).embed)
            .collect();

        Ok(Reply::Pages {
            pages,
            ephemeral: true,
        })
    }
}
