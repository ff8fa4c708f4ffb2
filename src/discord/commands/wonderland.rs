use crate::core::commands::CommandInvocation;
use crate::core::levels::{Guid, ServerRegion};
use crate::discord::commands::replies::{channel_context, send_reply};
use crate::discord::{Context, Error};

/// Game servers as they appear in the slash command picker.
#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum ServerChoice {
    #[name = "Asia"]
    Asia,
    #[name = "Europe"]
    Europe,
    #[name = "America"]
    America,
    #[name = "HK/TW/MO"]
    Cht,
}

impl ServerChoice {
    pub fn region(self) -> ServerRegion {
        match self {
            ServerChoice::Asia => ServerRegion::Asia,
            ServerChoice::Europe => ServerRegion::Europe,
            ServerChoice::America => ServerRegion::America,
            ServerChoice::Cht => ServerRegion::Cht,
        }
    }
}

/// Only input that can reach the upstream is worth a public "thinking..." state.
fn should_defer(raw_guid: &str) -> bool {
    Guid::parse(raw_guid).is_ok()
}

/// Fetch information about a Wonderland level.
#[poise::command(
    slash_command,
    install_context = "Guild|User",
    interaction_context = "Guild|BotDm|PrivateChannel"
)]
pub async fn wonderland(
    ctx: Context<'_>,
    #[description = "The GUID of the level."] guid: String,
    #[description = "The server the level is on."] server: ServerChoice,
) -> Result<(), Error> {
    let invocation = CommandInvocation::new("wonderland", channel_context(ctx))
        .with_arg("guid", guid.as_str())
        .with_arg("server", server.region().code());

    // A bad GUID is answered right away, so the error reply can still be
    // ephemeral. Once deferred publicly, the first follow-up is public too.
    if !should_defer(&guid) {
        let reply = ctx.data().router.dispatch(invocation).await;
        return send_reply(ctx, reply, true).await;
    }

    // Lookup plus a cover upload routinely takes longer than the 3s ack window.
    let deferred = match ctx.defer().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Interaction expired before defer, replying in channel: {}", e);
            false
        }
    };

    let reply = ctx.data().router.dispatch(invocation).await;

    send_reply(ctx, reply, deferred).await
}
