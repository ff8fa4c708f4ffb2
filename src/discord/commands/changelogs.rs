use crate::core::commands::CommandInvocation;
use crate::discord::commands::replies::{channel_context, send_reply};
use crate::discord::{Context, Error};

/// View bot version changelogs.
#[poise::command(
    slash_command,
    install_context = "Guild|User",
    interaction_context = "Guild|BotDm|PrivateChannel"
)]
pub async fn changelogs(ctx: Context<'_>) -> Result<(), Error> {
    let deferred = match ctx.defer_ephemeral().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Interaction expired before defer, replying in channel: {}", e);
            false
        }
    };

    let invocation = CommandInvocation::new("changelogs", channel_context(ctx));
    let reply = ctx.data().router.dispatch(invocation).await;
    send_reply(ctx, reply, deferred).await
}
