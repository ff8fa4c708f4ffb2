use crate::core::commands::CommandInvocation;
use crate::discord::commands::replies::{channel_context, send_reply};
use crate::discord::{Context, Error};

/// Learn about the Wonderland Explorer bot.
#[poise::command(
    slash_command,
    install_context = "Guild|User",
    interaction_context = "Guild|BotDm|PrivateChannel"
)]
pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
    let invocation = CommandInvocation::new("about", channel_context(ctx));
    let reply = ctx.data().router.dispatch(invocation).await;
    send_reply(ctx, reply, true).await
}
